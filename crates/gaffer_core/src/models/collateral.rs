//! Collateral entities: owners, staff and press. They flavor the narrative
//! events and carry the soft fields the collaborator may touch.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Owner {
    pub id: String,
    pub name: String,
    pub team_id: String,
    /// - Range: 0..=100; soft state, LLM-adjustable.
    pub public_approval: u8,
    /// - Range: 0..=100
    pub ambition: u8,
}

impl Owner {
    pub fn normalize(&mut self) {
        self.public_approval = self.public_approval.min(100);
        self.ambition = self.ambition.min(100);
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StaffRole {
    Manager,
    AssistantCoach,
    Physio,
    ChiefScout,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StaffMember {
    pub id: String,
    pub name: String,
    pub team_id: String,
    pub role: StaffRole,
    /// - Range: 1..=100
    pub quality: u8,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MediaStyle {
    Tabloid,
    Broadsheet,
    FanBlog,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaOutlet {
    pub id: String,
    pub name: String,
    pub style: MediaStyle,
}

/// Applied narrative, kept in a bounded world feed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewsItem {
    pub date: NaiveDate,
    pub outlet_id: Option<String>,
    pub headline: String,
    pub body: String,
}

/// World news feed cap; older items fall off the front.
pub const NEWS_FEED_CAP: usize = 100;
