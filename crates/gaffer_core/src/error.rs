use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("event codec error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("snapshot encode error: {0}")]
    SnapshotEncode(#[from] rmp_serde::encode::Error),

    #[error("snapshot decode error: {0}")]
    SnapshotDecode(#[from] rmp_serde::decode::Error),

    #[error("snapshot corrupted (checksum mismatch)")]
    SnapshotCorrupted,

    #[error("corrupt event record at sequence {sequence}")]
    CorruptEvent { sequence: i64 },

    #[error("unknown event kind `{kind}` at sequence {sequence}")]
    UnknownEventKind { sequence: i64, kind: String },

    #[error("unknown {kind} id: {id}")]
    UnknownEntity { kind: &'static str, id: String },

    #[error("world invariant violated: {0}")]
    InvariantViolation(String),

    #[error("calendar exhausted after season {season}")]
    CalendarExhausted { season: u32 },

    #[error("configuration error: {0}")]
    Config(String),
}

impl CoreError {
    /// Fatal errors abort the process or the current request; everything
    /// else is logged and worked around.
    pub fn is_fatal(&self) -> bool {
        match self {
            CoreError::Io(_) => true,
            CoreError::Store(_) => true,
            CoreError::SnapshotCorrupted => true,
            CoreError::CorruptEvent { .. } => true,
            CoreError::UnknownEventKind { .. } => true,
            CoreError::InvariantViolation(_) => true,
            CoreError::UnknownEntity { .. } => false,
            CoreError::CalendarExhausted { .. } => false,
            CoreError::Codec(_) => true,
            CoreError::SnapshotEncode(_) => true,
            CoreError::SnapshotDecode(_) => true,
            CoreError::Config(_) => false,
        }
    }

    /// Errors a caller outside the core should surface as "not found".
    pub fn is_not_found(&self) -> bool {
        matches!(self, CoreError::UnknownEntity { .. })
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
