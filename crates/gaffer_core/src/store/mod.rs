//! Append-only event log over embedded sqlite.
//!
//! One `events` table, monotone gap-free sequence, one transaction (and so
//! one fsync) per appended batch. The log is the single serialization point
//! of the system; a partial append rolls back with the transaction.

pub mod codec;

use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use std::path::Path;

use crate::error::{CoreError, Result};
use crate::models::{Event, World};

/// Snapshot cadence, in appended events.
pub const SNAPSHOT_INTERVAL: i64 = 500;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

pub struct EventStore {
    conn: Connection,
    /// Strict replay (default): unknown kinds are fatal. Lax replay logs and
    /// skips them.
    strict: bool,
}

impl EventStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Private throwaway store, used by tests and `gaffer test`.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            CREATE TABLE IF NOT EXISTS events (
                sequence INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                kind TEXT NOT NULL,
                payload BLOB NOT NULL
            );
            CREATE TABLE IF NOT EXISTS snapshots (
                sequence INTEGER PRIMARY KEY,
                payload BLOB NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_events_kind ON events(kind);
            "#,
        )?;
        Ok(EventStore { conn, strict: true })
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Append a batch atomically; returns the assigned sequences in order.
    pub fn append_batch(&mut self, events: &[Event]) -> Result<Vec<i64>> {
        if events.is_empty() {
            return Ok(Vec::new());
        }
        let tx = self.conn.transaction()?;
        let mut sequences = Vec::with_capacity(events.len());
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO events (timestamp, kind, payload) VALUES (?1, ?2, ?3)",
            )?;
            for event in events {
                let payload = codec::encode_payload(&event.payload)?;
                stmt.execute(params![
                    event.timestamp.format(TIMESTAMP_FORMAT).to_string(),
                    event.kind(),
                    payload,
                ])?;
                sequences.push(tx.last_insert_rowid());
            }
        }
        tx.commit()?;
        Ok(sequences)
    }

    /// Events from `from_seq` (inclusive) in sequence order.
    ///
    /// A corrupt row halts the read with a fatal error naming the sequence;
    /// unknown kinds follow the strict/lax policy.
    pub fn read_from(&self, from_seq: i64) -> Result<Vec<(i64, Event)>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT sequence, timestamp, kind, payload FROM events
             WHERE sequence >= ?1 ORDER BY sequence",
        )?;
        let rows = stmt.query_map(params![from_seq], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Vec<u8>>(3)?,
            ))
        })?;

        let mut events = Vec::new();
        for row in rows {
            let (sequence, timestamp, kind, payload) = row?;
            let timestamp = NaiveDateTime::parse_from_str(&timestamp, TIMESTAMP_FORMAT)
                .map_err(|_| CoreError::CorruptEvent { sequence })?;
            match codec::decode_payload(&payload, &kind, sequence, self.strict)? {
                Some(payload) => events.push((sequence, Event::new(timestamp, payload))),
                None => {
                    log::warn!("skipping unknown event kind `{}` at sequence {}", kind, sequence)
                }
            }
        }
        Ok(events)
    }

    pub fn last_sequence(&self) -> Result<i64> {
        let seq: Option<i64> =
            self.conn.query_row("SELECT MAX(sequence) FROM events", [], |row| row.get(0))?;
        Ok(seq.unwrap_or(0))
    }

    pub fn event_count(&self) -> Result<i64> {
        Ok(self.conn.query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))?)
    }

    /// Clear both tables for a fresh start. Sequences restart from 1.
    pub fn reset(&mut self) -> Result<()> {
        self.conn.execute_batch("DELETE FROM events; DELETE FROM snapshots;")?;
        // sqlite_sequence only exists once an autoincrement insert happened.
        let _ = self.conn.execute("DELETE FROM sqlite_sequence WHERE name = 'events'", []);
        log::info!("event store reset");
        Ok(())
    }

    /// Persist a compact world image covering everything up to `sequence`.
    pub fn save_snapshot(&mut self, world: &World, sequence: i64) -> Result<()> {
        let blob = codec::encode_snapshot(world)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO snapshots (sequence, payload) VALUES (?1, ?2)",
            params![sequence, blob],
        )?;
        log::debug!("snapshot saved at sequence {}", sequence);
        Ok(())
    }

    /// Sequence of the latest snapshot without decoding it.
    pub fn last_snapshot_sequence(&self) -> Result<Option<i64>> {
        let seq: Option<i64> =
            self.conn.query_row("SELECT MAX(sequence) FROM snapshots", [], |row| row.get(0))?;
        Ok(seq)
    }

    /// Latest snapshot, if any, with the last sequence it includes.
    pub fn load_snapshot(&self) -> Result<Option<(World, i64)>> {
        let row: Option<(i64, Vec<u8>)> = self
            .conn
            .query_row(
                "SELECT sequence, payload FROM snapshots ORDER BY sequence DESC LIMIT 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .map(Some)
            .or_else(|err| match err {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(other),
            })?;
        match row {
            Some((sequence, blob)) => Ok(Some((codec::decode_snapshot(&blob)?, sequence))),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data;
    use crate::models::EventPayload;
    use chrono::NaiveDate;

    fn ts(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 8, day).unwrap().and_hms_opt(15, 0, 0).unwrap()
    }

    fn kick_off(n: u32) -> Event {
        Event::new(ts(2), EventPayload::KickOff { match_id: format!("match-{}", n) })
    }

    #[test]
    fn append_assigns_gap_free_sequences() {
        let mut store = EventStore::open_in_memory().unwrap();
        let batch: Vec<Event> = (0..5).map(kick_off).collect();
        let seqs = store.append_batch(&batch).unwrap();
        assert_eq!(seqs, vec![1, 2, 3, 4, 5]);
        let seqs = store.append_batch(&batch[..2]).unwrap();
        assert_eq!(seqs, vec![6, 7]);
        assert_eq!(store.last_sequence().unwrap(), 7);
    }

    #[test]
    fn read_from_returns_suffix_in_order() {
        let mut store = EventStore::open_in_memory().unwrap();
        store.append_batch(&(0..6).map(kick_off).collect::<Vec<_>>()).unwrap();
        let events = store.read_from(4).unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].0, 4);
        assert_eq!(events[2].0, 6);
        for (_, event) in &events {
            assert_eq!(event.timestamp, ts(2));
        }
    }

    #[test]
    fn reset_clears_everything_and_restarts_sequences() {
        let mut store = EventStore::open_in_memory().unwrap();
        store.append_batch(&[kick_off(1)]).unwrap();
        store.save_snapshot(&data::genesis(1), 1).unwrap();
        store.reset().unwrap();
        assert_eq!(store.event_count().unwrap(), 0);
        assert!(store.load_snapshot().unwrap().is_none());
        let seqs = store.append_batch(&[kick_off(2)]).unwrap();
        assert_eq!(seqs, vec![1], "sequence restarts after reset");
    }

    #[test]
    fn corrupt_row_halts_replay_naming_the_sequence() {
        let mut store = EventStore::open_in_memory().unwrap();
        store.append_batch(&[kick_off(1), kick_off(2)]).unwrap();
        store
            .conn
            .execute("UPDATE events SET payload = x'00ff' WHERE sequence = 2", [])
            .unwrap();
        let err = store.read_from(1).unwrap_err();
        assert!(matches!(err, CoreError::CorruptEvent { sequence: 2 }), "got {:?}", err);
    }

    #[test]
    fn unknown_kind_fatal_in_strict_tolerated_in_lax() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.sqlite");
        {
            let mut store = EventStore::open(&path).unwrap();
            store.append_batch(&[kick_off(1)]).unwrap();
            store
                .conn
                .execute(
                    "INSERT INTO events (timestamp, kind, payload)
                     VALUES (?1, 'var_review', x'7b7d')",
                    params!["2025-08-02T15:00:00"],
                )
                .unwrap();

            let err = store.read_from(1).unwrap_err();
            assert!(matches!(err, CoreError::UnknownEventKind { sequence: 2, .. }));
        }

        let lax = EventStore::open(&path).unwrap().with_strict(false);
        let events = lax.read_from(1).unwrap();
        assert_eq!(events.len(), 1, "unknown kind skipped in lax mode");
    }

    #[test]
    fn snapshot_roundtrip_through_store() {
        let mut store = EventStore::open_in_memory().unwrap();
        let world = data::genesis(42);
        store.save_snapshot(&world, 123).unwrap();
        let (loaded, seq) = store.load_snapshot().unwrap().unwrap();
        assert_eq!(seq, 123);
        assert_eq!(loaded, world);
    }

    #[test]
    fn persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.sqlite");
        {
            let mut store = EventStore::open(&path).unwrap();
            store.append_batch(&[kick_off(1)]).unwrap();
        }
        let store = EventStore::open(&path).unwrap();
        assert_eq!(store.event_count().unwrap(), 1);
    }
}
