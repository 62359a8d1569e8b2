use crate::error::SourceError;
use crate::event::PrivacyLevel;
use crate::playback::{RawRecording, RecordingSource, StoredEvent, StoredRecording};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Result, Row};
use std::path::Path;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS recordings (
        id TEXT PRIMARY KEY,
        session_id TEXT NOT NULL,
        duration_ms INTEGER NOT NULL,
        total_keystrokes INTEGER NOT NULL,
        privacy_level TEXT NOT NULL,
        created_at TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS recording_events (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        recording_id TEXT NOT NULL REFERENCES recordings(id) ON DELETE CASCADE,
        event_id TEXT NOT NULL,
        seq INTEGER NOT NULL,
        timestamp_ms INTEGER NOT NULL,
        encrypted_data TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_recording_events_recording
        ON recording_events(recording_id, seq);
"#;

/// SQLite-backed recording storage; serves as the playback fetch collaborator
#[derive(Debug)]
pub struct RecordingStore {
    conn: Connection,
}

impl RecordingStore {
    /// Opens (creating if needed) the database at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CANTOPEN),
                    Some(format!("Failed to create directory: {}", e)),
                )
            })?;
        }
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Inserts or replaces a recording together with all of its events
    pub fn save_recording(&mut self, raw: &RawRecording) -> Result<()> {
        let tx = self.conn.transaction()?;
        let rec = &raw.recording;

        tx.execute(
            "DELETE FROM recording_events WHERE recording_id = ?1",
            [&rec.id],
        )?;
        tx.execute(
            r#"
            INSERT OR REPLACE INTO recordings
            (id, session_id, duration_ms, total_keystrokes, privacy_level, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                rec.id,
                rec.session_id,
                rec.duration_ms,
                rec.total_keystrokes,
                rec.privacy_level.to_string(),
                rec.created_at.to_rfc3339(),
            ],
        )?;

        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO recording_events
                (recording_id, event_id, seq, timestamp_ms, encrypted_data)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )?;
            for (seq, event) in raw.events.iter().enumerate() {
                stmt.execute(params![
                    rec.id,
                    event.id,
                    seq,
                    event.timestamp_ms,
                    event.encrypted_data,
                ])?;
            }
        }

        tx.commit()?;
        log::debug!(
            "stored recording {} with {} events",
            rec.id,
            raw.events.len()
        );
        Ok(())
    }

    /// All recordings, newest first
    pub fn list_recordings(&self) -> Result<Vec<StoredRecording>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, session_id, duration_ms, total_keystrokes, privacy_level, created_at
            FROM recordings
            ORDER BY created_at DESC, id
            "#,
        )?;
        let rows = stmt.query_map([], recording_from_row)?;
        rows.collect()
    }

    pub fn get_recording(&self, id: &str) -> Result<Option<RawRecording>> {
        let recording = self
            .conn
            .query_row(
                r#"
                SELECT id, session_id, duration_ms, total_keystrokes, privacy_level, created_at
                FROM recordings WHERE id = ?1
                "#,
                [id],
                recording_from_row,
            )
            .optional()?;

        let Some(recording) = recording else {
            return Ok(None);
        };

        let mut stmt = self.conn.prepare(
            r#"
            SELECT event_id, timestamp_ms, encrypted_data
            FROM recording_events
            WHERE recording_id = ?1
            ORDER BY seq
            "#,
        )?;
        let events = stmt
            .query_map([id], |row| {
                Ok(StoredEvent {
                    id: row.get(0)?,
                    timestamp_ms: row.get(1)?,
                    encrypted_data: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>>>()?;

        Ok(Some(RawRecording { recording, events }))
    }

    pub fn delete_recording(&self, id: &str) -> Result<bool> {
        self.conn
            .execute("DELETE FROM recording_events WHERE recording_id = ?1", [id])?;
        let removed = self
            .conn
            .execute("DELETE FROM recordings WHERE id = ?1", [id])?;
        Ok(removed > 0)
    }
}

impl RecordingSource for RecordingStore {
    fn fetch(&self, id: &str) -> std::result::Result<RawRecording, SourceError> {
        self.get_recording(id)?
            .ok_or_else(|| SourceError::NotFound(id.to_string()))
    }
}

fn recording_from_row(row: &Row<'_>) -> Result<StoredRecording> {
    let privacy: String = row.get(4)?;
    let privacy_level = PrivacyLevel::from_name(&privacy)
        .ok_or_else(|| rusqlite::Error::InvalidColumnType(4, "privacy_level".to_string(), Type::Text))?;

    let created_at: String = row.get(5)?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|_| rusqlite::Error::InvalidColumnType(5, "created_at".to_string(), Type::Text))?
        .with_timezone(&Utc);

    Ok(StoredRecording {
        id: row.get(0)?,
        session_id: row.get(1)?,
        duration_ms: row.get(2)?,
        total_keystrokes: row.get(3)?,
        privacy_level,
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{KeystrokeEvent, WritingSession};
    use crate::playback::{encode_session, PlainJsonCodec};
    use assert_matches::assert_matches;
    use tempfile::tempdir;

    fn sample(id: &str) -> RawRecording {
        let session = WritingSession::new(
            format!("session-{id}"),
            "user",
            "doc",
            vec![
                KeystrokeEvent::keydown("1", "o", 0),
                KeystrokeEvent::keydown("2", "k", 150),
            ],
        );
        encode_session(&session, id, &PlainJsonCodec).unwrap()
    }

    #[test]
    fn save_and_fetch_round_trip() {
        let mut store = RecordingStore::open_in_memory().unwrap();
        let raw = sample("r1");
        store.save_recording(&raw).unwrap();

        let fetched = store.fetch("r1").unwrap();
        assert_eq!(fetched.recording.id, "r1");
        assert_eq!(fetched.recording.duration_ms, 150);
        assert_eq!(fetched.events, raw.events);
        assert_eq!(
            fetched.recording.created_at.timestamp(),
            raw.recording.created_at.timestamp()
        );
    }

    #[test]
    fn missing_recording_is_not_found() {
        let store = RecordingStore::open_in_memory().unwrap();
        assert_matches!(store.fetch("nope"), Err(SourceError::NotFound(id)) if id == "nope");
    }

    #[test]
    fn saving_again_replaces_events() {
        let mut store = RecordingStore::open_in_memory().unwrap();
        let mut raw = sample("r1");
        store.save_recording(&raw).unwrap();
        raw.events.truncate(1);
        store.save_recording(&raw).unwrap();

        assert_eq!(store.fetch("r1").unwrap().events.len(), 1);
        assert_eq!(store.list_recordings().unwrap().len(), 1);
    }

    #[test]
    fn list_and_delete() {
        let mut store = RecordingStore::open_in_memory().unwrap();
        store.save_recording(&sample("a")).unwrap();
        store.save_recording(&sample("b")).unwrap();
        assert_eq!(store.list_recordings().unwrap().len(), 2);

        assert!(store.delete_recording("a").unwrap());
        assert!(!store.delete_recording("a").unwrap());
        let ids: Vec<_> = store
            .list_recordings()
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["b"]);
    }

    #[test]
    fn open_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state").join("recordings.db");
        {
            let mut store = RecordingStore::open(&path).unwrap();
            store.save_recording(&sample("r1")).unwrap();
        }
        let store = RecordingStore::open(&path).unwrap();
        assert!(store.fetch("r1").is_ok());
    }
}
