use crate::error::{CodecError, PlaybackError, SourceError};
use crate::event::{is_deletion_key, PrivacyLevel, WritingSession};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The input action carried by one stored event once its payload is decoded
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DecodedAction {
    pub key: String,
    pub input_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

impl DecodedAction {
    pub fn insert_text(text: impl Into<String>) -> Self {
        let data = text.into();
        Self {
            key: data.clone(),
            input_type: "insertText".to_string(),
            data: Some(data),
        }
    }

    pub fn from_key(key: &str, value: Option<&str>) -> Self {
        let input_type = match key {
            "Backspace" => "deleteContentBackward",
            "Delete" => "deleteContentForward",
            "Enter" => "insertLineBreak",
            _ if value.is_some() => "insertText",
            _ => "none",
        };
        Self {
            key: key.to_string(),
            input_type: input_type.to_string(),
            data: value.filter(|_| !is_deletion_key(key)).map(str::to_string),
        }
    }
}

/// Summary row of a stored recording
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoredRecording {
    pub id: String,
    pub session_id: String,
    pub duration_ms: u64,
    pub total_keystrokes: usize,
    pub privacy_level: PrivacyLevel,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoredEvent {
    pub id: String,
    pub timestamp_ms: u64,
    pub encrypted_data: String,
}

/// What the fetch collaborator hands back for a recording id
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecording {
    pub recording: StoredRecording,
    pub events: Vec<StoredEvent>,
}

pub trait RecordingSource {
    fn fetch(&self, id: &str) -> Result<RawRecording, SourceError>;
}

/// Turns stored event payloads into actions and back
pub trait EventCodec {
    fn encode(&self, action: &DecodedAction) -> Result<String, CodecError>;
    fn decode(&self, payload: &str) -> Result<DecodedAction, CodecError>;
}

/// Payloads are the action's JSON, unencrypted
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainJsonCodec;

impl EventCodec for PlainJsonCodec {
    fn encode(&self, action: &DecodedAction) -> Result<String, CodecError> {
        Ok(serde_json::to_string(action)?)
    }

    fn decode(&self, payload: &str) -> Result<DecodedAction, CodecError> {
        Ok(serde_json::from_str(payload)?)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackEvent {
    pub id: String,
    pub timestamp_ms: u64,
    pub action: DecodedAction,
}

/// A decoded, read-only recording ready for playback
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackRecording {
    pub id: String,
    pub session_id: String,
    pub duration_ms: u64,
    pub total_keystrokes: usize,
    pub privacy_level: PrivacyLevel,
    pub created_at: DateTime<Utc>,
    pub events: Vec<PlaybackEvent>,
}

impl PlaybackRecording {
    /// Decodes every event payload. Events are ordered by timestamp and the
    /// duration is stretched to cover the last event if storage understated it.
    pub fn decode(raw: RawRecording, codec: &dyn EventCodec) -> Result<Self, PlaybackError> {
        let RawRecording { recording, events } = raw;

        let mut decoded = events
            .into_iter()
            .map(|stored| {
                let action = codec
                    .decode(&stored.encrypted_data)
                    .map_err(|source| PlaybackError::Decode {
                        id: recording.id.clone(),
                        event_id: stored.id.clone(),
                        source,
                    })?;
                Ok(PlaybackEvent {
                    id: stored.id,
                    timestamp_ms: stored.timestamp_ms,
                    action,
                })
            })
            .collect::<Result<Vec<_>, PlaybackError>>()?;
        decoded.sort_by_key(|e| e.timestamp_ms);

        let last_ts = decoded.last().map_or(0, |e| e.timestamp_ms);

        Ok(Self {
            id: recording.id,
            session_id: recording.session_id,
            duration_ms: recording.duration_ms.max(last_ts),
            total_keystrokes: recording.total_keystrokes,
            privacy_level: recording.privacy_level,
            created_at: recording.created_at,
            events: decoded,
        })
    }
}

/// Builds the storable form of a captured session: one payload per keydown
pub fn encode_session(
    session: &WritingSession,
    recording_id: &str,
    codec: &dyn EventCodec,
) -> Result<RawRecording, CodecError> {
    let sorted = session.sorted_events();
    let keydowns: Vec<_> = sorted.iter().filter(|e| e.is_keydown()).collect();
    let origin = sorted.first().map_or(0, |e| e.timestamp_ms);

    let events = keydowns
        .iter()
        .map(|e| {
            let action = DecodedAction::from_key(&e.key, e.value.as_deref());
            Ok(StoredEvent {
                id: e.id.clone(),
                timestamp_ms: e.timestamp_ms - origin,
                encrypted_data: codec.encode(&action)?,
            })
        })
        .collect::<Result<Vec<_>, CodecError>>()?;

    let duration_ms = sorted.last().map_or(0, |e| e.timestamp_ms - origin);

    Ok(RawRecording {
        recording: StoredRecording {
            id: recording_id.to_string(),
            session_id: session.id.clone(),
            duration_ms,
            total_keystrokes: keydowns.len(),
            privacy_level: session.metadata.privacy_level,
            created_at: session.start_time,
        },
        events,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::KeystrokeEvent;
    use assert_matches::assert_matches;

    fn raw_with(payloads: &[(&str, u64, &str)], duration_ms: u64) -> RawRecording {
        RawRecording {
            recording: StoredRecording {
                id: "rec".to_string(),
                session_id: "s".to_string(),
                duration_ms,
                total_keystrokes: payloads.len(),
                privacy_level: PrivacyLevel::Full,
                created_at: Utc::now(),
            },
            events: payloads
                .iter()
                .map(|(id, ts, data)| StoredEvent {
                    id: id.to_string(),
                    timestamp_ms: *ts,
                    encrypted_data: data.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn decode_sorts_and_extends_duration() {
        let b = PlainJsonCodec.encode(&DecodedAction::insert_text("b")).unwrap();
        let a = PlainJsonCodec.encode(&DecodedAction::insert_text("a")).unwrap();
        let raw = raw_with(&[("2", 900, &b), ("1", 100, &a)], 500);
        let recording = PlaybackRecording::decode(raw, &PlainJsonCodec).unwrap();
        assert_eq!(recording.events[0].id, "1");
        assert_eq!(recording.events[1].action.data.as_deref(), Some("b"));
        assert_eq!(recording.duration_ms, 900);
    }

    #[test]
    fn decode_reports_bad_payload() {
        let raw = raw_with(&[("e7", 0, "not json")], 100);
        let err = PlaybackRecording::decode(raw, &PlainJsonCodec).unwrap_err();
        assert_matches!(err, PlaybackError::Decode { ref event_id, .. } if event_id == "e7");
    }

    #[test]
    fn action_from_key() {
        let bs = DecodedAction::from_key("Backspace", None);
        assert_eq!(bs.input_type, "deleteContentBackward");
        let enter = DecodedAction::from_key("Enter", None);
        assert_eq!(enter.input_type, "insertLineBreak");
        let x = DecodedAction::from_key("x", Some("x"));
        assert_eq!(x.input_type, "insertText");
        assert_eq!(x.data.as_deref(), Some("x"));
        let nav = DecodedAction::from_key("ArrowLeft", None);
        assert_eq!(nav.input_type, "none");
    }

    #[test]
    fn encode_session_rebases_keydowns() {
        let mut session = WritingSession::new(
            "s1",
            "u",
            "d",
            vec![
                KeystrokeEvent::keydown("1", "h", 5_000),
                KeystrokeEvent::keyup("2", "h", 5_050),
                KeystrokeEvent::keydown("3", "i", 5_200),
                KeystrokeEvent::keyup("4", "i", 5_300),
            ],
        );
        session.metadata.privacy_level = PrivacyLevel::Anonymized;

        let raw = encode_session(&session, "rec-1", &PlainJsonCodec).unwrap();
        assert_eq!(raw.recording.id, "rec-1");
        assert_eq!(raw.recording.session_id, "s1");
        assert_eq!(raw.recording.total_keystrokes, 2);
        assert_eq!(raw.recording.duration_ms, 300);
        assert_eq!(raw.recording.privacy_level, PrivacyLevel::Anonymized);
        assert_eq!(raw.events.len(), 2);
        assert_eq!(raw.events[1].timestamp_ms, 200);

        let decoded = PlaybackRecording::decode(raw, &PlainJsonCodec).unwrap();
        assert_eq!(decoded.events[1].action, DecodedAction::insert_text("i"));
    }
}
