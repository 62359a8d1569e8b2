use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum KeyEventType {
    Keydown,
    Keyup,
}

/// Capture-time setting limiting what playback may expose
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, strum_macros::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PrivacyLevel {
    #[default]
    Full,
    Anonymized,
    MetadataOnly,
}

impl PrivacyLevel {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "full" => Some(Self::Full),
            "anonymized" => Some(Self::Anonymized),
            "metadata_only" => Some(Self::MetadataOnly),
            _ => None,
        }
    }
}

/// A single captured input action. Immutable once recorded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KeystrokeEvent {
    pub id: String,
    pub key: String,
    #[serde(default)]
    pub code: String,
    pub event_type: KeyEventType,
    /// Milliseconds since the session epoch
    pub timestamp_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor_position: Option<u32>,
}

impl KeystrokeEvent {
    pub fn keydown(id: impl Into<String>, key: impl Into<String>, timestamp_ms: u64) -> Self {
        let key = key.into();
        let value = (key.chars().count() == 1).then(|| key.clone());
        Self {
            id: id.into(),
            code: key_code_for(&key),
            key,
            event_type: KeyEventType::Keydown,
            timestamp_ms,
            value,
            cursor_position: None,
        }
    }

    pub fn keyup(id: impl Into<String>, key: impl Into<String>, timestamp_ms: u64) -> Self {
        Self {
            event_type: KeyEventType::Keyup,
            value: None,
            ..Self::keydown(id, key, timestamp_ms)
        }
    }

    pub fn is_keydown(&self) -> bool {
        self.event_type == KeyEventType::Keydown
    }

    pub fn is_deletion(&self) -> bool {
        self.is_keydown() && is_deletion_key(&self.key)
    }

    /// Keydown that is neither a navigation nor a deletion key
    pub fn is_productive(&self) -> bool {
        self.is_keydown() && !is_deletion_key(&self.key) && !is_navigation_key(&self.key)
    }
}

pub fn is_deletion_key(key: &str) -> bool {
    matches!(key, "Backspace" | "Delete")
}

pub fn is_navigation_key(key: &str) -> bool {
    key.starts_with("Arrow")
}

fn key_code_for(key: &str) -> String {
    let mut chars = key.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphabetic() => format!("Key{}", c.to_ascii_uppercase()),
        (Some(c), None) if c.is_ascii_digit() => format!("Digit{c}"),
        (Some(' '), None) => "Space".to_string(),
        _ => key.to_string(),
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignment_type: Option<String>,
    #[serde(default)]
    pub privacy_level: PrivacyLevel,
}

/// A captured writing session: metadata plus its keystroke stream
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WritingSession {
    pub id: String,
    pub user_id: String,
    pub document_id: String,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub events: Vec<KeystrokeEvent>,
    #[serde(default)]
    pub metadata: SessionMetadata,
}

impl WritingSession {
    pub fn new(
        id: impl Into<String>,
        user_id: impl Into<String>,
        document_id: impl Into<String>,
        events: Vec<KeystrokeEvent>,
    ) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
            document_id: document_id.into(),
            start_time: Utc::now(),
            end_time: None,
            events,
            metadata: SessionMetadata::default(),
        }
    }

    /// Events ordered by timestamp; ties keep their capture order
    pub fn sorted_events(&self) -> Vec<KeystrokeEvent> {
        let mut events = self.events.clone();
        events.sort_by_key(|e| e.timestamp_ms);
        events
    }

    pub fn from_json(data: &str) -> serde_json::Result<Self> {
        serde_json::from_str(data)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let data = fs::read_to_string(path)?;
        Self::from_json(&data).map_err(std::io::Error::from)
    }
}
