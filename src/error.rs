use thiserror::Error;

/// Failures of the recording fetch collaborator
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("recording {0} not found")]
    NotFound(String),

    #[error("recording store failed: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("recording transport failed: {0}")]
    Transport(String),
}

/// Failures decoding a stored event payload
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("malformed event payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("event payload could not be decrypted: {0}")]
    Decrypt(String),
}

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("no recording loaded")]
    NoRecordingLoaded,

    #[error("failed to load recording {id}: {source}")]
    Load {
        id: String,
        #[source]
        source: SourceError,
    },

    #[error("failed to decode event {event_id} of recording {id}: {source}")]
    Decode {
        id: String,
        event_id: String,
        #[source]
        source: CodecError,
    },

    #[error("recording {0} only exposes metadata and cannot be played back")]
    PrivacyRestricted(String),
}
