pub mod engine;
pub mod listeners;
pub mod recording;
pub mod render;
pub mod state;

pub use engine::PlaybackEngine;
pub use listeners::{ListenerId, PlaybackEventKind, PlaybackNotice};
pub use recording::{
    encode_session, DecodedAction, EventCodec, PlainJsonCodec, PlaybackEvent, PlaybackRecording,
    RawRecording, RecordingSource, StoredEvent, StoredRecording,
};
pub use render::{RenderTarget, SharedText, TextBuffer};
pub use state::{PlaybackAnalytics, PlaybackState, PlaybackStatus};
