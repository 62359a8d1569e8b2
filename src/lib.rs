// Library surface: analytics over captured keystroke sessions and their playback.
// The binary in main.rs is a thin CLI over these modules.
pub mod analytics;
pub mod app_dirs;
pub mod config;
pub mod error;
pub mod event;
pub mod playback;
pub mod runtime;
pub mod store;
pub mod summary;
pub mod time_series;
pub mod util;

pub use analytics::{analyze_session, analyze_session_with, SessionAnalytics, SessionType};
pub use error::{CodecError, PlaybackError, SourceError};
pub use event::{KeystrokeEvent, WritingSession};
pub use playback::PlaybackEngine;
pub use summary::{generate_summary, ImprovementTrend, Summary};
