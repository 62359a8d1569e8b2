use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, strum_macros::Display)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum PlaybackStatus {
    #[default]
    Idle,
    Loaded,
    Playing,
    Paused,
    Stopped,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackState {
    pub is_playing: bool,
    pub is_paused: bool,
    /// Position in the recording, milliseconds
    pub current_time: f64,
    pub playback_speed: f64,
    /// `current_time / duration`, within `[0, 1]`
    pub progress: f64,
}

impl PlaybackState {
    pub fn new(playback_speed: f64) -> Self {
        Self {
            is_playing: false,
            is_paused: false,
            current_time: 0.0,
            playback_speed,
            progress: 0.0,
        }
    }
}

/// Running viewer counters for one loaded recording
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackAnalytics {
    pub session_start_time: Option<DateTime<Utc>>,
    /// Wall-clock milliseconds spent playing
    pub total_play_time: u64,
    pub pause_count: u32,
    pub seek_count: u32,
    pub speed_changes: u32,
    /// Furthest point reached, percent of the recording
    pub completion_rate: f64,
    /// Playback speed averaged over play time
    pub average_speed: f64,
    #[serde(skip)]
    pub(crate) speed_weighted_ms: f64,
}

impl PlaybackAnalytics {
    pub(crate) fn record_play_time(&mut self, elapsed_ms: u64, speed: f64) {
        self.total_play_time += elapsed_ms;
        self.speed_weighted_ms += elapsed_ms as f64 * speed;
    }

    pub(crate) fn record_progress(&mut self, progress: f64) {
        self.completion_rate = self.completion_rate.max(progress * 100.0);
    }

    /// Snapshot with `average_speed` resolved; `current_speed` stands in before any play time
    pub(crate) fn snapshot(&self, current_speed: f64) -> Self {
        let average_speed = if self.total_play_time > 0 {
            self.speed_weighted_ms / self.total_play_time as f64
        } else {
            current_speed
        };
        Self {
            average_speed,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_speed_is_time_weighted() {
        let mut analytics = PlaybackAnalytics::default();
        assert_eq!(analytics.snapshot(1.5).average_speed, 1.5);

        analytics.record_play_time(1_000, 1.0);
        analytics.record_play_time(3_000, 2.0);
        let snap = analytics.snapshot(2.0);
        assert_eq!(snap.total_play_time, 4_000);
        assert_eq!(snap.average_speed, 1.75);
    }

    #[test]
    fn completion_rate_keeps_furthest_point() {
        let mut analytics = PlaybackAnalytics::default();
        analytics.record_progress(0.6);
        analytics.record_progress(0.2);
        assert_eq!(analytics.completion_rate, 60.0);
    }

    #[test]
    fn status_names() {
        assert_eq!(PlaybackStatus::Playing.to_string(), "playing");
        assert_eq!(PlaybackStatus::default(), PlaybackStatus::Idle);
    }
}
