use super::listeners::{Listener, ListenerId, ListenerRegistry, PlaybackEventKind, PlaybackNotice};
use super::recording::{EventCodec, PlainJsonCodec, PlaybackRecording, RecordingSource};
use super::render::{RenderTarget, TextBuffer};
use super::state::{PlaybackAnalytics, PlaybackState, PlaybackStatus};
use crate::config::PlaybackConfig;
use crate::error::PlaybackError;
use crate::event::PrivacyLevel;
use crate::runtime::{Clock, SystemClock};
use chrono::Utc;

/// Replays one recorded session at an adjustable speed.
///
/// Time only moves inside [`PlaybackEngine::tick`], which a [`crate::runtime::Runner`]
/// (or the host's own scheduler) calls repeatedly while playing. The rendered
/// text is always the result of applying, in order, every event at or before
/// the current time.
pub struct PlaybackEngine {
    config: PlaybackConfig,
    source: Box<dyn RecordingSource>,
    codec: Box<dyn EventCodec>,
    clock: Box<dyn Clock>,
    recording: Option<PlaybackRecording>,
    status: PlaybackStatus,
    state: PlaybackState,
    analytics: PlaybackAnalytics,
    listeners: ListenerRegistry,
    target: Option<Box<dyn RenderTarget>>,
    buffer: TextBuffer,
    /// Number of recording events reflected in `buffer`
    applied: usize,
    last_tick_ms: Option<u64>,
}

impl PlaybackEngine {
    pub fn new(
        source: Box<dyn RecordingSource>,
        codec: Box<dyn EventCodec>,
        clock: Box<dyn Clock>,
        config: PlaybackConfig,
    ) -> Self {
        let state = PlaybackState::new(config.clamp_speed(config.default_playback_speed));
        Self {
            config,
            source,
            codec,
            clock,
            recording: None,
            status: PlaybackStatus::Idle,
            state,
            analytics: PlaybackAnalytics::default(),
            listeners: ListenerRegistry::default(),
            target: None,
            buffer: TextBuffer::default(),
            applied: 0,
            last_tick_ms: None,
        }
    }

    /// Plain JSON payloads, wall-clock time, default limits
    pub fn with_source(source: Box<dyn RecordingSource>) -> Self {
        Self::new(
            source,
            Box::new(PlainJsonCodec),
            Box::new(SystemClock::new()),
            PlaybackConfig::default(),
        )
    }

    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn recording(&self) -> Option<&PlaybackRecording> {
        self.recording.as_ref()
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    /// Text committed at the current position
    pub fn rendered_text(&self) -> &str {
        self.buffer.text()
    }

    /// Fetches and decodes a recording, replacing any loaded one. On failure the
    /// engine is left idle with nothing loaded.
    pub fn load_recording(&mut self, id: &str) -> Result<(), PlaybackError> {
        self.halt();
        self.recording = None;
        self.status = PlaybackStatus::Idle;
        self.reset_position();

        log::info!("loading recording {}", id);
        let raw = self.source.fetch(id).map_err(|source| {
            log::warn!("fetching recording {} failed: {}", id, source);
            PlaybackError::Load {
                id: id.to_string(),
                source,
            }
        })?;

        if raw.recording.privacy_level == PrivacyLevel::MetadataOnly {
            log::warn!("recording {} is metadata-only, refusing playback", id);
            return Err(PlaybackError::PrivacyRestricted(id.to_string()));
        }

        let recording = PlaybackRecording::decode(raw, self.codec.as_ref())?;
        let notice = PlaybackNotice::RecordingLoaded {
            recording_id: recording.id.clone(),
            duration_ms: recording.duration_ms,
            total_keystrokes: recording.total_keystrokes,
        };
        log::debug!(
            "recording {} loaded: {} events over {}ms",
            recording.id,
            recording.events.len(),
            recording.duration_ms
        );

        self.buffer = TextBuffer::new(recording.privacy_level == PrivacyLevel::Anonymized);
        self.applied = 0;
        self.recording = Some(recording);
        self.status = PlaybackStatus::Loaded;
        self.state = PlaybackState::new(self.config.clamp_speed(self.config.default_playback_speed));
        self.analytics = PlaybackAnalytics::default();
        self.render_to(0.0);
        self.refresh_target();

        self.listeners.emit(&notice);
        Ok(())
    }

    /// Starts or resumes playback. Playing from the end restarts at 0.
    pub fn play(&mut self) -> Result<(), PlaybackError> {
        let duration = self.duration_ms().ok_or(PlaybackError::NoRecordingLoaded)?;
        if self.status == PlaybackStatus::Playing {
            return Ok(());
        }

        if duration > 0 && self.state.current_time >= duration as f64 {
            self.render_to(0.0);
            self.state.current_time = 0.0;
            self.state.progress = 0.0;
        }

        self.status = PlaybackStatus::Playing;
        self.state.is_playing = true;
        self.state.is_paused = false;
        self.last_tick_ms = Some(self.clock.now_ms());
        self.analytics.session_start_time.get_or_insert_with(Utc::now);

        log::debug!("play from {:.0}ms", self.state.current_time);
        self.listeners.emit(&PlaybackNotice::Play {
            current_time: self.state.current_time,
        });
        Ok(())
    }

    /// Freezes time advancement. No-op unless playing.
    pub fn pause(&mut self) {
        if self.status != PlaybackStatus::Playing {
            return;
        }
        self.advance();
        if self.status != PlaybackStatus::Playing {
            // reached the end while catching up
            return;
        }

        self.halt();
        self.status = PlaybackStatus::Paused;
        self.state.is_paused = true;
        self.analytics.pause_count += 1;

        self.listeners.emit(&PlaybackNotice::Pause {
            current_time: self.state.current_time,
        });
    }

    /// Halts playback and rewinds to the start. No-op when nothing is loaded or
    /// already stopped at the start.
    pub fn stop(&mut self) {
        let rewound = self.state.current_time == 0.0;
        match self.status {
            PlaybackStatus::Idle => return,
            PlaybackStatus::Loaded | PlaybackStatus::Stopped if rewound => return,
            _ => {}
        }

        if self.status == PlaybackStatus::Playing {
            self.take_elapsed();
        }
        self.halt();
        self.status = PlaybackStatus::Stopped;
        self.state.is_paused = false;
        self.reset_position();

        self.listeners.emit(&PlaybackNotice::Stop);
    }

    /// Sets the playback speed, clamped to the configured range
    pub fn set_speed(&mut self, speed: f64) {
        if self.status == PlaybackStatus::Playing {
            self.advance();
        }
        let speed = self.config.clamp_speed(speed);
        self.state.playback_speed = speed;
        self.analytics.speed_changes += 1;

        self.listeners.emit(&PlaybackNotice::SpeedChange { speed });
    }

    /// Jumps to `time_ms`, clamped to the recording, and re-renders the text there
    pub fn seek(&mut self, time_ms: f64) -> Result<(), PlaybackError> {
        let duration = self.duration_ms().ok_or(PlaybackError::NoRecordingLoaded)?;
        if self.status == PlaybackStatus::Playing {
            self.take_elapsed();
        }

        let from = self.state.current_time;
        let to = if time_ms.is_nan() {
            from
        } else {
            time_ms.clamp(0.0, duration as f64)
        };

        self.state.current_time = to;
        self.state.progress = progress_of(to, duration);
        self.analytics.seek_count += 1;
        self.analytics.record_progress(self.state.progress);
        self.render_to(to);

        self.listeners.emit(&PlaybackNotice::Seek { from, to });
        Ok(())
    }

    pub fn skip_forward(&mut self) -> Result<(), PlaybackError> {
        self.seek(self.state.current_time + self.config.skip_step_ms as f64)
    }

    pub fn skip_backward(&mut self) -> Result<(), PlaybackError> {
        self.seek(self.state.current_time - self.config.skip_step_ms as f64)
    }

    /// Binds (or unbinds) the surface that mirrors the rendered text
    pub fn set_target(&mut self, target: Option<Box<dyn RenderTarget>>) {
        self.target = target;
        self.refresh_target();
    }

    pub fn on(&mut self, kind: PlaybackEventKind, listener: Listener) -> ListenerId {
        self.listeners.on(kind, listener)
    }

    pub fn off(&mut self, kind: PlaybackEventKind, id: ListenerId) -> bool {
        self.listeners.off(kind, id)
    }

    pub fn get_analytics(&self) -> PlaybackAnalytics {
        self.analytics.snapshot(self.state.playback_speed)
    }

    /// Stops playback and drops the recording, target and listeners. Safe to
    /// call repeatedly; an engine loaded again afterwards is torn down again.
    pub fn destroy(&mut self) {
        if self.recording.is_none() && self.target.is_none() && self.listeners.is_empty() {
            return;
        }
        self.stop();
        self.halt();
        self.listeners.clear();
        self.target = None;
        self.recording = None;
        self.status = PlaybackStatus::Idle;
        self.buffer = TextBuffer::default();
        self.applied = 0;
        self.state.is_paused = false;
        log::debug!("playback engine destroyed");
    }

    /// One scheduler step: moves `current_time` by the wall time since the
    /// previous step scaled by the speed, applies the events it passed, and
    /// finishes playback at the end of the recording.
    pub fn tick(&mut self) {
        if self.status != PlaybackStatus::Playing {
            return;
        }
        self.advance();
    }

    fn advance(&mut self) {
        let Some(duration) = self.duration_ms() else {
            return;
        };
        let speed = self.state.playback_speed;
        let elapsed = self.take_elapsed();

        let current = (self.state.current_time + elapsed as f64 * speed).min(duration as f64);
        self.state.current_time = current;
        self.state.progress = progress_of(current, duration);
        self.analytics.record_progress(self.state.progress);
        self.render_to(current);

        self.listeners.emit(&PlaybackNotice::TimeUpdate {
            current_time: current,
            progress: self.state.progress,
        });

        if current >= duration as f64 {
            self.complete();
        }
    }

    fn complete(&mut self) {
        self.halt();
        self.status = PlaybackStatus::Stopped;
        self.state.is_paused = false;
        self.state.progress = 1.0;
        self.analytics.record_progress(1.0);

        let analytics = self.get_analytics();
        log::info!(
            "playback complete after {}ms of viewing",
            analytics.total_play_time
        );
        self.listeners
            .emit(&PlaybackNotice::PlaybackComplete { analytics });
    }

    /// Wall milliseconds since the previous tick, booked as play time
    fn take_elapsed(&mut self) -> u64 {
        let now = self.clock.now_ms();
        let elapsed = self
            .last_tick_ms
            .replace(now)
            .map_or(0, |last| now.saturating_sub(last));
        self.analytics
            .record_play_time(elapsed, self.state.playback_speed);
        elapsed
    }

    /// Cancels the tick source
    fn halt(&mut self) {
        self.last_tick_ms = None;
        self.state.is_playing = false;
    }

    fn reset_position(&mut self) {
        self.state.current_time = 0.0;
        self.state.progress = 0.0;
        self.render_to(0.0);
    }

    fn duration_ms(&self) -> Option<u64> {
        self.recording.as_ref().map(|r| r.duration_ms)
    }

    /// Brings the buffer to `time_ms`, replaying from the start when moving backwards
    fn render_to(&mut self, time_ms: f64) {
        let Some(recording) = self.recording.as_ref() else {
            if !self.buffer.text().is_empty() {
                self.buffer.clear();
                self.applied = 0;
                self.refresh_target();
            }
            return;
        };
        let events = &recording.events;

        let mut changed = false;
        let rewind = self.applied > 0 && events[self.applied - 1].timestamp_ms as f64 > time_ms;
        if rewind {
            self.buffer.clear();
            self.applied = 0;
            changed = true;
        }
        while self.applied < events.len() && events[self.applied].timestamp_ms as f64 <= time_ms {
            self.buffer.apply(&events[self.applied].action);
            self.applied += 1;
            changed = true;
        }

        if changed {
            self.refresh_target();
        }
    }

    fn refresh_target(&mut self) {
        if let Some(target) = self.target.as_mut() {
            target.render(self.buffer.text());
        }
    }
}

impl Drop for PlaybackEngine {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl std::fmt::Debug for PlaybackEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackEngine")
            .field("status", &self.status)
            .field("state", &self.state)
            .field("recording", &self.recording.as_ref().map(|r| &r.id))
            .field("listeners", &self.listeners)
            .finish()
    }
}

fn progress_of(time_ms: f64, duration_ms: u64) -> f64 {
    if duration_ms == 0 {
        return 0.0;
    }
    (time_ms / duration_ms as f64).clamp(0.0, 1.0)
}
