use crate::config::AnalyticsConfig;
use crate::event::{KeystrokeEvent, WritingSession};
use crate::time_series::{wpm_timeline, TimeSeriesPoint};
use crate::util::{self, ratio};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// Deletions above this share of productive input mark an editing pass
const EDITING_RATIO_CUTOFF: f64 = 0.3;
const DISTRACTED_LONG_PAUSES: usize = 5;
const EXPLORATORY_MAX_WPM: f64 = 15.0;
const EXPLORATORY_MIN_PAUSES: usize = 20;
const FOCUS_PENALTY_PER_LONG_PAUSE: f64 = 10.0;
const REVISION_CONTEXT_CHARS: usize = 20;

#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SessionType {
    Focused,
    Distracted,
    Exploratory,
    Editing,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RevisionType {
    Deletion,
    Insertion,
    Replacement,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PauseAnalysis {
    pub short_pauses: usize,
    pub medium_pauses: usize,
    pub long_pauses: usize,
    pub total_pauses: usize,
    pub average_pause_length: f64,
    pub longest_pause: u64,
}

/// A maximal run of keydowns without a gap above the short-pause threshold
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WritingBurst {
    pub start_time: u64,
    pub end_time: u64,
    pub keystrokes: usize,
    pub duration: u64,
    pub average_wpm: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RevisionPattern {
    pub timestamp: u64,
    #[serde(rename = "type")]
    pub kind: RevisionType,
    pub length: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeRange {
    pub start: u64,
    pub end: u64,
    pub duration: u64,
}

impl TimeRange {
    pub fn new(start: u64, end: u64) -> Self {
        Self {
            start,
            end,
            duration: end.saturating_sub(start),
        }
    }
}

/// Derived writing-behaviour metrics for one session. Built fresh per call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionAnalytics {
    pub session_id: String,
    pub total_duration: u64,
    pub active_writing_time: u64,
    pub total_keystrokes: usize,
    pub productive_keystrokes: usize,
    pub deletions: usize,
    pub words_per_minute: f64,
    pub pause_analysis: PauseAnalysis,
    pub bursts_of_activity: Vec<WritingBurst>,
    pub revision_patterns: Vec<RevisionPattern>,
    pub editing_ratio: f64,
    pub focus_score: f64,
    pub productivity_score: f64,
    pub engagement_score: f64,
    pub session_type: SessionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peak_productivity_time: Option<TimeRange>,
    pub struggling_periods: Vec<TimeRange>,
    #[serde(default)]
    pub wpm_timeline: Vec<TimeSeriesPoint>,
}

impl SessionAnalytics {
    /// Canonical result for a session with no input
    pub fn empty(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            total_duration: 0,
            active_writing_time: 0,
            total_keystrokes: 0,
            productive_keystrokes: 0,
            deletions: 0,
            words_per_minute: 0.0,
            pause_analysis: PauseAnalysis::default(),
            bursts_of_activity: Vec::new(),
            revision_patterns: Vec::new(),
            editing_ratio: 0.0,
            focus_score: 0.0,
            productivity_score: 0.0,
            engagement_score: 0.0,
            session_type: SessionType::Exploratory,
            peak_productivity_time: None,
            struggling_periods: Vec::new(),
            wpm_timeline: Vec::new(),
        }
    }

    /// Mean of the three 0-100 quality scores
    pub fn overall_score(&self) -> f64 {
        (self.focus_score + self.productivity_score + self.engagement_score) / 3.0
    }
}

pub fn analyze_session(session: &WritingSession) -> SessionAnalytics {
    analyze_session_with(session, &AnalyticsConfig::default())
}

pub fn analyze_session_with(session: &WritingSession, cfg: &AnalyticsConfig) -> SessionAnalytics {
    let events = session.sorted_events();
    let (Some(first), Some(last)) = (events.first(), events.last()) else {
        log::debug!("session {} has no events, returning zeroed analytics", session.id);
        return SessionAnalytics::empty(session.id.clone());
    };

    let total_duration = last.timestamp_ms - first.timestamp_ms;
    let total_keystrokes = events.iter().filter(|e| e.is_keydown()).count();
    let productive_keystrokes = events.iter().filter(|e| e.is_productive()).count();
    let deletions = events.iter().filter(|e| e.is_deletion()).count();

    let active_writing_time: u64 = gaps(&events)
        .filter(|gap| *gap < cfg.pause_threshold_medium_ms)
        .sum();
    let words_per_minute = util::words_per_minute(
        productive_keystrokes,
        active_writing_time,
        cfg.average_word_length,
    );

    let pause_analysis = classify_pauses(&events, cfg);
    let editing_ratio = ratio(deletions as f64, productive_keystrokes as f64);

    let focus_score =
        (100.0 - pause_analysis.long_pauses as f64 * FOCUS_PENALTY_PER_LONG_PAUSE).max(0.0);
    let overall_wpm =
        util::words_per_minute(productive_keystrokes, total_duration, cfg.average_word_length);
    let productivity_score = (ratio(overall_wpm, cfg.expected_wpm) * 100.0).min(100.0);
    let engagement_score =
        (ratio(active_writing_time as f64, total_duration as f64) * 100.0).min(100.0);

    let session_type = classify_session(editing_ratio, &pause_analysis, words_per_minute);

    let analytics = SessionAnalytics {
        session_id: session.id.clone(),
        total_duration,
        active_writing_time,
        total_keystrokes,
        productive_keystrokes,
        deletions,
        words_per_minute,
        pause_analysis,
        bursts_of_activity: detect_bursts(&events, cfg),
        revision_patterns: detect_revisions(&events),
        editing_ratio,
        focus_score,
        productivity_score,
        engagement_score,
        session_type,
        peak_productivity_time: find_peak_window(&events, cfg),
        struggling_periods: find_struggling_periods(&events, cfg),
        wpm_timeline: wpm_timeline(&events, cfg.average_word_length),
    };

    log::debug!(
        "analyzed session {}: {} events, {:.1} wpm, type {}",
        analytics.session_id,
        events.len(),
        analytics.words_per_minute,
        analytics.session_type
    );

    analytics
}

/// Inter-event gaps of a time-ordered event slice
fn gaps(events: &[KeystrokeEvent]) -> impl Iterator<Item = u64> + '_ {
    events
        .iter()
        .tuple_windows()
        .map(|(a, b)| b.timestamp_ms - a.timestamp_ms)
}

fn classify_pauses(events: &[KeystrokeEvent], cfg: &AnalyticsConfig) -> PauseAnalysis {
    let mut analysis = PauseAnalysis::default();
    let mut total_length = 0u64;

    for gap in gaps(events).filter(|gap| *gap >= cfg.min_pause_ms) {
        if gap < cfg.pause_threshold_short_ms {
            analysis.short_pauses += 1;
        } else if gap < cfg.pause_threshold_medium_ms {
            analysis.medium_pauses += 1;
        } else {
            analysis.long_pauses += 1;
        }
        analysis.total_pauses += 1;
        analysis.longest_pause = analysis.longest_pause.max(gap);
        total_length += gap;
    }

    analysis.average_pause_length = ratio(total_length as f64, analysis.total_pauses as f64);
    analysis
}

fn detect_bursts(events: &[KeystrokeEvent], cfg: &AnalyticsConfig) -> Vec<WritingBurst> {
    let keydowns: Vec<u64> = events
        .iter()
        .filter(|e| e.is_keydown())
        .map(|e| e.timestamp_ms)
        .collect();

    let mut bursts = Vec::new();
    let Some(&first) = keydowns.first() else {
        return bursts;
    };

    let mut start = first;
    let mut prev = first;
    let mut keystrokes = 1usize;

    let mut close = |start: u64, end: u64, keystrokes: usize| {
        let duration = end - start;
        if duration >= cfg.burst_min_duration_ms && keystrokes >= cfg.burst_min_keystrokes {
            bursts.push(WritingBurst {
                start_time: start,
                end_time: end,
                keystrokes,
                duration,
                average_wpm: util::words_per_minute(keystrokes, duration, cfg.average_word_length),
            });
        }
    };

    for &ts in &keydowns[1..] {
        if ts - prev > cfg.pause_threshold_short_ms {
            close(start, prev, keystrokes);
            start = ts;
            keystrokes = 0;
        }
        keystrokes += 1;
        prev = ts;
    }
    close(start, prev, keystrokes);

    bursts
}

/// Collapses runs of consecutive deletion keydowns into one record each
fn detect_revisions(events: &[KeystrokeEvent]) -> Vec<RevisionPattern> {
    let keydowns: Vec<&KeystrokeEvent> = events.iter().filter(|e| e.is_keydown()).collect();
    let mut patterns = Vec::new();
    let mut recent = String::new();

    let mut i = 0;
    while i < keydowns.len() {
        let event = keydowns[i];
        if !event.is_deletion() {
            if let Some(value) = event.value.as_deref().filter(|_| event.is_productive()) {
                recent.push_str(value);
                let excess = recent.chars().count().saturating_sub(REVISION_CONTEXT_CHARS);
                if excess > 0 {
                    recent = recent.chars().skip(excess).collect();
                }
            }
            i += 1;
            continue;
        }

        let run = keydowns[i..]
            .iter()
            .take_while(|e| e.is_deletion())
            .count();
        patterns.push(RevisionPattern {
            timestamp: event.timestamp_ms,
            kind: RevisionType::Deletion,
            length: run,
            context: (!recent.is_empty()).then(|| recent.clone()),
        });
        i += run;
    }

    patterns
}

fn classify_session(
    editing_ratio: f64,
    pauses: &PauseAnalysis,
    words_per_minute: f64,
) -> SessionType {
    if editing_ratio > EDITING_RATIO_CUTOFF {
        SessionType::Editing
    } else if pauses.long_pauses > DISTRACTED_LONG_PAUSES {
        SessionType::Distracted
    } else if words_per_minute < EXPLORATORY_MAX_WPM && pauses.total_pauses > EXPLORATORY_MIN_PAUSES
    {
        SessionType::Exploratory
    } else {
        SessionType::Focused
    }
}

/// The window anchored at an event start holding the most keydowns
fn find_peak_window(events: &[KeystrokeEvent], cfg: &AnalyticsConfig) -> Option<TimeRange> {
    if events.len() < cfg.peak_min_events {
        return None;
    }

    let keydowns: Vec<u64> = events
        .iter()
        .filter(|e| e.is_keydown())
        .map(|e| e.timestamp_ms)
        .collect();

    let mut best: Option<(usize, u64)> = None;
    for anchor in events.iter().map(|e| e.timestamp_ms).dedup() {
        let end = anchor.saturating_add(cfg.peak_window_ms);
        let lo = keydowns.partition_point(|&t| t < anchor);
        let hi = keydowns.partition_point(|&t| t < end);
        let count = hi - lo;
        if count > 0 && best.map_or(true, |(best_count, _)| count > best_count) {
            best = Some((count, anchor));
        }
    }

    best.map(|(_, anchor)| TimeRange::new(anchor, anchor.saturating_add(cfg.peak_window_ms)))
}

/// Windows where deletions outweigh productive typing; overlapping flagged
/// windows are merged and reported ranges end no later than the last event.
fn find_struggling_periods(events: &[KeystrokeEvent], cfg: &AnalyticsConfig) -> Vec<TimeRange> {
    let (Some(first), Some(last)) = (events.first(), events.last()) else {
        return Vec::new();
    };
    let step = if cfg.struggle_step_ms == 0 {
        cfg.struggle_window_ms.max(1)
    } else {
        cfg.struggle_step_ms
    };
    let last_ts = last.timestamp_ms;

    let mut periods: Vec<TimeRange> = Vec::new();
    let mut start = first.timestamp_ms;
    loop {
        let end = start.saturating_add(cfg.struggle_window_ms);
        let lo = events.partition_point(|e| e.timestamp_ms < start);
        let hi = events.partition_point(|e| e.timestamp_ms < end);
        let window = &events[lo..hi];

        let productive = window.iter().filter(|e| e.is_productive()).count();
        let deletions = window.iter().filter(|e| e.is_deletion()).count();

        if productive > 0 && deletions as f64 / productive as f64 > cfg.struggle_deletion_ratio {
            let reported_end = end.min(last_ts);
            match periods.last_mut() {
                Some(prev) if prev.end >= start => *prev = TimeRange::new(prev.start, reported_end),
                _ => periods.push(TimeRange::new(start, reported_end)),
            }
        }
        match start.checked_add(step) {
            Some(next) if next <= last_ts => start = next,
            _ => break,
        }
    }

    periods
}
