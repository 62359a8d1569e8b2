use crate::event::KeystrokeEvent;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    pub t: f64,
    pub wpm: f64,
}

impl TimeSeriesPoint {
    pub fn new(t: f64, wpm: f64) -> Self {
        Self { t, wpm }
    }
}

/// Cumulative WPM sampled at each elapsed whole second that saw productive input.
///
/// Seconds are counted from the first event; a keystroke at `t` seconds lands in
/// bucket `ceil(t)` (with the opening keystroke counted in second 1).
pub fn wpm_timeline(events: &[KeystrokeEvent], average_word_length: f64) -> Vec<TimeSeriesPoint> {
    let Some(first) = events.first() else {
        return Vec::new();
    };
    let origin = first.timestamp_ms;

    let per_second = events
        .iter()
        .filter(|e| e.is_productive())
        .map(|e| {
            let secs = (e.timestamp_ms - origin) as f64 / 1000.0;
            secs.ceil().max(1.0) as u64
        })
        .counts();

    let mut typed = 0usize;
    per_second
        .into_iter()
        .sorted_by_key(|(sec, _)| *sec)
        .map(|(sec, count)| {
            typed += count;
            let t = sec as f64;
            TimeSeriesPoint::new(t, (60.0 / t) * typed as f64 / average_word_length)
        })
        .collect()
}
