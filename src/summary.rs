use crate::analytics::{SessionAnalytics, SessionType};
use crate::util::mean;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;

/// Minimum number of sessions before a trend is reported
const TREND_MIN_SESSIONS: usize = 4;
/// Score delta between halves that counts as a real change
const TREND_THRESHOLD: f64 = 5.0;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, strum_macros::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ImprovementTrend {
    Improving,
    #[default]
    Stable,
    Declining,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_sessions: usize,
    /// Sum of session durations, milliseconds
    pub total_time_on_task: u64,
    pub average_wpm: f64,
    pub average_focus_score: f64,
    pub average_productivity_score: f64,
    pub average_engagement_score: f64,
    pub session_type_distribution: BTreeMap<SessionType, usize>,
    pub improvement_trend: ImprovementTrend,
}

pub fn generate_summary(analytics: &[SessionAnalytics]) -> Summary {
    if analytics.is_empty() {
        return Summary::default();
    }

    let average_of = |f: fn(&SessionAnalytics) -> f64| -> f64 {
        mean(&analytics.iter().map(f).collect::<Vec<_>>()).unwrap_or(0.0)
    };

    let mut session_type_distribution = BTreeMap::new();
    for a in analytics {
        *session_type_distribution.entry(a.session_type).or_insert(0) += 1;
    }

    Summary {
        total_sessions: analytics.len(),
        total_time_on_task: analytics.iter().map(|a| a.total_duration).sum(),
        average_wpm: average_of(|a| a.words_per_minute),
        average_focus_score: average_of(|a| a.focus_score),
        average_productivity_score: average_of(|a| a.productivity_score),
        average_engagement_score: average_of(|a| a.engagement_score),
        session_type_distribution,
        improvement_trend: improvement_trend(analytics),
    }
}

/// Compares the mean overall score of the later half of the sessions with the earlier half
pub fn improvement_trend(analytics: &[SessionAnalytics]) -> ImprovementTrend {
    if analytics.len() < TREND_MIN_SESSIONS {
        return ImprovementTrend::Stable;
    }

    let (first, second) = analytics.split_at(analytics.len() / 2);
    let half_score = |half: &[SessionAnalytics]| {
        mean(&half.iter().map(|a| a.overall_score()).collect::<Vec<_>>()).unwrap_or(0.0)
    };

    let delta = half_score(second) - half_score(first);
    if delta > TREND_THRESHOLD {
        ImprovementTrend::Improving
    } else if delta < -TREND_THRESHOLD {
        ImprovementTrend::Declining
    } else {
        ImprovementTrend::Stable
    }
}

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    session_id: &'a str,
    total_duration_ms: u64,
    active_writing_ms: u64,
    total_keystrokes: usize,
    words_per_minute: f64,
    editing_ratio: f64,
    focus_score: f64,
    productivity_score: f64,
    engagement_score: f64,
    session_type: String,
}

/// Writes one CSV row per session, header first
pub fn write_csv<W: io::Write>(writer: W, analytics: &[SessionAnalytics]) -> csv::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for a in analytics {
        wtr.serialize(CsvRow {
            session_id: &a.session_id,
            total_duration_ms: a.total_duration,
            active_writing_ms: a.active_writing_time,
            total_keystrokes: a.total_keystrokes,
            words_per_minute: (a.words_per_minute * 100.0).round() / 100.0,
            editing_ratio: (a.editing_ratio * 1000.0).round() / 1000.0,
            focus_score: a.focus_score.round(),
            productivity_score: a.productivity_score.round(),
            engagement_score: a.engagement_score.round(),
            session_type: a.session_type.to_string(),
        })?;
    }
    wtr.flush()?;
    Ok(())
}
