use keyreplay::analytics::SessionType;
use keyreplay::event::{KeystrokeEvent, WritingSession};
use keyreplay::{analyze_session, generate_summary, ImprovementTrend, SessionAnalytics};

fn session_at(stamps: &[(&str, u64)]) -> WritingSession {
    let events = stamps
        .iter()
        .enumerate()
        .map(|(i, (key, ts))| KeystrokeEvent::keydown(i.to_string(), *key, *ts))
        .collect();
    WritingSession::new("s1", "student", "essay", events)
}

fn evenly_spaced(count: usize, start: u64, step: u64) -> Vec<(&'static str, u64)> {
    (0..count as u64).map(|i| ("a", start + i * step)).collect()
}

#[test]
fn empty_session_is_exploratory_and_zeroed() {
    let analytics = analyze_session(&session_at(&[]));
    assert_eq!(analytics.total_keystrokes, 0);
    assert_eq!(analytics.words_per_minute, 0.0);
    assert_eq!(analytics.session_type, SessionType::Exploratory);
    assert!(analytics.peak_productivity_time.is_none());
}

#[test]
fn eleven_keys_over_one_second() {
    let analytics = analyze_session(&session_at(&evenly_spaced(11, 1000, 100)));
    assert_eq!(analytics.total_keystrokes, 11);
    assert_eq!(analytics.total_duration, 1000);
    assert!(analytics.words_per_minute > 0.0);
}

#[test]
fn pauses_are_bucketed_by_length() {
    let analytics = analyze_session(&session_at(&[
        ("a", 0),
        ("b", 100),
        ("c", 1000),
        ("d", 4000),
        ("e", 16000),
    ]));
    let pauses = &analytics.pause_analysis;
    assert_eq!(pauses.short_pauses, 2);
    assert_eq!(pauses.medium_pauses, 1);
    assert_eq!(pauses.long_pauses, 1);
    assert_eq!(pauses.longest_pause, 12000);
}

#[test]
fn editing_ratio_counts_deletions_against_productive_keys() {
    let analytics = analyze_session(&session_at(&[
        ("a", 0),
        ("b", 100),
        ("c", 200),
        ("Backspace", 300),
        ("Backspace", 400),
        ("d", 500),
        ("e", 600),
        ("f", 700),
    ]));
    assert_eq!(analytics.productive_keystrokes, 6);
    assert_eq!(analytics.deletions, 2);
    assert!((analytics.editing_ratio - 2.0 / 6.0).abs() < 1e-9);
    assert_eq!(analytics.revision_patterns.len(), 1);
    assert_eq!(analytics.revision_patterns[0].length, 2);
}

#[test]
fn long_gap_splits_bursts() {
    let mut stamps = evenly_spaced(10, 0, 100);
    stamps.extend(evenly_spaced(15, 900 + 15_000, 100));
    let analytics = analyze_session(&session_at(&stamps));

    let sizes: Vec<_> = analytics
        .bursts_of_activity
        .iter()
        .map(|b| b.keystrokes)
        .collect();
    assert_eq!(sizes, vec![10, 15]);
    assert!(analytics.bursts_of_activity.iter().all(|b| b.average_wpm > 0.0));
}

#[test]
fn steady_typing_is_focused() {
    let analytics = analyze_session(&session_at(&evenly_spaced(50, 0, 200)));
    assert_eq!(analytics.session_type, SessionType::Focused);
    assert_eq!(analytics.focus_score, 100.0);
    assert!(analytics.peak_productivity_time.is_some());
}

#[test]
fn heavy_deleting_is_editing() {
    let mut stamps = evenly_spaced(10, 0, 200);
    stamps.extend((0..5u64).map(|i| ("Backspace", 2000 + i * 200)));
    let analytics = analyze_session(&session_at(&stamps));
    assert_eq!(analytics.session_type, SessionType::Editing);
}

#[test]
fn scores_stay_in_range() {
    let mut stamps = evenly_spaced(30, 0, 50);
    stamps.extend(evenly_spaced(5, 60_000, 50));
    let analytics = analyze_session(&session_at(&stamps));
    for score in [
        analytics.focus_score,
        analytics.productivity_score,
        analytics.engagement_score,
    ] {
        assert!((0.0..=100.0).contains(&score), "score out of range: {score}");
    }
    assert!(analytics.active_writing_time <= analytics.total_duration);
}

#[test]
fn unsorted_input_matches_sorted_input() {
    let sorted = session_at(&[("a", 0), ("b", 150), ("Backspace", 400), ("c", 3000)]);
    let mut shuffled = sorted.clone();
    shuffled.events.reverse();
    assert_eq!(analyze_session(&sorted), analyze_session(&shuffled));
}

fn scored(score: f64, wpm: f64) -> SessionAnalytics {
    let mut a = SessionAnalytics::empty(format!("s-{score}"));
    a.total_duration = 60_000;
    a.words_per_minute = wpm;
    a.focus_score = score;
    a.productivity_score = score;
    a.engagement_score = score;
    a
}

#[test]
fn empty_summary_is_stable() {
    let summary = generate_summary(&[]);
    assert_eq!(summary.total_sessions, 0);
    assert_eq!(summary.improvement_trend, ImprovementTrend::Stable);
}

#[test]
fn rising_scores_trend_upwards() {
    let sessions: Vec<_> = (0..8)
        .map(|i| scored(40.0 + i as f64 * 5.0, 20.0 + i as f64))
        .collect();
    let summary = generate_summary(&sessions);
    assert_eq!(summary.total_sessions, 8);
    assert_eq!(summary.total_time_on_task, 8 * 60_000);
    assert_eq!(summary.improvement_trend, ImprovementTrend::Improving);
}

#[test]
fn summary_of_real_sessions_counts_types() {
    let focused = analyze_session(&session_at(&evenly_spaced(50, 0, 200)));
    let empty = analyze_session(&session_at(&[]));
    let summary = generate_summary(&[focused, empty]);

    assert_eq!(summary.total_sessions, 2);
    assert_eq!(
        summary.session_type_distribution.get(&SessionType::Focused),
        Some(&1)
    );
    assert_eq!(
        summary.session_type_distribution.get(&SessionType::Exploratory),
        Some(&1)
    );
    assert_eq!(summary.improvement_trend, ImprovementTrend::Stable);
}

#[test]
fn timestamps_near_the_end_of_time_finish() {
    let analytics = analyze_session(&session_at(&[("a", u64::MAX - 10), ("b", u64::MAX - 5)]));
    assert_eq!(analytics.total_keystrokes, 2);
    assert_eq!(analytics.total_duration, 5);
    assert!(analytics.struggling_periods.is_empty());
}
