pub fn mean(data: &[f64]) -> Option<f64> {
    let sum = data.iter().sum::<f64>();
    let count = data.len();

    match count {
        positive if positive > 0 => Some(sum / count as f64),
        _ => None,
    }
}

/// Division that yields 0 instead of NaN/inf for an empty denominator
pub fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

/// Words per minute from a keystroke count over `elapsed_ms`
pub fn words_per_minute(keystrokes: usize, elapsed_ms: u64, average_word_length: f64) -> f64 {
    let minutes = elapsed_ms as f64 / 60_000.0;
    ratio(keystrokes as f64 / average_word_length, minutes)
}
