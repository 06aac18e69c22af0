use super::config::SeverityWeights;

/// Events at which the count factor reaches ~63%.
const COUNT_SCALE: f64 = 5.0;
/// Events per minute at which the density factor reaches 0.5.
const DENSITY_HALF_POINT: f64 = 2.0;
/// Sigmoid midpoint and slope for the span factor.
const DURATION_MIDPOINT_SECS: f64 = 300.0;
const DURATION_SLOPE: f64 = 0.01;

/// Compute severity as a weighted sum of three saturating factors.
///
/// Pure and non-decreasing in each of count, density and duration; the result
/// lies in `[0, sum of weights)`.
pub fn compute_severity(
    count: usize,
    density_per_min: f64,
    duration_secs: f64,
    weights: &SeverityWeights,
) -> f64 {
    weights.count * score_count(count)
        + weights.density * score_density(density_per_min)
        + weights.duration * score_duration(duration_secs)
}

/// 1 - e^(-count / 5): 1 event ≈ 0.18, 3 ≈ 0.45, 10 ≈ 0.86
fn score_count(count: usize) -> f64 {
    1.0 - (-(count as f64) / COUNT_SCALE).exp()
}

/// d / (d + 2): saturating; infinite density (zero span) scores 1.0
fn score_density(density_per_min: f64) -> f64 {
    if density_per_min.is_infinite() {
        return 1.0;
    }
    if density_per_min.is_nan() || density_per_min <= 0.0 {
        return 0.0;
    }
    density_per_min / (density_per_min + DENSITY_HALF_POINT)
}

/// Sigmoid around five minutes: 60s ≈ 0.08, 300s = 0.5, 600s ≈ 0.95
fn score_duration(duration_secs: f64) -> f64 {
    1.0 / (1.0 + (-DURATION_SLOPE * (duration_secs.max(0.0) - DURATION_MIDPOINT_SECS)).exp())
}
