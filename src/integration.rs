//! Trapezoidal integration of power over a flight's own time base

/// Energy [J] of each interval: `0.5 * (p[i] + p[i+1]) * (t[i+1] - t[i])`.
///
/// Returns one value per interval, so `len - 1` entries (none for fewer than
/// two samples). Extra entries in the longer slice are ignored.
pub fn interval_energy(time: &[f64], power: &[f64]) -> Vec<f64> {
    let n = time.len().min(power.len());
    (1..n)
        .map(|i| 0.5 * (power[i - 1] + power[i]) * (time[i] - time[i - 1]))
        .collect()
}

/// Running energy [J] at each sample, starting from 0 at the first one
pub fn cumulative_energy(time: &[f64], power: &[f64]) -> Vec<f64> {
    let n = time.len().min(power.len());
    if n == 0 {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(n);
    let mut total = 0.0;
    out.push(total);
    for step in interval_energy(&time[..n], &power[..n]) {
        total += step;
        out.push(total);
    }
    out
}

/// Total energy [J] over the series
pub fn total_energy(time: &[f64], power: &[f64]) -> f64 {
    interval_energy(time, power).iter().sum()
}
