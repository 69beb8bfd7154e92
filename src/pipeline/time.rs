//! Time-step helpers used by the executive and time-aware algorithms.

/// The advertised step nearest to `t`. Ties go to the earlier step.
pub fn nearest_step(steps: &[f64], t: f64) -> Option<f64> {
    let mut best: Option<(f64, f64)> = None;
    for &step in steps {
        let distance = (step - t).abs();
        match best {
            Some((_, d)) if distance >= d => {}
            _ => best = Some((step, distance)),
        }
    }
    best.map(|(step, _)| step)
}

/// Whether two times agree within a relative `tolerance`.
///
/// The tolerance is scaled by the larger magnitude, with a floor of 1 so
/// times near zero are compared absolutely.
pub fn times_match(a: f64, b: f64, tolerance: f64) -> bool {
    let scale = a.abs().max(b.abs()).max(1.0);
    (a - b).abs() <= tolerance * scale
}

/// `[first, last]` of an ascending step list.
pub fn time_range(steps: &[f64]) -> Option<[f64; 2]> {
    match (steps.first(), steps.last()) {
        (Some(&first), Some(&last)) => Some([first, last]),
        _ => None,
    }
}

pub fn is_ascending(steps: &[f64]) -> bool {
    steps.windows(2).all(|w| w[0] < w[1])
}

/// The step a reader serving `t` would load: the last step not after `t`,
/// or the first step when `t` precedes them all.
pub fn step_at_or_before(steps: &[f64], t: f64) -> Option<f64> {
    let first = *steps.first()?;
    Some(steps.iter().rev().copied().find(|&s| s <= t).unwrap_or(first))
}
