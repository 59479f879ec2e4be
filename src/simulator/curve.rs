//! Score trajectory shaping.

/// Smoothstep-style quadratic ease-in-out on `[0, 1]`.
///
/// `2t²` below the midpoint, `1 - 2(1 - t)²` above it. Inputs outside the
/// unit interval are clamped.
#[must_use]
pub fn ease(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        2.0 * t * t
    } else {
        let u = 1.0 - t;
        1.0 - 2.0 * u * u
    }
}

/// Linear interpolation from `a` to `b`.
#[must_use]
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Fraction of the settle window elapsed at `tick`, saturating at 1.
#[must_use]
pub fn progress(tick: u32, settle_ticks: u32) -> f64 {
    if settle_ticks == 0 {
        return 1.0;
    }
    (f64::from(tick) / f64::from(settle_ticks)).min(1.0)
}

/// Noise-free score at `tick`: eased from `start` toward `target`.
#[must_use]
pub fn expected_score(start: f64, target: f64, tick: u32, settle_ticks: u32) -> f64 {
    lerp(start, target, ease(progress(tick, settle_ticks)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ease_endpoints_and_midpoint() {
        assert!(ease(0.0).abs() < f64::EPSILON);
        assert!((ease(1.0) - 1.0).abs() < f64::EPSILON);
        assert!((ease(0.5) - 0.5).abs() < f64::EPSILON);
        assert!((ease(0.25) - 0.125).abs() < 1e-12);
        assert!((ease(0.75) - 0.875).abs() < 1e-12);
    }

    #[test]
    fn test_ease_is_monotone() {
        let mut prev = ease(0.0);
        for i in 1..=100 {
            let next = ease(f64::from(i) / 100.0);
            assert!(next >= prev);
            prev = next;
        }
    }

    #[test]
    fn test_ease_clamps() {
        assert!(ease(-3.0).abs() < f64::EPSILON);
        assert!((ease(7.0) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_expected_score_reaches_target_at_settle() {
        let s = expected_score(0.78, 0.06, 18, 18);
        assert!((s - 0.06).abs() < 1e-12);
        let beyond = expected_score(0.78, 0.06, 20, 18);
        assert!((beyond - 0.06).abs() < 1e-12);
    }

    #[test]
    fn test_expected_score_is_not_linear() {
        // A quarter of the way through, easing has covered an eighth of the distance.
        let s = expected_score(0.0, 1.0, 4, 16);
        assert!((s - 0.125).abs() < 1e-12);
    }

    #[test]
    fn test_progress_zero_settle() {
        assert!((progress(3, 0) - 1.0).abs() < f64::EPSILON);
    }
}
