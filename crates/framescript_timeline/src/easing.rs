// SPDX-License-Identifier: MIT OR Apache-2.0
//! Easing curves mapping normalized progress to normalized progress.
//!
//! Cubic-bezier curves are solved for `t` with a sampled lookup table,
//! Newton-Raphson refinement and a bisection fallback, matching the
//! behaviour of CSS `cubic-bezier()` timing functions.

use serde::{Deserialize, Serialize};

const NEWTON_ITERATIONS: usize = 4;
const NEWTON_MIN_SLOPE: f64 = 0.001;
const SUBDIVISION_PRECISION: f64 = 0.000_000_1;
const SUBDIVISION_MAX_ITERATIONS: usize = 10;

const SPLINE_TABLE_SIZE: usize = 11;
const SAMPLE_STEP_SIZE: f64 = 1.0 / (SPLINE_TABLE_SIZE as f64 - 1.0);

fn coeff_a(a1: f64, a2: f64) -> f64 {
    1.0 - 3.0 * a2 + 3.0 * a1
}

fn coeff_b(a1: f64, a2: f64) -> f64 {
    3.0 * a2 - 6.0 * a1
}

fn coeff_c(a1: f64) -> f64 {
    3.0 * a1
}

/// Evaluate one axis of the curve at `t`
fn calc_bezier(t: f64, a1: f64, a2: f64) -> f64 {
    ((coeff_a(a1, a2) * t + coeff_b(a1, a2)) * t + coeff_c(a1)) * t
}

/// Derivative of one axis of the curve at `t`
fn slope(t: f64, a1: f64, a2: f64) -> f64 {
    3.0 * coeff_a(a1, a2) * t * t + 2.0 * coeff_b(a1, a2) * t + coeff_c(a1)
}

/// A cubic-bezier easing with fixed endpoints `(0,0)` and `(1,1)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct CubicBezier {
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    samples: [f64; SPLINE_TABLE_SIZE],
}

impl CubicBezier {
    /// Build a curve from its two control points
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        let mut samples = [0.0; SPLINE_TABLE_SIZE];
        for (i, sample) in samples.iter_mut().enumerate() {
            *sample = calc_bezier(i as f64 * SAMPLE_STEP_SIZE, x1, x2);
        }
        Self { x1, y1, x2, y2, samples }
    }

    /// Control points as `(x1, y1, x2, y2)`
    pub fn control_points(&self) -> (f64, f64, f64, f64) {
        (self.x1, self.y1, self.x2, self.y2)
    }

    /// Whether the curve degenerates to the identity
    pub fn is_linear(&self) -> bool {
        self.x1 == self.y1 && self.x2 == self.y2
    }

    /// Map progress `x` in `[0, 1]` to eased progress
    pub fn ease(&self, x: f64) -> f64 {
        let x = if x.is_nan() { 0.0 } else { x.clamp(0.0, 1.0) };
        if self.is_linear() {
            return x;
        }
        if x == 0.0 || x == 1.0 {
            return x;
        }
        calc_bezier(self.t_for_x(x), self.y1, self.y2)
    }

    fn t_for_x(&self, x: f64) -> f64 {
        let last_sample = SPLINE_TABLE_SIZE - 1;
        let mut interval_start = 0.0;
        let mut current = 1;

        while current != last_sample && self.samples[current] <= x {
            interval_start += SAMPLE_STEP_SIZE;
            current += 1;
        }
        current -= 1;

        let span = self.samples[current + 1] - self.samples[current];
        let dist = if span == 0.0 { 0.0 } else { (x - self.samples[current]) / span };
        let guess = interval_start + dist * SAMPLE_STEP_SIZE;

        let initial_slope = slope(guess, self.x1, self.x2);
        if initial_slope >= NEWTON_MIN_SLOPE {
            self.newton_raphson(x, guess)
        } else if initial_slope == 0.0 {
            guess
        } else {
            self.binary_subdivide(x, interval_start, interval_start + SAMPLE_STEP_SIZE)
        }
    }

    fn newton_raphson(&self, x: f64, mut guess: f64) -> f64 {
        for _ in 0..NEWTON_ITERATIONS {
            let current_slope = slope(guess, self.x1, self.x2);
            if current_slope == 0.0 {
                return guess;
            }
            let current_x = calc_bezier(guess, self.x1, self.x2) - x;
            guess -= current_x / current_slope;
        }
        guess
    }

    fn binary_subdivide(&self, x: f64, mut lower: f64, mut upper: f64) -> f64 {
        let mut current_t = lower;
        for _ in 0..SUBDIVISION_MAX_ITERATIONS {
            current_t = lower + (upper - lower) / 2.0;
            let current_x = calc_bezier(current_t, self.x1, self.x2) - x;
            if current_x > 0.0 {
                upper = current_t;
            } else {
                lower = current_t;
            }
            if current_x.abs() <= SUBDIVISION_PRECISION {
                break;
            }
        }
        current_t
    }
}

impl From<[f64; 4]> for CubicBezier {
    fn from([x1, y1, x2, y2]: [f64; 4]) -> Self {
        Self::new(x1, y1, x2, y2)
    }
}

impl From<CubicBezier> for [f64; 4] {
    fn from(curve: CubicBezier) -> Self {
        [curve.x1, curve.y1, curve.x2, curve.y2]
    }
}

/// Build a cubic-bezier easing from control points
pub fn cubic_bezier(x1: f64, y1: f64, x2: f64, y2: f64) -> Easing {
    Easing::CubicBezier(CubicBezier::new(x1, y1, x2, y2))
}

/// Easing applied to an animation segment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub enum Easing {
    /// Identity
    #[default]
    Linear,
    /// CSS `ease`
    Ease,
    /// CSS `ease-in`
    EaseIn,
    /// CSS `ease-out`
    EaseOut,
    /// CSS `ease-in-out`
    EaseInOut,
    /// Cubic ease-in
    EaseInCubic,
    /// Cubic ease-out
    EaseOutCubic,
    /// Cubic ease-in-out
    EaseInOutCubic,
    /// Pulls back below zero before accelerating
    EaseInBack,
    /// Overshoots one before settling
    EaseOutBack,
    /// Pulls back and overshoots
    EaseInOutBack,
    /// Custom control points
    CubicBezier(CubicBezier),
}

impl Easing {
    /// Control points for the preset curves
    fn preset_points(&self) -> Option<(f64, f64, f64, f64)> {
        match self {
            Self::Linear | Self::CubicBezier(_) => None,
            Self::Ease => Some((0.25, 0.1, 0.25, 1.0)),
            Self::EaseIn => Some((0.42, 0.0, 1.0, 1.0)),
            Self::EaseOut => Some((0.0, 0.0, 0.58, 1.0)),
            Self::EaseInOut => Some((0.42, 0.0, 0.58, 1.0)),
            Self::EaseInCubic => Some((0.32, 0.0, 0.67, 0.0)),
            Self::EaseOutCubic => Some((0.33, 1.0, 0.68, 1.0)),
            Self::EaseInOutCubic => Some((0.65, 0.0, 0.35, 1.0)),
            Self::EaseInBack => Some((0.36, 0.0, 0.66, -0.56)),
            Self::EaseOutBack => Some((0.34, 1.56, 0.64, 1.0)),
            Self::EaseInOutBack => Some((0.68, -0.6, 0.32, 1.6)),
        }
    }

    /// Resolve to a concrete curve (`None` for linear)
    pub fn curve(&self) -> Option<CubicBezier> {
        match self {
            Self::CubicBezier(curve) => Some(*curve),
            other => other
                .preset_points()
                .map(|(x1, y1, x2, y2)| CubicBezier::new(x1, y1, x2, y2)),
        }
    }

    /// Map progress `t` to eased progress
    pub fn apply(&self, t: f64) -> f64 {
        match self.curve() {
            Some(curve) => curve.ease(t),
            None => if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) },
        }
    }

    /// All preset easings, for enumeration in tests and tooling
    pub fn presets() -> &'static [Easing] {
        &[
            Easing::Linear,
            Easing::Ease,
            Easing::EaseIn,
            Easing::EaseOut,
            Easing::EaseInOut,
            Easing::EaseInCubic,
            Easing::EaseOutCubic,
            Easing::EaseInOutCubic,
            Easing::EaseInBack,
            Easing::EaseOutBack,
            Easing::EaseInOutBack,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints_are_exact() {
        for easing in Easing::presets() {
            assert!((easing.apply(0.0)).abs() < 1e-6, "{easing:?} at 0");
            assert!((easing.apply(1.0) - 1.0).abs() < 1e-6, "{easing:?} at 1");
        }
    }

    #[test]
    fn test_degenerate_curve_is_identity() {
        let easing = cubic_bezier(0.3, 0.3, 0.7, 0.7);
        assert_eq!(easing.apply(0.25), 0.25);
        assert_eq!(easing.apply(2.0), 1.0);
        assert_eq!(easing.apply(-1.0), 0.0);
    }

    #[test]
    fn test_monotonic_curves() {
        for easing in [Easing::Ease, Easing::EaseIn, Easing::EaseOut, Easing::EaseInOut] {
            let mut previous = easing.apply(0.0);
            for i in 1..=100 {
                let value = easing.apply(i as f64 / 100.0);
                assert!(value + 1e-9 >= previous, "{easing:?} not monotonic at {i}");
                previous = value;
            }
        }
    }

    #[test]
    fn test_ease_in_out_is_symmetric() {
        let easing = Easing::EaseInOut;
        assert!((easing.apply(0.5) - 0.5).abs() < 1e-4);
        let a = easing.apply(0.2);
        let b = easing.apply(0.8);
        assert!((a + b - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_overshoot_inside_interval() {
        let peak = (1..100)
            .map(|i| Easing::EaseOutBack.apply(i as f64 / 100.0))
            .fold(f64::MIN, f64::max);
        assert!(peak > 1.0);
        let dip = (1..100)
            .map(|i| Easing::EaseInBack.apply(i as f64 / 100.0))
            .fold(f64::MAX, f64::min);
        assert!(dip < 0.0);
    }

    #[test]
    fn test_nan_input_is_clamped() {
        assert_eq!(Easing::Ease.apply(f64::NAN), 0.0);
        assert_eq!(Easing::Linear.apply(f64::NAN), 0.0);
    }
}
