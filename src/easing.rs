//! Easing curves mapping normalized growth progress to revealed fraction.
//!
//! Every curve maps `[0, 1]` onto `[0, 1]` monotonically with exact end
//! points; inputs outside the unit interval are clamped.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Easing {
    Linear,
    EaseOutQuad,
    #[default]
    EaseOutCubic,
    EaseInOutCubic,
    /// Logistic curve normalized so that 0 maps to 0 and 1 maps to 1.
    Sigmoid { steepness: f64, midpoint: f64 },
}

impl Easing {
    pub fn apply(self, t: f64) -> f64 {
        if t.is_nan() || t <= 0.0 {
            return 0.0;
        }
        if t >= 1.0 {
            return 1.0;
        }
        match self {
            Easing::Linear => t,
            Easing::EaseOutQuad => ease_out_quad(t),
            Easing::EaseOutCubic => ease_out_cubic(t),
            Easing::EaseInOutCubic => ease_in_out_cubic(t),
            Easing::Sigmoid {
                steepness,
                midpoint,
            } => sigmoid(t, steepness, midpoint),
        }
    }
}

pub fn ease_out_quad(t: f64) -> f64 {
    1.0 - (1.0 - t).powi(2)
}

pub fn ease_out_cubic(t: f64) -> f64 {
    1.0 - (1.0 - t).powi(3)
}

pub fn ease_in_out_cubic(t: f64) -> f64 {
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

/// Normalized logistic curve `(s(t) - s(0)) / (s(1) - s(0))` with
/// `s(t) = 1 / (1 + exp(-k (t - m)))`.
///
/// Falls back to linear when the curve is too flat to normalize.
pub fn sigmoid(t: f64, steepness: f64, midpoint: f64) -> f64 {
    if t <= 0.0 {
        return 0.0;
    }
    if t >= 1.0 {
        return 1.0;
    }
    let logistic = |x: f64| 1.0 / (1.0 + (-steepness * (x - midpoint)).exp());
    let low = logistic(0.0);
    let high = logistic(1.0);
    let span = high - low;
    if !span.is_finite() || span.abs() < 1e-12 {
        return t;
    }
    ((logistic(t) - low) / span).clamp(0.0, 1.0)
}
