//! Growth animation settings.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::easing::Easing;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrowthMode {
    /// Segments start in creation order and follow the configured easing.
    Linear,
    /// Creation-order starts with the normalized logistic curve.
    Sigmoid,
    /// Branch hierarchy reconstructed from geometry; children wait for
    /// their parent.
    #[default]
    Apical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrowthConfig {
    pub total_frames: usize,
    /// Frames a single segment takes to grow.
    pub growth_frames: usize,
    pub mode: GrowthMode,
    pub easing: Easing,
    pub sigmoid_steepness: f64,
    pub sigmoid_midpoint: f64,
    /// Fraction of its growth a parent completes before children start.
    pub apical_parent_threshold: f64,
    /// Extra start delay per nesting level, as a fraction of the animation.
    pub apical_delay_per_depth: f64,
    pub secondary_thickening: bool,
    pub thickening_rate: f64,
    /// Endpoint distance under which two segments are linked.
    pub link_tolerance: f64,
    /// Only look this many segments back for a parent.
    pub hierarchy_lookback: Option<usize>,
    /// Segments at or below this visibility or length are not emitted.
    pub visibility_epsilon: f64,
}

impl Default for GrowthConfig {
    fn default() -> Self {
        Self {
            total_frames: 100,
            growth_frames: 8,
            mode: GrowthMode::Apical,
            easing: Easing::EaseOutCubic,
            sigmoid_steepness: 10.0,
            sigmoid_midpoint: 0.5,
            apical_parent_threshold: 0.3,
            apical_delay_per_depth: 0.05,
            secondary_thickening: false,
            thickening_rate: 0.15,
            link_tolerance: 0.001,
            hierarchy_lookback: None,
            visibility_epsilon: 0.001,
        }
    }
}

impl GrowthConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_frames(mut self, total_frames: usize, growth_frames: usize) -> Self {
        self.total_frames = total_frames;
        self.growth_frames = growth_frames;
        self
    }

    pub fn with_mode(mut self, mode: GrowthMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    pub fn with_sigmoid(mut self, steepness: f64, midpoint: f64) -> Self {
        self.sigmoid_steepness = steepness;
        self.sigmoid_midpoint = midpoint;
        self
    }

    pub fn with_apical(mut self, parent_threshold: f64, delay_per_depth: f64) -> Self {
        self.apical_parent_threshold = parent_threshold;
        self.apical_delay_per_depth = delay_per_depth;
        self
    }

    pub fn with_thickening(mut self, rate: f64) -> Self {
        self.secondary_thickening = true;
        self.thickening_rate = rate;
        self
    }

    pub fn with_link_tolerance(mut self, tolerance: f64) -> Self {
        self.link_tolerance = tolerance;
        self
    }

    pub fn with_hierarchy_lookback(mut self, lookback: usize) -> Self {
        self.hierarchy_lookback = Some(lookback);
        self
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |message: String| -> Result<()> { Err(Error::InvalidConfig(message)) };

        if self.total_frames == 0 {
            return invalid("total_frames must be at least 1".into());
        }
        if self.growth_frames == 0 {
            return invalid("growth_frames must be at least 1".into());
        }
        let finite = [
            ("sigmoid_steepness", self.sigmoid_steepness),
            ("sigmoid_midpoint", self.sigmoid_midpoint),
            ("apical_parent_threshold", self.apical_parent_threshold),
            ("apical_delay_per_depth", self.apical_delay_per_depth),
            ("thickening_rate", self.thickening_rate),
            ("link_tolerance", self.link_tolerance),
            ("visibility_epsilon", self.visibility_epsilon),
        ];
        if let Some((name, value)) = finite.iter().find(|(_, v)| !v.is_finite()) {
            return invalid(format!("{name} must be finite, got {value}"));
        }
        if self.sigmoid_steepness <= 0.0 {
            return invalid(format!(
                "sigmoid_steepness must be positive, got {}",
                self.sigmoid_steepness
            ));
        }
        if let Easing::Sigmoid {
            steepness,
            midpoint,
        } = self.easing
        {
            if !steepness.is_finite() || steepness <= 0.0 || !midpoint.is_finite() {
                return invalid(format!(
                    "sigmoid easing needs a positive steepness and finite midpoint, got ({steepness}, {midpoint})"
                ));
            }
        }
        if !(0.0..=1.0).contains(&self.apical_parent_threshold) {
            return invalid(format!(
                "apical_parent_threshold must be within [0, 1], got {}",
                self.apical_parent_threshold
            ));
        }
        if self.apical_delay_per_depth < 0.0 {
            return invalid("apical_delay_per_depth must not be negative".into());
        }
        if self.thickening_rate < 0.0 {
            return invalid("thickening_rate must not be negative".into());
        }
        if self.link_tolerance <= 0.0 {
            return invalid("link_tolerance must be positive".into());
        }
        if self.visibility_epsilon < 0.0 {
            return invalid("visibility_epsilon must not be negative".into());
        }
        Ok(())
    }

    /// Per-segment growth duration as a fraction of the whole animation.
    pub fn growth_fraction(&self) -> f64 {
        self.growth_frames as f64 / self.total_frames.max(1) as f64
    }

    /// Window in which segments may start growing.
    pub fn growth_period(&self) -> f64 {
        let period = 1.0 - self.growth_fraction();
        if period <= 0.0 { 0.8 } else { period }
    }

    /// The easing actually used: sigmoid mode always uses the logistic
    /// curve with the configured steepness and midpoint.
    pub fn effective_easing(&self) -> Easing {
        match self.mode {
            GrowthMode::Sigmoid => Easing::Sigmoid {
                steepness: self.sigmoid_steepness,
                midpoint: self.sigmoid_midpoint,
            },
            GrowthMode::Linear | GrowthMode::Apical => self.easing,
        }
    }

    /// Picks `growth_frames` from the plant size and returns the suggested
    /// minimum frame count.
    ///
    /// `total_frames` is only raised to that minimum when
    /// `respect_total_frames` is `false`.
    pub fn auto_configure(&mut self, segment_count: usize, respect_total_frames: bool) -> usize {
        self.growth_frames = match segment_count {
            0..50 => 12,
            50..200 => 8,
            200..500 => 6,
            _ => 4,
        };
        let min_frames = (segment_count as f64 * 0.1 + self.growth_frames as f64 * 2.0) as usize;
        if !respect_total_frames && self.total_frames < min_frames {
            info!(
                from = self.total_frames,
                to = min_frames,
                "raising total frames to fit the plant"
            );
            self.total_frames = min_frames;
        }
        min_frames
    }
}
