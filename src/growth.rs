//! Growth scheduling: when each segment starts, how fast it grows and how
//! thick it gets afterwards.
//!
//! In apical mode the branch hierarchy is recovered from the flat segment
//! list by endpoint adjacency, then birth times are assigned breadth-first
//! from the roots so that a child starts only once its parent has grown
//! past a threshold. The hierarchy is built once and never mutated, which
//! makes every per-frame query a pure function safe to call from many
//! threads.

use std::collections::{HashMap, VecDeque};

use glam::DVec3;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{GrowthConfig, GrowthMode};
use crate::error::Result;
use crate::geometry::{BoundingBox, Interpretation, Point, Segment};

/// Fraction of the growth period over which roots are spread.
const ROOT_SPREAD: f64 = 0.3;
/// Growth priority is `PRIORITY_DECAY ^ depth`.
const PRIORITY_DECAY: f64 = 0.8;
/// Floor for the priority when stretching a growth curve.
const MIN_PRIORITY: f64 = 0.1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentGrowthInfo {
    /// Start of growth, as a fraction of the animation.
    pub birth_time: f64,
    /// Nominal growth duration, as a fraction of the animation.
    pub growth_duration: f64,
    pub growth_priority: f64,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    pub terminal: bool,
}

/// Per-frame statistics for tuning an animation without materializing it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthPreview {
    pub frame: usize,
    pub visible_segments: usize,
    pub total_segments: usize,
    pub average_visibility: f64,
    pub percent_complete: f64,
}

#[derive(Debug, Clone)]
pub struct GrowthScheduler<V> {
    pub(crate) config: GrowthConfig,
    pub(crate) geometry: Interpretation<V>,
    pub(crate) bounds: BoundingBox<V>,
    pub(crate) max_depth: usize,
    // Built only in apical mode.
    hierarchy: Option<Vec<SegmentGrowthInfo>>,
}

impl<V: Point> GrowthScheduler<V> {
    pub fn new(geometry: Interpretation<V>, config: GrowthConfig) -> Result<Self> {
        config.validate()?;

        let hierarchy = match config.mode {
            GrowthMode::Apical => Some(build_hierarchy(&geometry.segments, &config)),
            GrowthMode::Linear | GrowthMode::Sigmoid => None,
        };
        let bounds = geometry.bounding_box();
        let max_depth = geometry.max_depth();

        Ok(Self {
            config,
            geometry,
            bounds,
            max_depth,
            hierarchy,
        })
    }

    pub fn config(&self) -> &GrowthConfig {
        &self.config
    }

    pub fn geometry(&self) -> &Interpretation<V> {
        &self.geometry
    }

    /// Bounds of the complete plant; stable across frames.
    pub fn bounds(&self) -> BoundingBox<V> {
        self.bounds
    }

    pub fn segment_count(&self) -> usize {
        self.geometry.segments.len()
    }

    pub fn hierarchy(&self) -> Option<&[SegmentGrowthInfo]> {
        self.hierarchy.as_deref()
    }

    /// Scheduling record for one segment. Outside apical mode the record is
    /// derived from the creation index and has no links.
    pub fn growth_info(&self, index: usize) -> Option<SegmentGrowthInfo> {
        if let Some(hierarchy) = &self.hierarchy {
            return hierarchy.get(index).cloned();
        }
        let segment = self.geometry.segments.get(index)?;
        let (birth_time, growth_duration, growth_priority) = self.timing(index);
        Some(SegmentGrowthInfo {
            birth_time,
            growth_duration,
            growth_priority,
            parent: None,
            children: Vec::new(),
            terminal: segment.depth == self.max_depth,
        })
    }

    /// Normalized animation time of `frame`.
    pub fn frame_progress(&self, frame: usize) -> f64 {
        if self.config.total_frames <= 1 {
            1.0
        } else {
            frame as f64 / (self.config.total_frames - 1) as f64
        }
    }

    /// Revealed fraction of segment `index` at `frame`, in `[0, 1]`.
    pub fn visibility(&self, index: usize, frame: usize) -> f64 {
        if index >= self.segment_count() {
            return 0.0;
        }
        let (birth_time, duration, priority) = self.timing(index);
        let elapsed = self.frame_progress(frame) - birth_time;
        if elapsed <= 0.0 {
            return 0.0;
        }
        let effective_duration = duration / priority.max(MIN_PRIORITY);
        if elapsed >= effective_duration {
            return 1.0;
        }
        self.config
            .effective_easing()
            .apply(elapsed / effective_duration)
    }

    /// Width multiplier from secondary thickening; 1 until the segment is
    /// fully grown or when thickening is disabled.
    pub fn thickness(&self, index: usize, frame: usize) -> f64 {
        if !self.config.secondary_thickening || self.visibility(index, frame) < 1.0 {
            return 1.0;
        }
        let (birth_time, duration, _) = self.timing(index);
        let age = (self.frame_progress(frame) - (birth_time + duration)).max(0.0);
        1.0 + self.config.thickening_rate * (1.0 + 10.0 * age).ln()
    }

    /// Branch tip: no children in the hierarchy, or deepest nesting level
    /// when no hierarchy is built.
    pub fn is_terminal(&self, index: usize) -> bool {
        match &self.hierarchy {
            Some(hierarchy) => hierarchy.get(index).is_some_and(|info| info.terminal),
            None => self
                .geometry
                .segments
                .get(index)
                .is_some_and(|s| s.depth == self.max_depth),
        }
    }

    /// Samples about `samples` frames evenly across the animation.
    pub fn preview(&self, samples: usize) -> Vec<GrowthPreview> {
        let total_frames = self.config.total_frames;
        let step = (total_frames / samples.max(1)).max(1);
        let total_segments = self.segment_count();

        (0..total_frames)
            .step_by(step)
            .map(|frame| {
                let (visible_segments, visibility_sum) = (0..total_segments)
                    .map(|i| self.visibility(i, frame))
                    .filter(|v| *v > 0.0)
                    .fold((0usize, 0.0f64), |(count, sum), v| (count + 1, sum + v));
                let (average_visibility, percent_complete) = if total_segments == 0 {
                    (0.0, 0.0)
                } else {
                    (
                        visibility_sum / total_segments as f64,
                        visible_segments as f64 / total_segments as f64 * 100.0,
                    )
                };
                GrowthPreview {
                    frame,
                    visible_segments,
                    total_segments,
                    average_visibility,
                    percent_complete,
                }
            })
            .collect()
    }

    /// `(birth_time, growth_duration, growth_priority)` for a segment.
    fn timing(&self, index: usize) -> (f64, f64, f64) {
        if let Some(info) = self.hierarchy.as_ref().and_then(|h| h.get(index)) {
            return (info.birth_time, info.growth_duration, info.growth_priority);
        }
        let n = self.segment_count().max(1) as f64;
        (
            index as f64 / n * self.config.growth_period(),
            self.config.growth_fraction(),
            1.0,
        )
    }
}

// ---------------------------------------------------------------------------
// Hierarchy construction
// ---------------------------------------------------------------------------

type Cell = (i64, i64, i64);

fn cell_of(point: DVec3, size: f64) -> Cell {
    (
        (point.x / size).floor() as i64,
        (point.y / size).floor() as i64,
        (point.z / size).floor() as i64,
    )
}

/// For each segment, the latest earlier segment whose end touches its
/// start within `tolerance`.
///
/// Ends are bucketed in a grid with `tolerance`-sized cells, so only the 27
/// cells around a start point are searched.
pub(crate) fn link_parents<V: Point>(
    segments: &[Segment<V>],
    tolerance: f64,
    lookback: Option<usize>,
) -> Vec<Option<usize>> {
    let mut grid: HashMap<Cell, Vec<usize>> = HashMap::new();
    let mut parents = Vec::with_capacity(segments.len());

    for (i, segment) in segments.iter().enumerate() {
        let start = segment.start.to_dvec3();
        let (cx, cy, cz) = cell_of(start, tolerance);
        let earliest = lookback.map_or(0, |l| i.saturating_sub(l));

        let mut parent: Option<usize> = None;
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let key = (
                        cx.saturating_add(dx),
                        cy.saturating_add(dy),
                        cz.saturating_add(dz),
                    );
                    let Some(candidates) = grid.get(&key) else {
                        continue;
                    };
                    for &j in candidates {
                        if j < earliest || parent.is_some_and(|p| p >= j) {
                            continue;
                        }
                        if segments[j].end.to_dvec3().distance(start) <= tolerance {
                            parent = Some(j);
                        }
                    }
                }
            }
        }

        parents.push(parent);
        grid.entry(cell_of(segment.end.to_dvec3(), tolerance))
            .or_default()
            .push(i);
    }

    parents
}

fn build_hierarchy<V: Point>(
    segments: &[Segment<V>],
    config: &GrowthConfig,
) -> Vec<SegmentGrowthInfo> {
    let n = segments.len();
    let period = config.growth_period();
    let duration = config.growth_fraction();

    let mut infos: Vec<SegmentGrowthInfo> = segments
        .iter()
        .map(|s| SegmentGrowthInfo {
            birth_time: 0.0,
            growth_duration: duration,
            growth_priority: PRIORITY_DECAY.powf(s.depth as f64),
            parent: None,
            children: Vec::new(),
            terminal: true,
        })
        .collect();

    let parents = link_parents(segments, config.link_tolerance, config.hierarchy_lookback);
    for (child, parent) in parents.into_iter().enumerate() {
        if let Some(parent) = parent {
            infos[child].parent = Some(parent);
            infos[parent].children.push(child);
            infos[parent].terminal = false;
        }
    }

    let mut reached = vec![false; n];
    let mut queue = VecDeque::new();
    for (i, info) in infos.iter_mut().enumerate() {
        if info.parent.is_none() {
            info.birth_time = i as f64 / n as f64 * period * ROOT_SPREAD;
            reached[i] = true;
            queue.push_back(i);
        }
    }
    let roots = queue.len();

    while let Some(i) = queue.pop_front() {
        let parent_birth = infos[i].birth_time;
        let parent_duration = infos[i].growth_duration;
        let children = infos[i].children.clone();
        for child in children {
            if reached[child] {
                continue;
            }
            let delay = segments[child].depth as f64 * config.apical_delay_per_depth;
            infos[child].birth_time =
                (parent_birth + parent_duration * config.apical_parent_threshold + delay)
                    .min(period);
            reached[child] = true;
            queue.push_back(child);
        }
    }

    let mut orphans = 0;
    for (i, info) in infos.iter_mut().enumerate() {
        if !reached[i] {
            info.birth_time = i as f64 / n as f64 * period;
            orphans += 1;
        }
    }

    debug!(
        segments = n,
        roots,
        orphans,
        terminals = infos.iter().filter(|i| i.terminal).count(),
        "growth hierarchy built"
    );
    infos
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec2;

    fn seg(start: (f64, f64), end: (f64, f64), depth: usize, index: usize) -> Segment<DVec2> {
        Segment {
            start: DVec2::new(start.0, start.1),
            end: DVec2::new(end.0, end.1),
            depth,
            width: 1.0,
            index,
            color_index: 0,
        }
    }

    #[test]
    fn links_to_nearest_preceding_match() {
        // Two segments end at (0,1); the later one wins.
        let segments = vec![
            seg((0.0, 0.0), (0.0, 1.0), 0, 0),
            seg((1.0, 1.0), (0.0, 1.0), 0, 1),
            seg((0.0, 1.0), (0.0, 2.0), 0, 2),
        ];
        let parents = link_parents(&segments, 0.001, None);
        assert_eq!(parents, vec![None, None, Some(1)]);
    }

    #[test]
    fn links_across_cell_boundaries() {
        let segments = vec![
            seg((0.0, 0.0), (0.0, 0.99999), 0, 0),
            seg((0.0, 1.00049), (0.0, 2.0), 0, 1),
        ];
        let parents = link_parents(&segments, 0.001, None);
        assert_eq!(parents, vec![None, Some(0)]);
    }

    #[test]
    fn lookback_limits_parent_search() {
        let segments = vec![
            seg((0.0, 0.0), (0.0, 1.0), 0, 0),
            seg((5.0, 5.0), (6.0, 6.0), 0, 1),
            seg((7.0, 7.0), (8.0, 8.0), 0, 2),
            seg((0.0, 1.0), (0.0, 2.0), 0, 3),
        ];
        assert_eq!(link_parents(&segments, 0.001, None)[3], Some(0));
        assert_eq!(link_parents(&segments, 0.001, Some(2))[3], None);
    }

    #[test]
    fn distant_points_do_not_link() {
        let segments = vec![
            seg((0.0, 0.0), (0.0, 1.0), 0, 0),
            seg((0.0, 1.01), (0.0, 2.0), 0, 1),
        ];
        assert_eq!(link_parents(&segments, 0.001, None), vec![None, None]);
    }
}
