//! Per-frame geometry materialization, single or batched across a worker
//! pool.

use std::ops::Range;

use rayon::ThreadPool;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::geometry::{BoundingBox, Point, Polygon, Segment};
use crate::growth::GrowthScheduler;

/// Everything a scene formatter needs for one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameGeometry<V> {
    pub frame: usize,
    /// Partially revealed segments, width scaled by thickening.
    pub segments: Vec<Segment<V>>,
    pub polygons: Vec<Polygon<V>>,
    /// Creation indices of the branch tips present in this frame, ascending.
    pub terminals: Vec<usize>,
    /// Bounds of the complete plant, identical for every frame.
    pub bounds: BoundingBox<V>,
    pub max_depth: usize,
}

impl<V: Point> FrameGeometry<V> {
    pub fn is_terminal(&self, segment: &Segment<V>) -> bool {
        self.terminals.binary_search(&segment.index).is_ok()
    }

    pub fn terminal_segments(&self) -> impl Iterator<Item = &Segment<V>> {
        self.segments.iter().filter(|s| self.is_terminal(s))
    }
}

impl<V: Point> GrowthScheduler<V> {
    pub fn frame(&self, frame: usize) -> FrameGeometry<V> {
        let epsilon = self.config.visibility_epsilon;
        let mut segments = Vec::new();
        let mut terminals = Vec::new();

        for (i, segment) in self.geometry.segments.iter().enumerate() {
            let visibility = self.visibility(i, frame);
            if visibility <= epsilon {
                continue;
            }
            let partial = segment.partial(visibility);
            if partial.length() <= epsilon {
                continue;
            }
            if self.is_terminal(i) {
                terminals.push(segment.index);
            }
            segments.push(partial.with_width(segment.width * self.thickness(i, frame)));
        }

        let polygons = self
            .geometry
            .polygons
            .iter()
            .filter(|p| match p.anchor {
                Some(anchor) => self.visibility(anchor, frame) >= 1.0,
                None => true,
            })
            .cloned()
            .collect();

        FrameGeometry {
            frame,
            segments,
            polygons,
            terminals,
            bounds: self.bounds,
            max_depth: self.max_depth,
        }
    }

    /// Materializes `frames` on a fresh pool of `workers` threads. The
    /// result is in frame order.
    pub fn frames(&self, frames: Range<usize>, workers: usize) -> Result<Vec<FrameGeometry<V>>> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .build()?;
        let indices: Vec<usize> = frames.collect();
        Ok(self.frames_with(&pool, &indices))
    }

    /// Materializes `frames` on an existing pool, preserving input order.
    pub fn frames_with(&self, pool: &ThreadPool, frames: &[usize]) -> Vec<FrameGeometry<V>> {
        debug!(
            frames = frames.len(),
            workers = pool.current_num_threads(),
            "materializing frame batch"
        );
        pool.install(|| frames.par_iter().map(|&f| self.frame(f)).collect())
    }
}
