use symbios_growth::easing::Easing;
use symbios_growth::glam::DVec2;
use symbios_growth::{GrowthConfig, GrowthMode, GrowthScheduler, Turtle2D, TurtleConfig};

fn scheduler(word: &str, config: GrowthConfig) -> GrowthScheduler<DVec2> {
    let geometry = Turtle2D::new(TurtleConfig::new().with_angle(90.0)).interpret(word);
    GrowthScheduler::new(geometry, config).expect("valid config")
}

fn short_animation() -> GrowthConfig {
    GrowthConfig::new().with_frames(10, 2)
}

#[test]
fn test_last_frame_shows_complete_plant() {
    let s = scheduler("F[+F]F", short_animation());
    let last = s.frame(9);
    assert_eq!(last.frame, 9);
    assert_eq!(last.segments, s.geometry().segments);
    assert_eq!(last.max_depth, 1);
}

#[test]
fn test_first_apical_frame_is_empty() {
    let s = scheduler("F[+F]F", short_animation());
    let first = s.frame(0);
    assert!(first.segments.is_empty());
    assert!(first.terminals.is_empty());
}

#[test]
fn test_partial_segments_grow_from_start() {
    let config = GrowthConfig::new()
        .with_frames(11, 2)
        .with_mode(GrowthMode::Linear)
        .with_easing(Easing::Linear);
    let s = scheduler("F", config);
    let frame = s.frame(1);
    assert_eq!(frame.segments.len(), 1);
    let segment = frame.segments[0];
    assert_eq!(segment.start, DVec2::ZERO);
    assert!((segment.length() - 5.5).abs() < 1e-9, "length {}", segment.length());
}

#[test]
fn test_terminals_are_branch_tips() {
    let s = scheduler("F[+F]F", short_animation());
    let last = s.frame(9);
    assert_eq!(last.terminals, vec![1, 2]);
    let tips: Vec<usize> = last.terminal_segments().map(|seg| seg.index).collect();
    assert_eq!(tips, vec![1, 2]);
    assert!(!last.is_terminal(&last.segments[0]));
}

#[test]
fn test_polygon_waits_for_anchor_segment() {
    let anchored = scheduler("F{f+f+f}", short_animation());
    assert_eq!(anchored.geometry().polygons[0].anchor, Some(0));
    assert!(anchored.frame(0).polygons.is_empty());
    assert!(anchored.frame(1).polygons.is_empty(), "anchor still growing");
    assert_eq!(anchored.frame(9).polygons.len(), 1);

    let unanchored = scheduler("{f+f+f}F", short_animation());
    assert_eq!(unanchored.frame(0).polygons.len(), 1);
}

#[test]
fn test_thickening_widens_finished_segments() {
    let s = scheduler("F[+F]F", short_animation().with_thickening(0.15));
    let last = s.frame(9);
    for (grown, original) in last.segments.iter().zip(&s.geometry().segments) {
        assert!(grown.width > original.width, "segment {} not thickened", grown.index);
    }
}

#[test]
fn test_parallel_batch_matches_sequential_frames() {
    let s = scheduler("F[+F[-F]F]F[-F]F", GrowthConfig::new().with_frames(20, 4));
    let batch = s.frames(0..20, 4).expect("pool builds");
    let sequential: Vec<_> = (0..20).map(|f| s.frame(f)).collect();
    assert_eq!(batch, sequential);
}

#[test]
fn test_batch_on_shared_pool_preserves_order() {
    let s = scheduler("F[+F]F", short_animation());
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(3)
        .build()
        .unwrap();
    let frames = s.frames_with(&pool, &[5, 1, 3]);
    let order: Vec<usize> = frames.iter().map(|f| f.frame).collect();
    assert_eq!(order, vec![5, 1, 3]);
    assert_eq!(frames[0], s.frame(5));
}

#[test]
fn test_zero_workers_still_runs() {
    let s = scheduler("F", short_animation());
    assert_eq!(s.frames(0..3, 0).unwrap().len(), 3);
    assert!(s.frames(4..4, 2).unwrap().is_empty());
}

#[test]
fn test_bounds_are_stable_across_frames() {
    let s = scheduler("F[+F]F", short_animation());
    let frames = s.frames(0..10, 2).unwrap();
    assert!(frames.iter().all(|f| f.bounds == s.bounds()));
}
