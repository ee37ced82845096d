use proptest::prelude::*;
use symbios_growth::easing::{self, Easing};
use symbios_growth::{Error, GrowthConfig, GrowthMode, GrowthScheduler, Turtle2D};

const EPS: f64 = 1e-9;

fn scheduler(word: &str, config: GrowthConfig) -> GrowthScheduler<symbios_growth::glam::DVec2> {
    let geometry = Turtle2D::default().interpret(word);
    GrowthScheduler::new(geometry, config).expect("valid config")
}

fn short_animation() -> GrowthConfig {
    GrowthConfig::new().with_frames(10, 2)
}

// ---------------------------------------------------------------------------
// Hierarchy and birth times
// ---------------------------------------------------------------------------

#[test]
fn test_child_waits_for_parent() {
    let s = scheduler("F[+F]", short_animation());
    let hierarchy = s.hierarchy().expect("apical mode builds a hierarchy");
    assert_eq!(hierarchy.len(), 2);

    assert_eq!(hierarchy[0].parent, None);
    assert_eq!(hierarchy[0].children, vec![1]);
    assert!(!hierarchy[0].terminal);
    assert_eq!(hierarchy[0].birth_time, 0.0);

    let child = &hierarchy[1];
    assert_eq!(child.parent, Some(0));
    assert!(child.terminal);
    // 0.2 * 0.3 + 1 * 0.05
    assert!((child.birth_time - 0.11).abs() < EPS, "birth {}", child.birth_time);
    assert!((child.growth_duration - 0.2).abs() < EPS);
    assert!((child.growth_priority - 0.8).abs() < EPS);
}

#[test]
fn test_birth_is_capped_at_growth_period() {
    let s = scheduler("F[+F]", short_animation().with_apical(1.0, 1.0));
    let child = s.growth_info(1).unwrap();
    assert!((child.birth_time - 0.8).abs() < EPS);
}

#[test]
fn test_disconnected_roots_are_spread() {
    let s = scheduler("FfF", short_animation());
    let hierarchy = s.hierarchy().unwrap();
    assert_eq!(hierarchy[0].parent, None);
    assert_eq!(hierarchy[1].parent, None);
    // 1/2 of the 0.8 period, scaled by the 0.3 root spread
    assert!((hierarchy[1].birth_time - 0.12).abs() < EPS);
}

#[test]
fn test_trunk_continuation_is_a_child_too() {
    let s = scheduler("F[+F]F", short_animation());
    let root = s.growth_info(0).unwrap();
    assert_eq!(root.children, vec![1, 2]);
    assert!(!s.is_terminal(0));
    assert!(s.is_terminal(1));
    assert!(s.is_terminal(2));
    // Depth 0 continuation gets no per-depth delay
    assert!((s.growth_info(2).unwrap().birth_time - 0.06).abs() < EPS);
}

#[test]
fn test_linear_mode_uses_creation_order() {
    let s = scheduler("F[+F]F", short_animation().with_mode(GrowthMode::Linear));
    assert!(s.hierarchy().is_none());
    let info = s.growth_info(2).unwrap();
    assert!((info.birth_time - 2.0 / 3.0 * 0.8).abs() < EPS);
    assert_eq!(info.parent, None);
    assert!(s.growth_info(3).is_none());

    // Without a hierarchy only the deepest level counts as a tip
    assert!(!s.is_terminal(0));
    assert!(s.is_terminal(1));
    assert!(!s.is_terminal(2));
}

// ---------------------------------------------------------------------------
// Visibility and thickness
// ---------------------------------------------------------------------------

#[test]
fn test_visibility_at_animation_ends() {
    let s = scheduler("F[+F]F[-F]", short_animation());
    for i in 0..s.segment_count() {
        assert_eq!(s.visibility(i, 9), 1.0, "segment {i} must be complete");
    }
    assert_eq!(s.visibility(0, 0), 0.0);
    assert_eq!(s.visibility(99, 5), 0.0, "unknown segment");
}

#[test]
fn test_linear_growth_curve() {
    let config = GrowthConfig::new()
        .with_frames(11, 2)
        .with_mode(GrowthMode::Linear)
        .with_easing(Easing::Linear);
    let s = scheduler("F", config);
    // progress 0.1 over a duration of 2/11
    assert!((s.visibility(0, 1) - 0.55).abs() < EPS);
}

#[test]
fn test_default_easing_is_cubic() {
    let s = scheduler("F", GrowthConfig::new().with_frames(11, 2).with_mode(GrowthMode::Linear));
    let expected = 1.0 - 0.45f64.powi(3);
    assert!((s.visibility(0, 1) - expected).abs() < EPS);
}

#[test]
fn test_sigmoid_mode_forces_logistic_curve() {
    let config = GrowthConfig::new()
        .with_frames(11, 2)
        .with_mode(GrowthMode::Sigmoid)
        .with_sigmoid(8.0, 0.4);
    let s = scheduler("F", config);
    let expected = easing::sigmoid(0.55, 8.0, 0.4);
    assert!((s.visibility(0, 1) - expected).abs() < EPS);
}

#[test]
fn test_thickening_after_full_growth() {
    let s = scheduler("F", short_animation().with_thickening(0.15));
    // Fully grown at progress 0.2, so aged 0.8 at the last frame
    let expected = 1.0 + 0.15 * 9.0f64.ln();
    assert!((s.thickness(0, 9) - expected).abs() < EPS);
    assert_eq!(s.thickness(0, 1), 1.0, "still growing");

    let plain = scheduler("F", short_animation());
    assert_eq!(plain.thickness(0, 9), 1.0);
}

#[test]
fn test_single_frame_animation_is_complete() {
    let s = scheduler("F", GrowthConfig::new().with_frames(1, 1));
    assert_eq!(s.frame_progress(0), 1.0);
    assert_eq!(s.frame_progress(7), 1.0);
    assert_eq!(s.visibility(0, 0), 1.0);
}

#[test]
fn test_bounds_cover_whole_plant() {
    let s = scheduler("F[+F]F", GrowthConfig::new());
    let bounds = s.bounds();
    assert!(bounds.height() >= 20.0);
    assert_eq!(s.frame(0).bounds, bounds);
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[test]
fn test_invalid_configs_are_rejected() {
    let mut nan_epsilon = GrowthConfig::new();
    nan_epsilon.visibility_epsilon = f64::NAN;

    let invalid = [
        GrowthConfig::new().with_frames(0, 8),
        GrowthConfig::new().with_frames(100, 0),
        GrowthConfig::new().with_sigmoid(-1.0, 0.5),
        GrowthConfig::new().with_apical(1.5, 0.05),
        GrowthConfig::new().with_apical(0.3, -0.1),
        GrowthConfig::new().with_thickening(-0.2),
        GrowthConfig::new().with_link_tolerance(0.0),
        GrowthConfig::new().with_easing(Easing::Sigmoid {
            steepness: 0.0,
            midpoint: 0.5,
        }),
        nan_epsilon,
    ];
    for config in invalid {
        assert!(
            matches!(config.validate(), Err(Error::InvalidConfig(_))),
            "accepted {config:?}"
        );
        let geometry = Turtle2D::default().interpret("F");
        assert!(GrowthScheduler::new(geometry, config).is_err());
    }
    assert!(GrowthConfig::default().validate().is_ok());
}

#[test]
fn test_growth_period_fallback() {
    assert!((short_animation().growth_period() - 0.8).abs() < EPS);
    // Growth longer than the animation leaves no room; fall back to 0.8
    let crowded = GrowthConfig::new().with_frames(10, 20);
    assert_eq!(crowded.growth_period(), 0.8);
}

#[test]
fn test_auto_configure_by_plant_size() {
    for (segments, growth, minimum) in [(10, 12, 25), (100, 8, 26), (300, 6, 42), (1000, 4, 108)] {
        let mut config = GrowthConfig::new();
        assert_eq!(config.auto_configure(segments, true), minimum);
        assert_eq!(config.growth_frames, growth, "{segments} segments");
        assert_eq!(config.total_frames, 100, "respected total must not change");
    }

    let mut config = GrowthConfig::new();
    config.auto_configure(1000, false);
    assert_eq!(config.total_frames, 108);

    let mut roomy = GrowthConfig::new().with_frames(500, 8);
    roomy.auto_configure(1000, false);
    assert_eq!(roomy.total_frames, 500, "only raised, never lowered");
}

#[test]
fn test_preview_samples() {
    let s = scheduler("F[+F]F[-F]F", GrowthConfig::new());
    let preview = s.preview(10);
    assert_eq!(preview.len(), 10);
    assert_eq!(preview[0].frame, 0);
    assert_eq!(preview[9].frame, 90);
    assert!(preview.iter().all(|p| p.total_segments == 5));
    for pair in preview.windows(2) {
        assert!(pair[1].percent_complete >= pair[0].percent_complete);
        assert!(pair[1].average_visibility >= pair[0].average_visibility);
    }
    let last = preview.last().unwrap();
    assert!(last.percent_complete > 0.0 && last.percent_complete <= 100.0);
}

#[test]
fn test_preview_of_empty_plant() {
    let s = scheduler("XYZ", GrowthConfig::new().with_frames(4, 1));
    let preview = s.preview(100);
    assert_eq!(preview.len(), 4, "step never drops below one frame");
    assert!(preview.iter().all(|p| p.average_visibility == 0.0));
}

// ---------------------------------------------------------------------------
// Easing
// ---------------------------------------------------------------------------

#[test]
fn test_easing_reference_values() {
    assert!((Easing::EaseOutCubic.apply(0.5) - 0.875).abs() < EPS);
    assert!((Easing::EaseOutQuad.apply(0.5) - 0.75).abs() < EPS);
    assert!((Easing::EaseInOutCubic.apply(0.25) - 0.0625).abs() < EPS);
    assert!((Easing::EaseInOutCubic.apply(0.75) - 0.9375).abs() < EPS);
    assert_eq!(Easing::Linear.apply(0.3), 0.3);
}

#[test]
fn test_easing_clamps_inputs() {
    for easing in [Easing::Linear, Easing::EaseOutCubic, Easing::EaseInOutCubic] {
        assert_eq!(easing.apply(-0.5), 0.0);
        assert_eq!(easing.apply(1.5), 1.0);
        assert_eq!(easing.apply(f64::NAN), 0.0);
    }
}

#[test]
fn test_flat_sigmoid_falls_back_to_linear() {
    assert!((easing::sigmoid(0.3, 1e-14, 0.5) - 0.3).abs() < 1e-6);
}

proptest! {
    #[test]
    fn prop_sigmoid_has_exact_end_points(k in 0.1f64..50.0, m in -1.0f64..2.0) {
        prop_assert_eq!(easing::sigmoid(0.0, k, m), 0.0);
        prop_assert_eq!(easing::sigmoid(1.0, k, m), 1.0);
    }

    #[test]
    fn prop_easing_is_bounded_and_monotonic(
        a in 0.0f64..=1.0,
        b in 0.0f64..=1.0,
        k in 0.5f64..20.0,
        m in 0.0f64..=1.0,
    ) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let curves = [
            Easing::Linear,
            Easing::EaseOutQuad,
            Easing::EaseOutCubic,
            Easing::EaseInOutCubic,
            Easing::Sigmoid { steepness: k, midpoint: m },
        ];
        for easing in curves {
            let (ya, yb) = (easing.apply(lo), easing.apply(hi));
            prop_assert!((0.0..=1.0).contains(&ya));
            prop_assert!((0.0..=1.0).contains(&yb));
            prop_assert!(ya <= yb + 1e-12, "{:?} decreased: {} -> {}", easing, ya, yb);
        }
    }

    #[test]
    fn prop_visibility_never_decreases(frame in 0usize..59, segment in 0usize..9) {
        let s = scheduler("F[+F[-F]F]F[-F[+F]]F", GrowthConfig::new().with_frames(60, 6));
        prop_assert!(s.visibility(segment, frame + 1) >= s.visibility(segment, frame));
    }

    #[test]
    fn prop_partial_segment_grows_with_visibility(a in 0.0f64..=1.0, b in 0.0f64..=1.0) {
        let geometry = Turtle2D::default().interpret("+F");
        let segment = geometry.segments[0];
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(segment.partial(lo).length() <= segment.partial(hi).length() + 1e-12);
        prop_assert!(segment.partial(hi).length() <= segment.length() + 1e-12);
    }
}
