use nalgebra::Point2;
use squaremark_core::GrayImage;
use squaremark_detect::{
    border_is_black, CameraIntrinsics, CandidateOutcome, DetectorParams, FrameDebug, FrameState,
    MarkerDetector, PlanarPoseEstimator,
};

const SIZE: usize = 240;
const ORIGIN: usize = 75;
const CELL: usize = 15;

/// White frame with one marker: black ring, inner `bits` (`1` = black).
fn render(bits: [[u8; 4]; 4]) -> GrayImage {
    let mut img = GrayImage::filled(SIZE, SIZE, 255);
    for r in 0..6 {
        for c in 0..6 {
            let ring = r == 0 || c == 0 || r == 5 || c == 5;
            let black = ring || bits[r - 1][c - 1] == 1;
            if !black {
                continue;
            }
            for y in 0..CELL {
                for x in 0..CELL {
                    img.set(ORIGIN + c * CELL + x, ORIGIN + r * CELL + y, 0);
                }
            }
        }
    }
    img
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn rotate_clockwise(bits: [[u8; 4]; 4]) -> [[u8; 4]; 4] {
    let mut out = [[0u8; 4]; 4];
    for (r, row) in bits.iter().enumerate() {
        for (c, &b) in row.iter().enumerate() {
            out[c][3 - r] = b;
        }
    }
    out
}

const ASYMMETRIC: [[u8; 4]; 4] = [[1, 1, 0, 1], [1, 0, 0, 0], [0, 0, 1, 0], [0, 0, 0, 0]];

const LO: f32 = (ORIGIN as f32) - 0.5;
const HI: f32 = (ORIGIN + 6 * CELL) as f32 - 0.5;

fn assert_corners(actual: &[Point2<f32>; 4], expected: [(f32, f32); 4]) {
    for (a, (ex, ey)) in actual.iter().zip(expected) {
        assert!(
            (a.x - ex).abs() < 0.1 && (a.y - ey).abs() < 0.1,
            "corners {actual:?}, expected {expected:?}"
        );
    }
}

#[test]
fn asymmetric_marker_is_decoded_with_canonical_corners() {
    init_logging();
    let img = render(ASYMMETRIC);
    let mut detector = MarkerDetector::new(DetectorParams::default());
    let markers = detector.detect(&img.view()).expect("frame");

    assert_eq!(markers.len(), 1);
    let m = &markers[0];
    assert_eq!(m.id, 0x041B);
    // canonical corner 0 is where the minimal code starts reading
    assert_corners(&m.refined_corners, [(HI, HI), (LO, HI), (LO, LO), (HI, LO)]);
    assert_eq!(m.stripes.len(), 24);
    assert!(m.stripes.iter().all(|s| s.subpixel_center().is_some()));
    assert!(m.pose.is_none());
    assert_eq!(detector.state(), FrameState::FrameComplete { accepted: 1 });
}

#[test]
fn turned_marker_keeps_its_id() {
    let img = render(rotate_clockwise(ASYMMETRIC));
    let mut detector = MarkerDetector::new(DetectorParams::default());
    let markers = detector.detect(&img.view()).expect("frame");

    assert_eq!(markers.len(), 1);
    assert_eq!(markers[0].id, 0x041B);
    assert_corners(
        &markers[0].refined_corners,
        [(LO, HI), (LO, LO), (HI, LO), (HI, HI)],
    );
}

#[test]
fn stripes_follow_the_canonical_corners_in_every_rotation() {
    let mut bits = ASYMMETRIC;
    let corner0 = [(HI, HI), (LO, HI), (LO, LO), (HI, LO)];
    for (turns, expected) in corner0.into_iter().enumerate() {
        let img = render(bits);
        let mut detector = MarkerDetector::new(DetectorParams::default());
        let markers = detector.detect(&img.view()).expect("frame");
        assert_eq!(markers.len(), 1);
        let m = &markers[0];
        assert_eq!(m.id, 0x041B);
        assert_eq!(m.rotation as usize, turns);
        let c0 = m.refined_corners[0];
        assert!((c0.x - expected.0).abs() < 0.1 && (c0.y - expected.1).abs() < 0.1);

        for edge in 0..4 {
            let a = m.refined_corners[edge].cast::<f64>();
            let b = m.refined_corners[(edge + 1) % 4].cast::<f64>();
            let along = b - a;
            let len = along.norm();
            for stripe in &m.stripes[edge * 6..edge * 6 + 6] {
                let p = stripe.subpixel_center().expect("located") - a;
                let off_line = (p.x * along.y - p.y * along.x).abs() / len;
                let t = p.dot(&along) / (len * len);
                assert!(off_line < 0.25, "turns {turns}, edge {edge}: {off_line}");
                assert!((0.0..=1.0).contains(&t), "turns {turns}, edge {edge}: t = {t}");
            }
        }
        bits = rotate_clockwise(bits);
    }
}

#[test]
fn pose_is_attached_when_an_estimator_is_configured() {
    let img = render(ASYMMETRIC);
    let center = (LO + HI) as f64 / 2.0;
    let params = DetectorParams {
        marker_side_length: 0.09,
        ..DetectorParams::default()
    };
    let mut detector = MarkerDetector::new(params).with_pose_estimator(PlanarPoseEstimator::new(
        CameraIntrinsics {
            fx: 500.0,
            fy: 500.0,
            cx: center,
            cy: center,
        },
    ));
    let markers = detector.detect(&img.view()).expect("frame");
    let pose = markers[0].pose.expect("pose");

    let t = pose.translation();
    assert!(t.x.abs() < 1e-3 && t.y.abs() < 1e-3, "{t:?}");
    assert!((t.z - 0.5).abs() < 2e-3, "{t:?}");
    // corner 0 is the bottom-right one: half a turn about the optical axis
    let r = pose.rotation();
    assert!((r[(0, 0)] + 1.0).abs() < 5e-3, "{r:?}");
    assert!((r[(1, 1)] + 1.0).abs() < 5e-3, "{r:?}");
    assert!((r[(2, 2)] - 1.0).abs() < 5e-3, "{r:?}");
}

#[test]
fn debug_trace_records_every_candidate() {
    init_logging();
    let img = render(ASYMMETRIC);
    let mut detector = MarkerDetector::new(DetectorParams::default());
    let mut debug = FrameDebug::default();
    let markers = detector
        .detect_with_debug(&img.view(), Some(&mut debug))
        .expect("frame");

    assert_eq!(markers.len(), 1);
    assert!(debug.contours >= debug.candidates.len());
    let accepted: Vec<_> = debug.accepted().collect();
    assert_eq!(accepted.len(), 1);
    assert!(matches!(
        accepted[0].outcome,
        CandidateOutcome::Accepted { id: 0x041B, .. }
    ));
    let patch = accepted[0].patch.as_ref().expect("patch");
    let grid: [u8; 36] = patch.as_slice().try_into().expect("6x6");
    assert!(border_is_black(&grid));

    // a second frame replaces the trace
    let blank = GrayImage::filled(SIZE, SIZE, 255);
    detector
        .detect_with_debug(&blank.view(), Some(&mut debug))
        .expect("frame");
    assert!(debug.candidates.is_empty());
}

#[test]
fn degenerate_squares_are_not_markers() {
    let mut detector = MarkerDetector::new(DetectorParams::default());
    for (bits, code) in [([[1u8; 4]; 4], 0xFFFF), ([[0u8; 4]; 4], 0)] {
        let img = render(bits);
        let mut debug = FrameDebug::default();
        let markers = detector
            .detect_with_debug(&img.view(), Some(&mut debug))
            .expect("frame");
        assert!(markers.is_empty());
        assert!(
            debug
                .candidates
                .iter()
                .any(|c| c.outcome == CandidateOutcome::DegenerateCode { code }),
            "{debug:?}"
        );
    }
}

#[test]
fn blank_frame_completes_without_markers() {
    let img = GrayImage::filled(SIZE, SIZE, 255);
    let mut detector = MarkerDetector::new(DetectorParams::default());
    assert!(detector.detect(&img.view()).expect("frame").is_empty());
    assert_eq!(detector.state(), FrameState::FrameComplete { accepted: 0 });
}
