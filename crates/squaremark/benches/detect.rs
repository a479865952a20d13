use criterion::{black_box, criterion_group, criterion_main, Criterion};
use squaremark::detect::gray_view;
use squaremark::{
    CameraIntrinsics, DetectorParams, FramePipeline, FrameStage, MarkerDetector, PlanarPoseEstimator,
};

const CELL: u32 = 12;

/// 640×480 frame with a 4×3 grid of markers, each with a distinct inner pattern.
fn render_frame() -> image::GrayImage {
    image::GrayImage::from_fn(640, 480, |x, y| {
        let (gx, gy) = (x / 160, y / 160);
        let (lx, ly) = (x % 160, y % 160);
        if !(44..44 + 6 * CELL).contains(&lx) || !(44..44 + 6 * CELL).contains(&ly) {
            return image::Luma([235]);
        }
        let (c, r) = ((lx - 44) / CELL, (ly - 44) / CELL);
        if r == 0 || c == 0 || r == 5 || c == 5 {
            return image::Luma([20]);
        }
        let seed = 0x9E37u32.wrapping_mul(gy * 4 + gx + 1);
        let bit = (seed >> ((r - 1) * 4 + (c - 1))) & 1;
        image::Luma([if bit == 1 { 20 } else { 235 }])
    })
}

fn bench_detect(c: &mut Criterion) {
    let img = render_frame();
    let view = gray_view(&img);

    let mut detector = MarkerDetector::new(DetectorParams::default());
    c.bench_function("detect_640x480_global_threshold", |b| {
        b.iter(|| black_box(detector.detect(black_box(&view)).map(|m| m.len())))
    });

    let mut params = DetectorParams::default();
    params.preprocess = FramePipeline::new(vec![FrameStage::AdaptiveThreshold {
        block_radius: 15,
        offset: 5,
    }]);
    let mut adaptive = MarkerDetector::new(params);
    c.bench_function("detect_640x480_adaptive_threshold", |b| {
        b.iter(|| black_box(adaptive.detect(black_box(&view)).map(|m| m.len())))
    });

    let camera = CameraIntrinsics {
        fx: 600.0,
        fy: 600.0,
        cx: 319.5,
        cy: 239.5,
    };
    let mut with_pose = MarkerDetector::new(DetectorParams::default())
        .with_pose_estimator(PlanarPoseEstimator::new(camera));
    c.bench_function("detect_640x480_with_pose", |b| {
        b.iter(|| black_box(with_pose.detect(black_box(&view)).map(|m| m.len())))
    });
}

criterion_group!(benches, bench_detect);
criterion_main!(benches);
