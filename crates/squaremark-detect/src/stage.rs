//! Frame pre-processing stages.
//!
//! Each stage is a pure `GrayImageView -> GrayImage` transform. A
//! [`FramePipeline`] runs its stages front to back, ping-ponging between two
//! reusable buffers.

use imageproc::integral_image::{integral_image, sum_image_pixels};
use serde::{Deserialize, Serialize};
use squaremark_core::{GrayImage, GrayImageView};

/// One image transform.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FrameStage {
    /// Copy the input unchanged.
    Identity,
    /// Global threshold: `v > threshold -> 255`, else `0`.
    Threshold { threshold: u8 },
    /// Local mean threshold over a `(2r+1)²` window:
    /// `v > mean - offset -> 255`, else `0`.
    AdaptiveThreshold { block_radius: u32, offset: i32 },
}

impl FrameStage {
    /// Run the stage, overwriting `dst` (its allocation is reused).
    pub fn apply(&self, src: &GrayImageView<'_>, dst: &mut GrayImage) {
        dst.width = src.width;
        dst.height = src.height;
        dst.data.clear();
        match *self {
            FrameStage::Identity => {
                for y in 0..src.height {
                    dst.data.extend_from_slice(src.row(y));
                }
            }
            FrameStage::Threshold { threshold } => {
                for y in 0..src.height {
                    dst.data
                        .extend(src.row(y).iter().map(|&v| if v > threshold { 255 } else { 0 }));
                }
            }
            FrameStage::AdaptiveThreshold {
                block_radius,
                offset,
            } => adaptive_threshold(src, block_radius as usize, offset, &mut dst.data),
        }
    }

    pub fn transform(&self, src: &GrayImageView<'_>) -> GrayImage {
        let mut out = GrayImage::filled(0, 0, 0);
        self.apply(src, &mut out);
        out
    }
}

fn adaptive_threshold(src: &GrayImageView<'_>, radius: usize, offset: i32, out: &mut Vec<u8>) {
    let (w, h) = (src.width, src.height);
    if w == 0 || h == 0 {
        return;
    }
    let gray = image::GrayImage::from_fn(w as u32, h as u32, |x, y| {
        image::Luma([src.at(x as usize, y as usize)])
    });
    let integral = integral_image::<_, u64>(&gray);

    for y in 0..h {
        let y0 = y.saturating_sub(radius);
        let y1 = (y + radius).min(h - 1);
        for (x, &v) in src.row(y).iter().enumerate() {
            let x0 = x.saturating_sub(radius);
            let x1 = (x + radius).min(w - 1);
            let [sum] = sum_image_pixels(&integral, x0 as u32, y0 as u32, x1 as u32, y1 as u32);
            let count = ((x1 - x0 + 1) * (y1 - y0 + 1)) as i64;
            // v > sum / count - offset, kept in integers
            let lhs = (v as i64 + offset as i64) * count;
            out.push(if lhs > sum as i64 { 255 } else { 0 });
        }
    }
}

/// Ordered list of stages applied to every frame.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FramePipeline {
    stages: Vec<FrameStage>,
}

impl FramePipeline {
    pub fn new(stages: Vec<FrameStage>) -> Self {
        Self { stages }
    }

    pub fn stages(&self) -> &[FrameStage] {
        &self.stages
    }

    pub fn push(&mut self, stage: FrameStage) {
        self.stages.push(stage);
    }

    /// Run all stages; the result ends up in `out`, `tmp` is scratch.
    pub fn run(&self, src: &GrayImageView<'_>, out: &mut GrayImage, tmp: &mut GrayImage) {
        let Some((first, rest)) = self.stages.split_first() else {
            FrameStage::Identity.apply(src, out);
            return;
        };
        first.apply(src, out);
        for stage in rest {
            stage.apply(&out.view(), tmp);
            std::mem::swap(out, tmp);
        }
    }

    pub fn apply(&self, src: &GrayImageView<'_>) -> GrayImage {
        let mut out = GrayImage::filled(0, 0, 0);
        let mut tmp = GrayImage::filled(0, 0, 0);
        self.run(src, &mut out, &mut tmp);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> GrayImage {
        GrayImage {
            width: 4,
            height: 1,
            data: vec![10, 100, 104, 200],
        }
    }

    #[test]
    fn fixed_threshold_is_strict() {
        let out = FrameStage::Threshold { threshold: 100 }.transform(&ramp().view());
        assert_eq!(out.data, vec![0, 0, 255, 255]);
    }

    #[test]
    fn adaptive_threshold_follows_local_mean() {
        // bright left half, dark right half with a darker dot in each
        let mut img = GrayImage::filled(8, 8, 200);
        for y in 0..8 {
            for x in 4..8 {
                img.set(x, y, 60);
            }
        }
        img.set(1, 1, 150);
        img.set(6, 6, 20);
        let out = FrameStage::AdaptiveThreshold {
            block_radius: 1,
            offset: 5,
        }
        .transform(&img.view());
        assert_eq!(out.get(1, 1), 0);
        assert_eq!(out.get(6, 6), 0);
        assert_eq!(out.get(0, 6), 255);
        assert_eq!(out.get(7, 0), 255);
    }

    #[test]
    fn adaptive_threshold_matches_a_direct_window_mean() {
        let mut img = GrayImage::filled(13, 9, 0);
        for y in 0..9 {
            for x in 0..13 {
                img.set(x, y, ((x * 37 + y * 91 + x * y * 13) % 256) as u8);
            }
        }
        let (radius, offset) = (2usize, 3i32);
        let out = FrameStage::AdaptiveThreshold {
            block_radius: radius as u32,
            offset,
        }
        .transform(&img.view());

        for y in 0..9usize {
            for x in 0..13usize {
                let (mut sum, mut count) = (0i64, 0i64);
                for wy in y.saturating_sub(radius)..=(y + radius).min(8) {
                    for wx in x.saturating_sub(radius)..=(x + radius).min(12) {
                        sum += img.get(wx, wy) as i64;
                        count += 1;
                    }
                }
                let bright = (img.get(x, y) as i64 + offset as i64) * count > sum;
                assert_eq!(out.get(x, y), if bright { 255 } else { 0 }, "({x}, {y})");
            }
        }
    }

    #[test]
    fn stages_run_in_order() {
        let pipeline = FramePipeline::new(vec![
            FrameStage::Threshold { threshold: 50 },
            FrameStage::Identity,
            FrameStage::Threshold { threshold: 128 },
        ]);
        let out = pipeline.apply(&ramp().view());
        assert_eq!(out.data, vec![0, 255, 255, 255]);

        let empty = FramePipeline::default().apply(&ramp().view());
        assert_eq!(empty, ramp());
    }

    #[test]
    fn pipeline_serializes_as_a_list() {
        let pipeline = FramePipeline::new(vec![FrameStage::AdaptiveThreshold {
            block_radius: 27,
            offset: 5,
        }]);
        let json = serde_json::to_string(&pipeline).expect("serialize");
        assert_eq!(
            json,
            r#"[{"kind":"adaptive_threshold","block_radius":27,"offset":5}]"#
        );
    }
}
