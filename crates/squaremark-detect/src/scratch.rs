use crate::candidate::{Contour, Quad};
use squaremark_core::GrayImage;

/// Buffers reused from frame to frame.
///
/// Contents are only meaningful while a frame is being processed; nothing
/// handed back to the caller borrows from here.
#[derive(Debug)]
pub struct FrameScratch {
    /// Output of the pre-processing pipeline.
    pub binary: GrayImage,
    /// Ping-pong buffer for multi-stage pipelines.
    pub tmp: GrayImage,
    pub contours: Vec<Contour>,
    pub candidates: Vec<Quad>,
    /// Stripe derivative profile.
    pub derivative: Vec<i32>,
}

impl Default for FrameScratch {
    fn default() -> Self {
        Self {
            binary: GrayImage::filled(0, 0, 0),
            tmp: GrayImage::filled(0, 0, 0),
            contours: Vec::new(),
            candidates: Vec::new(),
            derivative: Vec::new(),
        }
    }
}

impl FrameScratch {
    /// Forget the previous frame, keeping allocations.
    pub fn reset(&mut self) {
        self.contours.clear();
        self.candidates.clear();
        self.derivative.clear();
    }
}
