//! JSON configuration and report helpers for marker detection.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use squaremark_detect::{
    CameraIntrinsics, DetectorParams, FrameDebug, Marker, MarkerDetector, PlanarPoseEstimator,
    Stripe,
};
use std::{
    fs,
    path::{Path, PathBuf},
};

#[derive(thiserror::Error, Debug)]
pub enum IoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[cfg(feature = "image")]
    #[error(transparent)]
    Image(#[from] ::image::ImageError),
}

/// Configuration of a detection run over one or more frames.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectConfig {
    /// Frames, processed in order by a single detector.
    #[serde(default)]
    pub image_paths: Vec<String>,
    #[serde(default)]
    pub output_path: Option<String>,
    #[serde(default)]
    pub detector: DetectorParams,
    /// Enables pose estimation when present.
    #[serde(default)]
    pub camera: Option<CameraIntrinsics>,
    /// Keep per-candidate traces in the report.
    #[serde(default)]
    pub debug: bool,
    /// Keep the 24 stripes of every marker in the report.
    #[serde(default)]
    pub report_stripes: bool,
}

impl DetectConfig {
    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, IoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), IoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Resolve the output report path.
    pub fn output_path(&self) -> PathBuf {
        self.output_path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("squaremark_report.json"))
    }

    /// Build a detector, with a pose estimator when a camera is configured.
    pub fn build_detector(&self) -> MarkerDetector {
        let detector = MarkerDetector::new(self.detector.clone());
        match self.camera {
            Some(camera) => detector.with_pose_estimator(PlanarPoseEstimator::new(camera)),
            None => detector,
        }
    }
}

/// One decoded marker as written to the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerReport {
    pub id: u16,
    pub rotation: u8,
    pub corners: [Point2<i32>; 4],
    pub refined_corners: [Point2<f32>; 4],
    pub center: Point2<f32>,
    /// Row-major 4×4 marker-to-camera transform.
    #[serde(default)]
    pub pose: Option<[f32; 16]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stripes: Option<Vec<Stripe>>,
}

impl MarkerReport {
    pub fn from_marker(marker: &Marker, with_stripes: bool) -> Self {
        Self {
            id: marker.id,
            rotation: marker.rotation,
            corners: marker.corners,
            refined_corners: marker.refined_corners,
            center: marker.center(),
            pose: marker.pose.map(|p| p.matrix),
            stripes: with_stripes.then(|| marker.stripes.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameReport {
    pub image_path: String,
    pub width: usize,
    pub height: usize,
    pub markers: Vec<MarkerReport>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug: Option<FrameDebug>,
}

/// Report of a whole detection run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectReport {
    #[serde(default)]
    pub config_path: Option<String>,
    pub frames: Vec<FrameReport>,
}

impl DetectReport {
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, IoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), IoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Total number of decoded markers over all frames.
    pub fn marker_count(&self) -> usize {
        self.frames.iter().map(|f| f.markers.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_uses_defaults() {
        let cfg: DetectConfig = serde_json::from_str(r#"{ "image_paths": ["a.png"] }"#)
            .expect("parse");
        assert_eq!(cfg.image_paths, vec!["a.png".to_string()]);
        assert_eq!(cfg.detector, DetectorParams::default());
        assert!(cfg.camera.is_none());
        assert_eq!(cfg.output_path(), PathBuf::from("squaremark_report.json"));
    }

    #[test]
    fn config_round_trips_through_a_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        let cfg = DetectConfig {
            image_paths: vec!["frame_000.png".into()],
            camera: Some(CameraIntrinsics {
                fx: 600.0,
                fy: 600.0,
                cx: 320.0,
                cy: 240.0,
            }),
            debug: true,
            ..DetectConfig::default()
        };
        cfg.write_json(&path).expect("write");
        assert_eq!(DetectConfig::load_json(&path).expect("load"), cfg);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = DetectConfig::load_json("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, IoError::Io(_)));
    }
}
