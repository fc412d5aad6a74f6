use matchviz_core::FeatureAlgorithm;
use opencv::core::{KeyPoint, Mat, Ptr, Vector};
use opencv::features2d::{Feature2D, BRISK, KAZE, ORB, SIFT};
use opencv::prelude::*;

use crate::error::{DetectError, DetectResult};

/// Read-only view of a detector's latest results.
///
/// Keypoints and descriptors are borrowed from the `Detector`'s own storage, so
/// a view is only usable until the next `detect_and_compute` call replaces that
/// storage.
#[derive(Debug)]
pub struct Detection<'a> {
    pub algorithm: FeatureAlgorithm,
    pub image: &'a Mat,
    pub keypoints: &'a Vector<KeyPoint>,
    pub descriptors: &'a Mat,
}

/// Wraps one OpenCV keypoint detector / descriptor extractor together with the
/// state from its most recent detection pass.
pub struct Detector {
    algorithm: FeatureAlgorithm,
    feature: Ptr<Feature2D>,
    image: Mat,
    keypoints: Vector<KeyPoint>,
    descriptors: Mat,
}

impl Detector {
    /// Bind the concrete OpenCV implementation for `algorithm`.
    ///
    /// The `_def` creators keep this compatible across OpenCV 4.x minor versions,
    /// which keep growing the full `create` signatures.
    pub fn create(algorithm: FeatureAlgorithm) -> DetectResult<Self> {
        let feature: Ptr<Feature2D> = match algorithm {
            FeatureAlgorithm::Sift => SIFT::create_def()?.into(),
            #[cfg(feature = "surf")]
            FeatureAlgorithm::Surf => opencv::xfeatures2d::SURF::create_def()?.into(),
            #[cfg(not(feature = "surf"))]
            FeatureAlgorithm::Surf => return Err(DetectError::UnsupportedAlgorithm(algorithm)),
            FeatureAlgorithm::Orb => ORB::create_def()?.into(),
            FeatureAlgorithm::Kaze => KAZE::create_def()?.into(),
            FeatureAlgorithm::Brisk => BRISK::create_def()?.into(),
        };

        Ok(Self {
            algorithm,
            feature,
            image: Mat::default(),
            keypoints: Vector::new(),
            descriptors: Mat::default(),
        })
    }

    /// Detect keypoints and compute descriptors on `image`, replacing all stored
    /// state from the previous call. No incremental update: results describe
    /// exactly this image.
    pub fn detect_and_compute(&mut self, image: &Mat) -> DetectResult<()> {
        if image.empty() {
            return Err(DetectError::EmptyImage);
        }

        self.image = image.clone();
        let mask = Mat::default();
        self.feature.detect_and_compute(
            &self.image,
            &mask,
            &mut self.keypoints,
            &mut self.descriptors,
            false,
        )?;
        Ok(())
    }

    pub fn detection(&self) -> Detection<'_> {
        Detection {
            algorithm: self.algorithm,
            image: &self.image,
            keypoints: &self.keypoints,
            descriptors: &self.descriptors,
        }
    }

    pub fn algorithm(&self) -> FeatureAlgorithm {
        self.algorithm
    }
}
