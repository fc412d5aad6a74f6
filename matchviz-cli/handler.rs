use log::warn;
use matchviz_core::{AcceptRatio, FeatureAlgorithm, MatchConfig, MatcherAlgorithm};
use matchviz_detect::Detector;
use matchviz_match::Matcher;
use opencv::core::Mat;

use crate::draw::{self, PipelineFrame};
use crate::error::{HandlerError, HandlerResult};

/// Orchestrates detect → match → draw across parallel pipelines.
///
/// Index i in `refer_dets`, `input_dets` and `matchers` always refers to the same
/// logical pipeline; the three vectors are built together and never change length.
/// Each pipeline gets independent detector state for the reference and input
/// sides. The acceptance ratio is owned here and passed into every match call;
/// there is no shared global.
pub struct MatchHandler {
    refer_dets: Vec<Detector>,
    input_dets: Vec<Detector>,
    matchers: Vec<Matcher>,
    accept_ratio: AcceptRatio,
    has_reference: bool,
    has_input: bool,
}

impl MatchHandler {
    /// Build one reference-side detector, one input-side detector and one matcher
    /// per (feature, matcher) pair. Fails before constructing anything if the
    /// lists are mismatched or empty; a failed pipeline constructor aborts the
    /// whole handler (never partially constructed).
    pub fn new(
        features: &[FeatureAlgorithm],
        matcher_algs: &[MatcherAlgorithm],
    ) -> HandlerResult<Self> {
        if features.len() != matcher_algs.len() {
            return Err(HandlerError::PipelineCountMismatch {
                features: features.len(),
                matchers: matcher_algs.len(),
            });
        }
        if features.is_empty() {
            return Err(HandlerError::NoPipelines);
        }

        let refer_dets = features
            .iter()
            .map(|&alg| Detector::create(alg))
            .collect::<Result<Vec<_>, _>>()?;
        let input_dets = features
            .iter()
            .map(|&alg| Detector::create(alg))
            .collect::<Result<Vec<_>, _>>()?;
        let matchers = features
            .iter()
            .zip(matcher_algs)
            .map(|(&feature, &matcher)| Matcher::create(matcher, feature))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            refer_dets,
            input_dets,
            matchers,
            accept_ratio: AcceptRatio::default(),
            has_reference: false,
            has_input: false,
        })
    }

    /// Parse name lists and delegate to [`MatchHandler::new`].
    pub fn from_names<S: AsRef<str>>(features: &[S], matchers: &[S]) -> HandlerResult<Self> {
        let features = features
            .iter()
            .map(|s| s.as_ref().parse::<FeatureAlgorithm>())
            .collect::<Result<Vec<_>, _>>()?;
        let matchers = matchers
            .iter()
            .map(|s| s.as_ref().parse::<MatcherAlgorithm>())
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(&features, &matchers)
    }

    /// Validate a configuration, build the handler and apply its ratio.
    pub fn from_config(config: &MatchConfig) -> HandlerResult<Self> {
        config.validate()?;
        let mut handler = Self::new(&config.features, &config.matchers)?;
        handler.accept_ratio = AcceptRatio::new(config.accept_ratio);
        Ok(handler)
    }

    pub fn pipeline_count(&self) -> usize {
        self.matchers.len()
    }

    /// Detect features and compute descriptors on the reference image for every
    /// pipeline. Calling again replaces all prior reference state.
    pub fn set_reference_image(&mut self, image: &Mat) -> HandlerResult<()> {
        for det in &mut self.refer_dets {
            det.detect_and_compute(image)?;
        }
        self.has_reference = true;
        Ok(())
    }

    /// Detect on the new input image for every pipeline, then match each
    /// pipeline's input descriptors against its reference descriptors. Results
    /// reflect only this image; nothing accumulates across calls.
    pub fn match_image(&mut self, image: &Mat) -> HandlerResult<()> {
        if !self.has_reference {
            return Err(HandlerError::MissingReferenceImage);
        }

        for det in &mut self.input_dets {
            det.detect_and_compute(image)?;
        }

        for i in 0..self.matchers.len() {
            let refer = self.refer_dets[i].detection();
            let input = self.input_dets[i].detection();
            self.matchers[i].match_descriptors(
                refer.descriptors,
                input.descriptors,
                self.accept_ratio,
            )?;
        }
        self.has_input = true;
        Ok(())
    }

    /// Add `delta` to the acceptance ratio, clamped to `[0, 1]`. Takes effect on
    /// the next `match_image`; already-computed match lists are untouched.
    pub fn change_accept_ratio(&mut self, delta: f32) -> AcceptRatio {
        self.accept_ratio = self.accept_ratio.adjust(delta);
        self.accept_ratio
    }

    pub fn set_accept_ratio(&mut self, ratio: AcceptRatio) {
        self.accept_ratio = ratio;
    }

    pub fn accept_ratio(&self) -> AcceptRatio {
        self.accept_ratio
    }

    /// Per-pipeline (feature, matcher, kept-match-count) summary.
    pub fn match_counts(&self) -> Vec<(FeatureAlgorithm, MatcherAlgorithm, usize)> {
        self.refer_dets
            .iter()
            .zip(&self.matchers)
            .map(|(det, matcher)| (det.algorithm(), matcher.algorithm(), matcher.matches().len()))
            .collect()
    }

    /// Render every pipeline, reporting each outcome explicitly instead of
    /// failing the batch on the first flaky draw call.
    pub fn draw_pipeline_frames(&self) -> Vec<PipelineFrame> {
        (0..self.matchers.len())
            .map(|i| {
                let input = self.input_dets[i].detection();
                let refer = self.refer_dets[i].detection();
                match draw::render_single(&input, &refer, self.matchers[i].matches()) {
                    Ok(frame) => PipelineFrame::Rendered {
                        algorithm: input.algorithm,
                        frame,
                    },
                    Err(reason) => PipelineFrame::Failed {
                        algorithm: input.algorithm,
                        reason,
                    },
                }
            })
            .collect()
    }

    /// Composite visualization: one side-by-side frame per pipeline, stacked
    /// vertically. A pipeline whose rendering fails contributes a logged black
    /// placeholder of the same geometry, so the composite always has exactly one
    /// slot per pipeline. When `max_height > 0` and the stack is taller, the
    /// composite is downscaled to `max_height` preserving aspect ratio.
    pub fn draw_match_result(&self, max_height: i32) -> HandlerResult<Mat> {
        if !self.has_reference {
            return Err(HandlerError::MissingReferenceImage);
        }
        if !self.has_input {
            return Err(HandlerError::NothingToDraw);
        }

        let mut mats = Vec::with_capacity(self.matchers.len());
        for (i, frame) in self.draw_pipeline_frames().into_iter().enumerate() {
            match frame {
                PipelineFrame::Rendered { frame, .. } => mats.push(frame),
                PipelineFrame::Failed { algorithm, reason } => {
                    warn!(
                        "match rendering failed for pipeline '{}': {}; substituting blank frame",
                        algorithm, reason
                    );
                    let input = self.input_dets[i].detection();
                    let refer = self.refer_dets[i].detection();
                    mats.push(draw::placeholder(&input, &refer)?);
                }
            }
        }

        draw::stack(mats, max_height).map_err(HandlerError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencv::prelude::*;

    fn textured_image(width: i32, height: i32, seed: u32) -> Mat {
        let mut state = seed;
        let mut rows: Vec<Vec<u8>> = Vec::with_capacity(height as usize);
        for y in 0..height {
            let mut row = Vec::with_capacity(width as usize);
            for x in 0..width {
                let block = ((y / 8) * (width / 8) + (x / 8)) as u32;
                state = state
                    .wrapping_mul(1664525)
                    .wrapping_add(1013904223)
                    .wrapping_add(block);
                row.push((state >> 24) as u8);
            }
            rows.push(row);
        }
        Mat::from_slice_2d(&rows).unwrap()
    }

    fn flat_image(width: i32, height: i32) -> Mat {
        let rows: Vec<Vec<u8>> = (0..height).map(|_| vec![128u8; width as usize]).collect();
        Mat::from_slice_2d(&rows).unwrap()
    }

    fn orb_bf_handler() -> MatchHandler {
        MatchHandler::new(&[FeatureAlgorithm::Orb], &[MatcherAlgorithm::Bf]).unwrap()
    }

    #[test]
    fn test_mismatched_list_lengths_rejected() {
        let result = MatchHandler::new(
            &[
                FeatureAlgorithm::Sift,
                FeatureAlgorithm::Orb,
                FeatureAlgorithm::Kaze,
            ],
            &[MatcherAlgorithm::Flann, MatcherAlgorithm::Bf],
        );
        assert!(matches!(
            result,
            Err(HandlerError::PipelineCountMismatch { features: 3, matchers: 2 })
        ));
    }

    #[test]
    fn test_empty_lists_rejected() {
        assert!(matches!(
            MatchHandler::new(&[], &[]),
            Err(HandlerError::NoPipelines)
        ));
    }

    #[test]
    fn test_unknown_name_rejected() {
        assert!(matches!(
            MatchHandler::from_names(&["orb", "fast"], &["bf", "bf"]),
            Err(HandlerError::Parse(_))
        ));
        assert!(matches!(
            MatchHandler::from_names(&["orb"], &["knn"]),
            Err(HandlerError::Parse(_))
        ));
    }

    #[test]
    fn test_match_requires_reference() {
        let mut handler = orb_bf_handler();
        let result = handler.match_image(&textured_image(160, 160, 7));
        assert!(matches!(result, Err(HandlerError::MissingReferenceImage)));
    }

    #[test]
    fn test_draw_requires_matched_input() {
        let mut handler = orb_bf_handler();
        assert!(matches!(
            handler.draw_match_result(0),
            Err(HandlerError::MissingReferenceImage)
        ));

        handler.set_reference_image(&textured_image(160, 160, 7)).unwrap();
        assert!(matches!(
            handler.draw_match_result(0),
            Err(HandlerError::NothingToDraw)
        ));
    }

    #[test]
    fn test_ratio_accumulates_and_clamps() {
        let mut handler = orb_bf_handler();
        assert_eq!(handler.accept_ratio().get(), 0.5);
        assert_eq!(handler.change_accept_ratio(0.8).get(), 1.0);
        assert_eq!(handler.change_accept_ratio(-2.0).get(), 0.0);
        assert_eq!(handler.change_accept_ratio(0.25).get(), 0.25);
    }

    #[test]
    fn test_match_reflects_latest_input_only() {
        let mut handler = orb_bf_handler();
        handler.set_reference_image(&textured_image(160, 160, 7)).unwrap();

        handler.match_image(&textured_image(160, 160, 99)).unwrap();
        let first = handler.match_counts()[0].2;
        assert!(first > 0, "textured input should produce matches");

        // A featureless second input must fully replace the first result.
        handler.match_image(&flat_image(160, 160)).unwrap();
        let second = handler.match_counts()[0].2;
        assert_eq!(second, 0);
    }

    #[test]
    fn test_zero_ratio_discards_everything() {
        let mut handler = orb_bf_handler();
        handler.set_reference_image(&textured_image(160, 160, 7)).unwrap();
        handler.change_accept_ratio(-1.0);
        handler.match_image(&textured_image(160, 160, 99)).unwrap();
        assert_eq!(handler.match_counts()[0].2, 0);
    }

    #[test]
    fn test_composite_stacks_one_frame_per_pipeline() {
        let mut handler = MatchHandler::new(
            &[FeatureAlgorithm::Orb, FeatureAlgorithm::Brisk],
            &[MatcherAlgorithm::Bf, MatcherAlgorithm::Bf],
        )
        .unwrap();
        handler.set_reference_image(&textured_image(160, 160, 7)).unwrap();
        handler.match_image(&textured_image(160, 160, 99)).unwrap();

        let composite = handler.draw_match_result(0).unwrap();
        // Two side-by-side frames of 160-row images stacked vertically.
        assert_eq!(composite.rows(), 320);
        assert_eq!(composite.cols(), 320);
    }

    #[test]
    fn test_composite_downscales_to_max_height() {
        let mut handler = MatchHandler::new(
            &[FeatureAlgorithm::Orb, FeatureAlgorithm::Brisk],
            &[MatcherAlgorithm::Bf, MatcherAlgorithm::Bf],
        )
        .unwrap();
        handler.set_reference_image(&textured_image(160, 160, 7)).unwrap();
        handler.match_image(&textured_image(160, 160, 99)).unwrap();

        let composite = handler.draw_match_result(100).unwrap();
        assert_eq!(composite.rows(), 100);
        assert!(composite.cols() < 320);
    }

    #[test]
    fn test_flann_binary_descriptor_pipeline() {
        // FLANN over orb requires the LSH index path; the default KD-tree index
        // would reject CV_8U descriptors outright.
        let mut handler =
            MatchHandler::new(&[FeatureAlgorithm::Orb], &[MatcherAlgorithm::Flann]).unwrap();
        handler.set_reference_image(&textured_image(160, 160, 7)).unwrap();
        handler.match_image(&textured_image(160, 160, 99)).unwrap();
        assert!(handler.match_counts()[0].2 > 0);
    }
}
