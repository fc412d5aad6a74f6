use matchviz_core::{AcceptRatio, FeatureAlgorithm, MatcherAlgorithm};
use opencv::core::{DMatch, Mat, Ptr, Vector, NORM_HAMMING, NORM_L2};
use opencv::features2d::{BFMatcher, DescriptorMatcher, FlannBasedMatcher};
use opencv::flann::{IndexParams, LshIndexParams, SearchParams};
use opencv::prelude::*;

#[derive(Debug)]
pub enum MatchError {
    OpenCv(opencv::Error),
}

impl std::fmt::Display for MatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchError::OpenCv(e) => write!(f, "OpenCV error: {}", e),
        }
    }
}

impl std::error::Error for MatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MatchError::OpenCv(e) => Some(e),
        }
    }
}

impl From<opencv::Error> for MatchError {
    fn from(err: opencv::Error) -> Self {
        MatchError::OpenCv(err)
    }
}

pub type MatchResult<T> = Result<T, MatchError>;

// LSH parameters for FLANN over binary descriptors (hash tables, key bits,
// multi-probe level).
const LSH_TABLE_NUMBER: i32 = 12;
const LSH_KEY_SIZE: i32 = 20;
const LSH_MULTI_PROBE_LEVEL: i32 = 2;

/// Wraps one OpenCV descriptor matcher together with its last filtered match list.
pub struct Matcher {
    algorithm: MatcherAlgorithm,
    matcher: Ptr<DescriptorMatcher>,
    matches: Vector<DMatch>,
}

impl Matcher {
    /// Bind the concrete matching strategy for `algorithm`.
    ///
    /// The descriptor algorithm selects the distance metric: Hamming for binary
    /// descriptors (orb, brisk), L2 otherwise. FLANN additionally needs an LSH
    /// index for binary descriptors; its default KD-tree index only handles
    /// float descriptors.
    pub fn create(algorithm: MatcherAlgorithm, descriptor: FeatureAlgorithm) -> MatchResult<Self> {
        let matcher: Ptr<DescriptorMatcher> = match algorithm {
            MatcherAlgorithm::Bf => {
                let norm = if descriptor.binary_descriptor() {
                    NORM_HAMMING
                } else {
                    NORM_L2
                };
                BFMatcher::create(norm, false)?.into()
            }
            MatcherAlgorithm::Flann => {
                if descriptor.binary_descriptor() {
                    let index_params: Ptr<IndexParams> = Ptr::new(
                        LshIndexParams::new(LSH_TABLE_NUMBER, LSH_KEY_SIZE, LSH_MULTI_PROBE_LEVEL)?
                            .into(),
                    );
                    let search_params: Ptr<SearchParams> = Ptr::new(SearchParams::new_def()?);
                    Ptr::new(FlannBasedMatcher::new(&index_params, &search_params)?).into()
                } else {
                    FlannBasedMatcher::create()?.into()
                }
            }
        };

        Ok(Self {
            algorithm,
            matcher,
            matches: Vector::new(),
        })
    }

    /// Match input descriptors (query side) against reference descriptors (train
    /// side): one nearest reference match per input descriptor, sorted by ascending
    /// distance and truncated to the leading `ratio` fraction. Replaces the stored
    /// match list.
    pub fn match_descriptors(
        &mut self,
        reference: &Mat,
        input: &Mat,
        ratio: AcceptRatio,
    ) -> MatchResult<&Vector<DMatch>> {
        let mut raw = Vector::<DMatch>::new();
        if !reference.empty() && !input.empty() {
            self.matcher
                .train_match(input, reference, &mut raw, &Mat::default())?;
        }
        self.matches = keep_best(raw, ratio);
        Ok(&self.matches)
    }

    /// The last filtered match list; `query_idx` indexes the input image's
    /// keypoints, `train_idx` the reference image's.
    pub fn matches(&self) -> &Vector<DMatch> {
        &self.matches
    }

    pub fn algorithm(&self) -> MatcherAlgorithm {
        self.algorithm
    }
}

/// Sort matches by ascending distance and keep the best `floor(len * ratio)`.
///
/// A plain distance cut, not a geometric consistency check: with ratio 0.5 and
/// 100 raw matches, exactly the 50 lowest-distance matches survive.
pub fn keep_best(raw: Vector<DMatch>, ratio: AcceptRatio) -> Vector<DMatch> {
    let mut sorted = raw.to_vec();
    sorted.sort_by(|a, b| {
        a.distance
            .partial_cmp(&b.distance)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let keep = (sorted.len() as f32 * ratio.get()) as usize;
    sorted.truncate(keep);
    Vector::from_iter(sorted)
}
