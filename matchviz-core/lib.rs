use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Keypoint detector / descriptor algorithm, one per supported OpenCV Feature2D.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum FeatureAlgorithm {
    Sift,
    Surf,
    Orb,
    Kaze,
    Brisk,
}

impl FeatureAlgorithm {
    pub const ALL: [FeatureAlgorithm; 5] = [
        FeatureAlgorithm::Sift,
        FeatureAlgorithm::Surf,
        FeatureAlgorithm::Orb,
        FeatureAlgorithm::Kaze,
        FeatureAlgorithm::Brisk,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FeatureAlgorithm::Sift => "sift",
            FeatureAlgorithm::Surf => "surf",
            FeatureAlgorithm::Orb => "orb",
            FeatureAlgorithm::Kaze => "kaze",
            FeatureAlgorithm::Brisk => "brisk",
        }
    }

    /// True for algorithms producing binary (bit-string) descriptors, which are
    /// compared with the Hamming metric rather than an L2-family norm.
    pub fn binary_descriptor(self) -> bool {
        matches!(self, FeatureAlgorithm::Orb | FeatureAlgorithm::Brisk)
    }
}

impl fmt::Display for FeatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FeatureAlgorithm {
    type Err = ParseAlgorithmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sift" => Ok(FeatureAlgorithm::Sift),
            "surf" => Ok(FeatureAlgorithm::Surf),
            "orb" => Ok(FeatureAlgorithm::Orb),
            "kaze" => Ok(FeatureAlgorithm::Kaze),
            "brisk" => Ok(FeatureAlgorithm::Brisk),
            _ => Err(ParseAlgorithmError::UnknownFeature(s.to_string())),
        }
    }
}

/// Descriptor matching strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum MatcherAlgorithm {
    /// Approximate nearest-neighbor search (FLANN index).
    Flann,
    /// Exhaustive brute-force search.
    Bf,
}

impl MatcherAlgorithm {
    pub const ALL: [MatcherAlgorithm; 2] = [MatcherAlgorithm::Flann, MatcherAlgorithm::Bf];

    pub fn name(self) -> &'static str {
        match self {
            MatcherAlgorithm::Flann => "flann",
            MatcherAlgorithm::Bf => "bf",
        }
    }
}

impl fmt::Display for MatcherAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MatcherAlgorithm {
    type Err = ParseAlgorithmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "flann" => Ok(MatcherAlgorithm::Flann),
            "bf" => Ok(MatcherAlgorithm::Bf),
            _ => Err(ParseAlgorithmError::UnknownMatcher(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseAlgorithmError {
    UnknownFeature(String),
    UnknownMatcher(String),
}

impl fmt::Display for ParseAlgorithmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseAlgorithmError::UnknownFeature(name) => {
                write!(f, "Unknown feature algorithm '{}' (expected one of: sift, surf, orb, kaze, brisk)", name)
            }
            ParseAlgorithmError::UnknownMatcher(name) => {
                write!(f, "Unknown matcher algorithm '{}' (expected one of: flann, bf)", name)
            }
        }
    }
}

impl std::error::Error for ParseAlgorithmError {}

/// Fraction of best (lowest-distance) matches retained after sorting.
///
/// Always clamped to `[0, 1]`; construction and arithmetic cannot produce a value
/// outside that range.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct AcceptRatio(f32);

impl AcceptRatio {
    pub const MIN: AcceptRatio = AcceptRatio(0.0);
    pub const MAX: AcceptRatio = AcceptRatio(1.0);

    pub fn new(value: f32) -> Self {
        AcceptRatio(value.clamp(0.0, 1.0))
    }

    /// Add `delta` and clamp back into `[0, 1]`.
    pub fn adjust(self, delta: f32) -> Self {
        AcceptRatio::new(self.0 + delta)
    }

    pub fn get(self) -> f32 {
        self.0
    }
}

impl Default for AcceptRatio {
    fn default() -> Self {
        AcceptRatio(0.5)
    }
}

impl fmt::Display for AcceptRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// Complete matching-session configuration: one (feature, matcher) pair per
/// pipeline, positionally paired, plus the initial acceptance ratio.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MatchConfig {
    pub features: Vec<FeatureAlgorithm>,
    pub matchers: Vec<MatcherAlgorithm>,
    pub accept_ratio: f32,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            features: vec![FeatureAlgorithm::Orb],
            matchers: vec![MatcherAlgorithm::Bf],
            accept_ratio: 0.5,
        }
    }
}

impl MatchConfig {
    pub fn new(features: Vec<FeatureAlgorithm>, matchers: Vec<MatcherAlgorithm>) -> Self {
        Self {
            features,
            matchers,
            accept_ratio: AcceptRatio::default().get(),
        }
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.features.len() != self.matchers.len() {
            return Err(ConfigError::PipelineCountMismatch {
                features: self.features.len(),
                matchers: self.matchers.len(),
            });
        }
        if !(0.0..=1.0).contains(&self.accept_ratio) {
            return Err(ConfigError::RatioOutOfRange(self.accept_ratio));
        }
        Ok(())
    }

    /// Save configuration to JSON file
    #[cfg(feature = "serde")]
    pub fn save_json<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load configuration from JSON file
    #[cfg(feature = "serde")]
    pub fn load_json<P: AsRef<std::path::Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Save configuration to TOML file
    #[cfg(feature = "serde")]
    pub fn save_toml<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let toml = toml::to_string_pretty(self)?;
        std::fs::write(path, toml)?;
        Ok(())
    }

    /// Load configuration from TOML file
    #[cfg(feature = "serde")]
    pub fn load_toml<P: AsRef<std::path::Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Serialize to JSON string
    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize from JSON string
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to TOML string
    #[cfg(feature = "serde")]
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Deserialize from TOML string
    #[cfg(feature = "serde")]
    pub fn from_toml(toml_str: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    PipelineCountMismatch { features: usize, matchers: usize },
    RatioOutOfRange(f32),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::PipelineCountMismatch { features, matchers } => {
                write!(f, "Feature and matcher lists must have equal length: {} features, {} matchers", features, matchers)
            }
            ConfigError::RatioOutOfRange(r) => {
                write!(f, "Accept ratio {} out of range (must be within [0, 1])", r)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_every_feature_name_round_trips() {
        for alg in FeatureAlgorithm::ALL {
            assert_eq!(alg.name().parse::<FeatureAlgorithm>().unwrap(), alg);
        }
        for alg in MatcherAlgorithm::ALL {
            assert_eq!(alg.name().parse::<MatcherAlgorithm>().unwrap(), alg);
        }
    }

    #[test]
    fn test_unknown_names_rejected() {
        assert!(matches!(
            "akaze".parse::<FeatureAlgorithm>(),
            Err(ParseAlgorithmError::UnknownFeature(_))
        ));
        assert!(matches!(
            "SIFT".parse::<FeatureAlgorithm>(),
            Err(ParseAlgorithmError::UnknownFeature(_))
        ));
        assert!(matches!(
            "knn".parse::<MatcherAlgorithm>(),
            Err(ParseAlgorithmError::UnknownMatcher(_))
        ));
        assert!(matches!(
            "".parse::<MatcherAlgorithm>(),
            Err(ParseAlgorithmError::UnknownMatcher(_))
        ));
    }

    #[test]
    fn test_binary_descriptor_split() {
        assert!(FeatureAlgorithm::Orb.binary_descriptor());
        assert!(FeatureAlgorithm::Brisk.binary_descriptor());
        assert!(!FeatureAlgorithm::Sift.binary_descriptor());
        assert!(!FeatureAlgorithm::Surf.binary_descriptor());
        assert!(!FeatureAlgorithm::Kaze.binary_descriptor());
    }

    #[test]
    fn test_ratio_adjust_clamps_high() {
        let ratio = AcceptRatio::default().adjust(0.8);
        assert_eq!(ratio.get(), 1.0);
    }

    #[test]
    fn test_ratio_adjust_clamps_low() {
        let ratio = AcceptRatio::default().adjust(-2.0);
        assert_eq!(ratio.get(), 0.0);
    }

    #[test]
    fn test_ratio_new_clamps() {
        assert_eq!(AcceptRatio::new(1.3).get(), 1.0);
        assert_eq!(AcceptRatio::new(-0.1).get(), 0.0);
        assert_eq!(AcceptRatio::new(0.25).get(), 0.25);
    }

    #[test]
    fn test_config_validate_mismatched_lengths() {
        let config = MatchConfig {
            features: vec![
                FeatureAlgorithm::Sift,
                FeatureAlgorithm::Orb,
                FeatureAlgorithm::Kaze,
            ],
            matchers: vec![MatcherAlgorithm::Flann, MatcherAlgorithm::Bf],
            accept_ratio: 0.5,
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::PipelineCountMismatch { features: 3, matchers: 2 })
        ));
    }

    #[test]
    fn test_config_validate_ratio_range() {
        let mut config = MatchConfig::default();
        config.accept_ratio = 1.5;
        assert!(matches!(config.validate(), Err(ConfigError::RatioOutOfRange(_))));
        config.accept_ratio = 0.0;
        assert!(config.validate().is_ok());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_config_toml_round_trip() {
        let config = MatchConfig {
            features: vec![FeatureAlgorithm::Sift, FeatureAlgorithm::Orb],
            matchers: vec![MatcherAlgorithm::Flann, MatcherAlgorithm::Bf],
            accept_ratio: 0.4,
        };
        let toml = config.to_toml().unwrap();
        assert!(toml.contains("sift"));
        let parsed = MatchConfig::from_toml(&toml).unwrap();
        assert_eq!(parsed.features, config.features);
        assert_eq!(parsed.matchers, config.matchers);
        assert!((parsed.accept_ratio - 0.4).abs() < 1e-6);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_config_json_rejects_invalid() {
        // Parses, but validation must catch the mismatched lists.
        let json = r#"{"features":["sift","orb"],"matchers":["bf"],"accept_ratio":0.5}"#;
        assert!(MatchConfig::from_json(json).is_err());
    }

    proptest! {
        #[test]
        fn prop_ratio_always_in_range(start in -10.0f32..10.0, delta in -10.0f32..10.0) {
            let ratio = AcceptRatio::new(start).adjust(delta);
            prop_assert!((0.0..=1.0).contains(&ratio.get()));
        }

        #[test]
        fn prop_adjust_zero_is_identity(start in 0.0f32..=1.0) {
            let ratio = AcceptRatio::new(start);
            prop_assert_eq!(ratio.adjust(0.0), ratio);
        }
    }
}
