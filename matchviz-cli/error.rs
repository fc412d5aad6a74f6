use matchviz_core::{ConfigError, ParseAlgorithmError};
use matchviz_detect::DetectError;
use matchviz_match::MatchError;

#[derive(Debug)]
pub enum HandlerError {
    PipelineCountMismatch { features: usize, matchers: usize },
    NoPipelines,
    MissingReferenceImage,
    NothingToDraw,
    Parse(ParseAlgorithmError),
    Config(ConfigError),
    Detect(DetectError),
    Match(MatchError),
    OpenCv(opencv::Error),
}

impl std::fmt::Display for HandlerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HandlerError::PipelineCountMismatch { features, matchers } => {
                write!(f, "Feature and matcher lists must have equal length: {} features, {} matchers", features, matchers)
            }
            HandlerError::NoPipelines => {
                write!(f, "At least one (feature, matcher) pipeline is required")
            }
            HandlerError::MissingReferenceImage => {
                write!(f, "No reference image set; call set_reference_image first")
            }
            HandlerError::NothingToDraw => {
                write!(f, "No input image matched yet; call match_image first")
            }
            HandlerError::Parse(e) => write!(f, "{}", e),
            HandlerError::Config(e) => write!(f, "{}", e),
            HandlerError::Detect(e) => write!(f, "Detection error: {}", e),
            HandlerError::Match(e) => write!(f, "Matching error: {}", e),
            HandlerError::OpenCv(e) => write!(f, "OpenCV error: {}", e),
        }
    }
}

impl std::error::Error for HandlerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HandlerError::Parse(e) => Some(e),
            HandlerError::Config(e) => Some(e),
            HandlerError::Detect(e) => Some(e),
            HandlerError::Match(e) => Some(e),
            HandlerError::OpenCv(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ParseAlgorithmError> for HandlerError {
    fn from(err: ParseAlgorithmError) -> Self {
        HandlerError::Parse(err)
    }
}

impl From<ConfigError> for HandlerError {
    fn from(err: ConfigError) -> Self {
        HandlerError::Config(err)
    }
}

impl From<DetectError> for HandlerError {
    fn from(err: DetectError) -> Self {
        HandlerError::Detect(err)
    }
}

impl From<MatchError> for HandlerError {
    fn from(err: MatchError) -> Self {
        HandlerError::Match(err)
    }
}

impl From<opencv::Error> for HandlerError {
    fn from(err: opencv::Error) -> Self {
        HandlerError::OpenCv(err)
    }
}

pub type HandlerResult<T> = Result<T, HandlerError>;
