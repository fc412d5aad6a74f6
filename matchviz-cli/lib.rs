mod draw;
mod error;
mod handler;

pub use draw::PipelineFrame;
pub use error::{HandlerError, HandlerResult};
pub use handler::MatchHandler;

pub use matchviz_core::{
    AcceptRatio, ConfigError, FeatureAlgorithm, MatchConfig, MatcherAlgorithm,
    ParseAlgorithmError,
};
pub use matchviz_detect::{Detection, DetectError, Detector};
pub use matchviz_match::{keep_best, MatchError, Matcher};
