use matchviz_core::FeatureAlgorithm;

#[derive(Debug)]
pub enum DetectError {
    /// The algorithm is recognized but not compiled into this build.
    UnsupportedAlgorithm(FeatureAlgorithm),
    EmptyImage,
    OpenCv(opencv::Error),
}

impl std::fmt::Display for DetectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetectError::UnsupportedAlgorithm(alg) => {
                write!(f, "Feature algorithm '{}' is not available in this build (requires the `surf` feature and an OpenCV build with contrib modules)", alg)
            }
            DetectError::EmptyImage => {
                write!(f, "Cannot detect features on an empty image")
            }
            DetectError::OpenCv(e) => {
                write!(f, "OpenCV error: {}", e)
            }
        }
    }
}

impl std::error::Error for DetectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DetectError::OpenCv(e) => Some(e),
            _ => None,
        }
    }
}

impl From<opencv::Error> for DetectError {
    fn from(err: opencv::Error) -> Self {
        DetectError::OpenCv(err)
    }
}

pub type DetectResult<T> = Result<T, DetectError>;
