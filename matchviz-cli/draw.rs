use matchviz_core::FeatureAlgorithm;
use matchviz_detect::Detection;
use opencv::core::{self, DMatch, Mat, Point, Scalar, Size, Vector, CV_8UC3};
use opencv::features2d;
use opencv::imgproc;
use opencv::prelude::*;

/// Render outcome for one pipeline.
///
/// The underlying draw call is known to be flaky for some keypoint/descriptor
/// combinations; a failure is reported per pipeline and the caller decides
/// between placeholder, skip, or abort.
#[derive(Debug)]
pub enum PipelineFrame {
    Rendered {
        algorithm: FeatureAlgorithm,
        frame: Mat,
    },
    Failed {
        algorithm: FeatureAlgorithm,
        reason: opencv::Error,
    },
}

impl PipelineFrame {
    pub fn algorithm(&self) -> FeatureAlgorithm {
        match self {
            PipelineFrame::Rendered { algorithm, .. } => *algorithm,
            PipelineFrame::Failed { algorithm, .. } => *algorithm,
        }
    }
}

/// Side-by-side rendering of one pipeline: input image left, reference image
/// right, matched keypoints connected, algorithm name overlaid top-left.
pub(crate) fn render_single(
    input: &Detection<'_>,
    refer: &Detection<'_>,
    matches: &Vector<DMatch>,
) -> Result<Mat, opencv::Error> {
    let mut frame = Mat::default();
    features2d::draw_matches_def(
        input.image,
        input.keypoints,
        refer.image,
        refer.keypoints,
        matches,
        &mut frame,
    )?;

    imgproc::put_text(
        &mut frame,
        input.algorithm.name(),
        Point::new(10, 30),
        imgproc::FONT_HERSHEY_SIMPLEX,
        1.0,
        Scalar::all(0.0),
        2,
        imgproc::LINE_8,
        false,
    )?;

    Ok(frame)
}

/// Black frame with the same side-by-side geometry `render_single` would have
/// produced, standing in for a failed pipeline so the composite keeps one slot
/// per pipeline.
pub(crate) fn placeholder(
    input: &Detection<'_>,
    refer: &Detection<'_>,
) -> Result<Mat, opencv::Error> {
    let rows = input.image.rows().max(refer.image.rows());
    let cols = input.image.cols() + refer.image.cols();
    Mat::new_rows_cols_with_default(rows, cols, CV_8UC3, Scalar::all(0.0))
}

/// Stack per-pipeline frames vertically; downscale the composite (preserving
/// aspect ratio) when `max_height > 0` and the stacked height exceeds it.
pub(crate) fn stack(frames: Vec<Mat>, max_height: i32) -> Result<Mat, opencv::Error> {
    let mats: Vector<Mat> = Vector::from_iter(frames);
    let mut composite = Mat::default();
    core::vconcat(&mats, &mut composite)?;

    if max_height > 0 && composite.rows() > max_height {
        let scale = max_height as f64 / composite.rows() as f64;
        let size = Size::new((composite.cols() as f64 * scale).round() as i32, max_height);
        let mut resized = Mat::default();
        imgproc::resize(&composite, &mut resized, size, 0.0, 0.0, imgproc::INTER_AREA)?;
        composite = resized;
    }

    Ok(composite)
}
