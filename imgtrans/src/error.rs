use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum MatrixError {
    #[error("invalid matrix shape {rows}x{cols}")]
    InvalidShape { rows: usize, cols: usize },

    #[error("matrix is not square ({rows}x{cols})")]
    NotSquare { rows: usize, cols: usize },

    #[error("expected a {}x{} matrix, found {}x{}", expected.0, expected.1, found.0, found.1)]
    ShapeMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("matrix is singular: no usable pivot in column {column}")]
    Singular { column: usize },
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TransformError {
    #[error("source points are linearly dependent")]
    Degenerate,

    #[error(transparent)]
    Matrix(#[from] MatrixError),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ImageError {
    #[error("invalid image layout: {0}")]
    InvalidLayout(String),

    #[error("size mismatch: {0}")]
    SizeMismatch(String),

    #[error("operation not implemented for {0} channels")]
    UnsupportedChannels(usize),

    #[error("source image {src_w}x{src_h} is too small for a {dst_w}x{dst_h} half-size output")]
    SourceTooSmall {
        src_w: usize,
        src_h: usize,
        dst_w: usize,
        dst_h: usize,
    },

    #[error(transparent)]
    Transform(#[from] TransformError),
}

impl From<MatrixError> for ImageError {
    fn from(err: MatrixError) -> Self {
        ImageError::Transform(TransformError::Matrix(err))
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("config error: {0}")]
    Config(String),

    #[error("step {index} ({step}): {source}")]
    Step {
        index: usize,
        step: &'static str,
        #[source]
        source: ImageError,
    },
}
