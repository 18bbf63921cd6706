use enough::StopReason;
use std::fmt;

use crate::writer::Phase;

/// Which part of the encode a failure happened in.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    /// Profile and compression setup before `init`.
    Configure,
    /// Validation and header emission inside `init`.
    Header,
    /// Scanline writes.
    Rows,
    /// Trailing records written by `close`.
    Finalize,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Configure => "configure",
            Stage::Header => "header",
            Stage::Rows => "row write",
            Stage::Finalize => "finalize",
        })
    }
}

/// Errors from PNG writing.
///
/// Any error returned by a [`crate::PngWriter`] operation ends the session:
/// the writer can still be dropped safely, but further writes are rejected.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum PngWriteError {
    #[error("resolution is invalid: {horizontal_dpi} x {vertical_dpi} dpi")]
    InvalidResolution {
        horizontal_dpi: f64,
        vertical_dpi: f64,
    },

    #[error("resolution does not fit the pHYs chunk: {horizontal_dpi} x {vertical_dpi} dpi")]
    ResolutionOutOfRange {
        horizontal_dpi: f64,
        vertical_dpi: f64,
    },

    #[error("invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("dimensions too large: {width}x{height}")]
    DimensionsTooLarge { width: u32, height: u32 },

    #[error("invalid ICC profile: {0}")]
    InvalidProfile(String),

    #[error("a color profile is already configured")]
    ProfileAlreadySet,

    #[error("{operation} is not allowed in phase {phase:?}")]
    InvalidPhase {
        operation: &'static str,
        phase: Phase,
    },

    #[error("row length mismatch: expected {expected} bytes, got {actual}")]
    RowLengthMismatch { expected: usize, actual: usize },

    #[error("buffer too small: need {needed} bytes, got {actual}")]
    BufferTooSmall { needed: usize, actual: usize },

    #[error("image has only {height} rows")]
    TooManyRows { height: u32 },

    #[error("image incomplete: {written} of {expected} rows written")]
    MissingRows { written: u32, expected: u32 },

    #[error("png engine error during {stage}: {source}")]
    Engine {
        stage: Stage,
        #[source]
        source: png::EncodingError,
    },

    #[error("i/o error during {stage}: {source}")]
    Io {
        stage: Stage,
        #[source]
        source: std::io::Error,
    },

    #[error("png engine fault during {stage}: {message}")]
    EngineFault { stage: Stage, message: String },

    #[error("operation cancelled")]
    Cancelled(StopReason),
}

impl PngWriteError {
    /// The stage an engine-side failure happened in, if any.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Engine { stage, .. } | Self::Io { stage, .. } | Self::EngineFault { stage, .. } => {
                Some(*stage)
            }
            _ => None,
        }
    }

    pub(crate) fn engine(stage: Stage) -> impl Fn(png::EncodingError) -> Self {
        move |source| Self::Engine { stage, source }
    }

    pub(crate) fn io(stage: Stage) -> impl Fn(std::io::Error) -> Self {
        move |source| Self::Io { stage, source }
    }
}

impl From<StopReason> for PngWriteError {
    fn from(r: StopReason) -> Self {
        PngWriteError::Cancelled(r)
    }
}
