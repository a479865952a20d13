use squaremark_core::ImageError;

/// Errors that abort a whole frame.
///
/// Per-candidate failures are not errors; they only show up in
/// [`crate::FrameDebug`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DetectError {
    #[error(transparent)]
    Image(#[from] ImageError),
    #[error(
        "frame size changed from {}x{} to {}x{}",
        .expected.0, .expected.1, .got.0, .got.1
    )]
    FrameSizeMismatch {
        expected: (usize, usize),
        got: (usize, usize),
    },
}
