use thiserror::Error;

/// Errors that end a [`LogStreamer`](crate::LogStreamer) run
///
/// Failures scoped to a single pod or namespace are logged by the task that
/// hit them and never surface here.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum StreamError {
    /// Writing to the console failed (for example a closed pipe)
    #[error("failed to write log output: {0}")]
    Output(#[from] std::io::Error),
}
