use std::io::Write;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use ktail_types::LogLine;

use crate::error::StreamError;

/// Drain the shared line queue to `out` in arrival order
///
/// Each line is written as `[namespace/name] text` and flushed immediately.
/// Returns the number of lines written once `cancel` fires or every producer
/// has dropped its sender. Cancellation is checked before every line, so
/// nothing is printed after it fires.
pub async fn print_lines<W: Write>(
    mut lines: mpsc::Receiver<LogLine>,
    cancel: CancellationToken,
    mut out: W,
) -> Result<u64, StreamError> {
    let mut printed = 0;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,

            next = lines.recv() => {
                let Some(line) = next else { break };
                writeln!(out, "{}", line.render())?;
                out.flush()?;
                printed += 1;
            }
        }
    }

    Ok(printed)
}
