//! Replay of newline-delimited JSON measurement files
//!
//! Each non-blank line is one payload in any shape accepted by
//! [`crate::telemetry::decode_payload`]. Lines that fail to decode are logged
//! and skipped.

use std::path::{Path, PathBuf};

use futures::stream::{self, StreamExt};
use tokio::io::{AsyncBufReadExt, BufReader, Lines};

use super::MeasurementStream;
use crate::telemetry::decode_payload;

struct ReplayState {
    path: PathBuf,
    lines: Lines<BufReader<tokio::fs::File>>,
    line_no: usize,
}

/// Open a replay file as a measurement stream
pub async fn replay_file(path: impl AsRef<Path>) -> std::io::Result<MeasurementStream> {
    let path = path.as_ref().to_path_buf();
    let file = tokio::fs::File::open(&path).await?;
    tracing::info!(path = %path.display(), "Replaying measurements");

    let state = ReplayState {
        path,
        lines: BufReader::new(file).lines(),
        line_no: 0,
    };

    let batches = stream::unfold(state, |mut state| async move {
        loop {
            let line = match state.lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => return None,
                Err(e) => {
                    tracing::error!(
                        path = %state.path.display(),
                        error = %e,
                        "Replay read failed"
                    );
                    return None;
                }
            };
            state.line_no += 1;

            if line.trim().is_empty() {
                continue;
            }

            match decode_payload(line.as_bytes()) {
                Ok(measurements) => return Some((measurements, state)),
                Err(e) => {
                    tracing::warn!(
                        path = %state.path.display(),
                        line = state.line_no,
                        error = %e,
                        "Skipping undecodable replay line"
                    );
                }
            }
        }
    });

    Ok(batches.flat_map(stream::iter).boxed())
}
