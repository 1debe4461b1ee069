//! `proofly bridge` — the JSON message surface as newline-delimited JSON.
//!
//! Each stdin line is one request object; each response is written as one
//! line to stdout, in order. Blank lines are skipped. Logs go to stderr.

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::info;

use proofly_service::{handle_line, Proofreader};

/// Serve stdin/stdout until EOF.
pub async fn run(service: &Proofreader) -> Result<()> {
    info!("bridge started");
    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();
    let served = serve(service, stdin, stdout).await?;
    info!(requests = served, "bridge stopped");
    Ok(())
}

/// Answer every line from `reader` on `writer`. Returns the request count.
async fn serve<R, W>(service: &Proofreader, reader: R, mut writer: W) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    let mut served = 0;

    while let Some(line) = lines.next_line().await.context("failed to read request")? {
        if line.trim().is_empty() {
            continue;
        }
        let response = handle_line(service, &line).await;
        writer
            .write_all(response.as_bytes())
            .await
            .context("failed to write response")?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
        served += 1;
    }

    Ok(served)
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
