//! Calibre adapter.
//!
//! Runs `ebook-convert input output [flags...]` as a child process.

use std::{collections::VecDeque, path::Path, process::Stdio};

use async_trait::async_trait;

use b2k_core::{
    errors::Error,
    tool::{CalibreConfig, CalibreInvocation, ConversionTool, ToolOutput},
    utils::truncate_text,
    Result,
};

use tokio::{io::AsyncReadExt, process::Command};
use tracing::{debug, info};

const STDERR_TAIL_MAX_BYTES: usize = 16 * 1024;
const STDERR_TAIL_MAX_LINES: usize = 200;
const STDOUT_PREVIEW_CHARS: usize = 500;

#[derive(Clone, Debug)]
pub struct CalibreTool {
    cfg: CalibreConfig,
}

#[derive(Clone, Debug, Default)]
struct StderrTail {
    lines: VecDeque<String>,
    bytes: usize,
}

impl StderrTail {
    fn from_output(raw: &str) -> Self {
        let mut tail = Self::default();
        for line in raw.lines() {
            tail.push_line(line.to_string());
        }
        tail
    }

    fn push_line(&mut self, line: String) {
        // +1 for the '\n' we join with later.
        self.bytes = self.bytes.saturating_add(line.len() + 1);
        self.lines.push_back(line);

        while self.lines.len() > STDERR_TAIL_MAX_LINES || self.bytes > STDERR_TAIL_MAX_BYTES {
            if let Some(front) = self.lines.pop_front() {
                self.bytes = self.bytes.saturating_sub(front.len() + 1);
            } else {
                break;
            }
        }
    }

    fn snapshot(&self) -> String {
        self.lines.iter().cloned().collect::<Vec<_>>().join("\n")
    }
}

impl CalibreTool {
    pub fn new(cfg: CalibreConfig) -> Self {
        Self { cfg }
    }

    async fn run_to_completion(&self, inv: &CalibreInvocation) -> Result<ToolOutput> {
        let mut child = Command::new(&inv.program)
            .args(&inv.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // A timed-out run drops the future; make sure the process goes with it.
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                Error::ConversionFailed(format!(
                    "failed to start {}: {e}",
                    inv.program.display()
                ))
            })?;

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::ConversionFailed("stdout was not captured".to_string()))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| Error::ConversionFailed("stderr was not captured".to_string()))?;

        // Drain both pipes while waiting so a chatty tool never blocks on a full pipe.
        let mut out = Vec::new();
        let mut err = Vec::new();
        let (status, read_out, read_err) = tokio::join!(
            child.wait(),
            stdout.read_to_end(&mut out),
            stderr.read_to_end(&mut err)
        );
        let status = status?;
        read_out?;
        read_err?;

        let output = ToolOutput {
            stdout: String::from_utf8_lossy(&out).to_string(),
            stderr: String::from_utf8_lossy(&err).to_string(),
        };

        if !status.success() {
            let tail = StderrTail::from_output(&output.stderr).snapshot();
            let mut msg = format!("ebook-convert exited with status {status}");
            if !tail.trim().is_empty() {
                msg.push_str("\nstderr (tail):\n");
                msg.push_str(&tail);
            }
            return Err(Error::ConversionFailed(msg));
        }

        debug!(stdout = %truncate_text(&output.stdout, STDOUT_PREVIEW_CHARS), "ebook-convert output");
        Ok(output)
    }
}

#[async_trait]
impl ConversionTool for CalibreTool {
    async fn run(&self, input: &Path, output: &Path, extra_args: &[String]) -> Result<ToolOutput> {
        let inv = CalibreInvocation::build(&self.cfg, input, output, extra_args);
        info!(program = %inv.program.display(), args = ?inv.args, "running ebook-convert");

        let res = match self.cfg.timeout {
            Some(limit) => tokio::time::timeout(limit, self.run_to_completion(&inv))
                .await
                .map_err(|_| {
                    Error::ConversionFailed(format!("ebook-convert timed out after {limit:?}"))
                })?,
            None => self.run_to_completion(&inv).await,
        };

        res.map_err(|e| match e {
            Error::ConversionFailed(_) => e,
            other => Error::ConversionFailed(other.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{path::PathBuf, time::Duration};

    fn tool(program: &str, timeout: Option<Duration>) -> CalibreTool {
        CalibreTool::new(CalibreConfig {
            ebook_convert_path: PathBuf::from(program),
            timeout,
        })
    }

    #[test]
    fn stderr_tail_keeps_the_last_lines() {
        let raw = (0..STDERR_TAIL_MAX_LINES + 10)
            .map(|i| format!("line {i}"))
            .collect::<Vec<_>>()
            .join("\n");
        let tail = StderrTail::from_output(&raw);
        assert_eq!(tail.lines.len(), STDERR_TAIL_MAX_LINES);
        assert!(tail.snapshot().ends_with(&format!("line {}", STDERR_TAIL_MAX_LINES + 9)));
        assert!(!tail.snapshot().contains("line 9\n"));
    }

    #[tokio::test]
    async fn missing_program_is_conversion_failed() {
        let t = tool("/nonexistent/ebook-convert", None);
        let err = t
            .run(Path::new("/tmp/a.epub"), Path::new("/tmp/a.mobi"), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ConversionFailed(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_is_conversion_failed() {
        let t = tool("false", None);
        let err = t
            .run(Path::new("/tmp/a.epub"), Path::new("/tmp/a.mobi"), &[])
            .await
            .unwrap_err();
        match err {
            Error::ConversionFailed(msg) => assert!(msg.contains("exited with status")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn zero_exit_succeeds() {
        let t = tool("true", Some(Duration::from_secs(10)));
        t.run(
            Path::new("/tmp/a.epub"),
            Path::new("/tmp/a.mobi"),
            &["--mobi-file-type".to_string(), "old".to_string()],
        )
        .await
        .unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn timeout_is_conversion_failed() {
        // The input/output slots become `sh -c "sleep 5"`.
        let t = tool("sh", Some(Duration::from_millis(100)));
        let err = t
            .run(Path::new("-c"), Path::new("sleep 5"), &[])
            .await
            .unwrap_err();
        match err {
            Error::ConversionFailed(msg) => assert!(msg.contains("timed out")),
            other => panic!("unexpected error: {other}"),
        }
    }
}
