//! Port for the external conversion tool (Calibre's `ebook-convert`).

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use async_trait::async_trait;

use crate::Result;

#[derive(Clone, Debug)]
pub struct CalibreConfig {
    pub ebook_convert_path: PathBuf,
    /// `None` means no timeout; Calibre conversions can be slow.
    pub timeout: Option<Duration>,
}

/// A concrete tool invocation: `program input output extra_args...`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CalibreInvocation {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl CalibreInvocation {
    pub fn build(cfg: &CalibreConfig, input: &Path, output: &Path, extra_args: &[String]) -> Self {
        let mut args = vec![
            input.display().to_string(),
            output.display().to_string(),
        ];
        args.extend(extra_args.iter().cloned());
        Self {
            program: cfg.ebook_convert_path.clone(),
            args,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

/// External conversion tool.
///
/// Implementations must return `Error::ConversionFailed` for a non-zero exit,
/// a missing program or a timeout.
#[async_trait]
pub trait ConversionTool: Send + Sync {
    async fn run(&self, input: &Path, output: &Path, extra_args: &[String]) -> Result<ToolOutput>;
}
