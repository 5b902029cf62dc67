//! Converters: one per target format, backed by the external conversion tool.

use std::{path::PathBuf, sync::Arc};

use async_trait::async_trait;

use crate::{
    book::{Book, BookFormat},
    errors::Error,
    tool::ConversionTool,
    Result,
};

/// Produces a book in one target format.
#[async_trait]
pub trait BookConverter: Send + Sync {
    /// Target format; also the key the registry resolves this converter by.
    fn format(&self) -> &BookFormat;

    /// Where a real conversion writes its output: the source path with the
    /// target extension substituted.
    fn output_path(&self, source: &Book) -> PathBuf {
        source
            .path
            .with_extension(self.format().extension().trim_start_matches('.'))
    }

    /// Convert `source`. A source already in the target format is returned
    /// unchanged without touching the tool.
    async fn convert(&self, source: &Book) -> Result<Book>;
}

/// Converter that shells out to the conversion tool with format-specific flags.
pub struct ToolConverter {
    format: BookFormat,
    extra_args: Vec<String>,
    tool: Arc<dyn ConversionTool>,
}

impl ToolConverter {
    pub fn new(format: BookFormat, extra_args: Vec<String>, tool: Arc<dyn ConversionTool>) -> Self {
        Self {
            format,
            extra_args,
            tool,
        }
    }

    /// Kindle MOBI; the old file type keeps older devices happy.
    pub fn mobi(tool: Arc<dyn ConversionTool>) -> Self {
        Self::new(
            BookFormat::mobi(),
            vec!["--mobi-file-type".to_string(), "old".to_string()],
            tool,
        )
    }

    pub fn azw3(tool: Arc<dyn ConversionTool>) -> Self {
        Self::new(BookFormat::azw3(), Vec::new(), tool)
    }
}

#[async_trait]
impl BookConverter for ToolConverter {
    fn format(&self) -> &BookFormat {
        &self.format
    }

    async fn convert(&self, source: &Book) -> Result<Book> {
        if source.format == self.format {
            return Ok(source.clone());
        }

        let output = self.output_path(source);
        self.tool
            .run(&source.path, &output, &self.extra_args)
            .await
            .map_err(|e| match e {
                Error::ConversionFailed(_) => e,
                other => Error::ConversionFailed(other.to_string()),
            })?;

        let md = tokio::fs::metadata(&output).await.map_err(|e| {
            Error::ConversionFailed(format!("no output at {}: {e}", output.display()))
        })?;
        if !md.is_file() {
            return Err(Error::ConversionFailed(format!(
                "output {} is not a file",
                output.display()
            )));
        }

        Ok(Book::new(source.title.clone(), self.format.clone(), output))
    }
}
