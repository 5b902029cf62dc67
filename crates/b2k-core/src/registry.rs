use std::{collections::HashMap, sync::Arc};

use tracing::warn;

use crate::{
    book::BookFormat,
    converter::{BookConverter, ToolConverter},
    messaging::types::{InlineButton, InlineKeyboard},
    tool::ConversionTool,
};

/// Immutable mapping from target format to converter.
///
/// Built once at startup and shared behind an `Arc`; lookups need no locking.
pub struct FormatRegistry {
    converters: Vec<Arc<dyn BookConverter>>,
    by_format: HashMap<BookFormat, usize>,
}

impl FormatRegistry {
    /// Register converters in order. A later converter for an already
    /// registered format is ignored.
    pub fn new(converters: Vec<Arc<dyn BookConverter>>) -> Self {
        let mut kept: Vec<Arc<dyn BookConverter>> = Vec::with_capacity(converters.len());
        let mut by_format = HashMap::new();
        for conv in converters {
            let format = conv.format().clone();
            if by_format.contains_key(&format) {
                warn!(%format, "duplicate converter ignored");
                continue;
            }
            by_format.insert(format, kept.len());
            kept.push(conv);
        }
        Self {
            converters: kept,
            by_format,
        }
    }

    /// The Kindle formats the bot ships with: MOBI, then AZW3.
    pub fn kindle(tool: Arc<dyn ConversionTool>) -> Self {
        Self::new(vec![
            Arc::new(ToolConverter::mobi(tool.clone())),
            Arc::new(ToolConverter::azw3(tool)),
        ])
    }

    pub fn resolve(&self, format: &BookFormat) -> Option<Arc<dyn BookConverter>> {
        self.by_format
            .get(format)
            .map(|&idx| self.converters[idx].clone())
    }

    /// Known formats in registration order.
    pub fn formats(&self) -> impl Iterator<Item = &BookFormat> {
        self.converters.iter().map(|c| c.format())
    }

    /// Format-selection keyboard: a single row, one button per format.
    pub fn keyboard(&self) -> InlineKeyboard {
        InlineKeyboard::single_row(
            self.formats()
                .map(|f| InlineButton {
                    label: f.name().to_string(),
                    callback_data: f.to_token(),
                })
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::tests::FakeTool;

    #[test]
    fn resolves_by_format_case_insensitively() {
        let reg = FormatRegistry::kindle(Arc::new(FakeTool::default()));
        let conv = reg.resolve(&BookFormat::new(".MOBI", "mobi")).unwrap();
        assert_eq!(conv.format(), &BookFormat::mobi());
        assert!(reg.resolve(&BookFormat::from_extension(".epub")).is_none());
    }

    #[test]
    fn lists_formats_in_registration_order() {
        let reg = FormatRegistry::kindle(Arc::new(FakeTool::default()));
        let names: Vec<&str> = reg.formats().map(|f| f.name()).collect();
        assert_eq!(names, vec!["MOBI", "AZW3"]);
    }

    #[test]
    fn keyboard_buttons_carry_tokens() {
        let reg = FormatRegistry::kindle(Arc::new(FakeTool::default()));
        let kb = reg.keyboard();
        assert_eq!(kb.rows.len(), 1);
        let data: Vec<&str> = kb.rows[0]
            .iter()
            .map(|b| b.callback_data.as_str())
            .collect();
        assert_eq!(data, vec!["MOBI|.mobi", "AZW3|.azw3"]);
        for token in data {
            assert!(reg.resolve(&BookFormat::parse_token(token).unwrap()).is_some());
        }
    }

    #[test]
    fn first_registration_wins() {
        let tool: Arc<dyn ConversionTool> = Arc::new(FakeTool::default());
        let reg = FormatRegistry::new(vec![
            Arc::new(ToolConverter::mobi(tool.clone())),
            Arc::new(ToolConverter::new(BookFormat::mobi(), Vec::new(), tool)),
        ]);
        assert_eq!(reg.formats().count(), 1);
    }
}
