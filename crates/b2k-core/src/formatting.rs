/// Escape text for Telegram HTML parse mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Bold a user-provided name for an HTML message.
pub fn bold(text: &str) -> String {
    format!("<b>{}</b>", escape_html(text))
}
