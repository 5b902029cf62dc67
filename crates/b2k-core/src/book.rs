//! Book files and their formats.

use std::{
    fmt,
    hash::{Hash, Hasher},
    path::{Path, PathBuf},
};

const TOKEN_SEPARATOR: char = '|';

/// E-book format: a file extension (with leading dot) plus a display name.
///
/// Equality is case-insensitive on both parts; hashing uses the lower-cased
/// extension only, which keeps `Hash` consistent with `Eq`.
#[derive(Clone, Debug)]
pub struct BookFormat {
    extension: String,
    name: String,
}

impl BookFormat {
    pub fn new(extension: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            extension: normalize_extension(&extension.into()),
            name: name.into().trim().to_string(),
        }
    }

    /// Format for a bare extension; the name is the upper-cased extension (`.epub` -> `EPUB`).
    pub fn from_extension(extension: &str) -> Self {
        let extension = normalize_extension(extension);
        let name = extension.trim_start_matches('.').to_uppercase();
        Self { extension, name }
    }

    /// Format of a file, derived from its extension. No extension yields an empty format.
    pub fn of_path(path: &Path) -> Self {
        match path.extension() {
            Some(ext) => Self::from_extension(&ext.to_string_lossy()),
            None => Self::from_extension(""),
        }
    }

    pub fn mobi() -> Self {
        Self::new(".mobi", "MOBI")
    }

    pub fn azw3() -> Self {
        Self::new(".azw3", "AZW3")
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Encode as `"<Name>|<extension>"` for an opaque choice token (e.g. callback data).
    pub fn to_token(&self) -> String {
        format!("{}{TOKEN_SEPARATOR}{}", self.name, self.extension)
    }

    /// Decode a choice token. Anything but exactly one separator between two
    /// non-empty parts yields `None`.
    pub fn parse_token(input: &str) -> Option<Self> {
        let mut parts = input.split(TOKEN_SEPARATOR);
        let name = parts.next()?.trim();
        let extension = parts.next()?.trim();
        if parts.next().is_some() || name.is_empty() || extension.is_empty() {
            return None;
        }
        Some(Self::new(extension, name))
    }
}

fn normalize_extension(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() || raw.starts_with('.') {
        raw.to_string()
    } else {
        format!(".{raw}")
    }
}

impl PartialEq for BookFormat {
    fn eq(&self, other: &Self) -> bool {
        self.extension.to_lowercase() == other.extension.to_lowercase()
            && self.name.to_lowercase() == other.name.to_lowercase()
    }
}

impl Eq for BookFormat {}

impl Hash for BookFormat {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.extension.to_lowercase().hash(state);
    }
}

impl fmt::Display for BookFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_token())
    }
}

/// A book on the filesystem.
///
/// The tracker in [`crate::temp_files`] decides when the file is removed; a
/// `Book` only references it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Book {
    /// Display title, without extension.
    pub title: String,
    pub format: BookFormat,
    pub path: PathBuf,
}

impl Book {
    pub fn new(title: impl Into<String>, format: BookFormat, path: impl Into<PathBuf>) -> Self {
        Self {
            title: title.into(),
            format,
            path: path.into(),
        }
    }

    /// Book backed by an existing file; the format comes from the path's extension.
    pub fn from_file(title: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let format = BookFormat::of_path(&path);
        Self::new(title, format, path)
    }

    /// File name used when sending the book back (`{title}{extension}`).
    pub fn file_name(&self) -> String {
        format!("{}{}", self.title, self.format.extension())
    }
}

/// Split a user-visible file name into its title and format (`novel.epub` -> `novel`, `EPUB`).
pub fn split_file_name(file_name: &str) -> (String, BookFormat) {
    let path = Path::new(file_name);
    let title = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| file_name.to_string());
    (title, BookFormat::of_path(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn equality_ignores_case() {
        assert_eq!(BookFormat::new(".MOBI", "mobi"), BookFormat::mobi());
        assert_eq!(BookFormat::new(".Azw3", "Azw3"), BookFormat::azw3());
        assert_ne!(BookFormat::mobi(), BookFormat::azw3());
    }

    #[test]
    fn case_variants_hit_the_same_map_entry() {
        let mut map = HashMap::new();
        map.insert(BookFormat::mobi(), 1);
        assert_eq!(map.get(&BookFormat::new(".MoBi", "MOBI")), Some(&1));
    }

    #[test]
    fn from_extension_derives_name_and_leading_dot() {
        let f = BookFormat::from_extension("epub");
        assert_eq!(f.extension(), ".epub");
        assert_eq!(f.name(), "EPUB");
        assert_eq!(BookFormat::from_extension(".fb2").name(), "FB2");
    }

    #[test]
    fn token_round_trips() {
        for f in [BookFormat::mobi(), BookFormat::azw3()] {
            let token = f.to_token();
            assert_eq!(BookFormat::parse_token(&token), Some(f));
        }
        assert_eq!(BookFormat::mobi().to_token(), "MOBI|.mobi");
    }

    #[test]
    fn malformed_tokens_decode_to_none() {
        assert_eq!(BookFormat::parse_token(""), None);
        assert_eq!(BookFormat::parse_token("MOBI"), None);
        assert_eq!(BookFormat::parse_token("MOBI|.mobi|x"), None);
        assert_eq!(BookFormat::parse_token("|.mobi"), None);
        assert_eq!(BookFormat::parse_token("MOBI|"), None);
    }

    #[test]
    fn book_format_comes_from_path() {
        let b = Book::from_file("novel", "/tmp/abc.MOBI");
        assert_eq!(b.format, BookFormat::mobi());
        assert_eq!(b.file_name(), "novel.MOBI");
        assert_eq!(BookFormat::of_path(Path::new("/tmp/noext")).extension(), "");
    }

    #[test]
    fn splits_file_names() {
        let (title, format) = split_file_name("novel.epub");
        assert_eq!(title, "novel");
        assert_eq!(format, BookFormat::from_extension(".epub"));

        let (title, format) = split_file_name("My.Book.fb2");
        assert_eq!(title, "My.Book");
        assert_eq!(format.name(), "FB2");

        let (title, format) = split_file_name("README");
        assert_eq!(title, "README");
        assert_eq!(format.extension(), "");
    }
}
