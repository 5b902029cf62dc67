use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;

use crate::{errors::Error, tool::CalibreConfig, Result};

const DEFAULT_SETTINGS_FILE: &str = "appsettings.json";
const DEFAULT_STORAGE_DIR: &str = "/tmp/book-to-kindle";
const DEFAULT_EBOOK_CONVERT: &str = "/usr/bin/ebook-convert";

/// Typed configuration, loaded once at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub telegram_bot_token: String,
    /// Shared directory for downloaded and converted books.
    pub storage_dir: PathBuf,
    pub ebook_convert_path: PathBuf,
    pub conversion_timeout: Option<Duration>,
}

/// Optional JSON settings file (`{"ApiKey": "...", "FileStorage": "..."}`).
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SettingsFile {
    api_key: Option<String>,
    file_storage: Option<PathBuf>,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let settings_path = env_path("APP_SETTINGS").unwrap_or_else(|| DEFAULT_SETTINGS_FILE.into());
        let settings = read_settings_file(&settings_path)?;

        let telegram_bot_token = env_str("TELEGRAM_BOT_TOKEN")
            .and_then(non_empty)
            .or_else(|| settings.api_key.clone().and_then(non_empty))
            .ok_or_else(|| {
                Error::Config("TELEGRAM_BOT_TOKEN environment variable is required".to_string())
            })?;

        let storage_dir = env_path("FILE_STORAGE")
            .or(settings.file_storage)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STORAGE_DIR));

        let ebook_convert_path = env_path("EBOOK_CONVERT_PATH")
            .or_else(|| which_in_path("ebook-convert"))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_EBOOK_CONVERT));

        let conversion_timeout = env_u64("CONVERSION_TIMEOUT_SECS")
            .filter(|&s| s > 0)
            .map(Duration::from_secs);

        fs::create_dir_all(&storage_dir)?;

        Ok(Self {
            telegram_bot_token,
            storage_dir,
            ebook_convert_path,
            conversion_timeout,
        })
    }

    pub fn calibre(&self) -> CalibreConfig {
        CalibreConfig {
            ebook_convert_path: self.ebook_convert_path.clone(),
            timeout: self.conversion_timeout,
        }
    }
}

fn read_settings_file(path: &Path) -> Result<SettingsFile> {
    match fs::read_to_string(path) {
        Ok(txt) => parse_settings(&txt),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(SettingsFile::default()),
        Err(e) => Err(Error::Io(e)),
    }
}

fn parse_settings(txt: &str) -> Result<SettingsFile> {
    Ok(serde_json::from_str(txt)?)
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn env_path(key: &str) -> Option<PathBuf> {
    env_str(key).and_then(non_empty).map(PathBuf::from)
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        out.push((key.to_string(), val));
    }
    out
}

fn which_in_path(binary: &str) -> Option<PathBuf> {
    let path = env::var_os("PATH")?;
    for dir in env::split_paths(&path) {
        let candidate = dir.join(binary);
        if is_executable_file(&candidate) {
            return Some(candidate);
        }
    }
    None
}

fn is_executable_file(p: &Path) -> bool {
    if !p.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(md) = fs::metadata(p) {
            return (md.permissions().mode() & 0o111) != 0;
        }
    }
    true
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
