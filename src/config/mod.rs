use std::env;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde::Serialize;

pub const DEFAULT_URL: &str = "http://localhost:8081";

#[derive(Debug, Default, Deserialize, Serialize, Clone, PartialEq)]
pub struct ConfigFile {
    pub url: Option<String>,
    pub timeout: Option<u64>,
    pub proxy: Option<String>,
    pub output: Option<String>,
    pub output_format: Option<String>,
    pub no_color: Option<bool>,
    pub viewport_width: Option<f64>,
    pub viewport_height: Option<f64>,
    pub list_rows: Option<usize>,
}

/// Login state kept between runs.
#[derive(Debug, Default, Deserialize, Serialize, Clone, PartialEq)]
pub struct Session {
    pub url: Option<String>,
    pub token: Option<String>,
}

fn home_dir() -> Option<PathBuf> {
    env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(|| env::var_os("USERPROFILE").map(PathBuf::from))
        .or_else(|| {
            let drive = env::var_os("HOMEDRIVE")?;
            let path = env::var_os("HOMEPATH")?;
            Some(PathBuf::from(drive).join(path))
        })
}

pub fn default_config_path() -> Option<PathBuf> {
    Some(home_dir()?.join(".alertmap").join("config.yml"))
}

pub fn default_session_path() -> Option<PathBuf> {
    Some(home_dir()?.join(".alertmap").join("session.yml"))
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\")) {
        if let Some(home) = home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

fn read_yaml<T>(path: &Path, what: &str, allow_missing: bool) -> Result<T, String>
where
    T: for<'de> Deserialize<'de> + Default,
{
    match std::fs::read_to_string(path) {
        Ok(contents) if contents.trim().is_empty() => Ok(T::default()),
        Ok(contents) => serde_yaml::from_str::<T>(&contents)
            .map_err(|e| format!("failed to parse {what} '{}': {e}", path.display())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && allow_missing => Ok(T::default()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(format!("{what} file not found '{}'", path.display()))
        }
        Err(e) => Err(format!("failed to read {what} '{}': {e}", path.display())),
    }
}

fn write_file(path: &Path, contents: &str, what: &str) -> Result<(), String> {
    let parent = path
        .parent()
        .ok_or_else(|| format!("invalid {what} path '{}'", path.display()))?;
    if !parent.as_os_str().is_empty() {
        std::fs::create_dir_all(parent).map_err(|e| {
            format!("failed to create {what} directory '{}': {e}", parent.display())
        })?;
    }
    std::fs::write(path, contents)
        .map_err(|e| format!("failed to write {what} file '{}': {e}", path.display()))
}

pub fn load_config(path: &Path, allow_missing: bool) -> Result<ConfigFile, String> {
    read_yaml(path, "config", allow_missing)
}

pub fn load_session(path: &Path) -> Result<Session, String> {
    read_yaml(path, "session", true)
}

pub fn save_session(path: &Path, session: &Session) -> Result<(), String> {
    let contents = serde_yaml::to_string(session)
        .map_err(|e| format!("failed to serialize session: {e}"))?;
    write_file(path, &contents, "session")
}

/// Forgets the token but keeps the server URL for the next login.
pub fn clear_session_token(path: &Path) -> Result<(), String> {
    let mut session = load_session(path)?;
    session.token = None;
    save_session(path, &session)
}

fn default_config_yaml() -> String {
    format!(
        r#"# alertmap config
#
# Location (default):
#   ~/.alertmap/config.yml

# Search service (no trailing slash)
url: {DEFAULT_URL}

# HTTP
timeout: 30
# proxy: http://127.0.0.1:8080

# Output (optional)
# output: ./results.json
# output_format: json

# Map viewport used for tooltip placement and camera framing
viewport_width: 960.0
viewport_height: 540.0

# Result list window shown around a selection
list_rows: 12

no_color: false
"#
    )
}

pub fn ensure_default_config_file(path: &Path) -> Result<(), String> {
    if path.exists() {
        return Ok(());
    }
    write_file(path, &default_config_yaml(), "config")
}
