//! Transcript logging configuration from TOML (`[logging]` section)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Raw logging settings from TOML
///
/// # Example
///
/// ```toml
/// [logging]
/// transcript_dir = "~/.local/share/webpilot/sessions"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// Directory for `<session-id>.jsonl` transcripts; unset disables them
    pub transcript_dir: Option<PathBuf>,
}

impl FileLoggingConfig {
    pub fn transcript_path(&self, session_id: &str) -> Option<PathBuf> {
        self.transcript_dir
            .as_deref()
            .map(|dir| expand_home(dir).join(format!("{}.jsonl", session_id)))
    }
}

/// Expand a leading `~/` to the home directory.
fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}
