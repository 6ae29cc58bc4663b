//! Core type definitions for rclone-artifacts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ArtifactError, Result};
use crate::utils::join_path;

/// A named remote plus the base path every operation is scoped to.
///
/// Parsed once from `scheme://remote-name/base/path` and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRef {
    /// URI scheme, kept only for dispatch and display
    pub scheme: String,
    /// Remote name as configured in rclone, without the trailing `:`
    pub remote: String,
    /// Base path inside the remote; empty means the remote root
    pub path: String,
}

impl RemoteRef {
    /// Parse an artifact URI.
    ///
    /// The remote is everything between `scheme://` and the next `/`; the
    /// rest is the base path, kept byte-for-byte. Fails with
    /// [`ArtifactError::Configuration`] when there is no scheme or no remote.
    pub fn parse(uri: &str) -> Result<Self> {
        let (scheme, rest) = uri
            .split_once(':')
            .filter(|(scheme, _)| is_valid_scheme(scheme))
            .ok_or_else(|| {
                ArtifactError::Configuration(format!("Invalid artifact uri '{}': no scheme", uri))
            })?;

        let authority_and_path = rest.strip_prefix("//").ok_or_else(|| {
            ArtifactError::Configuration("No remote found in uri".to_string())
        })?;

        let (remote, path) = match authority_and_path.find('/') {
            Some(idx) => authority_and_path.split_at(idx),
            None => (authority_and_path, ""),
        };

        if remote.is_empty() {
            return Err(ArtifactError::Configuration(
                "No remote found in uri".to_string(),
            ));
        }

        Ok(Self {
            scheme: scheme.to_ascii_lowercase(),
            remote: remote.to_string(),
            path: path.to_string(),
        })
    }

    /// Base path joined with an optional sub-path
    pub fn resolve(&self, sub_path: Option<&str>) -> String {
        join_path(&self.path, sub_path)
    }

    /// The `remote:path` argument rclone expects for a path on this remote
    pub fn spec(&self, path: &str) -> String {
        format!("{}:{}", self.remote, path)
    }

    /// How the remote shows up in `rclone listremotes`
    pub fn listing_name(&self) -> String {
        format!("{}:", self.remote)
    }
}

/// RFC 3986 scheme: a letter followed by letters, digits, `+`, `-` or `.`
fn is_valid_scheme(scheme: &str) -> bool {
    let mut chars = scheme.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

impl std::fmt::Display for RemoteRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}://{}{}", self.scheme, self.remote, self.path)
    }
}

/// What a path on the remote turned out to be
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntryKind {
    File,
    Directory,
    Absent,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::File => "file",
            EntryKind::Directory => "directory",
            EntryKind::Absent => "absent",
        }
    }
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Metadata for one path found on the remote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryStat {
    pub kind: EntryKind,
    pub size: Option<u64>,
    pub modified_at: Option<DateTime<Utc>>,
}

impl EntryStat {
    pub fn absent() -> Self {
        Self {
            kind: EntryKind::Absent,
            size: None,
            modified_at: None,
        }
    }
}

/// One object under a listed path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactEntry {
    pub path: String,
    pub is_directory: bool,
    /// Byte size, only ever set for files
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
}

impl ArtifactEntry {
    pub fn file(path: impl Into<String>, size: u64) -> Self {
        Self {
            path: path.into(),
            is_directory: false,
            size: Some(size),
            modified_at: None,
        }
    }

    pub fn directory(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            is_directory: true,
            size: None,
            modified_at: None,
        }
    }

    pub fn with_modified_at(mut self, modified_at: Option<DateTime<Utc>>) -> Self {
        self.modified_at = modified_at;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_uri_with_base_path() {
        let remote = RemoteRef::parse("rclone://myremote/experiments/42").unwrap();
        assert_eq!(remote.scheme, "rclone");
        assert_eq!(remote.remote, "myremote");
        assert_eq!(remote.path, "/experiments/42");
        assert_eq!(remote.listing_name(), "myremote:");
        assert_eq!(remote.to_string(), "rclone://myremote/experiments/42");
    }

    #[test]
    fn test_parse_uri_without_path_targets_root() {
        let remote = RemoteRef::parse("rclone://backup").unwrap();
        assert_eq!(remote.remote, "backup");
        assert_eq!(remote.path, "");
        assert_eq!(remote.spec(&remote.resolve(None)), "backup:");
        assert_eq!(remote.spec(&remote.resolve(Some("run1"))), "backup:run1");
    }

    #[test]
    fn test_parse_uri_keeps_path_verbatim() {
        let remote = RemoteRef::parse("rclone://myremote/runs/../secret").unwrap();
        assert_eq!(remote.path, "/runs/../secret");

        let remote = RemoteRef::parse("rclone://myremote/runs/a%2Fb%25c").unwrap();
        assert_eq!(remote.path, "/runs/a%2Fb%25c");
        assert_eq!(remote.spec(&remote.resolve(None)), "myremote:/runs/a%2Fb%25c");
    }

    #[test]
    fn test_parse_uri_allows_rclone_remote_names() {
        let remote = RemoteRef::parse("rclone://my remote/runs").unwrap();
        assert_eq!(remote.remote, "my remote");
        assert_eq!(remote.path, "/runs");

        let remote = RemoteRef::parse("RClone://Backup_2/x").unwrap();
        assert_eq!(remote.scheme, "rclone");
        assert_eq!(remote.remote, "Backup_2");
    }

    #[test]
    fn test_parse_uri_without_remote_fails() {
        for uri in [
            "rclone:/experiments/42",
            "rclone:///experiments/42",
            "rclone://",
            "not a uri",
            "://myremote/x",
        ] {
            match RemoteRef::parse(uri) {
                Err(ArtifactError::Configuration(_)) => {}
                other => panic!("expected configuration error for {}, got {:?}", uri, other),
            }
        }
    }

    #[test]
    fn test_entry_constructors() {
        let file = ArtifactEntry::file("/a/b.txt", 10);
        assert!(!file.is_directory);
        assert_eq!(file.size, Some(10));

        let dir = ArtifactEntry::directory("/a/sub");
        assert!(dir.is_directory);
        assert_eq!(dir.size, None);
    }

    #[test]
    fn test_entry_serializes_without_empty_fields() {
        let json = serde_json::to_value(ArtifactEntry::directory("/a")).unwrap();
        assert_eq!(json, serde_json::json!({"path": "/a", "is_directory": true}));
    }
}
