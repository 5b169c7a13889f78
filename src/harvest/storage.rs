//! Writing stored artifacts under the download root.
//!
//! Layout: `{root}/{YYYY-MM-DD-HH-MM-SS}/{name}`, one directory per receipt
//! timestamp. Existing files are overwritten.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, TimeZone};
use tracing::debug;

use crate::error::{HarvestError, Result};

/// Format a receipt timestamp as a directory name, in the timestamp's own zone.
pub fn timestamp_segment<Tz: TimeZone>(received: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    received.format("%Y-%m-%d-%H-%M-%S").to_string()
}

/// Create `dir` and any missing parents.
///
/// A directory that already exists, including one created concurrently by
/// another process, is not an error. Every other failure is.
pub fn ensure_dir(dir: &Path) -> Result<()> {
    match std::fs::create_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::AlreadyExists && dir.is_dir() => Ok(()),
        Err(e) => Err(HarvestError::io(dir, e)),
    }
}

/// Destination tree for stored artifacts.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path an artifact named `name` would be stored at.
    ///
    /// `name` must be usable as a single path component.
    pub fn artifact_path(&self, segment: &str, name: &str) -> Result<PathBuf> {
        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(part)), None) if part == name => {
                Ok(self.root.join(segment).join(name))
            }
            _ => Err(HarvestError::InvalidName(name.to_string())),
        }
    }

    /// Write `content` to `{root}/{segment}/{name}`, creating directories first.
    pub fn save(&self, segment: &str, name: &str, content: &[u8]) -> Result<PathBuf> {
        let path = self.artifact_path(segment, name)?;
        if let Some(parent) = path.parent() {
            ensure_dir(parent)?;
        }
        std::fs::write(&path, content).map_err(|e| HarvestError::io(&path, e))?;
        debug!(path = %path.display(), bytes = content.len(), "Wrote artifact");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    #[test]
    fn test_timestamp_segment_is_zero_padded() {
        let received = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(1, 2, 3)
            .unwrap()
            .and_utc();
        let segment = timestamp_segment(&received);
        assert_eq!(segment, "2024-03-01-01-02-03");
        assert_eq!(segment.len(), 19);
    }

    #[test]
    fn test_timestamp_segment_uses_own_offset() {
        let received = DateTime::parse_from_rfc3339("2024-03-01T23:15:30+08:00").unwrap();
        assert_eq!(timestamp_segment(&received), "2024-03-01-23-15-30");
        let in_utc = received.with_timezone(&Utc);
        assert_eq!(timestamp_segment(&in_utc), "2024-03-01-15-15-30");
    }

    #[test]
    fn test_ensure_dir_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        ensure_dir(&nested).unwrap();
        ensure_dir(&nested).unwrap();
        assert!(nested.is_dir());
    }

    #[test]
    fn test_ensure_dir_over_a_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("taken");
        std::fs::write(&file, b"x").unwrap();
        assert!(matches!(ensure_dir(&file), Err(HarvestError::Io { .. })));
    }

    #[test]
    fn test_save_overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let first = store.save("2024-03-01-10-15-30", "a.pdf", b"first").unwrap();
        let second = store.save("2024-03-01-10-15-30", "a.pdf", b"second").unwrap();
        assert_eq!(first, second);
        assert_eq!(std::fs::read(&second).unwrap(), b"second");
    }

    #[test]
    fn test_rejects_names_that_are_not_one_component() {
        let store = ArtifactStore::new("/tmp/root");
        for bad in ["", ".", "..", "../escape.pdf", "dir/file.pdf", "/etc/passwd"] {
            assert!(
                matches!(
                    store.artifact_path("seg", bad),
                    Err(HarvestError::InvalidName(_))
                ),
                "accepted {bad:?}"
            );
        }
        assert_eq!(
            store.artifact_path("seg", "invoice.pdf").unwrap(),
            PathBuf::from("/tmp/root/seg/invoice.pdf")
        );
    }
}
