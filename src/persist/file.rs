use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use log::debug;
use tempfile::NamedTempFile;

use super::PersistenceProvider;
use crate::error::{PersistError, PersistFailure};
use crate::feed;
use crate::status::Project;

/// Persists the feed to a local file by replacing it atomically.
pub struct FileProvider {
    path: PathBuf,
}

impl FileProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl PersistenceProvider for FileProvider {
    async fn persist_projects(&self, projects: &[Project]) -> Result<(), PersistError> {
        let bytes = feed::encode_to_vec(projects).map_err(|e| PersistError::new(self.target(), e))?;
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || write_atomic(&path, &bytes))
            .await
            .map_err(|e| PersistError::new(self.target(), std::io::Error::other(e)))?
            .map_err(|e| PersistError::new(self.target(), e))?;

        debug!("Replaced feed file {}", self.path.display());
        Ok(())
    }

    fn target(&self) -> String {
        self.path.display().to_string()
    }
}

/// Replaces `path` with `bytes` via a temporary file and a rename.
///
/// The target is never truncated: a crash before the rename leaves the
/// previous contents in place, and the temporary file is cleaned up on drop.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), PersistFailure> {
    let dir = parent_dir(path);
    let staged = stage(dir, bytes)?;
    commit(staged, path)?;
    Ok(())
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

// Same directory as the target so the rename stays on one filesystem.
fn stage(dir: &Path, bytes: &[u8]) -> std::io::Result<NamedTempFile> {
    let mut staged = tempfile::Builder::new()
        .prefix(".cctray-")
        .suffix(".tmp")
        .tempfile_in(dir)?;

    staged.write_all(bytes)?;
    staged.flush()?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        staged
            .as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o644))?;
    }

    staged.as_file().sync_all()?;
    Ok(staged)
}

fn commit(staged: NamedTempFile, path: &Path) -> std::io::Result<()> {
    staged.persist(path).map_err(|e| e.error)?;

    #[cfg(unix)]
    File::open(parent_dir(path))?.sync_all()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::{Activity, LastBuildStatus};
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;

    fn projects(name: &str) -> Vec<Project> {
        vec![Project {
            name: name.to_string(),
            last_build_status: LastBuildStatus::Success,
            activity: Activity::Sleeping,
            last_build_time: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }]
    }

    #[tokio::test]
    async fn test_persist_writes_encoded_feed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cctray.xml");
        let provider = FileProvider::new(&path);

        tokio_test::assert_ok!(provider.persist_projects(&projects("demo")).await);

        let written = std::fs::read(&path).unwrap();
        assert_eq!(written, feed::encode_to_vec(&projects("demo")).unwrap());
    }

    #[tokio::test]
    async fn test_persist_replaces_previous_feed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cctray.xml");
        std::fs::write(&path, "stale").unwrap();
        let provider = FileProvider::new(&path);

        provider.persist_projects(&projects("fresh")).await.unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains(r#"name="fresh""#));
        assert!(!written.contains("stale"));
    }

    #[test]
    fn test_interrupted_write_leaves_previous_feed_intact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cctray.xml");
        let original = feed::encode_to_vec(&projects("original")).unwrap();
        write_atomic(&path, &original).unwrap();

        // A crash between staging and commit: half the bytes are on disk in
        // the staging file but the rename never happens.
        let replacement = feed::encode_to_vec(&projects("replacement")).unwrap();
        let staged = stage(dir.path(), &replacement[..replacement.len() / 2]).unwrap();
        drop(staged);

        let on_disk = std::fs::read(&path).unwrap();
        assert!(!on_disk.is_empty());
        assert_eq!(on_disk, original);
    }

    #[test]
    fn test_staging_file_is_removed_after_commit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cctray.xml");

        write_atomic(&path, b"<Projects/>").unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, [std::ffi::OsString::from("cctray.xml")]);
    }

    #[cfg(unix)]
    #[test]
    fn test_committed_feed_is_world_readable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cctray.xml");

        write_atomic(&path, b"<Projects/>").unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }

    #[tokio::test]
    async fn test_concurrent_persists_leave_one_complete_feed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cctray.xml");
        let provider = Arc::new(FileProvider::new(&path));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let provider = Arc::clone(&provider);
                tokio::spawn(async move {
                    provider
                        .persist_projects(&projects(&format!("pipeline-{i}")))
                        .await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let on_disk = std::fs::read(&path).unwrap();
        let candidates: Vec<_> = (0..8)
            .map(|i| feed::encode_to_vec(&projects(&format!("pipeline-{i}"))).unwrap())
            .collect();
        assert!(candidates.contains(&on_disk));
    }

    #[tokio::test]
    async fn test_missing_directory_reports_target() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("cctray.xml");
        let provider = FileProvider::new(&path);

        let err = tokio_test::assert_err!(provider.persist_projects(&projects("demo")).await);

        assert_eq!(err.target, path.display().to_string());
        assert!(matches!(err.failure, PersistFailure::Io(_)));
        assert!(!path.exists());
    }

    #[test]
    fn test_parent_dir_of_bare_file_name_is_current_dir() {
        assert_eq!(parent_dir(Path::new("cctray.xml")), Path::new("."));
        assert_eq!(parent_dir(Path::new("/srv/feeds/cctray.xml")), Path::new("/srv/feeds"));
    }
}
