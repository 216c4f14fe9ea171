//! Filesystem operations behind the shell's built-ins and the action executor

use kindshell_core::{DirEntryInfo, FailureReason};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

#[derive(Debug, thiserror::Error)]
pub enum FsError {
    #[error("No such file or directory: {0}")]
    NotFound(String),

    #[error("File exists: {0}")]
    AlreadyExists(String),

    #[error("Not a directory: {0}")]
    NotADirectory(String),

    #[error("Destination is not a directory: {0}")]
    DestinationNotDirectory(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FsError {
    /// Collapse into the closed set of reasons callers branch on.
    pub fn reason(&self) -> FailureReason {
        match self {
            FsError::NotFound(_) => FailureReason::NotFound,
            FsError::AlreadyExists(_) => FailureReason::AlreadyExists,
            FsError::NotADirectory(_) => FailureReason::NotADirectory,
            FsError::DestinationNotDirectory(_) => FailureReason::DestinationNotDirectory,
            FsError::Io(e) => match e.kind() {
                ErrorKind::NotFound => FailureReason::NotFound,
                ErrorKind::PermissionDenied => FailureReason::PermissionDenied,
                ErrorKind::AlreadyExists => FailureReason::AlreadyExists,
                ErrorKind::InvalidInput | ErrorKind::InvalidData => FailureReason::InvalidPath,
                _ => FailureReason::Io,
            },
        }
    }
}

pub type FsResult<T> = Result<T, FsError>;

/// Create a directory and any missing parents. Fails if anything already
/// occupies the path.
pub async fn create_dir<P: AsRef<Path>>(path: P) -> FsResult<()> {
    let path = path.as_ref();

    if path.exists() {
        return Err(FsError::AlreadyExists(path.display().to_string()));
    }

    fs::create_dir_all(path).await?;
    Ok(())
}

/// Delete a file, or a directory recursively
pub async fn delete<P: AsRef<Path>>(path: P) -> FsResult<()> {
    let path = path.as_ref();

    // symlink_metadata so a dangling link can still be removed
    let metadata = match fs::symlink_metadata(path).await {
        Ok(m) => m,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(FsError::NotFound(path.display().to_string()))
        }
        Err(e) => return Err(e.into()),
    };

    if metadata.is_dir() {
        fs::remove_dir_all(path).await?;
    } else {
        fs::remove_file(path).await?;
    }

    Ok(())
}

/// Move `from` into `to` when `to` is an existing directory, otherwise
/// rename `from` to `to`. Returns the final location.
pub async fn move_path<P: AsRef<Path>, Q: AsRef<Path>>(from: P, to: Q) -> FsResult<PathBuf> {
    let from = from.as_ref();
    let to = to.as_ref();

    if !from.exists() {
        return Err(FsError::NotFound(from.display().to_string()));
    }

    let target = if to.is_dir() {
        let name = from
            .file_name()
            .ok_or_else(|| FsError::NotFound(from.display().to_string()))?;
        to.join(name)
    } else if to.exists() {
        return Err(FsError::DestinationNotDirectory(to.display().to_string()));
    } else {
        to.to_path_buf()
    };

    if target.exists() {
        return Err(FsError::AlreadyExists(target.display().to_string()));
    }

    match fs::rename(from, &target).await {
        Ok(()) => {}
        Err(e) if crosses_devices(&e) => {
            tracing::debug!(from = %from.display(), to = %target.display(), "Rename crosses filesystems, copying");
            copy_then_remove(from, &target).await?;
        }
        Err(e) => return Err(e.into()),
    }
    Ok(target)
}

/// `rename(2)` cannot move between filesystems (EXDEV).
fn crosses_devices(e: &std::io::Error) -> bool {
    #[cfg(unix)]
    const EXDEV: i32 = 18;
    #[cfg(windows)]
    const EXDEV: i32 = 17; // ERROR_NOT_SAME_DEVICE
    #[cfg(not(any(unix, windows)))]
    const EXDEV: i32 = -1;

    e.raw_os_error() == Some(EXDEV)
}

/// Copy `from` to `to` (recursively for directories), then remove `from`.
async fn copy_then_remove(from: &Path, to: &Path) -> FsResult<()> {
    let (from_owned, to_owned) = (from.to_path_buf(), to.to_path_buf());
    tokio::task::spawn_blocking(move || copy_recursive(&from_owned, &to_owned))
        .await
        .map_err(|e| std::io::Error::new(ErrorKind::Other, e))??;
    delete(from).await
}

fn copy_recursive(from: &Path, to: &Path) -> std::io::Result<()> {
    let metadata = std::fs::symlink_metadata(from)?;
    let file_type = metadata.file_type();

    if file_type.is_dir() {
        std::fs::create_dir(to)?;
        for entry in std::fs::read_dir(from)? {
            let entry = entry?;
            copy_recursive(&entry.path(), &to.join(entry.file_name()))?;
        }
        std::fs::set_permissions(to, metadata.permissions())?;
    } else if file_type.is_symlink() {
        copy_symlink(from, to)?;
    } else {
        std::fs::copy(from, to)?;
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(from: &Path, to: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(std::fs::read_link(from)?, to)
}

#[cfg(not(unix))]
fn copy_symlink(from: &Path, to: &Path) -> std::io::Result<()> {
    std::fs::copy(from, to).map(|_| ())
}

/// List directory contents, sorted by name
pub async fn list<P: AsRef<Path>>(path: P) -> FsResult<Vec<DirEntryInfo>> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(FsError::NotFound(path.display().to_string()));
    }

    if !path.is_dir() {
        return Err(FsError::NotADirectory(path.display().to_string()));
    }

    let mut entries = Vec::new();
    let mut dir = fs::read_dir(path).await?;

    while let Some(entry) = dir.next_entry().await? {
        let name = entry.file_name().to_string_lossy().to_string();
        let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
        entries.push(DirEntryInfo { name, is_dir });
    }

    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}
