//! Post-upload handling of the source file.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// What happens to a source file once its upload succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    None,
    Delete,
    MoveTo(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispositionOutcome {
    Kept,
    Deleted,
    Moved(PathBuf),
    Failed(String),
}

impl Disposition {
    /// Applies the disposition to `path`. Failures are logged and reported in the
    /// outcome; the upload they follow is already stored remotely.
    pub fn apply(&self, path: &Path) -> DispositionOutcome {
        match self {
            Disposition::None => DispositionOutcome::Kept,
            Disposition::Delete => match fs::remove_file(path) {
                Ok(()) => {
                    info!(path = %path.display(), "deleted file");
                    DispositionOutcome::Deleted
                }
                Err(e) => {
                    error!(path = %path.display(), error = %e, "failed to delete file");
                    DispositionOutcome::Failed(e.to_string())
                }
            },
            Disposition::MoveTo(folder) => move_into(path, folder),
        }
    }
}

fn move_into(path: &Path, folder: &Path) -> DispositionOutcome {
    if let Err(e) = fs::create_dir_all(folder) {
        error!(folder = %folder.display(), error = %e, "failed to create processed folder");
        return DispositionOutcome::Failed(format!(
            "failed to create processed folder {}: {e}",
            folder.display()
        ));
    }
    let Some(name) = path.file_name() else {
        return DispositionOutcome::Failed(format!("{} has no file name", path.display()));
    };
    let dest = folder.join(name);
    match rename_or_copy(path, &dest) {
        Ok(()) => {
            info!(from = %path.display(), to = %dest.display(), "moved file");
            DispositionOutcome::Moved(dest)
        }
        Err(e) => {
            error!(from = %path.display(), to = %dest.display(), error = %e, "failed to move file");
            DispositionOutcome::Failed(e.to_string())
        }
    }
}

/// Rename, falling back to copy-then-delete when the rename cannot cross filesystems.
fn rename_or_copy(from: &Path, to: &Path) -> std::io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            if !from.is_file() {
                return Err(rename_err);
            }
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
    }
}
