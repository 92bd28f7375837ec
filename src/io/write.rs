// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Checks on output files before any work is done.

use std::path::{Path, PathBuf};

use log::{trace, warn};
use thiserror::Error;

/// Test whether we're allowed to write to `file`. If it already exists and
/// `overwrite` is false, that's an error; otherwise the user is warned that it
/// will be overwritten.
pub(crate) fn can_write_to_file(file: &Path, overwrite: bool) -> Result<(), FileWriteError> {
    trace!("Testing whether we can write to {}", file.display());

    if file.is_dir() {
        return Err(FileWriteError::IsADirectory(file.to_path_buf()));
    }

    let exists = file.exists();
    if exists && !overwrite {
        return Err(FileWriteError::AlreadyExists(file.to_path_buf()));
    }

    can_write_to_file_inner(file)?;
    if exists {
        warn!("Will overwrite the existing file '{}'", file.display());
    }

    Ok(())
}

/// Test whether a file is writable. Directories leading up to the file are
/// created if they don't exist.
fn can_write_to_file_inner(file: &Path) -> Result<(), FileWriteError> {
    let file_exists = file.exists();

    if let Some(p) = file.parent() {
        if !p.as_os_str().is_empty() && !p.exists() {
            match std::fs::DirBuilder::new()
                .recursive(true)
                .create(p)
                .map_err(|e| e.kind())
            {
                Ok(()) => (),
                Err(std::io::ErrorKind::PermissionDenied) => {
                    return Err(FileWriteError::NewDirectory(p.to_path_buf()))
                }
                Err(e) => return Err(FileWriteError::IO(e.into())),
            }
        }
    }

    // Don't truncate; the file might be one of our inputs.
    match std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(file)
        .map_err(|e| e.kind())
    {
        // File is writable.
        Ok(_) => {
            // If the file in question didn't already exist, `OpenOptions::new`
            // creates it as part of its work. We don't want to keep the 0-sized
            // file; remove it if it didn't exist before.
            if !file_exists {
                std::fs::remove_file(file).map_err(FileWriteError::IO)?;
            }
        }

        Err(std::io::ErrorKind::PermissionDenied) => {
            return Err(FileWriteError::FileNotWritable {
                file: file.display().to_string(),
            })
        }

        Err(e) => {
            return Err(FileWriteError::IO(e.into()));
        }
    }

    Ok(())
}

#[derive(Error, Debug)]
pub enum FileWriteError {
    #[error("Cannot write to the specified file '{file}'. Do you have write permissions set?")]
    FileNotWritable { file: String },

    #[error(
        "Couldn't create directory '{0}' for output files. Do you have write permissions set?"
    )]
    NewDirectory(PathBuf),

    #[error("'{0}' already exists and overwriting is disabled")]
    AlreadyExists(PathBuf),

    #[error("'{0}' is a directory; expected a file")]
    IsADirectory(PathBuf),

    #[error(transparent)]
    IO(#[from] std::io::Error),
}
