use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ExtractError;

pub(super) fn load_document(path: &Path) -> Result<Vec<u8>, ExtractError> {
    fs::read(path).map_err(|source| ExtractError::Io {
        path: path.to_path_buf(),
        source,
    })
}

// Regular files only, ordered by file name so runs are reproducible.
pub(super) fn list_documents(dir: &Path) -> Result<Vec<PathBuf>, ExtractError> {
    let io_error = |source: std::io::Error| ExtractError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_error)? {
        let entry = entry.map_err(io_error)?;
        let path = entry.path();

        if !entry.file_type().map_err(io_error)?.is_file() {
            continue;
        }
        paths.push(path);
    }

    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(paths)
}
