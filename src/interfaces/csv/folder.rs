use crate::error::Result;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Lists the `*.csv` files directly inside `folder`, sorted by name.
///
/// The extension match is case-insensitive. Subdirectories are not entered.
pub fn list_csv_files(folder: &Path) -> Result<Vec<PathBuf>> {
    let metadata = fs::metadata(folder).map_err(|e| {
        io::Error::new(e.kind(), format!("{}: {e}", folder.display()))
    })?;
    if !metadata.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::NotADirectory,
            format!("{} is not a directory", folder.display()),
        )
        .into());
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(folder)? {
        let path = entry?.path();
        let is_csv = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if is_csv && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Creates (or truncates) an empty output file.
pub fn provision_output(path: &Path) -> Result<()> {
    fs::File::create(path)?;
    Ok(())
}
