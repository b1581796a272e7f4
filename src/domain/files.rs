use super::ports::Entity;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Extension appended to an input file name to get its companion output file.
pub const OUTPUT_EXTENSION: &str = "out";

/// A directory root to scan for payment files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    id: Uuid,
    path: PathBuf,
}

impl Folder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::from_parts(Uuid::new_v4(), path.into())
    }

    pub(crate) fn from_parts(id: Uuid, path: PathBuf) -> Self {
        Self { id, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Entity for Folder {
    const KIND: &'static str = "folders";

    fn id(&self) -> Uuid {
        self.id
    }
}

/// An input file paired with the output file provisioned for it.
///
/// The output file exists on disk by the time a pair is handed downstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsvInputFile {
    id: Uuid,
    folder: PathBuf,
    input: PathBuf,
    output: PathBuf,
}

impl CsvInputFile {
    pub fn new(folder: impl Into<PathBuf>, input: impl Into<PathBuf>) -> Self {
        let input = input.into();
        let output = output_path_for(&input);
        Self::from_parts(Uuid::new_v4(), folder.into(), input, output)
    }

    pub(crate) fn from_parts(id: Uuid, folder: PathBuf, input: PathBuf, output: PathBuf) -> Self {
        Self {
            id,
            folder,
            input,
            output,
        }
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Display name of the input file, for logs.
    pub fn source_name(&self) -> String {
        self.input
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.input.to_string_lossy().into_owned())
    }
}

impl Entity for CsvInputFile {
    const KIND: &'static str = "input_files";

    fn id(&self) -> Uuid {
        self.id
    }
}

/// `payments.csv` -> `payments.csv.out`
pub fn output_path_for(input: &Path) -> PathBuf {
    let mut name = input.as_os_str().to_owned();
    name.push(".");
    name.push(OUTPUT_EXTENSION);
    PathBuf::from(name)
}

/// Result of writing one output file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputFileSummary {
    pub id: Uuid,
    /// `None` when no record reached the writer.
    pub path: Option<PathBuf>,
    pub records_written: u64,
}

impl Entity for OutputFileSummary {
    const KIND: &'static str = "output_files";

    fn id(&self) -> Uuid {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_path_appends_extension() {
        assert_eq!(
            output_path_for(Path::new("/data/in/payments.csv")),
            PathBuf::from("/data/in/payments.csv.out")
        );
    }

    #[test]
    fn test_input_file_pairs_output_path() {
        let file = CsvInputFile::new("/data/in", "/data/in/a.csv");
        assert_eq!(file.output(), Path::new("/data/in/a.csv.out"));
        assert_eq!(file.source_name(), "a.csv");
    }
}
