use super::{Mapper, MappingError, parse_path, parse_uuid, path_to_string};
use crate::domain::files::{CsvInputFile, Folder, OutputFileSummary};
use crate::domain::ports::Entity;
use crate::interfaces::wire::{CsvInputFileMsg, FolderMsg, OutputFileSummaryMsg};
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderDto {
    pub id: Uuid,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FolderMapper;

impl Mapper for FolderMapper {
    type Wire = FolderMsg;
    type Dto = FolderDto;
    type Domain = Folder;

    fn from_wire(&self, wire: FolderMsg) -> Result<FolderDto, MappingError> {
        Ok(FolderDto {
            id: parse_uuid("id", &wire.id)?,
            path: parse_path("path", &wire.path)?,
        })
    }

    fn to_wire(&self, dto: FolderDto) -> FolderMsg {
        FolderMsg {
            id: dto.id.to_string(),
            path: path_to_string(&dto.path),
        }
    }

    fn from_dto(&self, dto: FolderDto) -> Result<Folder, MappingError> {
        Ok(Folder::from_parts(dto.id, dto.path))
    }

    fn to_dto(&self, domain: Folder) -> FolderDto {
        FolderDto {
            id: domain.id(),
            path: domain.path().to_path_buf(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvInputFileDto {
    pub id: Uuid,
    pub folder: PathBuf,
    pub input: PathBuf,
    pub output: PathBuf,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InputFileMapper;

impl Mapper for InputFileMapper {
    type Wire = CsvInputFileMsg;
    type Dto = CsvInputFileDto;
    type Domain = CsvInputFile;

    fn from_wire(&self, wire: CsvInputFileMsg) -> Result<CsvInputFileDto, MappingError> {
        Ok(CsvInputFileDto {
            id: parse_uuid("id", &wire.id)?,
            folder: parse_path("folder", &wire.folder)?,
            input: parse_path("input_path", &wire.input_path)?,
            output: parse_path("output_path", &wire.output_path)?,
        })
    }

    fn to_wire(&self, dto: CsvInputFileDto) -> CsvInputFileMsg {
        CsvInputFileMsg {
            id: dto.id.to_string(),
            folder: path_to_string(&dto.folder),
            input_path: path_to_string(&dto.input),
            output_path: path_to_string(&dto.output),
        }
    }

    fn from_dto(&self, dto: CsvInputFileDto) -> Result<CsvInputFile, MappingError> {
        if dto.input == dto.output {
            return Err(MappingError::new(
                "output_path",
                "output file must differ from input file",
            ));
        }
        Ok(CsvInputFile::from_parts(
            dto.id, dto.folder, dto.input, dto.output,
        ))
    }

    fn to_dto(&self, domain: CsvInputFile) -> CsvInputFileDto {
        CsvInputFileDto {
            id: domain.id(),
            folder: domain.folder().to_path_buf(),
            input: domain.input().to_path_buf(),
            output: domain.output().to_path_buf(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OutputFileSummaryMapper;

impl Mapper for OutputFileSummaryMapper {
    type Wire = OutputFileSummaryMsg;
    type Dto = OutputFileSummary;
    type Domain = OutputFileSummary;

    fn from_wire(&self, wire: OutputFileSummaryMsg) -> Result<OutputFileSummary, MappingError> {
        let path = if wire.path.is_empty() {
            None
        } else {
            Some(PathBuf::from(wire.path))
        };
        Ok(OutputFileSummary {
            id: parse_uuid("id", &wire.id)?,
            path,
            records_written: wire.records_written,
        })
    }

    fn to_wire(&self, dto: OutputFileSummary) -> OutputFileSummaryMsg {
        OutputFileSummaryMsg {
            id: dto.id.to_string(),
            path: dto.path.as_deref().map(path_to_string).unwrap_or_default(),
            records_written: dto.records_written,
        }
    }

    fn from_dto(&self, dto: OutputFileSummary) -> Result<OutputFileSummary, MappingError> {
        if dto.path.is_none() && dto.records_written > 0 {
            return Err(MappingError::missing("path"));
        }
        Ok(dto)
    }

    fn to_dto(&self, domain: OutputFileSummary) -> OutputFileSummary {
        domain
    }
}
