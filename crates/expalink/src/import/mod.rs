//! CSV import of a professional directory export, used to seed the in-memory store.

mod normalizer;
mod parser;

use std::io::Read;
use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::marketplace::{visibility, Professional, ProfessionalRepository, RepositoryError};

#[derive(Debug, thiserror::Error)]
pub enum DirectoryImportError {
    #[error("failed to read directory export: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid directory CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("line {line}: {reason}")]
    InvalidRow { line: u64, reason: String },
    #[error("could not store imported professional: {0}")]
    Store(#[from] RepositoryError),
}

pub struct DirectoryImporter;

impl DirectoryImporter {
    pub fn from_path<P: AsRef<Path>>(
        path: P,
        now: DateTime<Utc>,
    ) -> Result<Vec<Professional>, DirectoryImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file, now)
    }

    /// Parses every row, recomputing the online flag as of `now`.
    pub fn from_reader<R: Read>(
        reader: R,
        now: DateTime<Utc>,
    ) -> Result<Vec<Professional>, DirectoryImportError> {
        let mut professionals = Vec::new();
        for parsed in parser::parse_rows(reader)? {
            let mut pro = normalizer::build_professional(parsed.row).map_err(|reason| {
                DirectoryImportError::InvalidRow {
                    line: parsed.line,
                    reason,
                }
            })?;
            visibility::refresh(&mut pro, now);
            professionals.push(pro);
        }
        Ok(professionals)
    }

    /// Imports the export at `path` into `store`, returning how many records were added.
    pub fn seed<S, P>(store: &S, path: P, now: DateTime<Utc>) -> Result<usize, DirectoryImportError>
    where
        S: ProfessionalRepository + ?Sized,
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let professionals = Self::from_path(path, now)?;
        let count = professionals.len();
        for pro in professionals {
            store.insert_professional(pro)?;
        }
        info!(path = %path.display(), count, "directory seeded");
        Ok(count)
    }
}
