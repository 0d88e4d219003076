//! Exam discovery and student number extraction.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, instrument};

use crate::core::student_id::parse_student_id;
use crate::io::config::MarkingConfig;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("no exams found in {}", dir.display())]
    NoExamsFound { dir: PathBuf },

    #[error("no student number in {}", path.display())]
    StudentIdNotFound { path: PathBuf },

    #[error("read exam {}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Ordered set of exam files named `<prefix><N>.<ext>` under one directory.
#[derive(Debug, Clone)]
pub struct ExamCatalog {
    config: MarkingConfig,
}

impl ExamCatalog {
    pub fn new(config: &MarkingConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Probe exams `1..=max_exams` in order, stopping at the first missing one.
    #[instrument(skip_all, fields(dir = %self.config.exams_dir.display(), max = self.config.max_exams))]
    pub fn discover(&self) -> Result<Vec<PathBuf>, CatalogError> {
        let exams: Vec<PathBuf> = (1..=self.config.max_exams)
            .map(|n| self.config.exam_path(n))
            .take_while(|path| path.is_file())
            .collect();
        debug!(found = exams.len(), "exam discovery finished");
        if exams.is_empty() {
            return Err(CatalogError::NoExamsFound {
                dir: self.config.exams_dir.clone(),
            });
        }
        Ok(exams)
    }

    /// Read `exam` and return its student number.
    ///
    /// Exam text is not required to be UTF-8; invalid bytes are replaced.
    pub fn extract_student_id(&self, exam: &Path) -> Result<u32, CatalogError> {
        let bytes = fs::read(exam).map_err(|source| CatalogError::Unreadable {
            path: exam.to_path_buf(),
            source,
        })?;
        parse_student_id(&String::from_utf8_lossy(&bytes)).ok_or_else(|| CatalogError::StudentIdNotFound {
            path: exam.to_path_buf(),
        })
    }
}
