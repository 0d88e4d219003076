//! Rubric file persistence.
//!
//! Loading never fails: a missing, unreadable or short file is filled with
//! deterministic defaults. Saving failures are reported to the caller, and
//! workers log and ignore them through [`RubricStore::persist`].

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{debug, warn};

use crate::core::rubric::Rubric;
use crate::io::write_atomic;

#[derive(Debug, Clone)]
pub struct RubricStore {
    path: PathBuf,
    exercises: usize,
}

impl RubricStore {
    pub fn new(path: impl Into<PathBuf>, exercises: usize) -> Self {
        Self {
            path: path.into(),
            exercises,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Rubric {
        match fs::read(&self.path) {
            Ok(bytes) => {
                debug!(path = %self.path.display(), "loaded rubric");
                Rubric::parse(&String::from_utf8_lossy(&bytes), self.exercises)
            }
            Err(err) => {
                debug!(path = %self.path.display(), err = %err, "rubric unavailable, using defaults");
                Rubric::default_for(self.exercises)
            }
        }
    }

    pub fn save(&self, rubric: &Rubric) -> Result<()> {
        write_atomic(&self.path, &rubric.render())
    }

    /// Save and log on failure; the in-memory rubric stays authoritative.
    pub fn persist(&self, rubric: &Rubric) {
        if let Err(err) = self.save(rubric) {
            warn!(path = %self.path.display(), err = %format!("{err:#}"), "failed to persist rubric");
        }
    }
}
