//! Marking configuration stored in a TOML file (`marking.toml` by default).

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Marking pool configuration (TOML).
///
/// Missing fields default to the classic setup: five exercises per exam and
/// up to twenty exams named `exams/exam<N>.txt`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MarkingConfig {
    /// Exercise slots per exam (and grades per rubric).
    pub exercises: usize,

    /// Highest exam number probed during discovery.
    pub max_exams: usize,

    pub exams_dir: PathBuf,
    pub exam_prefix: String,
    pub exam_extension: String,

    pub rubric_path: PathBuf,

    /// Worker count used when the requested count is missing or not positive.
    pub default_workers: usize,

    pub pacing: PacingConfig,
}

/// Simulated delays and rubric correction odds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PacingConfig {
    /// Reading pause before each rubric review, taken outside the lock.
    pub review_min_ms: u64,
    pub review_max_ms: u64,

    /// Simulated marking time for one claimed slot, taken outside the lock.
    pub marking_min_ms: u64,
    pub marking_max_ms: u64,

    /// Sleep before retrying when no slot could be claimed.
    pub backoff_ms: u64,

    /// Each grade is corrected with probability `1 / correction_one_in` per review.
    pub correction_one_in: u32,
}

impl Default for MarkingConfig {
    fn default() -> Self {
        Self {
            exercises: 5,
            max_exams: 20,
            exams_dir: PathBuf::from("exams"),
            exam_prefix: "exam".to_string(),
            exam_extension: "txt".to_string(),
            rubric_path: PathBuf::from("rubric.txt"),
            default_workers: 2,
            pacing: PacingConfig::default(),
        }
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            review_min_ms: 200,
            review_max_ms: 500,
            marking_min_ms: 500,
            marking_max_ms: 1500,
            backoff_ms: 100,
            correction_one_in: 4,
        }
    }
}

impl PacingConfig {
    /// No sleeping at all; rubric corrections keep their default odds.
    pub fn instant() -> Self {
        Self {
            review_min_ms: 0,
            review_max_ms: 0,
            marking_min_ms: 0,
            marking_max_ms: 0,
            backoff_ms: 0,
            ..Self::default()
        }
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    pub fn correction_probability(&self) -> f64 {
        1.0 / f64::from(self.correction_one_in)
    }

    pub fn validate(&self) -> Result<()> {
        if self.review_min_ms > self.review_max_ms {
            return Err(anyhow!("pacing.review_min_ms must be <= pacing.review_max_ms"));
        }
        if self.marking_min_ms > self.marking_max_ms {
            return Err(anyhow!(
                "pacing.marking_min_ms must be <= pacing.marking_max_ms"
            ));
        }
        if self.correction_one_in == 0 {
            return Err(anyhow!("pacing.correction_one_in must be > 0"));
        }
        Ok(())
    }
}

impl MarkingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.exercises == 0 {
            return Err(anyhow!("exercises must be > 0"));
        }
        if self.max_exams == 0 {
            return Err(anyhow!("max_exams must be > 0"));
        }
        if self.default_workers == 0 {
            return Err(anyhow!("default_workers must be > 0"));
        }
        if self.exam_prefix.trim().is_empty() {
            return Err(anyhow!("exam_prefix must be non-empty"));
        }
        self.pacing.validate()
    }

    /// Path of exam number `n` (1-indexed).
    pub fn exam_path(&self, n: usize) -> PathBuf {
        let name = if self.exam_extension.is_empty() {
            format!("{}{}", self.exam_prefix, n)
        } else {
            format!("{}{}.{}", self.exam_prefix, n, self.exam_extension)
        };
        self.exams_dir.join(name)
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `MarkingConfig::default()`.
pub fn load_config(path: &Path) -> Result<MarkingConfig> {
    if !path.exists() {
        let cfg = MarkingConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: MarkingConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &MarkingConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    super::write_atomic(path, &buf)
}
