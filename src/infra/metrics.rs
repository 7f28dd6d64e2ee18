// ============================================================
// Layer 6 — Loss Curve Logger
// ============================================================
// Appends the interval-average training loss to a CSV file every
// `plot_every` iterations, for plotting a learning curve later.
//
// Output file: checkpoints/loss_curve.csv
//
//   step,avg_loss
//   100,7.912345
//   200,6.503211
//   ...
//
// The header is written once; later runs append to the same file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

const CSV_FILE: &str = "loss_curve.csv";

/// One point of the learning curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LossPoint {
    /// Iteration the interval ended at
    pub step:     usize,
    /// Mean per-token loss over the interval
    pub avg_loss: f64,
}

impl LossPoint {
    pub fn new(step: usize, avg_loss: f64) -> Self {
        Self { step, avg_loss }
    }
}

pub struct LossLogger {
    csv_path: PathBuf,
}

impl LossLogger {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create '{}'", dir.display()))?;

        let csv_path = dir.join(CSV_FILE);
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)?;
            writeln!(f, "step,avg_loss")?;
            tracing::debug!("Created loss CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    pub fn log(&self, point: &LossPoint) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;

        writeln!(f, "{},{:.6}", point.step, point.avg_loss)?;
        tracing::debug!("Logged loss {:.4} at step {}", point.avg_loss, point.step);
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_then_rows() {
        let dir    = tempfile::tempdir().unwrap();
        let logger = LossLogger::new(dir.path()).unwrap();
        logger.log(&LossPoint::new(100, 2.5)).unwrap();
        logger.log(&LossPoint::new(200, 1.25)).unwrap();

        let text = fs::read_to_string(logger.csv_path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["step,avg_loss", "100,2.500000", "200,1.250000"]);
    }

    #[test]
    fn test_reopen_appends_without_second_header() {
        let dir = tempfile::tempdir().unwrap();
        LossLogger::new(dir.path()).unwrap().log(&LossPoint::new(1, 1.0)).unwrap();
        LossLogger::new(dir.path()).unwrap().log(&LossPoint::new(2, 0.5)).unwrap();

        let text = fs::read_to_string(dir.path().join(CSV_FILE)).unwrap();
        assert_eq!(text.lines().filter(|l| l.starts_with("step")).count(), 1);
        assert_eq!(text.lines().count(), 3);
    }
}
