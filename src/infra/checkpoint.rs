// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores the three HRED components, each in its own
// file, with burn's named MessagePack + gzip recorder at full
// precision (restored weights are bit-identical to the saved
// ones).
//
// Directory layout:
//   checkpoints/
//     encoder.mpk.gz      ← EncoderRnn record
//     context.mpk.gz      ← ContextRnn record
//     decoder.mpk.gz      ← AttnDecoderRnn record
//     latest_iter.json    ← iteration of the snapshot above
//     train_config.json   ← hyper-parameters to rebuild the model
//     loss_curve.csv      ← written by infra::metrics
//
// Every save overwrites the previous snapshot.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkGzFileRecorder, Recorder},
};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::application::train_use_case::TrainConfig;
use crate::ml::hred::Hred;

type HredRecorder = NamedMpkGzFileRecorder<FullPrecisionSettings>;

const ENCODER_FILE: &str = "encoder";
const CONTEXT_FILE: &str = "context";
const DECODER_FILE: &str = "decoder";
const LATEST_FILE:  &str = "latest_iter.json";
const CONFIG_FILE:  &str = "train_config.json";

/// Owns one checkpoint directory. Each component gets its own file so
/// the three optimizers' modules can be restored independently.
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Creates the directory if it doesn't already exist.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        fs::create_dir_all(&dir).ok();
        Self { dir }
    }

    /// The checkpoint directory; `LossLogger` writes its CSV here too.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write all three components and record `iter` as the latest snapshot.
    pub fn save_components<B: Backend>(&self, hred: &Hred<B>, iter: usize) -> Result<()> {
        let recorder = HredRecorder::new();

        let path = self.dir.join(ENCODER_FILE);
        recorder
            .record(hred.encoder.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save encoder to '{}'", path.display()))?;

        let path = self.dir.join(CONTEXT_FILE);
        recorder
            .record(hred.context.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save context to '{}'", path.display()))?;

        let path = self.dir.join(DECODER_FILE);
        recorder
            .record(hred.decoder.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save decoder to '{}'", path.display()))?;

        let latest = self.dir.join(LATEST_FILE);
        fs::write(&latest, serde_json::to_string(&iter)?)
            .with_context(|| format!("Failed to write '{}'", latest.display()))?;

        tracing::debug!("Saved checkpoint at iteration {}", iter);
        Ok(())
    }

    /// Load saved weights into freshly initialised components.
    ///
    /// `hred` must have the architecture the checkpoint was written
    /// with; rebuild it from `load_config()` first.
    pub fn load_components<B: Backend>(&self, hred: Hred<B>, device: &B::Device) -> Result<Hred<B>> {
        let iter     = self.latest_iter()?;
        let recorder = HredRecorder::new();
        tracing::info!("Loading checkpoint from iteration {}", iter);

        let path    = self.dir.join(ENCODER_FILE);
        let encoder = recorder
            .load(path.clone(), device)
            .with_context(|| format!("Cannot load encoder '{}'", path.display()))?;

        let path    = self.dir.join(CONTEXT_FILE);
        let context = recorder
            .load(path.clone(), device)
            .with_context(|| format!("Cannot load context '{}'", path.display()))?;

        let path    = self.dir.join(DECODER_FILE);
        let decoder = recorder
            .load(path.clone(), device)
            .with_context(|| format!("Cannot load decoder '{}'", path.display()))?;

        Ok(Hred {
            encoder: hred.encoder.load_record(encoder),
            context: hred.context.load_record(context),
            decoder: hred.decoder.load_record(decoder),
        })
    }

    /// Persist the run's hyper-parameters as pretty JSON.
    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.dir.join(CONFIG_FILE);
        let json = serde_json::to_string_pretty(cfg)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;
        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    /// Read back the config written by `save_config`. Fails with a
    /// hint when no training run has used this directory yet.
    pub fn load_config(&self) -> Result<TrainConfig> {
        let path = self.dir.join(CONFIG_FILE);
        let json = fs::read_to_string(&path).with_context(|| {
            format!(
                "Cannot read config from '{}'. Run 'train' before 'sample'.",
                path.display()
            )
        })?;
        serde_json::from_str(&json)
            .with_context(|| format!("Malformed config in '{}'", path.display()))
    }

    /// Iteration of the snapshot currently on disk.
    pub fn latest_iter(&self) -> Result<usize> {
        let path = self.dir.join(LATEST_FILE);
        let s    = fs::read_to_string(&path)
            .with_context(|| format!("Cannot find '{}'. Have you run 'train' first?", path.display()))?;
        Ok(serde_json::from_str::<usize>(&s)?)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::hred::HredConfig;
    use crate::test_util::TestBackend;

    fn model() -> Hred<TestBackend> {
        HredConfig::new(5)
            .with_hidden_size(4)
            .with_max_length(6)
            .init(&Default::default())
    }

    fn flat<const D: usize>(t: Tensor<TestBackend, D>) -> Vec<f32> {
        t.into_data().to_vec::<f32>().unwrap()
    }

    #[test]
    fn test_components_round_trip_exactly() {
        let dir   = tempfile::tempdir().unwrap();
        let ckpt  = CheckpointManager::new(dir.path());
        let saved = model();
        ckpt.save_components(&saved, 300).unwrap();

        let loaded = ckpt.load_components(model(), &Default::default()).unwrap();

        assert_eq!(ckpt.latest_iter().unwrap(), 300);
        assert_eq!(
            flat(saved.encoder.embedding.weight.val()),
            flat(loaded.encoder.embedding.weight.val()),
        );
        assert_eq!(
            flat(saved.context.cell.hidden_gates.weight.val()),
            flat(loaded.context.cell.hidden_gates.weight.val()),
        );
        assert_eq!(
            flat(saved.decoder.attn.weight.val()),
            flat(loaded.decoder.attn.weight.val()),
        );
        assert_eq!(
            flat(saved.decoder.out.weight.val()),
            flat(loaded.decoder.out.weight.val()),
        );
    }

    #[test]
    fn test_load_without_checkpoint_fails() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path());
        assert!(ckpt.load_components(model(), &Default::default()).is_err());
        assert!(ckpt.load_config().is_err());
    }

    #[test]
    fn test_config_round_trip() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path());
        let cfg  = TrainConfig { hidden_size: 32, max_iters: Some(7), ..TrainConfig::default() };
        ckpt.save_config(&cfg).unwrap();

        let back = ckpt.load_config().unwrap();
        assert_eq!(back.hidden_size, 32);
        assert_eq!(back.max_iters, Some(7));
        assert_eq!(back.max_length, cfg.max_length);
    }
}
