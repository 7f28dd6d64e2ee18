// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the training pipeline in order:
//
//   Step 1: Load the vocabulary             (Layer 4 - data)
//   Step 2: Load and clean the corpus       (Layer 4 - data)
//   Step 3: Encode conversations            (Layer 4 - data)
//   Step 4: Save config                     (Layer 6 - infra)
//   Step 5: Run the training loop           (Layer 5 - ml)
//
// Reference: Rust Book §13 (Iterators and Closures)
//            Burn Book §5 (Training)

use anyhow::{bail, Result};
use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

use crate::data::{dataset::ConversationDataset, loader::CorpusLoader, vocab_loader::VocabularyLoader};
use crate::domain::traits::{ConversationSource, VocabularySource};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::hred::HredConfig;
use crate::ml::trainer::{run_training, TrainSummary};

// ─── Training Configuration ──────────────────────────────────────────────────
// All hyper-parameters of a run. Saved next to the checkpoints so
// `sample` can rebuild the same architecture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    /// Corpus file: one conversation per line, turns separated by `</s>`
    pub data_path:             String,
    /// JSON array of `[word, id]` pairs
    pub vocab_path:            String,
    /// Where checkpoints, `train_config.json` and the loss curve go
    pub checkpoint_dir:        String,
    /// Filled in from the vocabulary file when training starts
    pub vocab_size:            usize,
    /// Width of every hidden state (encoder, context and decoder share it)
    pub hidden_size:           usize,
    /// Longest utterance in tokens, `</s>` included. Also the width of
    /// the decoder's attention window, so it is fixed at build time.
    pub max_length:            usize,
    /// Times each GRU cell is applied per step
    pub n_layers:              usize,
    /// Decoder dropout on embeddings; only active during training
    pub dropout:               f64,
    /// Adam learning rate, shared by all three components
    pub lr:                    f64,
    /// Probability that a sampled conversation is decoded with gold inputs
    pub teacher_forcing_ratio: f64,
    /// Iterations between progress lines. Checkpoints are written every
    /// three print intervals.
    pub print_every:           usize,
    /// Iterations between rows of `loss_curve.csv`
    pub plot_every:            usize,
    /// Iterations between greedy sample printouts
    pub evaluate_every:        usize,
    /// Conversations decoded at each evaluation
    pub eval_samples:          usize,
    /// `None` trains until interrupted
    pub max_iters:             Option<usize>,
    /// Seeds sampling and teacher-forcing draws; `None` uses entropy
    pub seed:                  Option<u64>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data_path:             "data/train.txt".to_string(),
            vocab_path:            "data/vocab.json".to_string(),
            checkpoint_dir:        "checkpoints".to_string(),
            vocab_size:            0,
            hidden_size:           300,
            max_length:            100,
            n_layers:              1,
            dropout:               0.1,
            lr:                    1e-4,
            teacher_forcing_ratio: 0.5,
            print_every:           100,
            plot_every:            100,
            evaluate_every:        600,
            eval_samples:          10,
            max_iters:             None,
            seed:                  None,
        }
    }
}

impl TrainConfig {
    /// Architecture part of the config. `sample` rebuilds the model
    /// from this before loading weights, so the shapes always match.
    pub fn hred_config(&self) -> HredConfig {
        HredConfig::new(self.vocab_size)
            .with_hidden_size(self.hidden_size)
            .with_max_length(self.max_length)
            .with_n_layers(self.n_layers)
            .with_dropout(self.dropout)
    }

    /// Reject settings the training loop cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.hidden_size == 0 || self.n_layers == 0 {
            bail!("hidden_size and n_layers must be positive");
        }
        if self.max_length < 2 {
            bail!("max_length must be at least 2 (one word plus </s>), got {}", self.max_length);
        }
        if self.print_every == 0 || self.plot_every == 0 || self.evaluate_every == 0 {
            bail!("print_every, plot_every and evaluate_every must be positive");
        }
        if !(0.0..=1.0).contains(&self.teacher_forcing_ratio) {
            bail!("teacher_forcing_ratio must lie in [0, 1], got {}", self.teacher_forcing_ratio);
        }
        if !(0.0..1.0).contains(&self.dropout) {
            bail!("dropout must lie in [0, 1), got {}", self.dropout);
        }
        Ok(())
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<TrainSummary> {
        let mut cfg = self.config.clone();
        cfg.validate()?;

        // ── Step 1: Vocabulary ────────────────────────────────────────────────
        let vocab      = VocabularyLoader::new(&cfg.vocab_path).load()?;
        cfg.vocab_size = vocab.len();
        tracing::info!("Vocabulary: {} words", vocab.len());

        // ── Step 2: Corpus ────────────────────────────────────────────────────
        let groups = CorpusLoader::new(&cfg.data_path).load_all()?;

        // ── Step 3: Encode ────────────────────────────────────────────────────
        let dataset = ConversationDataset::from_raw(&groups, &vocab, cfg.max_length);
        if dataset.is_empty() {
            bail!("No usable conversations in '{}'", cfg.data_path);
        }
        tracing::info!(
            "Dataset: {} conversations, {} turns",
            dataset.len(),
            dataset.total_turns()
        );

        // ── Step 4: Save config for sampling ──────────────────────────────────
        let ckpt_manager = CheckpointManager::new(&cfg.checkpoint_dir);
        ckpt_manager.save_config(&cfg)?;

        // ── Step 5: Train ─────────────────────────────────────────────────────
        run_training(&cfg, &vocab, &dataset, &ckpt_manager)
    }
}
