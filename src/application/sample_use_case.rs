// ============================================================
// Layer 2 — Sample Use Case
// ============================================================
// Rebuilds a trained model and shows what it says:
//
//   Step 1: Load train_config.json      (Layer 6 - infra)
//   Step 2: Load vocabulary + corpus    (Layer 4 - data)
//   Step 3: Rebuild and load weights    (Layer 5 / 6)
//   Step 4: Greedy-decode `count` random conversations
//   Step 5: Optionally dump attention matrices as JSON

use anyhow::{bail, Context, Result};
use burn::{data::dataset::Dataset, prelude::*};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::Serialize;
use std::{fs, path::Path};

use crate::data::{dataset::ConversationDataset, loader::CorpusLoader, vocab_loader::VocabularyLoader};
use crate::domain::traits::{ConversationSource, VocabularySource};
use crate::domain::vocabulary::Vocabulary;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::evaluator::{Evaluator, Generation};
use crate::ml::hred::Hred;

type InferBackend = burn::backend::Wgpu;

/// One sampled conversation with the model's continuation.
#[derive(Debug, Clone, Serialize)]
pub struct SampleOutput {
    pub sources:    Vec<String>,
    /// The corpus's actual final turn
    pub reference:  Option<String>,
    pub generation: Generation,
}

pub struct SampleUseCase {
    pub data_path:      String,
    pub vocab_path:     String,
    pub checkpoint_dir: String,
    pub count:          usize,
    pub seed:           Option<u64>,
    /// Where to write attention weights, if anywhere
    pub attention_out:  Option<String>,
}

impl SampleUseCase {
    pub fn execute(&self) -> Result<Vec<SampleOutput>> {
        // ── Step 1: Config ────────────────────────────────────────────────────
        let ckpt = CheckpointManager::new(&self.checkpoint_dir);
        let cfg  = ckpt.load_config()?;

        // ── Step 2: Data ──────────────────────────────────────────────────────
        let vocab = VocabularyLoader::new(&self.vocab_path).load()?;
        if vocab.len() != cfg.vocab_size {
            bail!(
                "Vocabulary has {} words but the checkpoint was trained with {}",
                vocab.len(),
                cfg.vocab_size
            );
        }
        let groups  = CorpusLoader::new(&self.data_path).load_all()?;
        let dataset = ConversationDataset::from_raw(&groups, &vocab, cfg.max_length);
        if dataset.is_empty() {
            bail!("No usable conversations in '{}'", self.data_path);
        }

        // ── Step 3: Model ─────────────────────────────────────────────────────
        let device = burn::backend::wgpu::WgpuDevice::default();
        let hred: Hred<InferBackend> = cfg.hred_config().init(&device);
        let hred      = ckpt.load_components(hred, &device)?;
        let evaluator = Evaluator::new(hred, &vocab, device);

        // ── Step 4: Generate ──────────────────────────────────────────────────
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None       => StdRng::from_entropy(),
        };
        let samples = sample_conversations(&evaluator, &vocab, &dataset, self.count, &mut rng)?;
        for sample in &samples {
            for line in &sample.sources {
                println!("> {line}");
            }
            if let Some(reference) = &sample.reference {
                println!("= {reference}");
            }
            println!("< {}", sample.generation.sentence());
            println!();
        }

        // ── Step 5: Attention dump ────────────────────────────────────────────
        if let Some(path) = &self.attention_out {
            write_samples(&samples, Path::new(path))?;
            tracing::info!("Wrote attention weights to '{}'", path);
        }

        Ok(samples)
    }
}

/// Decode `count` conversations drawn at random (with replacement).
pub fn sample_conversations<B: Backend, R: Rng + ?Sized>(
    evaluator: &Evaluator<B>,
    vocab:     &Vocabulary,
    dataset:   &ConversationDataset,
    count:     usize,
    rng:       &mut R,
) -> Result<Vec<SampleOutput>> {
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        let Some(conversation) = dataset.sample(rng) else { break };
        let n_sources  = conversation.sources().len();
        let generation = evaluator.evaluate(conversation.sources(), vocab)?;
        out.push(SampleOutput {
            sources:   conversation.text[..n_sources].to_vec(),
            reference: conversation.text.get(n_sources).cloned(),
            generation,
        });
    }
    Ok(out)
}

pub fn write_samples(samples: &[SampleOutput], path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(samples)?;
    fs::write(path, json).with_context(|| format!("Cannot write '{}'", path.display()))
}
