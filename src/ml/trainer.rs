// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Iteration-based loop over randomly sampled conversations:
//
//   every iteration       sample one conversation (with replacement)
//                         → TurnStepper::train_conversation
//   every print_every     print moving-average loss + timing
//   every plot_every      append average loss to loss_curve.csv
//   every 3*print_every   save the three component checkpoints
//   every evaluate_every  greedy-decode eval_samples conversations
//                         with a valid() snapshot
//
// Runs until max_iters, or forever when it is unset.
//
// Training uses Autodiff<Wgpu>; evaluation runs on the inner
// backend through `Hred::valid`, so dropout is off and no graph is
// recorded for it.
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::{bail, Result};
use burn::{data::dataset::Dataset, tensor::backend::AutodiffBackend};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::time::Instant;

use crate::application::train_use_case::TrainConfig;
use crate::data::dataset::ConversationDataset;
use crate::domain::vocabulary::Vocabulary;
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::{LossLogger, LossPoint},
};
use crate::ml::{evaluator::Evaluator, hred::Hred, optim, stepper::TurnStepper};

type MyBackend = burn::backend::Autodiff<burn::backend::Wgpu>;

/// What a finished run reports back to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainSummary {
    pub iterations:    usize,
    /// Mean loss of the final print interval
    pub last_avg_loss: Option<f64>,
}

pub fn run_training(
    cfg:          &TrainConfig,
    vocab:        &Vocabulary,
    dataset:      &ConversationDataset,
    ckpt_manager: &CheckpointManager,
) -> Result<TrainSummary> {
    let device = burn::backend::wgpu::WgpuDevice::default();
    tracing::info!("Using WGPU device: {:?}", device);
    train_loop::<MyBackend>(cfg, vocab, dataset, ckpt_manager, device)
}

/// Running sum of per-conversation losses over one reporting interval.
#[derive(Debug, Default)]
struct LossWindow {
    total: f64,
    count: usize,
}

impl LossWindow {
    fn add(&mut self, loss: f64) {
        self.total += loss;
        self.count += 1;
    }

    /// Interval mean; resets the window.
    fn take(&mut self) -> Option<f64> {
        let mean = (self.count > 0).then(|| self.total / self.count as f64);
        *self = Self::default();
        mean
    }
}

pub fn train_loop<B: AutodiffBackend>(
    cfg:          &TrainConfig,
    vocab:        &Vocabulary,
    dataset:      &ConversationDataset,
    ckpt_manager: &CheckpointManager,
    device:       B::Device,
) -> Result<TrainSummary> {
    cfg.validate()?;
    if dataset.is_empty() {
        bail!("Cannot train on an empty dataset");
    }

    // ── Build model ───────────────────────────────────────────────────────────
    let hred: Hred<B> = cfg.hred_config().init(&device);
    let (enc, ctx, dec) = hred.num_params();
    tracing::info!(
        "Model ready: hidden={}, layers={}, params encoder={} context={} decoder={}",
        cfg.hidden_size, cfg.n_layers, enc, ctx, dec,
    );

    let optims      = optim::adam::<B>(cfg.lr);
    tracing::info!("Adam lr={} per component", optims.learning_rate());
    let mut stepper = TurnStepper::new(
        hred,
        optims,
        vocab,
        cfg.teacher_forcing_ratio,
        device.clone(),
    );
    let metrics = LossLogger::new(ckpt_manager.dir())?;

    let mut rng = match cfg.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None       => StdRng::from_entropy(),
    };

    let start           = Instant::now();
    let checkpoint_every = 3 * cfg.print_every;
    let mut print_window = LossWindow::default();
    let mut plot_window  = LossWindow::default();
    let mut last_avg     = None;
    let mut iter         = 0usize;

    // ── Iteration loop ────────────────────────────────────────────────────────
    while cfg.max_iters.map_or(true, |max| iter < max) {
        iter += 1;

        let Some(conversation) = dataset.sample(&mut rng) else {
            bail!("Dataset returned no conversation");
        };
        let report = stepper.train_conversation(&conversation, &mut rng)?;
        tracing::debug!(
            "iter {} turns={} forced={} loss={:?}",
            iter,
            conversation.turns.len(),
            report.teacher_forced,
            report.loss,
        );
        if let Some(loss) = report.loss {
            print_window.add(loss);
            plot_window.add(loss);
        }

        if iter % cfg.print_every == 0 {
            let avg  = print_window.take();
            last_avg = avg.or(last_avg);
            println!(
                "steps {} loss {:.4} ({})",
                iter,
                avg.unwrap_or(f64::NAN),
                time_since(start, iter, cfg.max_iters),
            );
        }

        if iter % cfg.plot_every == 0 {
            if let Some(avg) = plot_window.take() {
                metrics.log(&LossPoint::new(iter, avg))?;
            }
        }

        if iter % checkpoint_every == 0 {
            ckpt_manager.save_components(stepper.model(), iter)?;
            tracing::info!("Checkpoint saved at iteration {}", iter);
        }

        if iter % cfg.evaluate_every == 0 {
            let evaluator = Evaluator::new(stepper.model().valid(), vocab, device.clone());
            print_samples(&evaluator, vocab, dataset, cfg.eval_samples, &mut rng)?;
        }
    }

    // Keep the final weights when the run stops between checkpoints
    if iter % checkpoint_every != 0 {
        ckpt_manager.save_components(stepper.model(), iter)?;
    }

    tracing::info!("Training complete after {} iterations", iter);
    Ok(TrainSummary { iterations: iter, last_avg_loss: last_avg.or(print_window.take()) })
}

/// Print `count` random conversations as `>` source lines followed by
/// the model's `<` continuation.
fn print_samples<B: burn::prelude::Backend, R: Rng + ?Sized>(
    evaluator: &Evaluator<B>,
    vocab:     &Vocabulary,
    dataset:   &ConversationDataset,
    count:     usize,
    rng:       &mut R,
) -> Result<()> {
    for _ in 0..count {
        let Some(conversation) = dataset.sample(rng) else { break };
        let sources = conversation.sources();
        for line in conversation.text.iter().take(sources.len()) {
            println!("> {line}");
        }
        let generation = evaluator.evaluate(sources, vocab)?;
        println!("< {}", generation.sentence());
        println!();
    }
    Ok(())
}

fn as_minutes(secs: f64) -> String {
    let minutes = (secs / 60.0).floor();
    format!("{}m {}s", minutes as u64, (secs - minutes * 60.0) as u64)
}

/// Elapsed time, plus the estimated remainder when the run is bounded.
fn time_since(start: Instant, iter: usize, max_iters: Option<usize>) -> String {
    let elapsed = start.elapsed().as_secs_f64();
    match max_iters {
        Some(max) if iter > 0 && max > 0 => {
            let percent   = iter as f64 / max as f64;
            let estimated = elapsed / percent;
            format!("{} (- {})", as_minutes(elapsed), as_minutes(estimated - elapsed))
        }
        _ => as_minutes(elapsed),
    }
}
