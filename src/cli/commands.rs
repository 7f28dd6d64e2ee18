// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Two subcommands, `train` and `sample`. Both take the corpus
// and the vocabulary file as positional arguments.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};

use crate::application::{sample_use_case::SampleUseCase, train_use_case::TrainConfig};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train an HRED model on a conversation corpus
    Train(TrainArgs),

    /// Generate continuations with a trained checkpoint
    Sample(SampleArgs),
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Corpus file: one conversation per line, turns separated by </s>
    pub data: String,

    /// Vocabulary file: JSON array of [word, id] pairs
    pub vocab: String,

    /// Directory for checkpoints, config and the loss curve
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Size of every hidden state
    #[arg(long, default_value_t = 300)]
    pub hidden_size: usize,

    /// Longest utterance in tokens (including </s>); also the
    /// number of positions attention scores
    #[arg(long, default_value_t = 100)]
    pub max_length: usize,

    /// Times each GRU cell is applied per step
    #[arg(long, default_value_t = 1)]
    pub n_layers: usize,

    /// Dropout on the decoder's embedded input
    #[arg(long, default_value_t = 0.1)]
    pub dropout: f64,

    /// Adam learning rate for all three components
    #[arg(long, default_value_t = 1e-4)]
    pub lr: f64,

    /// Probability of feeding gold tokens to the decoder
    #[arg(long, default_value_t = 0.5)]
    pub teacher_forcing_ratio: f64,

    /// Print the average loss every N iterations; checkpoints every 3N
    #[arg(long, default_value_t = 100)]
    pub print_every: usize,

    /// Append to the loss curve every N iterations
    #[arg(long, default_value_t = 100)]
    pub plot_every: usize,

    /// Print sample generations every N iterations
    #[arg(long, default_value_t = 600)]
    pub evaluate_every: usize,

    /// Conversations shown per evaluation
    #[arg(long, default_value_t = 10)]
    pub eval_samples: usize,

    /// Stop after N iterations (default: run until interrupted)
    #[arg(long)]
    pub max_iters: Option<usize>,

    /// Seed for conversation sampling and teacher forcing
    #[arg(long)]
    pub seed: Option<u64>,
}

impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            data_path:             a.data,
            vocab_path:            a.vocab,
            checkpoint_dir:        a.checkpoint_dir,
            vocab_size:            0,
            hidden_size:           a.hidden_size,
            max_length:            a.max_length,
            n_layers:              a.n_layers,
            dropout:               a.dropout,
            lr:                    a.lr,
            teacher_forcing_ratio: a.teacher_forcing_ratio,
            print_every:           a.print_every,
            plot_every:            a.plot_every,
            evaluate_every:        a.evaluate_every,
            eval_samples:          a.eval_samples,
            max_iters:             a.max_iters,
            seed:                  a.seed,
        }
    }
}

#[derive(Args, Debug)]
pub struct SampleArgs {
    /// Corpus file to draw conversations from
    pub data: String,

    /// Vocabulary file used for training
    pub vocab: String,

    /// Directory where checkpoints were saved during training
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Number of conversations to decode
    #[arg(long, default_value_t = 10)]
    pub count: usize,

    #[arg(long)]
    pub seed: Option<u64>,

    /// Write attention weights of every sample to this JSON file
    #[arg(long)]
    pub attention_out: Option<String>,
}

impl From<SampleArgs> for SampleUseCase {
    fn from(a: SampleArgs) -> Self {
        SampleUseCase {
            data_path:      a.data,
            vocab_path:     a.vocab,
            checkpoint_dir: a.checkpoint_dir,
            count:          a.count,
            seed:           a.seed,
            attention_out:  a.attention_out,
        }
    }
}
