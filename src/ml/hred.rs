// ============================================================
// Layer 5 — HRED Components
// ============================================================
// The three independently owned modules of the model:
//
//   EncoderRnn      — tokens of one turn   → utterance state
//   ContextRnn      — utterance states     → conversation state
//   AttnDecoderRnn  — (utterance, context) → next turn's tokens
//
// They are kept as separate burn Modules rather than one big
// Module because each has its own optimizer and its own
// checkpoint file. `Hred` is only a bundle for passing them
// around together.

use burn::{module::AutodiffModule, prelude::*, tensor::backend::AutodiffBackend};

use crate::ml::context::{ContextConfig, ContextRnn};
use crate::ml::decoder::{AttnDecoderRnn, DecoderConfig};
use crate::ml::encoder::{EncoderConfig, EncoderRnn};

#[derive(Config, Debug)]
pub struct HredConfig {
    pub vocab_size:  usize,
    #[config(default = 300)]
    pub hidden_size: usize,
    #[config(default = 100)]
    pub max_length:  usize,
    #[config(default = 1)]
    pub n_layers:    usize,
    #[config(default = 0.1)]
    pub dropout:     f64,
}

impl HredConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Hred<B> {
        Hred {
            encoder: EncoderConfig::new(self.vocab_size, self.hidden_size)
                .with_n_layers(self.n_layers)
                .init(device),
            context: ContextConfig::new(self.hidden_size)
                .with_n_layers(self.n_layers)
                .init(device),
            decoder: DecoderConfig::new(self.vocab_size, self.hidden_size, self.max_length)
                .with_n_layers(self.n_layers)
                .with_dropout(self.dropout)
                .init(device),
        }
    }
}

/// The three components, owned together but trained and saved apart.
#[derive(Debug, Clone)]
pub struct Hred<B: Backend> {
    /// Reads one turn at a time
    pub encoder: EncoderRnn<B>,
    /// Carries state across the turns of one conversation; reset per sample
    pub context: ContextRnn<B>,
    /// Generates the next turn. Its `max_length` bounds both decoding
    /// and the encoder output buffer.
    pub decoder: AttnDecoderRnn<B>,
}

impl<B: Backend> Hred<B> {
    /// Parameter count per component: (encoder, context, decoder).
    pub fn num_params(&self) -> (usize, usize, usize) {
        (
            self.encoder.num_params(),
            self.context.num_params(),
            self.decoder.num_params(),
        )
    }
}

impl<B: AutodiffBackend> Hred<B> {
    /// Inference copy on the inner backend: no autodiff graph,
    /// dropout disabled. Used for periodic evaluation so the
    /// training copy is never touched.
    pub fn valid(&self) -> Hred<B::InnerBackend> {
        Hred {
            encoder: self.encoder.valid(),
            context: self.context.valid(),
            decoder: self.decoder.valid(),
        }
    }
}
