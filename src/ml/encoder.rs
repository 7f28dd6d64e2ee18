// ============================================================
// Layer 5 — Utterance Encoder
// ============================================================
// Reads one utterance token by token:
//
//   ids ──embedding──► x_t ──GRU (n_layers times)──► h_t
//
// and returns
//   outputs      — [max_length, hidden]: row t holds h_t, rows past
//                  the utterance length stay zero
//   final_hidden — [1, hidden]: h_{len-1}, which seeds both the
//                  context aggregator and the decoder
//
// The outputs buffer has a fixed capacity because the decoder's
// attention layer scores exactly max_length positions. Input that
// does not fit is rejected; the data layer clamps utterances
// before they get here.

use anyhow::{bail, Result};
use burn::{
    nn::{Embedding, EmbeddingConfig},
    prelude::*,
};

use crate::ml::gru::{GruCell, GruCellConfig};

#[derive(Config, Debug)]
pub struct EncoderConfig {
    pub vocab_size:  usize,
    pub hidden_size: usize,
    #[config(default = 1)]
    pub n_layers:    usize,
}

impl EncoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> EncoderRnn<B> {
        EncoderRnn {
            embedding:   EmbeddingConfig::new(self.vocab_size, self.hidden_size).init(device),
            cell:        GruCellConfig::new(self.hidden_size, self.hidden_size).init(device),
            hidden_size: self.hidden_size,
            n_layers:    self.n_layers,
        }
    }
}

#[derive(Module, Debug)]
pub struct EncoderRnn<B: Backend> {
    pub embedding:   Embedding<B>,
    pub cell:        GruCell<B>,
    pub hidden_size: usize,
    pub n_layers:    usize,
}

/// Everything the decoder needs from one encoded utterance.
#[derive(Debug, Clone)]
pub struct EncoderOutput<B: Backend> {
    /// [max_length, hidden]
    pub outputs:      Tensor<B, 2>,
    /// [1, hidden]
    pub final_hidden: Tensor<B, 2>,
    /// Number of filled rows in `outputs`
    pub len:          usize,
}

impl<B: Backend> EncoderRnn<B> {
    pub fn init_hidden(&self, device: &B::Device) -> Tensor<B, 2> {
        self.cell.zero_state(device)
    }

    /// One token: embedded input [1, hidden] and previous state → new state.
    pub fn step(&self, embedded: Tensor<B, 2>, hidden: Tensor<B, 2>) -> Tensor<B, 2> {
        let mut input  = embedded;
        let mut hidden = hidden;
        for _ in 0..self.n_layers {
            hidden = self.cell.step(input, hidden);
            input  = hidden.clone();
        }
        hidden
    }

    /// Encode a whole utterance into a `max_length`-row buffer.
    pub fn encode(
        &self,
        tokens:     &[usize],
        max_length: usize,
        device:     &B::Device,
    ) -> Result<EncoderOutput<B>> {
        let len = tokens.len();
        if len == 0 {
            bail!("Cannot encode an empty utterance");
        }
        if len > max_length {
            bail!("Utterance of {len} tokens exceeds max_length={max_length}");
        }

        let ids: Vec<i32> = tokens.iter().map(|&t| t as i32).collect();
        let embedded = self.embedding.forward(
            Tensor::<B, 1, Int>::from_ints(ids.as_slice(), device).reshape([1, len]),
        ); // [1, len, hidden]

        let h          = self.hidden_size;
        let mut hidden = self.init_hidden(device);
        let mut rows   = Vec::with_capacity(len + 1);

        for t in 0..len {
            let x  = embedded.clone().narrow(1, t, 1).reshape([1, h]);
            hidden = self.step(x, hidden);
            rows.push(hidden.clone());
        }
        if len < max_length {
            rows.push(Tensor::zeros([max_length - len, h], device));
        }

        Ok(EncoderOutput {
            outputs:      Tensor::cat(rows, 0),
            final_hidden: hidden,
            len,
        })
    }
}
