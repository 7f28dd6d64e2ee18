// ============================================================
// Layer 5 — Attention Decoder
// ============================================================
// Produces one output token per call. Per step:
//
//   1. e  = dropout(embed(prev_token))
//   2. a  = softmax(attn([e, h]))               over max_length slots
//   3. v  = a · encoder_outputs                 attention-applied
//   4. x  = attn_combine([e, v])
//   5. per layer: x = relu(x); h = GRU([x, context], h); x = h
//   6. log p = log_softmax(out(h))
//
// The context aggregator's state enters at step 5, concatenated
// feature-wise with the cell input, so every token is generated
// knowing the conversation so far.
//
// The first hidden state of a turn is the encoder's final state
// (see `initial_hidden`). Log-probabilities are returned rather
// than logits: the training loss reads the target entry directly
// as the negative log-likelihood.
//
// Reference: Bahdanau et al. (2015) attention
//            Serban et al. (2016) HRED

use burn::{
    nn::{Dropout, DropoutConfig, Embedding, EmbeddingConfig, Linear, LinearConfig},
    prelude::*,
    tensor::activation::{log_softmax, relu, softmax},
};

use crate::ml::encoder::EncoderOutput;
use crate::ml::gru::{GruCell, GruCellConfig};

#[derive(Config, Debug)]
pub struct DecoderConfig {
    pub vocab_size:  usize,
    pub hidden_size: usize,
    pub max_length:  usize,
    #[config(default = 1)]
    pub n_layers:    usize,
    #[config(default = 0.1)]
    pub dropout:     f64,
}

impl DecoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> AttnDecoderRnn<B> {
        let h = self.hidden_size;
        AttnDecoderRnn {
            embedding:    EmbeddingConfig::new(self.vocab_size, h).init(device),
            attn:         LinearConfig::new(2 * h, self.max_length).init(device),
            attn_combine: LinearConfig::new(2 * h, h).init(device),
            dropout:      DropoutConfig::new(self.dropout).init(),
            cell:         GruCellConfig::new(2 * h, h).init(device),
            out:          LinearConfig::new(h, self.vocab_size).init(device),
            hidden_size:  h,
            max_length:   self.max_length,
            n_layers:     self.n_layers,
        }
    }
}

#[derive(Module, Debug)]
pub struct AttnDecoderRnn<B: Backend> {
    pub embedding:    Embedding<B>,
    pub attn:         Linear<B>,
    pub attn_combine: Linear<B>,
    pub dropout:      Dropout,
    pub cell:         GruCell<B>,
    pub out:          Linear<B>,
    pub hidden_size:  usize,
    pub max_length:   usize,
    pub n_layers:     usize,
}

/// Result of one decoding step.
#[derive(Debug, Clone)]
pub struct DecoderStep<B: Backend> {
    /// [1, vocab]
    pub log_probs:    Tensor<B, 2>,
    /// [1, hidden]
    pub hidden:       Tensor<B, 2>,
    /// [1, max_length], sums to one
    pub attn_weights: Tensor<B, 2>,
}

impl<B: Backend> DecoderStep<B> {
    /// Arg-max token of the distribution.
    pub fn top_token(&self) -> usize {
        self.log_probs.clone().argmax(1).into_scalar().elem::<i64>() as usize
    }

    /// Negative log-likelihood of `target`, shape [1].
    pub fn nll(&self, target: usize) -> Tensor<B, 1> {
        self.log_probs.clone().narrow(1, target, 1).reshape([1]).neg()
    }
}

impl<B: Backend> AttnDecoderRnn<B> {
    pub fn initial_hidden(&self, encoded: &EncoderOutput<B>) -> Tensor<B, 2> {
        encoded.final_hidden.clone()
    }

    pub fn step(
        &self,
        prev_token: usize,
        hidden:     Tensor<B, 2>,
        encoded:    &EncoderOutput<B>,
        context:    &Tensor<B, 2>,
    ) -> DecoderStep<B> {
        let device = hidden.device();
        let h      = self.hidden_size;

        let token    = Tensor::<B, 1, Int>::from_ints([prev_token as i32], &device).unsqueeze::<2>();
        let embedded = self.embedding.forward(token).reshape([1, h]);
        let embedded = self.dropout.forward(embedded);

        let attn_weights = softmax(
            self.attn.forward(Tensor::cat(vec![embedded.clone(), hidden.clone()], 1)),
            1,
        );
        let attn_applied = attn_weights.clone().matmul(encoded.outputs.clone()); // [1, hidden]

        let mut input  = self.attn_combine.forward(Tensor::cat(vec![embedded, attn_applied], 1));
        let mut hidden = hidden;
        for _ in 0..self.n_layers {
            let x  = Tensor::cat(vec![relu(input), context.clone()], 1);
            hidden = self.cell.step(x, hidden);
            input  = hidden.clone();
        }

        let log_probs = log_softmax(self.out.forward(hidden.clone()), 1);

        DecoderStep { log_probs, hidden, attn_weights }
    }
}
