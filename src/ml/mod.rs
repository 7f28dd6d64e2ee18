// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All Burn model code lives here. Other layers hand it encoded
// conversations and get back losses, generations and weights.
//
//   gru.rs       — GRU cell shared by all three components
//   encoder.rs   — Utterance encoder: tokens → states
//   context.rs   — Context aggregator: turn states → conversation state
//   decoder.rs   — Attention decoder: one token per step
//   hred.rs      — The three components bundled, plus HredConfig
//   optim.rs     — One Adam per component, shared backward pass
//   stepper.rs   — Per-conversation training state machine
//   evaluator.rs — Greedy generation for inspection and sampling
//   trainer.rs   — Iteration loop: print, plot, checkpoint, evaluate
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Serban et al. (2016) Hierarchical Recurrent Encoder-Decoder

/// Gated recurrent unit cell
pub mod gru;

/// Utterance encoder
pub mod encoder;

/// Context aggregator over turns
pub mod context;

/// Attention decoder
pub mod decoder;

/// Component bundle and model hyper-parameters
pub mod hred;

/// Per-component optimizers
pub mod optim;

/// Turn-stepper training state machine
pub mod stepper;

/// Greedy evaluator
pub mod evaluator;

/// Training loop with checkpointing and periodic evaluation
pub mod trainer;
