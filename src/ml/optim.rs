// ============================================================
// Layer 5 — Per-Component Optimizers
// ============================================================
// One Adam instance per component, all sharing a learning rate.
// A single backward pass produces one gradient store; each
// component takes out the gradients of its own parameters with
// GradientsParams::from_module and steps its own optimizer.
//
//   m = β1*m + (1-β1)*g        (mean)
//   v = β2*v + (1-β2)*g²       (variance)
//   θ = θ - lr * m / (√v + ε)  (update)
//
// Reference: Kingma & Ba (2015) Adam
//            Burn Book §5 (Optimizers)

use burn::{
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::ml::context::ContextRnn;
use crate::ml::decoder::AttnDecoderRnn;
use crate::ml::encoder::EncoderRnn;
use crate::ml::hred::Hred;

pub struct HredOptimizers<OE, OC, OD> {
    encoder: OE,
    context: OC,
    decoder: OD,
    lr:      f64,
}

/// Adam for all three components.
#[allow(clippy::type_complexity)]
pub fn adam<B: AutodiffBackend>(
    lr: f64,
) -> HredOptimizers<
    impl Optimizer<EncoderRnn<B>, B>,
    impl Optimizer<ContextRnn<B>, B>,
    impl Optimizer<AttnDecoderRnn<B>, B>,
> {
    let cfg = AdamConfig::new().with_epsilon(1e-8);
    HredOptimizers {
        encoder: cfg.init::<B, EncoderRnn<B>>(),
        context: cfg.init::<B, ContextRnn<B>>(),
        decoder: cfg.init::<B, AttnDecoderRnn<B>>(),
        lr,
    }
}

impl<OE, OC, OD> HredOptimizers<OE, OC, OD> {
    pub fn learning_rate(&self) -> f64 {
        self.lr
    }

    /// Backward pass from `loss`, then one update of every component.
    pub fn step<B>(&mut self, hred: Hred<B>, loss: Tensor<B, 1>) -> Hred<B>
    where
        B:  AutodiffBackend,
        OE: Optimizer<EncoderRnn<B>, B>,
        OC: Optimizer<ContextRnn<B>, B>,
        OD: Optimizer<AttnDecoderRnn<B>, B>,
    {
        let mut grads = loss.backward();

        let encoder_grads = GradientsParams::from_module(&mut grads, &hred.encoder);
        let context_grads = GradientsParams::from_module(&mut grads, &hred.context);
        let decoder_grads = GradientsParams::from_module(&mut grads, &hred.decoder);

        Hred {
            encoder: self.encoder.step(self.lr, hred.encoder, encoder_grads),
            context: self.context.step(self.lr, hred.context, context_grads),
            decoder: self.decoder.step(self.lr, hred.decoder, decoder_grads),
        }
    }
}
