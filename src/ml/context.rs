// ============================================================
// Layer 5 — Context Aggregator
// ============================================================
// The "hierarchical" part of HRED: a GRU that runs over turns
// rather than tokens. Its input is the encoder's final state
// (already in hidden space, so there is no embedding), and its
// hidden state is the running summary of the conversation.
//
//   c_0 = 0
//   c_i = GRU(final_hidden(turn_i), c_{i-1})
//
// The state lives for one conversation and restarts from zero
// at the next one.

use burn::prelude::*;

use crate::ml::gru::{GruCell, GruCellConfig};

#[derive(Config, Debug)]
pub struct ContextConfig {
    pub hidden_size: usize,
    #[config(default = 1)]
    pub n_layers:    usize,
}

impl ContextConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> ContextRnn<B> {
        ContextRnn {
            cell:     GruCellConfig::new(self.hidden_size, self.hidden_size).init(device),
            n_layers: self.n_layers,
        }
    }
}

#[derive(Module, Debug)]
pub struct ContextRnn<B: Backend> {
    pub cell:     GruCell<B>,
    pub n_layers: usize,
}

impl<B: Backend> ContextRnn<B> {
    /// Fresh conversation state: the zero vector.
    pub fn init_state(&self, device: &B::Device) -> Tensor<B, 2> {
        self.cell.zero_state(device)
    }

    /// Fold one utterance representation [1, hidden] into the state.
    pub fn step(&self, utterance: Tensor<B, 2>, state: Tensor<B, 2>) -> Tensor<B, 2> {
        let mut input = utterance;
        let mut state = state;
        for _ in 0..self.n_layers {
            state = self.cell.step(input, state);
            input = state.clone();
        }
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::TestBackend;

    #[test]
    fn test_initial_state_is_zero() {
        let device = Default::default();
        let ctx: ContextRnn<TestBackend> = ContextConfig::new(4).init(&device);
        let sum = ctx.init_state(&device).abs().sum().into_scalar().elem::<f32>();
        assert_eq!(sum, 0.0);
    }

    #[test]
    fn test_step_depends_on_history() {
        let device = Default::default();
        let ctx: ContextRnn<TestBackend> = ContextConfig::new(4).init(&device);
        let u = Tensor::<TestBackend, 2>::ones([1, 4], &device);

        let once  = ctx.step(u.clone(), ctx.init_state(&device));
        let twice = ctx.step(u, once.clone());

        assert_eq!(twice.dims(), [1, 4]);
        let once  = once.into_data().to_vec::<f32>().unwrap();
        let twice = twice.into_data().to_vec::<f32>().unwrap();
        assert_ne!(once, twice);
    }
}
