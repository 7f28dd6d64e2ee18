// ============================================================
// Layer 5 — GRU Cell
// ============================================================
// One step of a gated recurrent unit, shared by the encoder,
// the context aggregator and the decoder.
//
//   r  = σ(W_ir·x + W_hr·h)            reset gate
//   z  = σ(W_iz·x + W_hz·h)            update gate
//   n  = tanh(W_in·x + r ⊙ (W_hn·h))   candidate state
//   h' = (1 − z) ⊙ n + z ⊙ h
//
// The three input projections live in one Linear (d_input → 3H)
// and the three hidden projections in another (H → 3H); gates
// are read back with narrow(). Both Linears carry biases.
//
// Reference: Cho et al. (2014) GRU
//            Burn Book §3 (Building Blocks)

use burn::{
    nn::{Linear, LinearConfig},
    prelude::*,
    tensor::activation::sigmoid,
};

#[derive(Config, Debug)]
pub struct GruCellConfig {
    pub d_input:  usize,
    pub d_hidden: usize,
}

impl GruCellConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> GruCell<B> {
        GruCell {
            input_gates:  LinearConfig::new(self.d_input, 3 * self.d_hidden).init(device),
            hidden_gates: LinearConfig::new(self.d_hidden, 3 * self.d_hidden).init(device),
            d_hidden:     self.d_hidden,
        }
    }
}

#[derive(Module, Debug)]
pub struct GruCell<B: Backend> {
    pub input_gates:  Linear<B>,
    pub hidden_gates: Linear<B>,
    pub d_hidden:     usize,
}

impl<B: Backend> GruCell<B> {
    /// input: [batch, d_input], hidden: [batch, d_hidden] → new hidden [batch, d_hidden]
    pub fn step(&self, input: Tensor<B, 2>, hidden: Tensor<B, 2>) -> Tensor<B, 2> {
        let h  = self.d_hidden;
        let gi = self.input_gates.forward(input);
        let gh = self.hidden_gates.forward(hidden.clone());

        let reset  = sigmoid(gi.clone().narrow(1, 0, h) + gh.clone().narrow(1, 0, h));
        let update = sigmoid(gi.clone().narrow(1, h, h) + gh.clone().narrow(1, h, h));
        let candidate = (gi.narrow(1, 2 * h, h) + reset * gh.narrow(1, 2 * h, h)).tanh();

        let keep = update.clone().neg().add_scalar(1.0);
        keep * candidate + update * hidden
    }

    pub fn zero_state(&self, device: &B::Device) -> Tensor<B, 2> {
        Tensor::zeros([1, self.d_hidden], device)
    }
}
