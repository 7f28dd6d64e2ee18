// ============================================================
// Layer 5 — Evaluator (greedy generation)
// ============================================================
// Inference-only walk over the source turns of a conversation:
//
//   context = 0
//   for each source turn: encode, fold into context
//   decode the final source turn greedily from </d>:
//       token = argmax(log p); stop on </s> or after max_length
//
// Runs on whatever backend the components live on. During training
// it is handed the `valid()` copy (inner backend, dropout off), so
// no autodiff graph is built and the training copy is untouched.

use anyhow::Result;
use burn::prelude::*;
use serde::Serialize;

use crate::domain::conversation::Utterance;
use crate::domain::vocabulary::Vocabulary;
use crate::ml::hred::Hred;

/// Greedy output for one conversation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Generation {
    pub token_ids:  Vec<usize>,
    pub words:      Vec<String>,
    /// One row of `max_length` weights per generated token
    pub attentions: Vec<Vec<f32>>,
    /// `</s>` was produced before the step limit
    pub finished:   bool,
}

impl Generation {
    pub fn sentence(&self) -> String {
        self.words.join(" ")
    }

    pub fn len(&self) -> usize {
        self.token_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.token_ids.is_empty()
    }
}

pub struct Evaluator<B: Backend> {
    hred:       Hred<B>,
    max_length: usize,
    sos_id:     usize,
    eos_id:     usize,
    device:     B::Device,
}

impl<B: Backend> Evaluator<B> {
    /// The step limit is the decoder's attention width, so encoder
    /// buffers and attention weights always agree in shape.
    pub fn new(hred: Hred<B>, vocab: &Vocabulary, device: B::Device) -> Self {
        Self {
            max_length: hred.decoder.max_length,
            hred,
            sos_id: vocab.sos_id(),
            eos_id: vocab.eos_id(),
            device,
        }
    }

    pub fn evaluate(&self, sources: &[Utterance], vocab: &Vocabulary) -> Result<Generation> {
        let Some((last, history)) = sources.split_last() else {
            return Ok(Generation::default());
        };

        let mut context = self.hred.context.init_state(&self.device);
        for turn in history {
            let encoded = self.hred.encoder.encode(turn.ids(), self.max_length, &self.device)?;
            context     = self.hred.context.step(encoded.final_hidden, context);
        }

        let encoded = self.hred.encoder.encode(last.ids(), self.max_length, &self.device)?;
        context     = self.hred.context.step(encoded.final_hidden.clone(), context);

        let decoder    = &self.hred.decoder;
        let mut hidden = decoder.initial_hidden(&encoded);
        let mut input  = self.sos_id;
        let mut out    = Generation::default();

        for _ in 0..self.max_length {
            let step  = decoder.step(input, hidden, &encoded, &context);
            let token = step.top_token();
            let attn  = step
                .attn_weights
                .into_data()
                .to_vec::<f32>()
                .map_err(|e| anyhow::anyhow!("Cannot read attention weights: {e:?}"))?;

            out.attentions.push(attn);
            out.token_ids.push(token);

            if token == self.eos_id {
                out.finished = true;
                break;
            }
            hidden = step.hidden;
            input  = token;
        }

        out.words = vocab.decode(&out.token_ids);

        tracing::debug!(
            "Generated {} tokens (finished={}) from {} source turns",
            out.len(),
            out.finished,
            sources.len()
        );
        Ok(out)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::hred::HredConfig;
    use crate::test_util::{toy_vocab, TestBackend};

    const MAX_LEN: usize = 7;

    fn evaluator() -> Evaluator<TestBackend> {
        let device = Default::default();
        let hred   = HredConfig::new(5)
            .with_hidden_size(6)
            .with_max_length(MAX_LEN)
            .with_dropout(0.0)
            .init::<TestBackend>(&device);
        Evaluator::new(hred, &toy_vocab(), device)
    }

    fn sources() -> Vec<Utterance> {
        vec![Utterance::from_ids(vec![3, 4, 1]), Utterance::from_ids(vec![4, 1])]
    }

    #[test]
    fn test_terminates_within_max_length() {
        let generation = evaluator().evaluate(&sources(), &toy_vocab()).unwrap();
        assert!(!generation.is_empty());
        assert!(generation.len() <= MAX_LEN);
        if !generation.finished {
            assert_eq!(generation.len(), MAX_LEN);
        }
    }

    #[test]
    fn test_stops_right_after_eos() {
        let vocab      = toy_vocab();
        let generation = evaluator().evaluate(&sources(), &vocab).unwrap();
        let eos_at     = generation.token_ids.iter().position(|&t| t == vocab.eos_id());
        match eos_at {
            Some(i) => {
                assert!(generation.finished);
                assert_eq!(i + 1, generation.len());
            }
            None => assert!(!generation.finished),
        }
    }

    #[test]
    fn test_one_attention_row_per_token() {
        let generation = evaluator().evaluate(&sources(), &toy_vocab()).unwrap();
        assert_eq!(generation.attentions.len(), generation.len());
        assert_eq!(generation.words.len(), generation.len());
        for row in &generation.attentions {
            assert_eq!(row.len(), MAX_LEN);
            let total: f32 = row.iter().sum();
            assert!((total - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_empty_sources_give_empty_generation() {
        let generation = evaluator().evaluate(&[], &toy_vocab()).unwrap();
        assert!(generation.is_empty());
        assert!(generation.attentions.is_empty());
        assert!(!generation.finished);
        assert_eq!(generation.sentence(), "");
    }

    #[test]
    fn test_step_limit_follows_model_max_length() {
        let device = Default::default();
        let hred   = HredConfig::new(5)
            .with_hidden_size(6)
            .with_max_length(3)
            .init::<TestBackend>(&device);
        let eval   = Evaluator::new(hred, &toy_vocab(), device);
        let short  = vec![Utterance::from_ids(vec![3, 1])];

        let generation = eval.evaluate(&short, &toy_vocab()).unwrap();
        assert!(generation.len() <= 3);
        assert!(generation.attentions.iter().all(|row| row.len() == 3));

        // Anything longer than the model's buffer is an error, not a panic
        let long = vec![Utterance::from_ids(vec![3, 4, 3, 1])];
        assert!(eval.evaluate(&long, &toy_vocab()).is_err());
    }

    #[test]
    fn test_words_follow_vocabulary() {
        let vocab      = toy_vocab();
        let generation = evaluator().evaluate(&sources(), &vocab).unwrap();
        assert_eq!(generation.words, vocab.decode(&generation.token_ids));
    }

    #[test]
    fn test_deterministic_without_dropout() {
        let eval = evaluator();
        let a    = eval.evaluate(&sources(), &toy_vocab()).unwrap();
        let b    = eval.evaluate(&sources(), &toy_vocab()).unwrap();
        assert_eq!(a.token_ids, b.token_ids);
    }
}
