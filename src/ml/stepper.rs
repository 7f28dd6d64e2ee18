// ============================================================
// Layer 5 — Turn-Stepper (training state machine)
// ============================================================
// Walks one conversation of T utterances as T-1 transitions:
//
//   ConversationStart
//        │
//        ▼
//   MidConversation (i = 0 .. T-3)   turn i → turn i+1, no loss
//        │
//        ▼
//   LastStep        (i = T-2)        turn i → turn i+1, loss
//        │
//        ▼
//   ConversationEnd                  backward + optimizer steps
//
// Every transition encodes the input turn, folds it into the
// context state and decodes the target turn. Only the transition
// flagged `is_last_turn` accumulates NLL, so only the final
// response of each sampled conversation is supervised directly;
// earlier turns reach the gradient through the context state.
//
// Teacher forcing is drawn once per conversation sample and holds
// for all of its transitions.

use anyhow::{bail, Result};
use burn::{optim::Optimizer, prelude::*, tensor::backend::AutodiffBackend};
use rand::Rng;

use crate::domain::conversation::Conversation;
use crate::domain::vocabulary::Vocabulary;
use crate::ml::context::ContextRnn;
use crate::ml::decoder::AttnDecoderRnn;
use crate::ml::encoder::{EncoderOutput, EncoderRnn};
use crate::ml::hred::Hred;
use crate::ml::optim::HredOptimizers;

// ─── State machine ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    ConversationStart,
    MidConversation,
    LastStep,
    ConversationEnd,
}

/// One (input turn, target turn) step of a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// Input turn index; the target is `index + 1`
    pub index:        usize,
    /// Gates loss accumulation, backward and optimizer steps
    pub is_last_turn: bool,
}

/// Iterator over the transitions of a conversation with `turns` utterances.
#[derive(Debug, Clone)]
pub struct TurnSchedule {
    turns: usize,
    next:  usize,
    phase: TurnPhase,
}

impl TurnSchedule {
    pub fn new(turns: usize) -> Self {
        Self { turns, next: 0, phase: TurnPhase::ConversationStart }
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }
}

impl Iterator for TurnSchedule {
    type Item = Transition;

    fn next(&mut self) -> Option<Transition> {
        match self.phase {
            TurnPhase::ConversationEnd => None,
            TurnPhase::LastStep => {
                self.phase = TurnPhase::ConversationEnd;
                None
            }
            TurnPhase::ConversationStart | TurnPhase::MidConversation => {
                // Fewer than two turns: nothing to pair up
                if self.turns < 2 {
                    self.phase = TurnPhase::ConversationEnd;
                    return None;
                }
                let index        = self.next;
                let is_last_turn = index + 2 == self.turns;
                self.next  += 1;
                self.phase  = if is_last_turn { TurnPhase::LastStep } else { TurnPhase::MidConversation };
                Some(Transition { index, is_last_turn })
            }
        }
    }
}

// ─── Reports ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionReport {
    pub transition:     Transition,
    pub target_len:     usize,
    pub decoded_steps:  usize,
    /// Free-running decoding predicted `</s>` and stopped there
    pub stopped_at_eos: bool,
}

#[derive(Debug, Clone)]
pub struct ConversationReport {
    pub transitions:    Vec<TransitionReport>,
    pub teacher_forced: bool,
    /// Average per-token NLL of the last transition; `None` when the
    /// conversation had no transitions
    pub loss:           Option<f64>,
    /// Context state after the last turn, length `hidden_size`
    pub final_context:  Vec<f32>,
}

struct Decoded<B: Backend> {
    steps:          usize,
    stopped_at_eos: bool,
    loss:           Option<Tensor<B, 1>>,
}

// ─── Turn-stepper ─────────────────────────────────────────────────────────────

pub struct TurnStepper<B: AutodiffBackend, OE, OC, OD> {
    hred:                  Hred<B>,
    optims:                HredOptimizers<OE, OC, OD>,
    teacher_forcing_ratio: f64,
    max_length:            usize,
    sos_id:                usize,
    eos_id:                usize,
    device:                B::Device,
}

impl<B, OE, OC, OD> TurnStepper<B, OE, OC, OD>
where
    B:  AutodiffBackend,
    OE: Optimizer<EncoderRnn<B>, B>,
    OC: Optimizer<ContextRnn<B>, B>,
    OD: Optimizer<AttnDecoderRnn<B>, B>,
{
    /// Utterances are encoded into buffers of the decoder's attention
    /// width (`hred.decoder.max_length`).
    pub fn new(
        hred:                  Hred<B>,
        optims:                HredOptimizers<OE, OC, OD>,
        vocab:                 &Vocabulary,
        teacher_forcing_ratio: f64,
        device:                B::Device,
    ) -> Self {
        Self {
            max_length: hred.decoder.max_length,
            hred,
            optims,
            teacher_forcing_ratio,
            sos_id: vocab.sos_id(),
            eos_id: vocab.eos_id(),
            device,
        }
    }

    pub fn model(&self) -> &Hred<B> {
        &self.hred
    }

    /// Process one conversation sample end to end: forward over every
    /// transition, then (if a last transition produced a loss) one
    /// backward pass and one step of each component's optimizer.
    pub fn train_conversation<R: Rng + ?Sized>(
        &mut self,
        conversation: &Conversation,
        rng:          &mut R,
    ) -> Result<ConversationReport> {
        let teacher_forced = rng.gen::<f64>() < self.teacher_forcing_ratio;

        let mut context     = self.hred.context.init_state(&self.device);
        let mut transitions = Vec::with_capacity(conversation.num_transitions());
        let mut last_loss   = None;

        for transition in TurnSchedule::new(conversation.turns.len()) {
            let input  = &conversation.turns[transition.index];
            let target = &conversation.turns[transition.index + 1];

            let encoded = self.hred.encoder.encode(input.ids(), self.max_length, &self.device)?;
            context     = self.hred.context.step(encoded.final_hidden.clone(), context);

            let decoded = self.decode_target(
                &encoded,
                &context,
                target.ids(),
                teacher_forced,
                transition.is_last_turn,
            );

            transitions.push(TransitionReport {
                transition,
                target_len:     target.len(),
                decoded_steps:  decoded.steps,
                stopped_at_eos: decoded.stopped_at_eos,
            });
            if let Some(loss) = decoded.loss {
                last_loss = Some((loss, target.len()));
            }
        }

        let final_context = context
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| anyhow::anyhow!("Cannot read context state: {e:?}"))?;

        let loss = match last_loss {
            Some((loss, target_len)) => {
                let total = loss.clone().into_scalar().elem::<f64>();
                if !total.is_finite() {
                    bail!("Non-finite loss ({total}) on a {target_len}-token target");
                }
                self.hred = self.optims.step(self.hred.clone(), loss);
                Some(total / target_len as f64)
            }
            None => None,
        };

        Ok(ConversationReport { transitions, teacher_forced, loss, final_context })
    }

    /// Run the decoder across one target turn.
    fn decode_target(
        &self,
        encoded:        &EncoderOutput<B>,
        context:        &Tensor<B, 2>,
        target:         &[usize],
        teacher_forced: bool,
        is_last_turn:   bool,
    ) -> Decoded<B> {
        let decoder        = &self.hred.decoder;
        let mut hidden     = decoder.initial_hidden(encoded);
        let mut input      = self.sos_id;
        let mut loss: Option<Tensor<B, 1>> = None;
        let mut steps      = 0;
        let mut stopped_at_eos = false;

        for &gold in target {
            let step = decoder.step(input, hidden, encoded, context);
            steps += 1;

            if is_last_turn {
                let nll = step.nll(gold);
                loss = Some(match loss {
                    Some(acc) => acc + nll,
                    None      => nll,
                });
            }

            if teacher_forced {
                input = gold;
            } else {
                input = step.top_token();
            }
            hidden = step.hidden;

            if !teacher_forced && input == self.eos_id {
                stopped_at_eos = true;
                break;
            }
        }

        Decoded { steps, stopped_at_eos, loss }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::conversation::Utterance;
    use crate::ml::hred::HredConfig;
    use crate::ml::optim;
    use crate::test_util::{toy_vocab, TestAutodiffBackend};
    use burn::module::Param;
    use rand::{rngs::StdRng, SeedableRng};

    type B = TestAutodiffBackend;

    fn conversation(turns: &[&[usize]]) -> Conversation {
        Conversation {
            turns: turns.iter().map(|t| Utterance::from_ids(t.to_vec())).collect(),
            text:  turns.iter().map(|t| format!("{t:?}")).collect(),
        }
    }

    fn hello_world() -> Conversation {
        conversation(&[&[3, 4, 1], &[4, 3, 1]])
    }

    fn hred(hidden: usize) -> Hred<B> {
        HredConfig::new(5)
            .with_hidden_size(hidden)
            .with_max_length(10)
            .with_dropout(0.0)
            .init(&Default::default())
    }

    fn stepper(
        hred:  Hred<B>,
        lr:    f64,
        ratio: f64,
    ) -> TurnStepper<B, impl Optimizer<EncoderRnn<B>, B>, impl Optimizer<ContextRnn<B>, B>, impl Optimizer<AttnDecoderRnn<B>, B>> {
        TurnStepper::new(hred, optim::adam::<B>(lr), &toy_vocab(), ratio, Default::default())
    }

    #[test]
    fn test_schedule_has_t_minus_one_transitions() {
        for turns in 2..7 {
            let transitions: Vec<_> = TurnSchedule::new(turns).collect();
            assert_eq!(transitions.len(), turns - 1);
            assert_eq!(transitions.iter().filter(|t| t.is_last_turn).count(), 1);
            assert!(transitions.last().unwrap().is_last_turn);
            let indices: Vec<_> = transitions.iter().map(|t| t.index).collect();
            assert_eq!(indices, (0..turns - 1).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_schedule_degenerate_is_empty() {
        for turns in 0..2 {
            let mut schedule = TurnSchedule::new(turns);
            assert_eq!(schedule.next(), None);
            assert_eq!(schedule.phase(), TurnPhase::ConversationEnd);
        }
    }

    #[test]
    fn test_schedule_phases() {
        let mut schedule = TurnSchedule::new(3);
        assert_eq!(schedule.phase(), TurnPhase::ConversationStart);
        schedule.next();
        assert_eq!(schedule.phase(), TurnPhase::MidConversation);
        schedule.next();
        assert_eq!(schedule.phase(), TurnPhase::LastStep);
        assert_eq!(schedule.next(), None);
        assert_eq!(schedule.phase(), TurnPhase::ConversationEnd);
    }

    #[test]
    fn test_end_to_end_single_transition() {
        let mut s   = stepper(hred(8), 1e-3, 0.5);
        let mut rng = StdRng::seed_from_u64(3);
        let report  = s.train_conversation(&hello_world(), &mut rng).unwrap();

        let loss = report.loss.expect("last transition produces a loss");
        assert!(loss.is_finite());
        assert!(loss >= 0.0);
        assert_eq!(report.final_context.len(), 8);
        assert_eq!(report.transitions.len(), 1);
        assert!(report.transitions[0].transition.is_last_turn);
    }

    #[test]
    fn test_single_turn_conversation_is_noop() {
        let mut s   = stepper(hred(4), 1e-3, 0.5);
        let mut rng = StdRng::seed_from_u64(0);
        let report  = s.train_conversation(&conversation(&[&[3, 1]]), &mut rng).unwrap();

        assert!(report.transitions.is_empty());
        assert!(report.loss.is_none());
        assert!(report.final_context.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_teacher_forcing_decodes_full_target() {
        let mut s   = stepper(hred(6), 1e-3, 1.0);
        let mut rng = StdRng::seed_from_u64(5);
        let conv    = conversation(&[&[3, 1], &[4, 4, 3, 1], &[3, 4, 1]]);
        let report  = s.train_conversation(&conv, &mut rng).unwrap();

        assert!(report.teacher_forced);
        assert_eq!(report.transitions.len(), 2);
        for t in &report.transitions {
            assert_eq!(t.decoded_steps, t.target_len);
            assert!(!t.stopped_at_eos);
        }
    }

    #[test]
    fn test_free_running_stops_only_at_eos() {
        let mut s   = stepper(hred(6), 1e-3, 0.0);
        let mut rng = StdRng::seed_from_u64(9);
        let conv    = conversation(&[&[3, 1], &[4, 4, 3, 4, 3, 1], &[3, 4, 3, 4, 1]]);

        for _ in 0..5 {
            let report = s.train_conversation(&conv, &mut rng).unwrap();
            assert!(!report.teacher_forced);
            for t in &report.transitions {
                assert!(t.decoded_steps >= 1);
                assert!(t.decoded_steps <= t.target_len);
                if t.decoded_steps < t.target_len {
                    assert!(t.stopped_at_eos);
                }
            }
        }
    }

    #[test]
    fn test_context_reset_between_conversations() {
        // lr = 0 keeps parameters fixed, so the only thing that could
        // make the second run differ is leaked context state.
        let shared  = hred(6);
        let first   = conversation(&[&[4, 4, 1], &[3, 1], &[4, 3, 1]]);
        let second  = hello_world();
        let mut rng = StdRng::seed_from_u64(11);

        let mut warmed = stepper(shared.clone(), 0.0, 1.0);
        warmed.train_conversation(&first, &mut rng).unwrap();
        let after_other = warmed.train_conversation(&second, &mut rng).unwrap();

        let mut fresh = stepper(shared, 0.0, 1.0);
        let alone     = fresh.train_conversation(&second, &mut rng).unwrap();

        assert_eq!(after_other.final_context, alone.final_context);
    }

    #[test]
    fn test_loss_decreases_on_fixed_example() {
        let mut s   = stepper(hred(16), 1e-2, 1.0);
        let mut rng = StdRng::seed_from_u64(1);
        let conv    = hello_world();

        let losses: Vec<f64> = (0..60)
            .map(|_| s.train_conversation(&conv, &mut rng).unwrap().loss.unwrap())
            .collect();

        let first = losses[0];
        let last  = *losses.last().unwrap();
        assert!(last < first, "loss went from {first} to {last}");
        assert!(last < 0.75 * first, "loss only went from {first} to {last}");
    }

    /// Output bias that makes `</s>` the arg-max of every decoder step.
    fn biased_towards_eos(mut hred: Hred<B>) -> Hred<B> {
        let mut bias = vec![0.0f32; 5];
        bias[toy_vocab().eos_id()] = 50.0;
        hred.decoder.out.bias = Some(Param::from_tensor(Tensor::<B, 1>::from_floats(
            bias.as_slice(),
            &Default::default(),
        )));
        hred
    }

    /// Per-token NLL of the final turn, computed directly: context
    /// built over every source turn, then `steps` gold-fed decoder
    /// steps, divided by the full target length.
    fn last_turn_loss(hred: &Hred<B>, conv: &Conversation, steps: usize) -> f64 {
        let device      = Default::default();
        let (target, sources) = conv.turns.split_last().unwrap();
        let mut context = hred.context.init_state(&device);
        let mut encoded = None;
        for turn in sources {
            let out = hred.encoder.encode(turn.ids(), 10, &device).unwrap();
            context = hred.context.step(out.final_hidden.clone(), context);
            encoded = Some(out);
        }
        let encoded = encoded.unwrap();

        let mut hidden = hred.decoder.initial_hidden(&encoded);
        let mut input  = toy_vocab().sos_id();
        let mut total  = 0.0;
        for &gold in &target.ids()[..steps] {
            let step = hred.decoder.step(input, hidden, &encoded, &context);
            total   += step.nll(gold).into_scalar().elem::<f64>();
            hidden   = step.hidden;
            input    = gold;
        }
        total / target.len() as f64
    }

    fn assert_close(actual: f64, expected: f64) {
        let tol = 1e-4 * expected.abs().max(1.0);
        assert!((actual - expected).abs() < tol, "loss {actual} != {expected}");
    }

    #[test]
    fn test_free_running_stops_after_predicted_eos() {
        let model   = biased_towards_eos(hred(6));
        let conv    = conversation(&[&[3, 4, 1], &[4, 4, 3, 1], &[3, 4, 3, 1]]);
        let expect  = last_turn_loss(&model, &conv, 1);
        let mut s   = stepper(model, 1e-3, 0.0);
        let mut rng = StdRng::seed_from_u64(9);
        let report  = s.train_conversation(&conv, &mut rng).unwrap();

        assert!(!report.teacher_forced);
        assert_eq!(report.transitions.len(), 2);
        for t in &report.transitions {
            assert_eq!(t.target_len, 4);
            assert_eq!(t.decoded_steps, 1);
            assert!(t.stopped_at_eos);
        }
        // One NLL term, averaged over the whole target
        assert_close(report.loss.unwrap(), expect);
    }

    #[test]
    fn test_loss_comes_from_last_transition_only() {
        let model   = hred(6);
        let conv    = conversation(&[&[3, 4, 1], &[4, 4, 3, 1], &[3, 4, 3, 1]]);
        let expect  = last_turn_loss(&model, &conv, 4);
        let mut s   = stepper(model, 0.0, 1.0);
        let mut rng = StdRng::seed_from_u64(2);
        let report  = s.train_conversation(&conv, &mut rng).unwrap();

        assert!(report.teacher_forced);
        assert_close(report.loss.unwrap(), expect);

        // lr = 0: a second pass sees the same weights and the same loss
        let again = s.train_conversation(&conv, &mut rng).unwrap();
        assert_close(again.loss.unwrap(), expect);
    }
}
