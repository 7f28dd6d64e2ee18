// ============================================================
// Layer 3 — Conversation Domain Types
// ============================================================
// A conversation ("group") is an ordered list of utterances.
// Each utterance is a list of token ids terminated by </s>.
//
//   "hello world </s> world hello"
//       → [[hello, world, </s>], [world, hello, </s>]]
//
// Training pairs are formed from consecutive turns:
//   turn i is the encoder input, turn i+1 is the decoder target.
//
// Reference: Rust Book §5 (Structs), §8 (Vectors)

use serde::{Deserialize, Serialize};

use crate::domain::vocabulary::Vocabulary;

/// One turn of a conversation as token ids, always ending in `</s>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utterance {
    ids: Vec<usize>,
}

impl Utterance {
    /// Encode a sentence and append `</s>`.
    ///
    /// At most `max_length` ids are kept: longer sentences are
    /// clamped to `max_length - 1` words plus the terminator so
    /// every utterance fits the encoder's output buffer.
    pub fn from_sentence(sentence: &str, vocab: &Vocabulary, max_length: usize) -> Self {
        let mut ids = vocab.encode(sentence);
        let limit   = max_length.saturating_sub(1);
        if ids.len() > limit {
            tracing::warn!(
                "Clamping utterance of {} tokens to max_length={}",
                ids.len() + 1,
                max_length
            );
            ids.truncate(limit);
        }
        ids.push(vocab.eos_id());
        Self { ids }
    }

    /// Wrap ids that are already encoded (terminator included).
    pub fn from_ids(ids: Vec<usize>) -> Self {
        Self { ids }
    }

    pub fn ids(&self) -> &[usize] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// An encoded conversation plus the cleaned text of each turn,
/// which is kept so evaluation output can show the source lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub turns: Vec<Utterance>,
    pub text:  Vec<String>,
}

impl Conversation {
    pub fn from_turns(turns: &[String], vocab: &Vocabulary, max_length: usize) -> Self {
        Self {
            turns: turns
                .iter()
                .map(|t| Utterance::from_sentence(t, vocab, max_length))
                .collect(),
            text: turns.to_vec(),
        }
    }

    /// Number of (input, target) transitions: `T - 1`, or zero
    /// for a degenerate single-turn group.
    pub fn num_transitions(&self) -> usize {
        self.turns.len().saturating_sub(1)
    }

    /// All turns except the final response, i.e. the evaluator input.
    pub fn sources(&self) -> &[Utterance] {
        let end = self.turns.len().saturating_sub(1);
        &self.turns[..end]
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::toy_vocab;

    #[test]
    fn test_eos_appended() {
        let v = toy_vocab();
        let u = Utterance::from_sentence("hello world", &v, 100);
        assert_eq!(u.ids(), &[3, 4, 1]);
    }

    #[test]
    fn test_long_sentence_clamped_to_max_length() {
        let v = toy_vocab();
        let u = Utterance::from_sentence("hello world hello world hello", &v, 4);
        assert_eq!(u.len(), 4);
        // Terminator survives the clamp
        assert_eq!(u.ids().last(), Some(&v.eos_id()));
    }

    #[test]
    fn test_transition_count() {
        let v = toy_vocab();
        let turns = vec!["hello".to_string(), "world".to_string(), "hello world".to_string()];
        let c = Conversation::from_turns(&turns, &v, 10);
        assert_eq!(c.num_transitions(), 2);
        assert_eq!(c.sources().len(), 2);
    }

    #[test]
    fn test_single_turn_has_no_transitions() {
        let v = toy_vocab();
        let c = Conversation::from_turns(&["hello".to_string()], &v, 10);
        assert_eq!(c.num_transitions(), 0);
        assert!(c.sources().is_empty());
    }
}
