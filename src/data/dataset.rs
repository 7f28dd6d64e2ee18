// ============================================================
// Layer 4 — Conversation Dataset
// ============================================================
// Encoded conversations behind Burn's Dataset trait. Training
// draws from it uniformly at random, with replacement.

use burn::data::dataset::Dataset;
use rand::Rng;

use crate::domain::conversation::Conversation;
use crate::domain::vocabulary::Vocabulary;

/// Encoded conversations, each with at least two turns.
pub struct ConversationDataset {
    conversations: Vec<Conversation>,
}

impl ConversationDataset {
    pub fn new(conversations: Vec<Conversation>) -> Self { Self { conversations } }

    /// Encode raw turn texts against the vocabulary.
    pub fn from_raw(groups: &[Vec<String>], vocab: &Vocabulary, max_length: usize) -> Self {
        Self::new(
            groups
                .iter()
                .map(|turns| Conversation::from_turns(turns, vocab, max_length))
                .collect(),
        )
    }

    /// Uniform random pick, with replacement.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Conversation> {
        if self.conversations.is_empty() {
            return None;
        }
        self.get(rng.gen_range(0..self.conversations.len()))
    }

    pub fn total_turns(&self) -> usize {
        self.conversations.iter().map(|c| c.turns.len()).sum()
    }
}

impl Dataset<Conversation> for ConversationDataset {
    fn get(&self, index: usize) -> Option<Conversation> {
        self.conversations.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.conversations.len()
    }
}
