// ============================================================
// Layer 3 — Vocabulary Domain Type
// ============================================================
// Bidirectional word <-> id mapping with three reserved tokens:
//
//   <unk>  — any word not in the vocabulary
//   </s>   — end of an utterance (appended to every turn)
//   </d>   — first decoder input ("start decoding")
//
// The vocabulary is built once from (word, id) pairs and is
// immutable afterwards. It is handed to the turn-stepper and
// the evaluator explicitly; there is no process-wide table.
//
// Reference: Rust Book §8 (Hash Maps)

use anyhow::{bail, Result};
use std::collections::HashMap;

pub const UNK_TOKEN: &str = "<unk>";
pub const EOS_TOKEN: &str = "</s>";
pub const SOS_TOKEN: &str = "</d>";

#[derive(Debug, Clone)]
pub struct Vocabulary {
    word_to_id: HashMap<String, usize>,
    /// Indexed by id; ids are contiguous `0..len`
    id_to_word: Vec<String>,
    unk_id:     usize,
    eos_id:     usize,
    sos_id:     usize,
}

impl Vocabulary {
    /// Build a vocabulary from (word, id) pairs.
    ///
    /// Fails when the mapping is not a bijection onto `0..len`
    /// or when one of the reserved tokens is missing. These are
    /// initialisation errors: training must not start without them.
    pub fn from_pairs(pairs: Vec<(String, usize)>) -> Result<Self> {
        let len = pairs.len();
        let mut id_to_word: Vec<Option<String>> = vec![None; len];
        let mut word_to_id = HashMap::with_capacity(len);

        for (word, id) in pairs {
            if id >= len {
                bail!("Vocabulary id {id} for '{word}' is outside 0..{len}");
            }
            if let Some(existing) = &id_to_word[id] {
                bail!("Vocabulary id {id} assigned to both '{existing}' and '{word}'");
            }
            if word_to_id.insert(word.clone(), id).is_some() {
                bail!("Vocabulary word '{word}' appears more than once");
            }
            id_to_word[id] = Some(word);
        }

        // Every slot is filled: len unique ids, all below len.
        let id_to_word: Vec<String> = id_to_word.into_iter().flatten().collect();

        let reserved = |token: &str| -> Result<usize> {
            match word_to_id.get(token) {
                Some(&id) => Ok(id),
                None => bail!("Vocabulary is missing the reserved token '{token}'"),
            }
        };
        let unk_id = reserved(UNK_TOKEN)?;
        let eos_id = reserved(EOS_TOKEN)?;
        let sos_id = reserved(SOS_TOKEN)?;

        Ok(Self { word_to_id, id_to_word, unk_id, eos_id, sos_id })
    }

    pub fn len(&self) -> usize {
        self.id_to_word.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_word.is_empty()
    }

    pub fn unk_id(&self) -> usize { self.unk_id }
    pub fn eos_id(&self) -> usize { self.eos_id }
    pub fn sos_id(&self) -> usize { self.sos_id }

    /// Id of a word; unknown words map to `<unk>` and never fail.
    pub fn id(&self, word: &str) -> usize {
        self.word_to_id.get(word).copied().unwrap_or(self.unk_id)
    }

    pub fn word(&self, id: usize) -> Option<&str> {
        self.id_to_word.get(id).map(String::as_str)
    }

    /// Map a whitespace-separated sentence to ids (no `</s>` appended).
    pub fn encode(&self, sentence: &str) -> Vec<usize> {
        sentence.split_whitespace().map(|w| self.id(w)).collect()
    }

    /// Map ids back to words. Ids outside the vocabulary render
    /// as `<unk>` so generated output can always be printed.
    pub fn decode(&self, ids: &[usize]) -> Vec<String> {
        ids.iter()
            .map(|&id| self.word(id).unwrap_or(UNK_TOKEN).to_string())
            .collect()
    }
}
