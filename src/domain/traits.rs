// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer talks to data sources through these
// traits so the on-disk formats stay swappable:
//   - CorpusLoader     implements ConversationSource
//   - VocabularyLoader implements VocabularySource
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;

use crate::domain::vocabulary::Vocabulary;

// ─── ConversationSource ───────────────────────────────────────────────────────
/// Anything that yields raw conversations: each conversation is the
/// list of its cleaned turn texts, in order.
pub trait ConversationSource {
    fn load_all(&self) -> Result<Vec<Vec<String>>>;
}

// ─── VocabularySource ─────────────────────────────────────────────────────────
/// Anything that can produce a validated vocabulary.
pub trait VocabularySource {
    fn load(&self) -> Result<Vocabulary>;
}
