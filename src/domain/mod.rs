// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types describing dialogue data:
//
//   vocabulary.rs   — word <-> id mapping with reserved tokens
//   conversation.rs — utterances and conversation groups
//   traits.rs       — sources the application layer loads from
//
// Rules for this layer:
//   - NO Burn framework types
//   - NO file I/O
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

pub mod vocabulary;

pub mod conversation;

pub mod traits;
