// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between the files on disk and encoded
// conversations ready for the turn-stepper:
//
//   corpus file                vocabulary file
//       │                           │
//       ▼                           ▼
//   CorpusLoader              VocabularyLoader
//       │ (Preprocessor)            │
//       ▼                           ▼
//   raw turn texts  ───────►  ConversationDataset
//
// Reference: Burn Book §4 (Datasets)
//            Rust Book §13 (Iterators and Closures)

/// Reads the corpus file into raw turn lists
pub mod loader;

/// Splits a corpus line into clean turns
pub mod preprocessor;

/// Reads and validates the vocabulary file
pub mod vocab_loader;

/// Implements Burn's Dataset trait for encoded conversations
pub mod dataset;
