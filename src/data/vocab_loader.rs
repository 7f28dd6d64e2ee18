// ============================================================
// Layer 4 — Vocabulary Loader
// ============================================================
// Reads the vocabulary file: a JSON array of [word, id] pairs,
//
//   [["<unk>", 0], ["</s>", 1], ["</d>", 2], ["hello", 3], ...]
//
// and validates it into a domain Vocabulary. A missing reserved
// token aborts here, before any model is built.
//
// Reference: serde_json documentation

use anyhow::{Context, Result};
use std::{fs, path::PathBuf};

use crate::domain::traits::VocabularySource;
use crate::domain::vocabulary::Vocabulary;

pub struct VocabularyLoader {
    path: PathBuf,
}

impl VocabularyLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl VocabularySource for VocabularyLoader {
    fn load(&self) -> Result<Vocabulary> {
        let json = fs::read_to_string(&self.path)
            .with_context(|| format!("Cannot read vocabulary '{}'", self.path.display()))?;

        let pairs: Vec<(String, usize)> = serde_json::from_str(&json)
            .with_context(|| {
                format!("'{}' is not a JSON list of [word, id] pairs", self.path.display())
            })?;

        let vocab = Vocabulary::from_pairs(pairs)
            .with_context(|| format!("Invalid vocabulary '{}'", self.path.display()))?;

        tracing::info!("Vocabulary loaded: {} words", vocab.len());
        Ok(vocab)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_vocab(json: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "{json}").unwrap();
        f
    }

    #[test]
    fn test_loads_pairs() {
        let f = write_vocab(r#"[["<unk>",0],["</s>",1],["</d>",2],["hello",3],["world",4]]"#);
        let v = VocabularyLoader::new(f.path()).load().unwrap();
        assert_eq!(v.len(), 5);
        assert_eq!(v.id("world"), 4);
    }

    #[test]
    fn test_missing_reserved_token_aborts() {
        let f = write_vocab(r#"[["<unk>",0],["</s>",1],["hello",2]]"#);
        let err = VocabularyLoader::new(f.path()).load().unwrap_err();
        assert!(format!("{err:#}").contains("</d>"));
    }

    #[test]
    fn test_malformed_json_is_error() {
        let f = write_vocab(r#"{"hello": 3}"#);
        assert!(VocabularyLoader::new(f.path()).load().is_err());
    }
}
