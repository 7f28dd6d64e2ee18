// ============================================================
// Layer 4 — Corpus Loader
// ============================================================
// Reads the dialogue corpus: one conversation per line, turns
// separated by "</s>". Each line goes through the Preprocessor;
// groups with fewer than two turns cannot form a single
// (input, target) pair, so they are dropped here with a warning.
//
// Reference: Rust Book §9 (Error Handling)
//            Rust Book §12 (Reading a File)

use anyhow::{Context, Result};
use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::PathBuf,
};

use crate::data::preprocessor::Preprocessor;
use crate::domain::traits::ConversationSource;

/// Minimum number of turns for a group to be trainable.
pub const MIN_TURNS: usize = 2;

pub struct CorpusLoader {
    path: PathBuf,
}

impl CorpusLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ConversationSource for CorpusLoader {
    fn load_all(&self) -> Result<Vec<Vec<String>>> {
        let file = File::open(&self.path)
            .with_context(|| format!("Cannot open corpus '{}'", self.path.display()))?;

        let prep       = Preprocessor::new();
        let mut groups = Vec::new();
        let mut short  = 0usize;

        for (line_no, line) in BufReader::new(file).lines().enumerate() {
            let line = line.with_context(|| {
                format!("Cannot read line {} of '{}'", line_no + 1, self.path.display())
            })?;

            let turns = prep.split_turns(&line);
            if turns.len() < MIN_TURNS {
                short += 1;
                continue;
            }
            groups.push(turns);
        }

        if short > 0 {
            tracing::warn!(
                "Dropped {} conversations with fewer than {} turns",
                short,
                MIN_TURNS
            );
        }
        tracing::info!(
            "Loaded {} conversations from '{}'",
            groups.len(),
            self.path.display()
        );
        Ok(groups)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_loads_and_filters_groups() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "<a> hello world </s> <b> world hello </s>").unwrap();
        writeln!(f, "only one turn </s>").unwrap();
        writeln!(f).unwrap();
        writeln!(f, "one </s> two </s> three").unwrap();

        let groups = CorpusLoader::new(f.path()).load_all().unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0], vec!["hello world", "world hello"]);
        assert_eq!(groups[1].len(), 3);
    }

    #[test]
    fn test_missing_file_is_error() {
        let err = CorpusLoader::new("/definitely/not/here.txt").load_all();
        assert!(err.is_err());
    }
}
