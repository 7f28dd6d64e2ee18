// ============================================================
// Layer 4 — Turn Preprocessor
// ============================================================
// Turns one raw corpus line into the cleaned texts of its turns.
//
// Corpus lines look like:
//   "<first_speaker> hi there </s> <second_speaker> hello ! </s>"
//
// Cleaning steps (applied in order):
//   1. Split the line on the literal turn delimiter "</s>"
//   2. Remove markup tags: '<', one or more non-'>' chars, '>'
//   3. Map tabs / control characters to plain spaces
//   4. Collapse runs of spaces and trim the edges
//   5. Drop turns that are empty after cleaning
//
// Reference: Rust Book §8 (Strings in Rust)
//            Rust Book §13 (Iterators)

pub const TURN_DELIMITER: &str = "</s>";

pub struct Preprocessor;

impl Preprocessor {
    pub fn new() -> Self {
        Self
    }

    /// Split a corpus line into cleaned, non-empty turns.
    pub fn split_turns(&self, line: &str) -> Vec<String> {
        line.split(TURN_DELIMITER)
            .map(|part| self.clean(&self.strip_tags(part)))
            .filter(|turn| !turn.is_empty())
            .collect()
    }

    /// Remove every `<...>` tag. A `<` with no closing `>` after it,
    /// or an empty `<>`, is ordinary text and stays.
    pub fn strip_tags(&self, text: &str) -> String {
        let mut out  = String::with_capacity(text.len());
        let mut rest = text;

        while let Some(open) = rest.find('<') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            match after.find('>') {
                // At least one character between the brackets
                Some(close) if close > 0 => {
                    rest = &after[close + 1..];
                }
                _ => {
                    out.push('<');
                    rest = after;
                }
            }
        }
        out.push_str(rest);
        out
    }

    /// Normalise whitespace inside a single turn.
    pub fn clean(&self, text: &str) -> String {
        let mut out        = String::with_capacity(text.len());
        let mut last_space = true;

        for c in text.chars() {
            let c = if c.is_whitespace() || c.is_control() { ' ' } else { c };
            if c == ' ' {
                if !last_space {
                    out.push(' ');
                }
                last_space = true;
            } else {
                out.push(c);
                last_space = false;
            }
        }

        out.trim_end().to_string()
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new()
    }
}
