// Shared fixtures for unit tests.

use crate::domain::vocabulary::Vocabulary;

/// CPU backend without gradients.
pub type TestBackend = burn::backend::NdArray;

/// CPU backend with gradients, for training tests.
pub type TestAutodiffBackend = burn::backend::Autodiff<TestBackend>;

/// {<unk>:0, </s>:1, </d>:2, hello:3, world:4}
pub fn toy_vocab() -> Vocabulary {
    let words = ["<unk>", "</s>", "</d>", "hello", "world"];
    Vocabulary::from_pairs(
        words.iter().enumerate().map(|(i, w)| (w.to_string(), i)).collect(),
    )
    .unwrap()
}
