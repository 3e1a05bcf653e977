// src/utils/join_code.rs

use rand::Rng;

use crate::config::{JOIN_CODE_ALPHABET, JOIN_CODE_LENGTH};

/// Generates a random join code. Ambiguous glyphs (0/O, 1/I) are left out.
pub fn generate() -> String {
    let mut rng = rand::thread_rng();
    (0..JOIN_CODE_LENGTH)
        .map(|_| JOIN_CODE_ALPHABET[rng.gen_range(0..JOIN_CODE_ALPHABET.len())] as char)
        .collect()
}

/// Canonical form of a code typed by a student.
pub fn normalize(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}
