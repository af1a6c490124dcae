//! Random secret generation
//!
//! Generates credentials for callers that want the runtime to mint them
//! (initial API tokens, service passwords). Output is drawn from a CSPRNG,
//! checked against character-class requirements for the chosen complexity,
//! and rejected when it contains weak patterns; generation retries until a
//! compliant value appears.

use crate::error::OpError;
use rand::seq::SliceRandom;

// Bounds on requested secret length.
const MIN_LENGTH: usize = 12;
const MAX_LENGTH: usize = 1024;

// Retries before giving up on the class requirements.
const MAX_ATTEMPTS: usize = 50;

const LOWER: &str = "abcdefghijklmnopqrstuvwxyz";
const UPPER: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &str = "0123456789";
const SYMBOLS_MEDIUM: &str = "!@#$%^&*";
const SYMBOLS_HIGH: &str = "!@#$%^&*()_+-=[]{}|;:,.<>?";

// Sequences that make a generated secret guessable regardless of entropy.
const SEQUENTIAL_PATTERNS: &[&str] = &[
    "abcdefgh", "12345678", "qwertyui", "87654321", "password",
];

/// Character-class profile of a generated secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SecretComplexity {
    /// Letters and digits, at least one of each class.
    Basic,
    /// Letters, digits and a small symbol set.
    Medium,
    /// Letters, digits and the full symbol set.
    #[default]
    High,
    /// Letters and digits with no class requirements.
    Alphanum,
}

impl SecretComplexity {
    fn charset(self) -> String {
        match self {
            SecretComplexity::Basic | SecretComplexity::Alphanum => {
                format!("{LOWER}{UPPER}{DIGITS}")
            }
            SecretComplexity::Medium => format!("{LOWER}{UPPER}{DIGITS}{SYMBOLS_MEDIUM}"),
            SecretComplexity::High => format!("{LOWER}{UPPER}{DIGITS}{SYMBOLS_HIGH}"),
        }
    }

    fn satisfied_by(self, candidate: &str) -> bool {
        let has_lower = candidate.chars().any(|c| c.is_ascii_lowercase());
        let has_upper = candidate.chars().any(|c| c.is_ascii_uppercase());
        let has_digit = candidate.chars().any(|c| c.is_ascii_digit());
        let has_symbol = candidate.chars().any(|c| SYMBOLS_HIGH.contains(c));

        match self {
            SecretComplexity::Basic => has_lower && has_upper && has_digit,
            SecretComplexity::Medium | SecretComplexity::High => {
                has_lower && has_upper && has_digit && has_symbol
            }
            SecretComplexity::Alphanum => true,
        }
    }
}

/// Generate a compliant random secret.
pub(crate) fn generate(
    length: usize,
    complexity: SecretComplexity,
) -> Result<String, OpError> {
    if length < MIN_LENGTH {
        return Err(OpError::msg(format!(
            "minimum secret length is {MIN_LENGTH} characters"
        )));
    }
    if length > MAX_LENGTH {
        return Err(OpError::msg(format!(
            "maximum secret length is {MAX_LENGTH} characters"
        )));
    }

    let charset: Vec<char> = complexity.charset().chars().collect();
    let mut rng = rand::thread_rng();

    for _ in 0..MAX_ATTEMPTS {
        let candidate: String = (0..length)
            .map(|_| *charset.choose(&mut rng).expect("charset is never empty"))
            .collect();

        if complexity.satisfied_by(&candidate) && is_strong(&candidate) {
            return Ok(candidate);
        }
    }

    Err(OpError::msg(format!(
        "failed to generate compliant secret after {MAX_ATTEMPTS} attempts"
    )))
}

// Reject runs of four identical characters and known keyboard/counter
// sequences.
fn is_strong(candidate: &str) -> bool {
    let chars: Vec<char> = candidate.chars().collect();
    if chars.windows(4).any(|w| w.iter().all(|c| *c == w[0])) {
        return false;
    }

    let lowered = candidate.to_lowercase();
    !SEQUENTIAL_PATTERNS.iter().any(|pattern| lowered.contains(pattern))
}
