//! Password generation and strength scoring.

use rand::rngs::OsRng;
use rand::Rng;

const LOWER: &str = "abcdefghijklmnopqrstuvwxyz";
const UPPER: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &str = "0123456789";
const SYMBOLS: &str = "!@#$%^&*()_+-=[]{}|;:,.<>?";

/// Character classes and length for a generated password.
#[derive(Debug, Clone, Copy)]
pub struct PasswordSpec {
    pub length: usize,
    pub lower: bool,
    pub upper: bool,
    pub digits: bool,
    pub symbols: bool,
}

impl Default for PasswordSpec {
    fn default() -> Self {
        Self {
            length: 16,
            lower: true,
            upper: true,
            digits: true,
            symbols: true,
        }
    }
}

/// Generate a random password from the selected character classes.
///
/// Falls back to letters and digits when every class is disabled.
pub fn generate_password(spec: &PasswordSpec) -> String {
    let mut charset = String::new();
    if spec.lower {
        charset.push_str(LOWER);
    }
    if spec.upper {
        charset.push_str(UPPER);
    }
    if spec.digits {
        charset.push_str(DIGITS);
    }
    if spec.symbols {
        charset.push_str(SYMBOLS);
    }
    if charset.is_empty() {
        charset.push_str(LOWER);
        charset.push_str(UPPER);
        charset.push_str(DIGITS);
    }

    let chars: Vec<char> = charset.chars().collect();
    (0..spec.length)
        .map(|_| chars[OsRng.gen_range(0..chars.len())])
        .collect()
}

/// Strength estimate on a 0-4 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Strength {
    pub score: u8,
    pub label: &'static str,
}

/// Score a password by length and character-class coverage.
pub fn password_strength(password: &str) -> Strength {
    if password.is_empty() {
        return Strength {
            score: 0,
            label: "Empty",
        };
    }

    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_symbol = password.chars().any(|c| SYMBOLS.contains(c));

    let length = password.chars().count();

    let mut score = 0u8;
    if length >= 8 {
        score += 1;
    }
    if length >= 12 {
        score += 1;
    }
    if has_lower && has_upper {
        score += 1;
    }
    if has_digit && has_symbol {
        score += 1;
    }

    match score {
        0 | 1 => Strength {
            score: 1,
            label: if score == 0 { "Very Weak" } else { "Weak" },
        },
        2 => Strength {
            score: 2,
            label: "Fair",
        },
        3 => Strength {
            score: 3,
            label: "Good",
        },
        _ => Strength {
            score: 4,
            label: "Strong",
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_password_has_requested_length() {
        let spec = PasswordSpec::default();
        assert_eq!(generate_password(&spec).chars().count(), 16);

        let spec = PasswordSpec {
            length: 32,
            ..PasswordSpec::default()
        };
        assert_eq!(generate_password(&spec).chars().count(), 32);
    }

    #[test]
    fn disabled_classes_are_absent() {
        let spec = PasswordSpec {
            length: 64,
            symbols: false,
            ..PasswordSpec::default()
        };
        let password = generate_password(&spec);
        assert!(!password.chars().any(|c| SYMBOLS.contains(c)));
    }

    #[test]
    fn all_classes_disabled_falls_back_to_alphanumeric() {
        let spec = PasswordSpec {
            length: 64,
            lower: false,
            upper: false,
            digits: false,
            symbols: false,
        };
        let password = generate_password(&spec);
        assert_eq!(password.len(), 64);
        assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn strength_scoring() {
        assert_eq!(password_strength("").score, 0);
        assert_eq!(password_strength("abc").label, "Very Weak");
        assert_eq!(password_strength("abcdefgh").score, 1);
        assert_eq!(password_strength("Abcdefghijkl").score, 3);
        assert_eq!(password_strength("Abcdefghijk1!").score, 4);
    }

    #[test]
    fn strength_counts_characters_not_bytes() {
        // Seven characters but eight bytes of UTF-8; no length bonus.
        assert_eq!(password_strength("Aä1!aaa").score, 2);
        // Eight characters crosses the first length threshold.
        assert_eq!(password_strength("Aä1!aaaa").score, 3);
    }
}
