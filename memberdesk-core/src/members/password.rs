//! One-time password generation for member password resets

use rand::Rng;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Letter alphabet. `I`, `O`, `i`, `l` and `o` are left out because they are
/// easily confused with each other and with digits.
pub const PASSWORD_LETTERS: &str = "ABCDEFGHJKLMNPQRSTUVWXYZabcdefghjkmnpqrstuvwxyz";

/// Digit alphabet, without `0` and `1`
pub const PASSWORD_DIGITS: &str = "23456789";

/// Total length of a generated password
pub const PASSWORD_LENGTH: usize = 8;

/// Number of digits in a generated password
pub const PASSWORD_DIGIT_COUNT: usize = 2;

/// A freshly generated member password.
///
/// Lives only between generation and being shown, copied or mailed. The
/// buffer is wiped on drop and `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct GeneratedPassword(String);

impl GeneratedPassword {
    /// The password text
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for GeneratedPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("GeneratedPassword(<redacted>)")
    }
}

/// Generate a new 8 character password: 2 digits and 6 letters, shuffled.
///
/// Every call draws from the thread-local generator.
pub fn generate_password() -> GeneratedPassword {
    generate_password_with(&mut rand::rng())
}

pub(crate) fn generate_password_with<R: Rng + ?Sized>(rng: &mut R) -> GeneratedPassword {
    let letters = PASSWORD_LETTERS.as_bytes();
    let digits = PASSWORD_DIGITS.as_bytes();

    let mut chars = Vec::with_capacity(PASSWORD_LENGTH);
    for _ in 0..PASSWORD_DIGIT_COUNT {
        chars.push(digits[rng.random_range(0..digits.len())]);
    }
    for _ in PASSWORD_DIGIT_COUNT..PASSWORD_LENGTH {
        chars.push(letters[rng.random_range(0..letters.len())]);
    }

    // Fisher-Yates
    for i in (1..chars.len()).rev() {
        let j = rng.random_range(0..=i);
        chars.swap(i, j);
    }

    // Both alphabets are ASCII.
    let password = chars.iter().map(|&b| b as char).collect();
    chars.zeroize();
    GeneratedPassword(password)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn assert_well_formed(password: &GeneratedPassword) {
        let text = password.expose();
        assert_eq!(text.chars().count(), PASSWORD_LENGTH);

        let digits = text.chars().filter(|c| PASSWORD_DIGITS.contains(*c)).count();
        let letters = text.chars().filter(|c| PASSWORD_LETTERS.contains(*c)).count();
        assert_eq!(digits, PASSWORD_DIGIT_COUNT, "{}", text);
        assert_eq!(letters, PASSWORD_LENGTH - PASSWORD_DIGIT_COUNT, "{}", text);
    }

    #[test]
    fn test_ten_thousand_passwords_are_well_formed() {
        let mut seen = HashSet::new();
        for _ in 0..10_000 {
            let password = generate_password();
            assert_well_formed(&password);
            seen.insert(password.expose().to_string());
        }
        // 8 digits^2 * 47 letters^6 combinations; collisions are vanishingly rare.
        assert!(seen.len() > 9_900);
    }

    #[test]
    fn test_ambiguous_characters_never_appear() {
        for _ in 0..2_000 {
            let password = generate_password();
            assert!(!password.expose().contains(['0', '1', 'I', 'O', 'i', 'l', 'o']));
        }
    }

    #[test]
    fn test_digits_are_shuffled_into_every_position() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut digit_positions = HashSet::new();
        for _ in 0..500 {
            let password = generate_password_with(&mut rng);
            for (idx, c) in password.expose().chars().enumerate() {
                if c.is_ascii_digit() {
                    digit_positions.insert(idx);
                }
            }
        }
        assert_eq!(digit_positions.len(), PASSWORD_LENGTH);
    }

    #[test]
    fn test_same_seed_same_password() {
        let a = generate_password_with(&mut StdRng::seed_from_u64(7));
        let b = generate_password_with(&mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
    }

    #[test]
    fn test_debug_is_redacted() {
        let password = generate_password();
        let debug = format!("{:?}", password);
        assert!(!debug.contains(password.expose()));
        assert!(debug.contains("redacted"));
    }

    proptest! {
        #[test]
        fn prop_any_seed_yields_valid_password(seed in any::<u64>()) {
            let password = generate_password_with(&mut StdRng::seed_from_u64(seed));
            prop_assert_eq!(password.len(), PASSWORD_LENGTH);
            prop_assert!(password
                .expose()
                .chars()
                .all(|c| PASSWORD_LETTERS.contains(c) || PASSWORD_DIGITS.contains(c)));
        }
    }
}
