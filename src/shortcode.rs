use rand::Rng;

const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

pub const MIN_LEN: usize = 3;
pub const MAX_LEN: usize = 10;
pub const DEFAULT_LEN: usize = 6;

/// Produces candidate shortcodes.
///
/// Generators are pure: they never look at the store, so a candidate may
/// collide with an existing code. The link service retries on collision.
pub trait CodeGenerator: Send + Sync + 'static {
    fn generate(&self) -> String;
}

/// Uniform random codes over `[A-Za-z0-9]`.
#[derive(Debug, Clone)]
pub struct RandomCodeGenerator {
    len: usize,
}

impl RandomCodeGenerator {
    /// `len` is clamped into the valid shortcode range.
    pub fn new(len: usize) -> Self {
        Self {
            len: len.clamp(MIN_LEN, MAX_LEN),
        }
    }
}

impl Default for RandomCodeGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_LEN)
    }
}

impl CodeGenerator for RandomCodeGenerator {
    fn generate(&self) -> String {
        let mut rng = rand::thread_rng();
        (0..self.len)
            .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
            .collect()
    }
}

/// `true` if `code` has the shape of a shortcode: 3 to 10 ASCII letters or digits.
pub fn is_valid(code: &str) -> bool {
    (MIN_LEN..=MAX_LEN).contains(&code.len()) && code.bytes().all(|b| b.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn generates_codes_of_configured_length() {
        let generator = RandomCodeGenerator::default();
        for _ in 0..100 {
            let code = generator.generate();
            assert_eq!(code.len(), DEFAULT_LEN);
            assert!(is_valid(&code), "generated invalid code {code}");
        }
    }

    #[test]
    fn length_is_clamped() {
        assert_eq!(RandomCodeGenerator::new(1).generate().len(), MIN_LEN);
        assert_eq!(RandomCodeGenerator::new(64).generate().len(), MAX_LEN);
    }

    #[test]
    fn codes_are_spread_out() {
        let generator = RandomCodeGenerator::default();
        let codes: HashSet<String> = (0..1000).map(|_| generator.generate()).collect();
        // 62^6 possible codes, 1000 draws: a handful of collisions at most.
        assert!(codes.len() > 990);
    }

    #[test]
    fn shape_validation() {
        assert!(is_valid("abc"));
        assert!(is_valid("abc123"));
        assert!(is_valid("ABCdef7890"));

        assert!(!is_valid("ab"));
        assert!(!is_valid("abcdefghijk"));
        assert!(!is_valid("abc-12"));
        assert!(!is_valid("abc 12"));
        assert!(!is_valid("ábc12"));
        assert!(!is_valid(""));
    }
}
