//! Room code generation and canonicalisation.

use rand::Rng;

/// Number of characters in a room code.
pub const ROOM_CODE_LEN: usize = 6;

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Draw a random room code from `A-Z0-9`.
pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..ROOM_CODE_LEN)
        .map(|_| char::from(ALPHABET[rng.random_range(0..ALPHABET.len())]))
        .collect()
}

/// Canonical (uppercase) form of a user supplied code, or `None` when it cannot be a room code.
pub fn canonicalize(raw: &str) -> Option<String> {
    let code = raw.trim().to_ascii_uppercase();
    let valid = code.len() == ROOM_CODE_LEN && code.bytes().all(|b| ALPHABET.contains(&b));
    valid.then_some(code)
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn generated_codes_are_canonical() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let code = generate(&mut rng);
            assert_eq!(canonicalize(&code).as_deref(), Some(code.as_str()));
        }
    }

    #[test]
    fn lookup_codes_are_case_insensitive() {
        assert_eq!(canonicalize(" ab12cd ").as_deref(), Some("AB12CD"));
        assert_eq!(canonicalize("ab12c"), None);
        assert_eq!(canonicalize("ab-2cd"), None);
    }
}
