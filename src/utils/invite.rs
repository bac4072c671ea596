//! Invite code generation

use rand::Rng;

use crate::constants::INVITE_CODE_LENGTH;

/// Generate a random uppercase alphanumeric code of the given length
pub fn generate_code(length: usize) -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    let mut rng = rand::rng();

    (0..length)
        .map(|_| {
            let idx = rng.random_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}

/// Generate a team invite code
pub fn generate_invite_code() -> String {
    generate_code(INVITE_CODE_LENGTH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_invite_code() {
        let code = generate_invite_code();
        assert_eq!(code.len(), INVITE_CODE_LENGTH);
        assert!(code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }

    #[test]
    fn test_codes_are_random() {
        let a = generate_code(32);
        let b = generate_code(32);
        assert_ne!(a, b);
    }
}
