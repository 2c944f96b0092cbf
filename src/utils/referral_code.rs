// utils/referral_code.rs
use rand::Rng;

pub const REFERRAL_CODE_LEN: usize = 6;

// Uppercase alphanumerics without the lookalikes (0/O, 1/I/L) — these codes
// get read aloud and typed from memory.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";

pub fn generate_referral_code() -> String {
    let mut rng = rand::rng();
    (0..REFERRAL_CODE_LEN)
        .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

pub fn generate_referral_link(base_url: &str, code: &str) -> String {
    format!("{}/register?ref={}", base_url, code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_has_expected_length() {
        assert_eq!(generate_referral_code().len(), REFERRAL_CODE_LEN);
    }

    #[test]
    fn code_uses_only_the_safe_alphabet() {
        for _ in 0..50 {
            let code = generate_referral_code();
            assert!(code.bytes().all(|b| CODE_ALPHABET.contains(&b)), "bad code: {}", code);
        }
    }

    #[test]
    fn link_embeds_the_code() {
        let link = generate_referral_link("https://wanderplan.app", "AB23CD");
        assert_eq!(link, "https://wanderplan.app/register?ref=AB23CD");
    }
}
