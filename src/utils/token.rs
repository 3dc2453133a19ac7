use rand::{distributions::Alphanumeric, thread_rng, Rng};

pub const REFERRAL_TOKEN_LENGTH: usize = 32;

pub fn generate_access_token(length: usize) -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

pub fn generate_referral_token() -> String {
    generate_access_token(REFERRAL_TOKEN_LENGTH)
}

/// Six-digit numeric code for email verification and password resets.
pub fn generate_numeric_code() -> String {
    format!("{:06}", thread_rng().gen_range(0..1_000_000u32))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn referral_tokens_are_alphanumeric() {
        let token = generate_referral_token();
        assert_eq!(token.len(), REFERRAL_TOKEN_LENGTH);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn numeric_codes_keep_leading_zeros() {
        for _ in 0..50 {
            let code = generate_numeric_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }
}
