//! Ephemeral verification codes for the SMS and email channels.

use rand::Rng;

/// Generate a uniformly random six-digit code (100000..=999999).
/// Leading zeros never occur, so the string length is always six.
pub fn generate_code() -> String {
    let mut rng = rand::rng();
    rng.random_range(100_000u32..=999_999).to_string()
}

/// SMS body carrying a channel code.
pub fn sms_body(code: &str, ttl_minutes: u64) -> String {
    format!("Your verification code is {code}. It expires in {ttl_minutes} minutes.")
}

pub fn email_subject() -> &'static str {
    "Your verification code"
}

/// Email body carrying a channel code.
pub fn email_body(code: &str, ttl_minutes: u64) -> String {
    format!(
        "Your verification code is {code}. It expires in {ttl_minutes} minutes.\n\n\
         If you did not try to sign in, you can ignore this message."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_six_digits_in_range() {
        for _ in 0..200 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            let value: u32 = code.parse().unwrap();
            assert!((100_000..=999_999).contains(&value));
        }
    }

    #[test]
    fn codes_vary() {
        let first = generate_code();
        // 200 draws from a 900k space colliding every time is not chance.
        assert!((0..200).any(|_| generate_code() != first));
    }

    #[test]
    fn bodies_contain_the_code() {
        assert!(sms_body("123456", 5).contains("123456"));
        assert!(sms_body("123456", 5).contains("5 minutes"));
        assert!(email_body("654321", 5).contains("654321"));
        assert!(!email_subject().is_empty());
    }
}
