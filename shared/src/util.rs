/// Current UTC timestamp in milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Generate a coupon redemption code.
///
/// Format: `RW-` followed by 10 characters from an unambiguous uppercase
/// alphabet (no 0/O, 1/I). Uniqueness is enforced by the coupon store,
/// not by this generator; the space is large enough that retries are
/// never needed in practice.
pub fn coupon_code() -> String {
    use rand::Rng;

    const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
    let mut rng = rand::thread_rng();
    let body: String = (0..10)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("RW-{}", body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coupon_code_shape() {
        let code = coupon_code();
        assert!(code.starts_with("RW-"));
        assert_eq!(code.len(), 13);
        assert!(!code.contains('0'));
        assert!(!code.contains('O'));
    }

    #[test]
    fn test_coupon_codes_differ() {
        assert_ne!(coupon_code(), coupon_code());
    }
}
