use rand::{Rng, rng};

const RUNES_ALPHA: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
const RUNES_ALPHA_NUMBER: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const RUNES_CANDIDATE_ID_FOUNDATION: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789/+";

/// ICE ufrag length, RFC 8839 requires at least 4 characters.
pub const LEN_UFRAG: usize = 16;
/// ICE pwd length, RFC 8839 requires at least 22 characters.
pub const LEN_PWD: usize = 32;

/// math_rand_alpha generates a mathematical random alphabet sequence of the requested length.
pub fn math_rand_alpha(n: usize) -> String {
    generate_crypto_random_string(n, RUNES_ALPHA)
}

/// math_rand_alpha_number generates a mathematical random alphabet and number sequence of the requested length.
pub fn math_rand_alpha_number(n: usize) -> String {
    generate_crypto_random_string(n, RUNES_ALPHA_NUMBER)
}

/// generate_ufrag generates ICE user fragment
pub fn generate_ufrag() -> String {
    generate_crypto_random_string(LEN_UFRAG, RUNES_CANDIDATE_ID_FOUNDATION)
}

/// generate_pwd generates ICE pwd
pub fn generate_pwd() -> String {
    generate_crypto_random_string(LEN_PWD, RUNES_CANDIDATE_ID_FOUNDATION)
}

/// generate_session_id produces a positive 63 bit session id for SDP origin lines.
pub fn generate_session_id() -> u64 {
    rng().random::<u64>() & (u64::MAX >> 1)
}

pub fn generate_crypto_random_string(n: usize, runes: &[u8]) -> String {
    let mut rng = rng();

    let rand_string: String = (0..n)
        .map(|_| {
            let idx = rng.random_range(0..runes.len());
            runes[idx] as char
        })
        .collect();

    rand_string
}
