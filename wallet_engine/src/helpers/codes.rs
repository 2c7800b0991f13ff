//! Generators for the various codes and references handed out by the engine.
use blake2::{Blake2b512, Digest};
use rand::{seq::SliceRandom, Rng};
use regex::Regex;

// No 0/O or 1/I, so that codes can be read out over the phone
const REFERRAL_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const REFERRAL_CODE_LENGTH: usize = 8;

pub fn new_referral_code() -> String {
    let mut rng = rand::thread_rng();
    (0..REFERRAL_CODE_LENGTH).filter_map(|_| REFERRAL_ALPHABET.choose(&mut rng).map(|&c| c as char)).collect()
}

/// A fresh payment reference, `pay_` followed by 16 hex characters.
pub fn new_payment_reference() -> String {
    format!("pay_{:016x}", rand::random::<u64>())
}

/// A uniformly random 6-digit numeric code, zero-padded.
pub fn new_otp_code() -> String {
    let code: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{code:06}")
}

/// The value stored in place of an OTP code. The phone number is mixed in so that equal codes for different phones
/// have different hashes.
pub fn hash_otp(phone: &str, code: &str) -> String {
    let mut hasher = Blake2b512::new();
    hasher.update(phone.as_bytes());
    hasher.update(b":");
    hasher.update(code.trim().as_bytes());
    hasher.finalize().iter().map(|b| format!("{b:02x}")).collect()
}

/// Strips formatting characters from a phone number and checks that what is left looks like one.
///
/// Returns `None` if the number is not 7 to 15 digits, with an optional leading `+`.
pub fn normalize_phone(phone: &str) -> Option<String> {
    let re = Regex::new(r"^\+?[0-9]{7,15}$").unwrap();
    let cleaned = phone.chars().filter(|c| !matches!(c, ' ' | '-' | '(' | ')' | '.')).collect::<String>();
    re.is_match(&cleaned).then_some(cleaned)
}
