mod hmac;

pub use hmac::{signature_matches, SignatureGuard, SignatureGuardService, PAYSTACK_SIGNATURE_HEADER};
