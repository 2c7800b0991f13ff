mod clock;
mod codes;
mod delivery;

#[cfg(test)]
pub use clock::MockClock;
pub use clock::{Clock, SystemClock};
pub use codes::{hash_otp, new_otp_code, new_payment_reference, new_referral_code, normalize_phone};
pub use delivery::{delivery_estimate, delivery_estimate_for_hour, SAME_DAY_CUTOFF_HOUR};
