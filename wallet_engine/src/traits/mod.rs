//! # Ledger store contracts
//!
//! The traits in this module describe what a storage backend has to provide for the wallet engine to work. The
//! public APIs in [`crate::engine_api`] are generic over these traits and never touch SQL directly.
//!
//! * [`WalletManagement`] covers users, balances and the append-only transaction ledger.
//! * [`IdempotencyGuard`] answers whether an external reference has already been applied.
//! * [`OrderManagement`] settles orders against the ledger and queries them.
//! * [`PaymentManagement`] keeps card payment intents and settles them against the ledger.
//! * [`ReferralManagement`] issues the paired referral credits.
//! * [`OtpManagement`] keeps OTP challenges and per-phone rate windows.
//! * [`LedgerStore`] ties all of the above together and carries the store lifecycle.
//!
//! Every mutating method is a single atomic unit of work. Backends must guarantee that concurrent units touching the
//! same user are serialised, and that no unit runs longer than the configured store timeout.
mod idempotency_guard;
mod ledger_store;
mod order_management;
mod otp_management;
mod payment_management;
mod referral_management;
mod wallet_management;

pub use idempotency_guard::IdempotencyGuard;
pub use ledger_store::{LedgerStore, StoreTimeout};
pub use order_management::OrderManagement;
pub use otp_management::{OtpError, OtpManagement};
pub use payment_management::PaymentManagement;
pub use referral_management::ReferralManagement;
pub use wallet_management::{WalletError, WalletManagement};
