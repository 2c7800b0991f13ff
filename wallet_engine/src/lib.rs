//! Grocer Wallet Engine
//!
//! The wallet engine keeps the stored-value wallets of the grocer storefront. It debits a user's wallet when an order
//! is placed, credits it from payment-provider webhooks and in-app card payments, and pays out referral bonuses. All of
//! this is atomic, idempotent, and safe under concurrent requests for the same user.
//!
//! The library is divided into a few sections:
//! 1. The store contracts ([`mod@traits`]) and their SQLite implementation ([`SqliteDatabase`]). Every mutation is a
//!    single unit of work with a bounded run time. You should never need to talk to the database directly; the data
//!    types it stores are public in [`mod@db_types`].
//! 2. The public API ([`mod@engine_api`]): wallets, order settlement, referral bonuses, payment webhooks, card
//!    payments and OTP verification.
//! 3. Events ([`mod@events`]). Hooks can be registered to react to settled orders and wallet credits.
pub mod db_types;
pub mod engine_api;
pub mod events;
pub mod helpers;
pub mod traits;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(all(feature = "sqlite", any(feature = "test_utils", test)))]
pub mod test_utils;

pub use engine_api::{
    order_flow_api::{price_items, OrderFlowApi},
    otp_api::OtpApi,
    otp_objects::{OtpConfig, OtpDeliveryError, OtpIssued, OtpSender, SandboxOtpSender},
    payment_api::PaymentApi,
    payment_objects::{PaymentCompletion, PaymentOutcome},
    referral_api::{ReferralApi, ReferralConfig},
    wallet_api::WalletApi,
    webhook_api::{WebhookApi, WebhookError},
    webhook_objects::{PaystackEvent, WebhookOutcome},
};
#[cfg(feature = "sqlite")]
pub use sqlite::{db, SqliteDatabase, DEFAULT_STORE_TIMEOUT};
pub use traits::{
    IdempotencyGuard,
    LedgerStore,
    OrderManagement,
    OtpError,
    OtpManagement,
    PaymentManagement,
    ReferralManagement,
    StoreTimeout,
    WalletError,
    WalletManagement,
};
