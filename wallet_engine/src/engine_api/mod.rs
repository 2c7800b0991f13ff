//! # Wallet engine public API
//!
//! The `engine_api` module exposes the programmatic API of the wallet engine. Each API is a thin, cloneable struct
//! over a store backend and is only constrained by the store traits it actually needs.
//!
//! * [`wallet_api`] balance queries, debits and idempotent credits.
//! * [`order_flow_api`] prices and settles orders against the wallet, then kicks off referral checks.
//! * [`referral_api`] the one-time referral bonus for a referred user's first order.
//! * [`webhook_api`] idempotent credits from payment-provider webhook events.
//! * [`payment_api`] in-app card payments reported back by the checkout widget.
//! * [`otp_api`] OTP issuance with rate limiting, and bounded verification.
//!
//! ```rust,ignore
//! use wallet_engine::{events::EventProducers, SqliteDatabase, WalletApi};
//! let db = SqliteDatabase::new_with_url("sqlite://data/grocer_wallet.db", 25, DEFAULT_STORE_TIMEOUT).await?;
//! let api = WalletApi::new(db, EventProducers::default());
//! let balance = api.get_balance(user_id).await?;
//! ```
pub mod order_flow_api;
pub mod otp_api;
pub mod otp_objects;
pub mod payment_api;
pub mod payment_objects;
pub mod referral_api;
pub mod wallet_api;
pub mod webhook_api;
pub mod webhook_objects;
