use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::traits::{
    IdempotencyGuard,
    OrderManagement,
    OtpManagement,
    PaymentManagement,
    ReferralManagement,
    WalletManagement,
};

/// A unit of work did not finish within the store's time budget. Callers may retry; nothing was committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("The ledger store did not complete the operation within {0:?}")]
pub struct StoreTimeout(pub Duration);

/// The umbrella trait for wallet engine backends.
///
/// A store is opened once at process start, handed to each API by value (it is cheap to clone), and closed at
/// shutdown.
#[async_trait]
pub trait LedgerStore:
    Clone
    + WalletManagement
    + IdempotencyGuard
    + OrderManagement
    + PaymentManagement
    + ReferralManagement
    + OtpManagement
    + 'static
{
    /// The URL of the database
    fn url(&self) -> &str;

    /// Closes all connections to the store. Pending units of work are allowed to finish.
    async fn close(&self);
}
