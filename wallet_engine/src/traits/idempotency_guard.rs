use async_trait::async_trait;

use crate::{
    db_types::{AppliedReference, LedgerEntry},
    traits::WalletError,
};

#[async_trait]
pub trait IdempotencyGuard: Send + Sync {
    /// Returns the recorded result if `reference` has already been applied to the ledger.
    ///
    /// This is a read-only fast path. The authoritative check happens again inside the credit's unit of work, after
    /// the write lock has been taken, and marking the reference as applied is part of that same unit.
    async fn has_applied(&self, reference: &str) -> Result<Option<AppliedReference>, WalletError>;

    /// Records `reference` as applied with the given ledger result, in a unit of its own.
    ///
    /// Credits do not call this; they mark their reference inside their own unit. Returns `DuplicateReference` if the
    /// reference was already recorded.
    async fn mark_applied(&self, reference: &str, entry: LedgerEntry) -> Result<(), WalletError>;
}
