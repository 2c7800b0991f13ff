use async_trait::async_trait;
use thiserror::Error;

use crate::{
    db_types::{
        BalanceAudit,
        CreditRequest,
        CreditResult,
        DebitRequest,
        Kobo,
        LedgerEntry,
        NewUser,
        OrderId,
        TransactionType,
        User,
        WalletTransaction,
    },
    traits::StoreTimeout,
};

/// Users, balances and the transaction ledger.
///
/// The stored balance is a cache of the sum of a user's transactions. Implementations must update both in the same
/// unit of work, and nothing outside this trait may write to either.
#[async_trait]
pub trait WalletManagement: Send + Sync {
    /// Creates a new user with a zero balance and a freshly generated, unique referral code.
    async fn create_user(&self, user: NewUser) -> Result<User, WalletError>;

    async fn fetch_user(&self, user_id: i64) -> Result<Option<User>, WalletError>;

    async fn fetch_user_by_referral_code(&self, code: &str) -> Result<Option<User>, WalletError>;

    async fn fetch_user_by_customer_code(&self, customer_code: &str) -> Result<Option<User>, WalletError>;

    /// Returns the user's current balance, or [`WalletError::UserNotFound`].
    async fn fetch_balance(&self, user_id: i64) -> Result<Kobo, WalletError>;

    /// Atomically decrements the balance by `request.amount` and appends a negative transaction.
    ///
    /// Fails with [`WalletError::InsufficientBalance`] without side effects if the balance is too small.
    async fn debit(&self, request: DebitRequest) -> Result<LedgerEntry, WalletError>;

    /// Atomically increments the balance and appends a positive transaction.
    ///
    /// If the request carries a reference that has already been applied, the prior result is returned with
    /// `replayed` set and the ledger is left untouched.
    async fn credit(&self, request: CreditRequest) -> Result<CreditResult, WalletError>;

    /// The user's ledger, newest first.
    async fn fetch_transactions_for_user(&self, user_id: i64) -> Result<Vec<WalletTransaction>, WalletError>;

    /// Compares the stored balance against the sum of the user's transactions.
    async fn audit_balance(&self, user_id: i64) -> Result<BalanceAudit, WalletError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletError {
    #[error("We have an internal database engine (configuration/uptime etc.) : {0}")]
    DatabaseError(String),
    #[error("{0}")]
    StoreTimeout(#[from] StoreTimeout),
    #[error("User {0} does not exist")]
    UserNotFound(i64),
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("No payment was initiated with the reference {0}")]
    PaymentNotFound(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Insufficient balance. The wallet holds {balance} but {requested} is required")]
    InsufficientBalance { balance: Kobo, requested: Kobo },
    #[error("Cannot place an order with an empty cart")]
    EmptyCart,
    #[error("The reference {0} has already been applied to the ledger")]
    DuplicateReference(String),
    #[error("{0} cannot be used for this operation")]
    InvalidTransactionType(TransactionType),
}

impl From<sqlx::Error> for WalletError {
    fn from(e: sqlx::Error) -> Self {
        WalletError::DatabaseError(e.to_string())
    }
}
