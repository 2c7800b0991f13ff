//! `SqliteDatabase` is the concrete ledger store used by the wallet engine.
//!
//! It implements every trait in [`crate::traits`]. Mutations run through [`SqliteDatabase::atomically`], which wraps a
//! closure of low-level [`db`](super::db) calls in a single SQLite transaction with a bounded run time.
use std::{fmt::Debug, future::Future, time::Duration};

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use log::*;
use sqlx::{migrate::MigrateError, SqliteConnection, SqlitePool};

use super::db::{db_url, idempotency, ledger, new_pool, orders, otp, payments, referrals, transactions, users};
use crate::{
    db_types::{
        AppliedReference,
        BalanceAudit,
        CreditRequest,
        CreditResult,
        DebitRequest,
        Kobo,
        LedgerEntry,
        NewUser,
        Order,
        OrderId,
        OrderSettlement,
        OtpChallenge,
        OtpCheck,
        PaymentIntent,
        PaymentStatus,
        RateWindow,
        ReferralBonus,
        ReferralOutcome,
        User,
        WalletTransaction,
    },
    traits::{
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
    },
};

pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
    unit_timeout: Duration,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?}, timeout {:?})", self.pool, self.unit_timeout)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object, using the URL in `GW_DATABASE_URL`.
    pub async fn new(max_connections: u32, unit_timeout: Duration) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(&url, max_connections, unit_timeout).await
    }

    /// Opens the store at `url`. Every unit of work, and every wait for another writer, is bounded by `unit_timeout`.
    pub async fn new_with_url(url: &str, max_connections: u32, unit_timeout: Duration) -> Result<Self, sqlx::Error> {
        trace!("🗃️ Creating new database connection pool for {url}");
        let pool = new_pool(url, max_connections, unit_timeout).await?;
        Ok(Self { url: url.to_string(), pool, unit_timeout })
    }

    /// Brings the schema up to date.
    pub async fn migrate(&self) -> Result<(), MigrateError> {
        sqlx::migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn unit_timeout(&self) -> Duration {
        self.unit_timeout
    }

    /// Runs `fut` under the store timeout.
    async fn bounded<T, E, F>(&self, fut: F) -> Result<T, E>
    where
        E: From<StoreTimeout>,
        F: Future<Output = Result<T, E>>,
    {
        match tokio::time::timeout(self.unit_timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!("🗃️ Store operation did not complete within {:?}. It has been abandoned.", self.unit_timeout);
                Err(E::from(StoreTimeout(self.unit_timeout)))
            },
        }
    }

    /// Runs `f` as one atomic unit of work.
    ///
    /// The closure receives a connection inside an open transaction. If it returns `Ok` the transaction is committed,
    /// otherwise it is rolled back and the error handed back unchanged. The whole unit, including waiting for the
    /// write lock, is bounded by the store timeout; on timeout nothing is committed and `StoreTimeout` is returned.
    ///
    /// The first statement the closure issues should be a write. SQLite then takes the write lock up front, which
    /// serialises units that touch the same rows.
    pub async fn atomically<T, E, F>(&self, f: F) -> Result<T, E>
    where
        T: Send,
        E: From<sqlx::Error> + From<StoreTimeout> + Send,
        F: for<'c> FnOnce(&'c mut SqliteConnection) -> BoxFuture<'c, Result<T, E>> + Send,
    {
        let unit = async {
            let mut tx = self.pool.begin().await?;
            match f(&mut *tx).await {
                Ok(value) => {
                    tx.commit().await?;
                    Ok(value)
                },
                Err(e) => {
                    if let Err(rollback_err) = tx.rollback().await {
                        warn!("🗃️ Rolling back unit of work failed: {rollback_err}");
                    }
                    Err(e)
                },
            }
        };
        self.bounded(unit).await
    }
}

#[async_trait]
impl LedgerStore for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn close(&self) {
        info!("🗃️ Closing database connections");
        self.pool.close().await;
    }
}

#[async_trait]
impl WalletManagement for SqliteDatabase {
    async fn create_user(&self, user: NewUser) -> Result<User, WalletError> {
        self.atomically(move |conn| Box::pin(async move { users::create_user(user, conn).await })).await
    }

    async fn fetch_user(&self, user_id: i64) -> Result<Option<User>, WalletError> {
        self.bounded(async {
            let mut conn = self.pool.acquire().await?;
            Ok(users::fetch_user(user_id, &mut conn).await?)
        })
        .await
    }

    async fn fetch_user_by_referral_code(&self, code: &str) -> Result<Option<User>, WalletError> {
        self.bounded(async {
            let mut conn = self.pool.acquire().await?;
            Ok(users::fetch_user_by_referral_code(code, &mut conn).await?)
        })
        .await
    }

    async fn fetch_user_by_customer_code(&self, customer_code: &str) -> Result<Option<User>, WalletError> {
        self.bounded(async {
            let mut conn = self.pool.acquire().await?;
            Ok(users::fetch_user_by_customer_code(customer_code, &mut conn).await?)
        })
        .await
    }

    async fn fetch_balance(&self, user_id: i64) -> Result<Kobo, WalletError> {
        self.bounded(async {
            let mut conn = self.pool.acquire().await?;
            users::fetch_balance(user_id, &mut conn).await
        })
        .await
    }

    async fn debit(&self, request: DebitRequest) -> Result<LedgerEntry, WalletError> {
        self.atomically(move |conn| Box::pin(async move { ledger::apply_debit(&request, conn).await })).await
    }

    async fn credit(&self, request: CreditRequest) -> Result<CreditResult, WalletError> {
        let result =
            self.atomically(move |conn| Box::pin(async move { ledger::apply_credit(&request, conn).await })).await;
        match result {
            Err(WalletError::DuplicateReference(reference)) => {
                // Another unit applied the same reference between our check and our write
                debug!("🗃️ Reference {reference} was applied concurrently. Returning the recorded result.");
                let prior = self.has_applied(&reference).await?;
                prior
                    .map(|p| CreditResult::replayed(p.to_entry()))
                    .ok_or(WalletError::DuplicateReference(reference))
            },
            other => other,
        }
    }

    async fn fetch_transactions_for_user(&self, user_id: i64) -> Result<Vec<WalletTransaction>, WalletError> {
        self.bounded(async {
            let mut conn = self.pool.acquire().await?;
            Ok(transactions::fetch_transactions_for_user(user_id, &mut conn).await?)
        })
        .await
    }

    async fn audit_balance(&self, user_id: i64) -> Result<BalanceAudit, WalletError> {
        self.atomically(move |conn| {
            Box::pin(async move {
                users::lock_user(user_id, conn).await?;
                let stored_balance = users::fetch_balance(user_id, conn).await?;
                let ledger = transactions::ledger_total(user_id, conn).await?;
                Ok(BalanceAudit {
                    user_id,
                    stored_balance,
                    ledger_total: ledger.total,
                    transaction_count: ledger.count,
                })
            })
        })
        .await
    }
}

#[async_trait]
impl IdempotencyGuard for SqliteDatabase {
    async fn has_applied(&self, reference: &str) -> Result<Option<AppliedReference>, WalletError> {
        self.bounded(async {
            let mut conn = self.pool.acquire().await?;
            Ok(idempotency::fetch_applied(reference, &mut conn).await?)
        })
        .await
    }

    async fn mark_applied(&self, reference: &str, entry: LedgerEntry) -> Result<(), WalletError> {
        let reference = reference.to_string();
        self.atomically(move |conn| Box::pin(async move { idempotency::mark_applied(&reference, &entry, conn).await }))
            .await
    }
}

#[async_trait]
impl OrderManagement for SqliteDatabase {
    async fn settle_order(&self, settlement: OrderSettlement) -> Result<Order, WalletError> {
        self.atomically(move |conn| Box::pin(async move { orders::settle(&settlement, conn).await })).await
    }

    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, WalletError> {
        self.bounded(async {
            let mut conn = self.pool.acquire().await?;
            Ok(orders::fetch_order(order_id, &mut conn).await?)
        })
        .await
    }

    async fn fetch_orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, WalletError> {
        self.bounded(async {
            let mut conn = self.pool.acquire().await?;
            Ok(orders::fetch_orders_for_user(user_id, &mut conn).await?)
        })
        .await
    }

    async fn count_orders_for_user(&self, user_id: i64) -> Result<i64, WalletError> {
        self.bounded(async {
            let mut conn = self.pool.acquire().await?;
            Ok(orders::count_orders_for_user(user_id, &mut conn).await?)
        })
        .await
    }
}

#[async_trait]
impl PaymentManagement for SqliteDatabase {
    async fn insert_payment_intent(
        &self,
        user_id: i64,
        amount: Kobo,
        reference: &str,
    ) -> Result<PaymentIntent, WalletError> {
        let reference = reference.to_string();
        self.atomically(move |conn| {
            Box::pin(async move { payments::insert_intent(user_id, amount, &reference, conn).await })
        })
        .await
    }

    async fn fetch_payment_intent(&self, reference: &str) -> Result<Option<PaymentIntent>, WalletError> {
        self.bounded(async {
            let mut conn = self.pool.acquire().await?;
            Ok(payments::fetch_intent(reference, &mut conn).await?)
        })
        .await
    }

    async fn complete_payment_intent(
        &self,
        reference: &str,
        description: &str,
    ) -> Result<(PaymentIntent, CreditResult), WalletError> {
        let reference = reference.to_string();
        let description = description.to_string();
        self.atomically(move |conn| Box::pin(async move { payments::complete(&reference, &description, conn).await }))
            .await
    }

    async fn close_payment_intent(&self, reference: &str, status: PaymentStatus) -> Result<PaymentIntent, WalletError> {
        let reference = reference.to_string();
        self.atomically(move |conn| Box::pin(async move { payments::close(&reference, status, conn).await })).await
    }
}

#[async_trait]
impl ReferralManagement for SqliteDatabase {
    async fn issue_referral_bonus(&self, bonus: ReferralBonus) -> Result<ReferralOutcome, WalletError> {
        self.atomically(move |conn| Box::pin(async move { referrals::issue(&bonus, conn).await })).await
    }
}

#[async_trait]
impl OtpManagement for SqliteDatabase {
    async fn record_otp_request(&self, phone: &str, now: i64, window_ms: i64) -> Result<RateWindow, OtpError> {
        let phone = phone.to_string();
        self.atomically(move |conn| {
            Box::pin(async move { Ok(otp::record_request(&phone, now, window_ms, conn).await?) })
        })
        .await
    }

    async fn store_challenge(&self, challenge: OtpChallenge) -> Result<(), OtpError> {
        self.atomically(move |conn| Box::pin(async move { Ok(otp::upsert_challenge(&challenge, conn).await?) }))
            .await
    }

    async fn check_challenge(
        &self,
        phone: &str,
        code_hash: &str,
        max_attempts: i64,
        now: i64,
    ) -> Result<OtpCheck, OtpError> {
        let phone = phone.to_string();
        let code_hash = code_hash.to_string();
        self.atomically(move |conn| {
            Box::pin(async move { otp::check(&phone, &code_hash, max_attempts, now, conn).await })
        })
        .await
    }

    async fn purge_expired(&self, now: i64) -> Result<u64, OtpError> {
        self.atomically(move |conn| Box::pin(async move { Ok(otp::purge_expired(now, conn).await?) })).await
    }
}
