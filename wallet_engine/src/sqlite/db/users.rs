use log::{debug, warn};
use sqlx::SqliteConnection;

use super::is_unique_violation_on;
use crate::{
    db_types::{Kobo, NewUser, User},
    helpers::new_referral_code,
    traits::WalletError,
};

const MAX_REFERRAL_CODE_ATTEMPTS: usize = 5;

/// Creates a user with a zero balance. A referral code is generated for the user, and regenerated if it happens to
/// collide with an existing one.
pub async fn create_user(user: NewUser, conn: &mut SqliteConnection) -> Result<User, WalletError> {
    for _ in 0..MAX_REFERRAL_CODE_ATTEMPTS {
        let code = new_referral_code();
        match insert_user(&user, &code, conn).await {
            Ok(user) => {
                debug!("🗃️ User #{} created with referral code {}", user.id, user.referral_code);
                return Ok(user);
            },
            Err(e) if is_unique_violation_on(&e, "users.referral_code") => {
                warn!("🗃️ Referral code {code} is already taken. Generating another one.");
            },
            Err(e) => return Err(e.into()),
        }
    }
    Err(WalletError::DatabaseError("Could not generate a unique referral code".into()))
}

async fn insert_user(user: &NewUser, referral_code: &str, conn: &mut SqliteConnection) -> Result<User, sqlx::Error> {
    sqlx::query_as(
        r#"
            INSERT INTO users (referral_code, referred_by, customer_code)
            VALUES ($1, $2, $3)
            RETURNING *;
        "#,
    )
    .bind(referral_code)
    .bind(user.referred_by.as_deref())
    .bind(user.customer_code.as_deref())
    .fetch_one(conn)
    .await
}

pub async fn fetch_user(user_id: i64, conn: &mut SqliteConnection) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM users WHERE id = $1").bind(user_id).fetch_optional(conn).await
}

pub async fn fetch_user_by_referral_code(code: &str, conn: &mut SqliteConnection) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM users WHERE referral_code = $1").bind(code).fetch_optional(conn).await
}

pub async fn fetch_user_by_customer_code(
    customer_code: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM users WHERE customer_code = $1").bind(customer_code).fetch_optional(conn).await
}

pub async fn fetch_balance(user_id: i64, conn: &mut SqliteConnection) -> Result<Kobo, WalletError> {
    let balance: Option<Kobo> =
        sqlx::query_scalar("SELECT balance FROM users WHERE id = $1").bind(user_id).fetch_optional(conn).await?;
    balance.ok_or(WalletError::UserNotFound(user_id))
}

/// Takes the write lock for the user's row without changing anything. Used as the opening statement of units of work
/// that need to read before they write.
pub async fn lock_user(user_id: i64, conn: &mut SqliteConnection) -> Result<(), WalletError> {
    let id: Option<i64> = sqlx::query_scalar("UPDATE users SET updated_at = updated_at WHERE id = $1 RETURNING id")
        .bind(user_id)
        .fetch_optional(conn)
        .await?;
    id.map(|_| ()).ok_or(WalletError::UserNotFound(user_id))
}

/// Decrements the balance by `amount`, but only if the balance covers it. Returns the new balance.
pub async fn try_decrement_balance(
    user_id: i64,
    amount: Kobo,
    conn: &mut SqliteConnection,
) -> Result<Kobo, WalletError> {
    let new_balance: Option<Kobo> = sqlx::query_scalar(
        r#"
            UPDATE users SET balance = balance - $1, updated_at = CURRENT_TIMESTAMP
            WHERE id = $2 AND balance >= $1
            RETURNING balance;
        "#,
    )
    .bind(amount)
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;
    match new_balance {
        Some(balance) => Ok(balance),
        None => {
            let balance = fetch_balance(user_id, conn).await?;
            Err(WalletError::InsufficientBalance { balance, requested: amount })
        },
    }
}

/// Increments the balance by `amount` and returns the new balance.
pub async fn increment_balance(user_id: i64, amount: Kobo, conn: &mut SqliteConnection) -> Result<Kobo, WalletError> {
    let new_balance: Option<Kobo> = sqlx::query_scalar(
        r#"
            UPDATE users SET balance = balance + $1, updated_at = CURRENT_TIMESTAMP
            WHERE id = $2
            RETURNING balance;
        "#,
    )
    .bind(amount)
    .bind(user_id)
    .fetch_optional(conn)
    .await?;
    new_balance.ok_or(WalletError::UserNotFound(user_id))
}
