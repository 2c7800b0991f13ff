use sqlx::SqliteConnection;

use crate::{
    db_types::{OtpChallenge, OtpCheck, RateWindow},
    traits::OtpError,
};

/// Atomically counts a request against the phone's rate window. An expired window is restarted at 1.
pub async fn record_request(
    phone: &str,
    now: i64,
    window_ms: i64,
    conn: &mut SqliteConnection,
) -> Result<RateWindow, sqlx::Error> {
    sqlx::query_as(
        r#"
            INSERT INTO otp_rate_windows (phone, request_count, expires_at)
            VALUES ($1, 1, $2 + $3)
            ON CONFLICT (phone) DO UPDATE SET
                request_count = CASE
                    WHEN otp_rate_windows.expires_at <= $2 THEN 1
                    ELSE otp_rate_windows.request_count + 1
                END,
                expires_at = CASE
                    WHEN otp_rate_windows.expires_at <= $2 THEN excluded.expires_at
                    ELSE otp_rate_windows.expires_at
                END
            RETURNING request_count, expires_at;
        "#,
    )
    .bind(phone)
    .bind(now)
    .bind(window_ms)
    .fetch_one(conn)
    .await
}

/// Stores the challenge, wholly replacing any earlier one for the phone.
pub async fn upsert_challenge(challenge: &OtpChallenge, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
            INSERT INTO otp_challenges (phone, code_hash, failed_attempts, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (phone) DO UPDATE SET
                code_hash = excluded.code_hash,
                failed_attempts = excluded.failed_attempts,
                created_at = excluded.created_at,
                expires_at = excluded.expires_at;
        "#,
    )
    .bind(&challenge.phone)
    .bind(&challenge.code_hash)
    .bind(challenge.failed_attempts)
    .bind(challenge.created_at)
    .bind(challenge.expires_at)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn fetch_live_challenge(
    phone: &str,
    now: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<OtpChallenge>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM otp_challenges WHERE phone = $1 AND expires_at > $2")
        .bind(phone)
        .bind(now)
        .fetch_optional(conn)
        .await
}

pub async fn delete_challenge(phone: &str, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM otp_challenges WHERE phone = $1").bind(phone).execute(conn).await?;
    Ok(())
}

async fn delete_expired_challenge(phone: &str, now: i64, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM otp_challenges WHERE phone = $1 AND expires_at <= $2")
        .bind(phone)
        .bind(now)
        .execute(conn)
        .await?;
    Ok(())
}

/// Increments the failure counter, leaving the expiry as it is. Returns the new count.
async fn record_failure(phone: &str, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "UPDATE otp_challenges SET failed_attempts = failed_attempts + 1 WHERE phone = $1 RETURNING failed_attempts",
    )
    .bind(phone)
    .fetch_one(conn)
    .await
}

/// Runs one verification attempt against the phone's challenge. Run inside a transaction.
pub async fn check(
    phone: &str,
    code_hash: &str,
    max_attempts: i64,
    now: i64,
    conn: &mut SqliteConnection,
) -> Result<OtpCheck, OtpError> {
    delete_expired_challenge(phone, now, conn).await?;
    let challenge = match fetch_live_challenge(phone, now, conn).await? {
        Some(c) => c,
        None => return Ok(OtpCheck::Missing),
    };
    if challenge.failed_attempts >= max_attempts {
        delete_challenge(phone, conn).await?;
        return Ok(OtpCheck::Locked);
    }
    if challenge.code_hash != code_hash {
        let failed_attempts = record_failure(phone, conn).await?;
        return Ok(OtpCheck::Mismatch { failed_attempts });
    }
    delete_challenge(phone, conn).await?;
    Ok(OtpCheck::Verified)
}

/// Removes every expired challenge and rate window.
pub async fn purge_expired(now: i64, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let challenges =
        sqlx::query("DELETE FROM otp_challenges WHERE expires_at <= $1").bind(now).execute(&mut *conn).await?;
    let windows = sqlx::query("DELETE FROM otp_rate_windows WHERE expires_at <= $1").bind(now).execute(conn).await?;
    Ok(challenges.rows_affected() + windows.rows_affected())
}
