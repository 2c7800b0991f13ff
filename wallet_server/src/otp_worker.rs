use std::time::Duration;

use log::*;
use tokio::task::JoinHandle;
use wallet_engine::{OtpApi, OtpSender, SqliteDatabase};

/// Starts the OTP purge worker. Do not await the returned JoinHandle, as it will run indefinitely.
///
/// Expired challenges and rate windows are already invisible to every read, so the worker only keeps the tables small.
pub fn start_otp_purge_worker<S>(api: OtpApi<SqliteDatabase, S>, interval: Duration) -> JoinHandle<()>
where S: OtpSender + 'static {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        info!("🕰️ OTP purge worker started");
        loop {
            timer.tick().await;
            trace!("🕰️ Running OTP purge job");
            match api.purge_expired().await {
                Ok(0) => {},
                Ok(n) => info!("🕰️ {n} expired OTP records purged"),
                Err(e) => error!("🕰️ Error running OTP purge job: {e}"),
            }
        }
    })
}
