use wallet_engine::{
    db_types::{Kobo, NewUser, PaymentStatus, TransactionType},
    events::EventProducers,
    PaymentApi,
    PaymentManagement,
    PaymentOutcome,
    SqliteDatabase,
    WalletError,
    WalletManagement,
};

use crate::support::prepare_env::{assert_consistent, funded_user, setup, tear_down};

mod support;

fn payment_api(db: &SqliteDatabase) -> PaymentApi<SqliteDatabase> {
    PaymentApi::new(db.clone(), EventProducers::default())
}

fn success(reference: &str) -> PaymentOutcome {
    PaymentOutcome::Success { reference: reference.to_string(), message: Some("Approved".into()) }
}

#[tokio::test]
async fn initiated_payment_credits_stored_amount_once() {
    let db = setup().await;
    let user = funded_user(&db, NewUser::default(), 0).await;
    let api = payment_api(&db);
    let intent = api.initiate(user.id, Kobo::from(250_000), None).await.unwrap();
    assert!(intent.reference.starts_with("pay_"));
    assert_eq!(intent.status, PaymentStatus::Pending);
    assert_eq!(db.fetch_balance(user.id).await.unwrap(), Kobo::from(0));

    let first = api.complete(&intent.reference, success(&intent.reference)).await.unwrap();
    let credit = first.credit.unwrap();
    assert!(!credit.replayed);
    assert_eq!(credit.entry.new_balance, Kobo::from(250_000));
    assert_eq!(first.intent.status, PaymentStatus::Completed);

    let again = api.complete(&intent.reference, success(&intent.reference)).await.unwrap();
    assert!(again.credit.unwrap().replayed);
    assert_eq!(assert_consistent(&db, user.id).await, Kobo::from(250_000));
    let txs = db.fetch_transactions_for_user(user.id).await.unwrap();
    assert_eq!(txs.len(), 1);
    assert_eq!(txs[0].transaction_type, TransactionType::CreditCard);
    assert_eq!(txs[0].reference.as_deref(), Some(intent.reference.as_str()));
    tear_down(db).await;
}

#[tokio::test]
async fn unknown_reference_credits_nothing() {
    let db = setup().await;
    let user = funded_user(&db, NewUser::default(), 1_000).await;
    let api = payment_api(&db);
    let err = api.complete("made_up", success("made_up")).await.unwrap_err();
    assert_eq!(err, WalletError::PaymentNotFound("made_up".into()));
    let err = api.complete("made_up", PaymentOutcome::Cancelled).await.unwrap_err();
    assert_eq!(err, WalletError::PaymentNotFound("made_up".into()));
    assert!(db.fetch_payment_intent("made_up").await.unwrap().is_none());
    assert_eq!(assert_consistent(&db, user.id).await, Kobo::from(1_000));
    assert_eq!(db.fetch_transactions_for_user(user.id).await.unwrap().len(), 1);
    tear_down(db).await;
}

#[tokio::test]
async fn reported_reference_cannot_redirect_the_credit() {
    let db = setup().await;
    let payer = funded_user(&db, NewUser::default(), 0).await;
    let api = payment_api(&db);
    let intent = api.initiate(payer.id, Kobo::from(5_000), Some("pay_small".into())).await.unwrap();
    let other = api.initiate(payer.id, Kobo::from(900_000), Some("pay_large".into())).await.unwrap();

    // The checkout names the large payment, but the small one is being completed
    let done = api.complete(&intent.reference, success(&other.reference)).await.unwrap();
    assert_eq!(done.credit.unwrap().entry.new_balance, Kobo::from(5_000));
    let untouched = db.fetch_payment_intent("pay_large").await.unwrap().unwrap();
    assert_eq!(untouched.status, PaymentStatus::Pending);
    assert_eq!(assert_consistent(&db, payer.id).await, Kobo::from(5_000));
    tear_down(db).await;
}

#[tokio::test]
async fn cancelled_and_failed_payments_only_change_status() {
    let db = setup().await;
    let user = funded_user(&db, NewUser::default(), 10_000).await;
    let api = payment_api(&db);
    let cancelled = api.initiate(user.id, Kobo::from(50_000), Some("pay_cancel".into())).await.unwrap();
    let failed = api.initiate(user.id, Kobo::from(50_000), Some("pay_fail".into())).await.unwrap();

    let done = api.complete(&cancelled.reference, PaymentOutcome::Cancelled).await.unwrap();
    assert!(done.credit.is_none());
    assert_eq!(done.intent.status, PaymentStatus::Cancelled);
    let outcome = PaymentOutcome::Failed { message: "Declined".into() };
    let done = api.complete(&failed.reference, outcome).await.unwrap();
    assert!(done.credit.is_none());
    assert_eq!(done.intent.status, PaymentStatus::Failed);
    assert_eq!(assert_consistent(&db, user.id).await, Kobo::from(10_000));

    // A late cancellation does not undo a completed payment
    let paid = api.initiate(user.id, Kobo::from(3_000), Some("pay_done".into())).await.unwrap();
    api.complete(&paid.reference, success(&paid.reference)).await.unwrap();
    let done = api.complete(&paid.reference, PaymentOutcome::Cancelled).await.unwrap();
    assert_eq!(done.intent.status, PaymentStatus::Completed);
    assert_eq!(assert_consistent(&db, user.id).await, Kobo::from(13_000));
    tear_down(db).await;
}

#[tokio::test]
async fn invalid_initiations() {
    let db = setup().await;
    let user = funded_user(&db, NewUser::default(), 0).await;
    let api = payment_api(&db);
    let err = api.initiate(user.id, Kobo::from(-5), None).await.unwrap_err();
    assert!(matches!(err, WalletError::InvalidAmount(_)));
    let err = api.initiate(9_999, Kobo::from(5_000), None).await.unwrap_err();
    assert_eq!(err, WalletError::UserNotFound(9_999));
    api.initiate(user.id, Kobo::from(5_000), Some("pay_twice".into())).await.unwrap();
    let err = api.initiate(user.id, Kobo::from(7_000), Some("pay_twice".into())).await.unwrap_err();
    assert_eq!(err, WalletError::DuplicateReference("pay_twice".into()));
    let stored = db.fetch_payment_intent("pay_twice").await.unwrap().unwrap();
    assert_eq!(stored.amount, Kobo::from(5_000));
    tear_down(db).await;
}
