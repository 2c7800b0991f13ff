use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use wallet_engine::{
    db_types::{
        CreditRequest,
        Kobo,
        NewOrder,
        NewOrderItem,
        NewUser,
        ReferralOutcome,
        ReferralSkipReason,
        TransactionType,
    },
    events::EventProducers,
    helpers::Clock,
    OrderFlowApi,
    ReferralApi,
    ReferralConfig,
    SqliteDatabase,
    WalletError,
    WalletManagement,
};

use crate::support::prepare_env::{assert_consistent, funded_user, setup, tear_down};

mod support;

fn groceries(user_id: i64) -> NewOrder {
    NewOrder::new(user_id, vec![NewOrderItem::new("tomatoes-basket", 1, Kobo::from(20_000))])
}

fn referral_api(db: &SqliteDatabase) -> ReferralApi<SqliteDatabase> {
    ReferralApi::new(db.clone(), EventProducers::default(), ReferralConfig::default())
}

struct FixedClock(i64);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp_millis(self.0).expect("valid timestamp")
    }
}

fn referral_credits(txs: &[wallet_engine::db_types::WalletTransaction]) -> Vec<Kobo> {
    txs.iter().filter(|t| t.transaction_type == TransactionType::CreditReferral).map(|t| t.amount).collect()
}

#[tokio::test]
async fn first_order_pays_both_sides() {
    let db = setup().await;
    let referrer = funded_user(&db, NewUser::default(), 0).await;
    let referee = funded_user(&db, NewUser::default().referred_by(referrer.referral_code.as_str()), 100_000).await;
    let orders = OrderFlowApi::new(db.clone(), EventProducers::default());
    orders.settle(groceries(referee.id)).await.unwrap();

    let outcome = referral_api(&db).maybe_issue_referral_bonus(referee.id).await.unwrap();
    let ReferralOutcome::Issued { referrer: r, referee: e } = outcome else { panic!("Bonus was not issued") };
    assert_eq!(r.user_id, referrer.id);
    assert_eq!(r.new_balance, Kobo::from(50_000));
    assert_eq!(e.user_id, referee.id);
    assert_eq!(e.new_balance, Kobo::from(105_000));

    let referrer_txs = db.fetch_transactions_for_user(referrer.id).await.unwrap();
    let referee_txs = db.fetch_transactions_for_user(referee.id).await.unwrap();
    assert_eq!(referral_credits(&referrer_txs), vec![Kobo::from(50_000)]);
    assert_eq!(referral_credits(&referee_txs), vec![Kobo::from(25_000)]);
    let reference = referrer_txs[0].reference.clone().unwrap();
    assert!(reference.starts_with(&format!("ref_{}_", referee.id)));
    assert!(reference.ends_with("_referrer"));

    // Never twice
    let outcome = referral_api(&db).maybe_issue_referral_bonus(referee.id).await.unwrap();
    assert_eq!(outcome, ReferralOutcome::Skipped(ReferralSkipReason::AlreadyIssued));
    assert!(db.fetch_user(referee.id).await.unwrap().unwrap().referral_bonus_issued);
    assert_consistent(&db, referrer.id).await;
    assert_consistent(&db, referee.id).await;
    tear_down(db).await;
}

#[tokio::test]
async fn preconditions_skip_without_credits() {
    let db = setup().await;
    let api = referral_api(&db);
    let orders = OrderFlowApi::new(db.clone(), EventProducers::default());

    let loner = funded_user(&db, NewUser::default(), 100_000).await;
    orders.settle(groceries(loner.id)).await.unwrap();
    let outcome = api.maybe_issue_referral_bonus(loner.id).await.unwrap();
    assert_eq!(outcome, ReferralOutcome::Skipped(ReferralSkipReason::NoReferrer));

    let orphan = funded_user(&db, NewUser::default().referred_by("NOBODY99"), 100_000).await;
    orders.settle(groceries(orphan.id)).await.unwrap();
    let outcome = api.maybe_issue_referral_bonus(orphan.id).await.unwrap();
    assert_eq!(outcome, ReferralOutcome::Skipped(ReferralSkipReason::ReferrerNotFound));

    let referrer = funded_user(&db, NewUser::default(), 0).await;
    let eager = funded_user(&db, NewUser::default().referred_by(referrer.referral_code.as_str()), 0).await;
    let outcome = api.maybe_issue_referral_bonus(eager.id).await.unwrap();
    assert_eq!(outcome, ReferralOutcome::Skipped(ReferralSkipReason::NotFirstOrder));

    let regular = funded_user(&db, NewUser::default().referred_by(referrer.referral_code.as_str()), 100_000).await;
    orders.settle(groceries(regular.id)).await.unwrap();
    orders.settle(groceries(regular.id)).await.unwrap();
    let outcome = api.maybe_issue_referral_bonus(regular.id).await.unwrap();
    assert_eq!(outcome, ReferralOutcome::Skipped(ReferralSkipReason::NotFirstOrder));

    for user_id in [loner.id, orphan.id, referrer.id, eager.id, regular.id] {
        let txs = db.fetch_transactions_for_user(user_id).await.unwrap();
        assert!(referral_credits(&txs).is_empty());
    }
    tear_down(db).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_checks_pay_once() {
    let db = setup().await;
    let referrer = funded_user(&db, NewUser::default(), 0).await;
    let referee = funded_user(&db, NewUser::default().referred_by(referrer.referral_code.as_str()), 20_000).await;
    OrderFlowApi::new(db.clone(), EventProducers::default()).settle(groceries(referee.id)).await.unwrap();
    let api = referral_api(&db);
    let referee_id = referee.id;
    let tasks = (0..8).map(|_| {
        let api = api.clone();
        tokio::spawn(async move { api.maybe_issue_referral_bonus(referee_id).await })
    });
    let outcomes = join_all(tasks).await.into_iter().map(|r| r.unwrap().unwrap()).collect::<Vec<_>>();
    let issued = outcomes.iter().filter(|o| matches!(o, ReferralOutcome::Issued { .. })).count();
    assert_eq!(issued, 1);
    assert_eq!(assert_consistent(&db, referrer.id).await, Kobo::from(50_000));
    assert_eq!(assert_consistent(&db, referee.id).await, Kobo::from(25_000));
    tear_down(db).await;
}

#[tokio::test]
async fn placing_an_order_triggers_the_bonus() {
    let db = setup().await;
    let referrer = funded_user(&db, NewUser::default(), 0).await;
    let referee = funded_user(&db, NewUser::default().referred_by(referrer.referral_code.as_str()), 20_000).await;
    let config = ReferralConfig { referrer_credit: Kobo::from(1_000), referee_credit: Kobo::from(500) };
    let orders = OrderFlowApi::with_referral_config(db.clone(), EventProducers::default(), config);
    orders.place_order(groceries(referee.id)).await.unwrap();
    let mut balance = Kobo::from(0);
    for _ in 0..50 {
        balance = db.fetch_balance(referrer.id).await.unwrap();
        if balance.is_positive() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert_eq!(balance, Kobo::from(1_000));
    assert_eq!(db.fetch_balance(referee.id).await.unwrap(), Kobo::from(500));
    tear_down(db).await;
}

#[tokio::test]
async fn failed_second_credit_rolls_back_the_whole_bonus() {
    let db = setup().await;
    let referrer = funded_user(&db, NewUser::default(), 0).await;
    let referee = funded_user(&db, NewUser::default().referred_by(referrer.referral_code.as_str()), 100_000).await;
    OrderFlowApi::new(db.clone(), EventProducers::default()).settle(groceries(referee.id)).await.unwrap();

    // The referee's bonus reference is already taken, so the second credit of the unit cannot be applied
    let millis = 1_727_740_800_000;
    let taken = CreditRequest::new(referee.id, Kobo::from(1), TransactionType::CreditTransfer, "Unrelated transfer")
        .with_reference(format!("ref_{}_{millis}_referee", referee.id));
    db.credit(taken).await.unwrap();

    let api = referral_api(&db).with_clock(Arc::new(FixedClock(millis)));
    let err = api.maybe_issue_referral_bonus(referee.id).await.unwrap_err();
    assert!(matches!(err, WalletError::DuplicateReference(_)), "Unexpected error: {err}");

    for user_id in [referrer.id, referee.id] {
        let txs = db.fetch_transactions_for_user(user_id).await.unwrap();
        assert!(referral_credits(&txs).is_empty());
    }
    assert_eq!(assert_consistent(&db, referrer.id).await, Kobo::from(0));
    assert_eq!(assert_consistent(&db, referee.id).await, Kobo::from(80_001));
    assert!(!db.fetch_user(referee.id).await.unwrap().unwrap().referral_bonus_issued);

    // Nothing was left half-done, so a later attempt pays both sides
    let api = referral_api(&db).with_clock(Arc::new(FixedClock(millis + 1)));
    let outcome = api.maybe_issue_referral_bonus(referee.id).await.unwrap();
    assert!(matches!(outcome, ReferralOutcome::Issued { .. }));
    assert_eq!(assert_consistent(&db, referrer.id).await, Kobo::from(50_000));
    assert_eq!(assert_consistent(&db, referee.id).await, Kobo::from(105_001));
    tear_down(db).await;
}
