use actix_web::{http::StatusCode, test::TestRequest};
use wallet_engine::{
    db_types::NewUser,
    test_utils::prepare_env::{prepare_test_db, teardown, user_with_balance},
    traits::WalletManagement,
};

use super::helpers::{request, send_request, test_config, CapturingOtpSender, TEST_SECRET_KEY};
use crate::helpers::calculate_hmac;

fn transfer_event(user_id: i64, amount: i64, reference: &str) -> String {
    format!(
        r#"{{
            "event": "dedicated_account.credit",
            "data": {{
                "amount": {amount},
                "reference": "{reference}",
                "customer": {{ "customer_code": "CUS_grocer" }},
                "metadata": {{ "user_id": "{user_id}" }}
            }}
        }}"#
    )
}

fn signed_webhook(payload: &str) -> TestRequest {
    TestRequest::post()
        .uri("/webhook/paystack")
        .insert_header(("content-type", "application/json"))
        .insert_header(("x-paystack-signature", calculate_hmac(TEST_SECRET_KEY, payload.as_bytes())))
        .set_payload(payload.to_string())
}

#[actix_web::test]
async fn duplicate_webhook_credits_once() {
    let db = prepare_test_db().await;
    let user = user_with_balance(&db, NewUser::default(), 0).await;
    let payload = transfer_event(user.id, 100_000, "pay_1");
    for _ in 0..2 {
        let (status, body) = request(&db, signed_webhook(&payload).to_request()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"status":"success"}"#);
    }
    assert_eq!(db.fetch_balance(user.id).await.unwrap().value(), 100_000);
    let txs = db.fetch_transactions_for_user(user.id).await.unwrap();
    assert_eq!(txs.len(), 1);
    assert_eq!(txs[0].reference.as_deref(), Some("pay_1"));
    teardown(db).await;
}

#[actix_web::test]
async fn bad_signatures_are_rejected() {
    let db = prepare_test_db().await;
    let user = user_with_balance(&db, NewUser::default(), 0).await;
    let payload = transfer_event(user.id, 100_000, "pay_forged");

    let req = signed_webhook(&payload).insert_header(("x-paystack-signature", "deadbeef")).to_request();
    let (status, _) = request(&db, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = TestRequest::post().uri("/webhook/paystack").set_payload(payload.clone()).to_request();
    let (status, _) = request(&db, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let tampered = payload.replace("100000", "900000");
    let req = signed_webhook(&payload).set_payload(tampered).to_request();
    let (status, _) = request(&db, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    assert_eq!(db.fetch_balance(user.id).await.unwrap().value(), 0);
    teardown(db).await;
}

#[actix_web::test]
async fn processing_failures_are_still_acknowledged() {
    let db = prepare_test_db().await;
    // Not JSON at all
    let (status, body) = request(&db, signed_webhook("this is not an event").to_request()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"status":"success"}"#);
    // A user that doesn't exist
    let (status, _) = request(&db, signed_webhook(&transfer_event(31337, 5_000, "pay_ghost")).to_request()).await;
    assert_eq!(status, StatusCode::OK);
    // An event type that doesn't credit anyone
    let payload = r#"{"event": "transfer.success", "data": {"amount": 5000, "reference": "trf_1"}}"#;
    let (status, _) = request(&db, signed_webhook(payload).to_request()).await;
    assert_eq!(status, StatusCode::OK);
    teardown(db).await;
}

#[actix_web::test]
async fn whitelist_is_enforced() {
    let db = prepare_test_db().await;
    let user = user_with_balance(&db, NewUser::default(), 0).await;
    let mut config = test_config();
    config.webhook.whitelist = Some(vec!["52.31.139.75".parse().unwrap()]);

    let req = signed_webhook(&transfer_event(user.id, 10_000, "pay_wl_1"))
        .peer_addr("10.9.8.7:443".parse().unwrap())
        .to_request();
    let (status, _) = send_request(&db, CapturingOtpSender::default(), &config, req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let req = signed_webhook(&transfer_event(user.id, 10_000, "pay_wl_2"))
        .peer_addr("52.31.139.75:443".parse().unwrap())
        .to_request();
    let (status, _) = send_request(&db, CapturingOtpSender::default(), &config, req).await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(db.fetch_balance(user.id).await.unwrap().value(), 10_000);
    teardown(db).await;
}
