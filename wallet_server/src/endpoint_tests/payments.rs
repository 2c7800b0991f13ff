use actix_web::{http::StatusCode, test::TestRequest};
use serde_json::json as json_body;
use wallet_engine::{
    db_types::NewUser,
    test_utils::prepare_env::{prepare_test_db, teardown, user_with_balance},
    traits::WalletManagement,
};

use super::helpers::{json, request};

fn complete(body: serde_json::Value) -> TestRequest {
    TestRequest::post().uri("/api/payments/complete").set_json(body)
}

#[actix_web::test]
async fn card_payment_round_trip() {
    let db = prepare_test_db().await;
    let user = user_with_balance(&db, NewUser::default(), 0).await;
    let req = TestRequest::post()
        .uri("/api/payments/initiate")
        .set_json(json_body!({ "user_id": user.id, "amount": 250_000 }))
        .to_request();
    let (status, body) = request(&db, req).await;
    assert_eq!(status, StatusCode::OK);
    let intent = json(&body);
    assert_eq!(intent["status"], "PENDING");
    assert_eq!(intent["amount"], 250_000);
    let reference = intent["reference"].as_str().unwrap().to_string();
    assert!(reference.starts_with("pay_"));
    assert_eq!(db.fetch_balance(user.id).await.unwrap().value(), 0);

    let completion = json_body!({
        "reference": reference,
        "outcome": { "status": "success", "reference": reference, "message": "Approved" }
    });
    for _ in 0..2 {
        let (status, body) = request(&db, complete(completion.clone()).to_request()).await;
        assert_eq!(status, StatusCode::OK);
        let body = json(&body);
        assert_eq!(body["status"], "COMPLETED");
        assert_eq!(body["credited"], true);
        assert_eq!(body["credit"]["entry"]["new_balance"], 250_000);
    }
    assert_eq!(db.fetch_balance(user.id).await.unwrap().value(), 250_000);
    teardown(db).await;
}

#[actix_web::test]
async fn amounts_in_the_completion_are_ignored() {
    let db = prepare_test_db().await;
    let user = user_with_balance(&db, NewUser::default(), 0).await;
    let req = TestRequest::post()
        .uri("/api/payments/initiate")
        .set_json(json_body!({ "user_id": user.id, "amount": 1_000, "reference": "pay_small" }))
        .to_request();
    let (status, _) = request(&db, req).await;
    assert_eq!(status, StatusCode::OK);

    let forged = json_body!({
        "reference": "pay_small",
        "intent": { "user_id": user.id, "amount": 999_999_999, "reference": "pay_small" },
        "amount": 999_999_999,
        "outcome": { "status": "success", "reference": "pay_small", "message": null }
    });
    let (status, body) = request(&db, complete(forged).to_request()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["credit"]["entry"]["new_balance"], 1_000);
    assert_eq!(db.fetch_balance(user.id).await.unwrap().value(), 1_000);
    teardown(db).await;
}

#[actix_web::test]
async fn payments_that_were_never_initiated_are_rejected() {
    let db = prepare_test_db().await;
    let user = user_with_balance(&db, NewUser::default(), 10_000).await;
    let forged = json_body!({
        "reference": "made_up",
        "outcome": { "status": "success", "reference": "made_up", "message": "Approved" }
    });
    let (status, body) = request(&db, complete(forged).to_request()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json(&body)["code"], "PAYMENT_NOT_FOUND");
    // A client-built intent does not stand in for the reference
    let intent_only = json_body!({
        "intent": { "user_id": user.id, "amount": 999_999_999, "reference": "made_up" },
        "outcome": { "status": "success", "reference": "made_up", "message": "Approved" }
    });
    let (status, body) = request(&db, complete(intent_only).to_request()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json(&body)["code"], "INVALID_REQUEST");
    assert_eq!(db.fetch_balance(user.id).await.unwrap().value(), 10_000);
    assert_eq!(db.fetch_transactions_for_user(user.id).await.unwrap().len(), 1);
    teardown(db).await;
}

#[actix_web::test]
async fn cancelled_and_failed_payments_change_nothing() {
    let db = prepare_test_db().await;
    let user = user_with_balance(&db, NewUser::default(), 10_000).await;
    let outcomes = [
        ("pay_cancel_me", json_body!({ "status": "cancelled" }), "CANCELLED"),
        ("pay_decline_me", json_body!({ "status": "failed", "message": "Declined" }), "FAILED"),
    ];
    for (reference, outcome, expected) in outcomes {
        let req = TestRequest::post()
            .uri("/api/payments/initiate")
            .set_json(json_body!({ "user_id": user.id, "amount": 50_000, "reference": reference }))
            .to_request();
        let (status, _) = request(&db, req).await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) =
            request(&db, complete(json_body!({ "reference": reference, "outcome": outcome })).to_request()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            json(&body),
            json_body!({ "reference": reference, "status": expected, "credited": false, "credit": null })
        );
    }
    assert_eq!(db.fetch_balance(user.id).await.unwrap().value(), 10_000);

    let req = TestRequest::post()
        .uri("/api/payments/initiate")
        .set_json(json_body!({ "user_id": user.id, "amount": -5 }))
        .to_request();
    let (status, body) = request(&db, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json(&body)["code"], "INVALID_AMOUNT");
    teardown(db).await;
}
