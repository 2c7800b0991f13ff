use actix_web::{http::StatusCode, test::TestRequest};
use wallet_engine::{
    db_types::NewUser,
    test_utils::prepare_env::{prepare_test_db, teardown, user_with_balance},
};

use super::helpers::{json, request};

#[actix_web::test]
async fn fetch_balance() {
    let db = prepare_test_db().await;
    let user = user_with_balance(&db, NewUser::default(), 500_000).await;
    let req = TestRequest::get().uri(&format!("/api/wallet/{}/balance", user.id)).to_request();
    let (status, body) = request(&db, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body), serde_json::json!({ "user_id": user.id, "balance": 500_000 }));
    teardown(db).await;
}

#[actix_web::test]
async fn fetch_balance_for_unknown_user() {
    let db = prepare_test_db().await;
    let req = TestRequest::get().uri("/api/wallet/9999/balance").to_request();
    let (status, body) = request(&db, req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let body = json(&body);
    assert_eq!(body["code"], "USER_NOT_FOUND");
    assert_eq!(body["error"], "User 9999 does not exist");
    teardown(db).await;
}

#[actix_web::test]
async fn fetch_transactions() {
    let db = prepare_test_db().await;
    let user = user_with_balance(&db, NewUser::default(), 120_000).await;
    let req = TestRequest::get().uri(&format!("/api/wallet/{}/transactions", user.id)).to_request();
    let (status, body) = request(&db, req).await;
    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    let txs = body.as_array().unwrap();
    assert_eq!(txs.len(), 1);
    assert_eq!(txs[0]["amount"], 120_000);
    assert_eq!(txs[0]["transaction_type"], "CREDIT_TRANSFER");
    assert_eq!(txs[0]["reference"], format!("opening_{}", user.id));

    let req = TestRequest::get().uri("/api/wallet/424242/transactions").to_request();
    let (status, _) = request(&db, req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    teardown(db).await;
}

#[actix_web::test]
async fn health_check() {
    let db = prepare_test_db().await;
    let (status, body) = request(&db, TestRequest::get().uri("/health").to_request()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "👍️\n");
    teardown(db).await;
}
