use actix_web::{http::StatusCode, test::TestRequest};
use serde_json::json as json_body;
use wallet_engine::{
    db_types::NewUser,
    test_utils::prepare_env::{prepare_test_db, teardown, user_with_balance},
    traits::WalletManagement,
};

use super::helpers::{json, request};

#[actix_web::test]
async fn place_order_then_run_out_of_funds() {
    let db = prepare_test_db().await;
    let user = user_with_balance(&db, NewUser::default(), 500_000).await;
    let order = json_body!({
        "user_id": user.id,
        "items": [
            { "item_id": "rice-5kg", "quantity": 2, "unit_price": 100_000 },
            { "item_id": "palm-oil-1l", "quantity": 1, "unit_price": 100_000 }
        ],
        "note": "Leave at the gate"
    });
    let req = TestRequest::post().uri("/api/orders").set_json(&order).to_request();
    let (status, body) = request(&db, req).await;
    assert_eq!(status, StatusCode::OK);
    let placed = json(&body);
    assert_eq!(placed["total"], 300_000);
    assert_eq!(placed["status"], "CONFIRMED");
    assert_eq!(placed["note"], "Leave at the gate");
    assert_eq!(placed["items"].as_array().unwrap().len(), 2);
    assert_eq!(db.fetch_balance(user.id).await.unwrap().value(), 200_000);

    let order = json_body!({
        "user_id": user.id,
        "items": [{ "item_id": "yam-tuber", "quantity": 5, "unit_price": 50_000 }]
    });
    let req = TestRequest::post().uri("/api/orders").set_json(&order).to_request();
    let (status, body) = request(&db, req).await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    let body = json(&body);
    assert_eq!(body["code"], "INSUFFICIENT_BALANCE");
    assert_eq!(body["balance"], 200_000);
    assert_eq!(body["requested"], 250_000);
    assert_eq!(db.fetch_balance(user.id).await.unwrap().value(), 200_000);

    let order_id = placed["id"].as_str().unwrap();
    let req = TestRequest::get().uri(&format!("/api/orders/{order_id}")).to_request();
    let (status, body) = request(&db, req).await;
    assert_eq!(status, StatusCode::OK);
    let fetched = json(&body);
    assert_eq!(fetched["id"], order_id);
    assert_eq!(fetched["total"], 300_000);
    teardown(db).await;
}

#[actix_web::test]
async fn rejected_orders() {
    let db = prepare_test_db().await;
    let user = user_with_balance(&db, NewUser::default(), 100_000).await;

    let empty = json_body!({ "user_id": user.id, "items": [] });
    let req = TestRequest::post().uri("/api/orders").set_json(&empty).to_request();
    let (status, body) = request(&db, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json(&body)["code"], "EMPTY_CART");

    let zero_qty = json_body!({
        "user_id": user.id,
        "items": [{ "item_id": "eggs-crate", "quantity": 0, "unit_price": 45_000 }]
    });
    let req = TestRequest::post().uri("/api/orders").set_json(&zero_qty).to_request();
    let (status, body) = request(&db, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json(&body)["code"], "INVALID_AMOUNT");

    let req = TestRequest::post()
        .uri("/api/orders")
        .insert_header(("content-type", "application/json"))
        .set_payload("{\"user_id\": \"bob\"}")
        .to_request();
    let (status, body) = request(&db, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json(&body)["code"], "INVALID_REQUEST");

    assert_eq!(db.fetch_balance(user.id).await.unwrap().value(), 100_000);
    assert_eq!(db.fetch_transactions_for_user(user.id).await.unwrap().len(), 1);
    teardown(db).await;
}

#[actix_web::test]
async fn unknown_order() {
    let db = prepare_test_db().await;
    let req = TestRequest::get().uri("/api/orders/ord_0000000000000000").to_request();
    let (status, body) = request(&db, req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json(&body)["code"], "ORDER_NOT_FOUND");
    teardown(db).await;
}
