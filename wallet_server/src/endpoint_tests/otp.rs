use actix_web::{http::StatusCode, test::TestRequest};
use serde_json::json as json_body;
use wallet_engine::{
    test_utils::prepare_env::{prepare_test_db, teardown},
    SqliteDatabase,
};

use super::helpers::{json, send_request, test_config, CapturingOtpSender};

const PHONE: &str = "+2348030000000";

fn otp_request(phone: &str) -> TestRequest {
    TestRequest::post().uri("/api/otp/request").set_json(json_body!({ "phone": phone }))
}

fn otp_verification(phone: &str, code: &str) -> TestRequest {
    TestRequest::post().uri("/api/otp/verify").set_json(json_body!({ "phone": phone, "code": code }))
}

async fn send(db: &SqliteDatabase, handset: &CapturingOtpSender, req: TestRequest) -> (StatusCode, String) {
    send_request(db, handset.clone(), &test_config(), req.to_request()).await
}

#[actix_web::test]
async fn request_and_verify() {
    let db = prepare_test_db().await;
    let handset = CapturingOtpSender::default();

    let (status, body) = send(&db, &handset, otp_request("+234 803 000 0000")).await;
    assert_eq!(status, StatusCode::OK);
    let issued = json(&body);
    assert_eq!(issued["phone"], PHONE);
    assert!(issued["expires_at"].is_string());
    let code = handset.last_code_for(PHONE).expect("A code should have been sent");

    let wrong = if code == "000000" { "111111" } else { "000000" };
    let (status, body) = send(&db, &handset, otp_verification(PHONE, wrong)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let body = json(&body);
    assert_eq!(body["code"], "INVALID_OTP");
    assert_eq!(body["attempts_remaining"], 4);

    let (status, body) = send(&db, &handset, otp_verification(PHONE, &code)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["success"], true);

    // Consumed once verified
    let (status, body) = send(&db, &handset, otp_verification(PHONE, &code)).await;
    assert_eq!(status, StatusCode::GONE);
    assert_eq!(json(&body)["code"], "OTP_EXPIRED");
    teardown(db).await;
}

#[actix_web::test]
async fn too_many_wrong_codes_discard_the_challenge() {
    let db = prepare_test_db().await;
    let handset = CapturingOtpSender::default();
    let (status, _) = send(&db, &handset, otp_request(PHONE)).await;
    assert_eq!(status, StatusCode::OK);
    let code = handset.last_code_for(PHONE).unwrap();
    let wrong = if code == "999999" { "888888" } else { "999999" };
    for remaining in (0..5).rev() {
        let (status, body) = send(&db, &handset, otp_verification(PHONE, wrong)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json(&body)["attempts_remaining"], remaining);
    }
    let (status, _) = send(&db, &handset, otp_verification(PHONE, &code)).await;
    assert_eq!(status, StatusCode::GONE);
    teardown(db).await;
}

#[actix_web::test]
async fn requests_are_rate_limited() {
    let db = prepare_test_db().await;
    let handset = CapturingOtpSender::default();
    for _ in 0..test_config().otp.max_requests {
        let (status, _) = send(&db, &handset, otp_request(PHONE)).await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, body) = send(&db, &handset, otp_request(PHONE)).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    let body = json(&body);
    assert_eq!(body["code"], "RATE_LIMIT_EXCEEDED");
    assert_eq!(body["limit"], 3);
    let retry_after = body["retry_after_secs"].as_i64().unwrap();
    assert!(retry_after > 0 && retry_after <= 600);
    // Other phones have their own window
    let (status, _) = send(&db, &handset, otp_request("+2348031111111")).await;
    assert_eq!(status, StatusCode::OK);
    teardown(db).await;
}

#[actix_web::test]
async fn invalid_phone() {
    let db = prepare_test_db().await;
    let (status, body) = send(&db, &CapturingOtpSender::default(), otp_request("call me")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json(&body)["code"], "INVALID_PHONE");
    teardown(db).await;
}
