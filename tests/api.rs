mod common;

use common::*;
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;
use wallet_users::api;
use wallet_users::server::Server;
use warp::Filter;
use warp::http::StatusCode;

fn remote() -> SocketAddr {
    SocketAddr::new(IP.parse().unwrap(), 40110)
}

fn filter(
    h: &Harness,
) -> impl Filter<Extract = (impl warp::Reply + use<>,), Error = std::convert::Infallible> + Clone + use<> {
    let server = Arc::new(Server::from_service(h.service.clone()));
    api::v1::routes(server).recover(api::v1::recover_error)
}

fn body(res: &warp::http::Response<warp::hyper::body::Bytes>) -> Value {
    serde_json::from_slice(res.body()).unwrap()
}

async fn sign_up(h: &Harness) -> Value {
    let res = warp::test::request()
        .method("POST")
        .path("/users/api/v1/signUp")
        .remote_addr(remote())
        .json(&json!({ "email": "ann@example.com", "password": PASSWORD, "name": "Ann" }))
        .reply(&filter(h))
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    body(&res)
}

#[tokio::test]
async fn health_is_open() {
    let h = Harness::new(5);
    let res = warp::test::request()
        .path("/users/api/v1/health")
        .reply(&filter(&h))
        .await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn sign_up_returns_a_pair_and_me_resolves_it() {
    let h = Harness::new(5);
    let pair = sign_up(&h).await;
    let access = pair["access"].as_str().unwrap();
    assert!(pair["refresh"].is_string());

    let res = warp::test::request()
        .path("/users/api/v1/me")
        .header("X-API-Token", access)
        .reply(&filter(&h))
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    let me = body(&res);
    assert_eq!(me["email"], "ann@example.com");
    assert_eq!(me["settings"]["currency"], "RUB");

    let res = warp::test::request()
        .path("/users/api/v1/me")
        .header("Authorization", format!("Bearer {access}"))
        .reply(&filter(&h))
        .await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn me_without_token_is_unauthorized() {
    let h = Harness::new(5);
    let res = warp::test::request()
        .path("/users/api/v1/me")
        .reply(&filter(&h))
        .await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body(&res)["slug"], "invalid-token");
}

#[tokio::test]
async fn bad_credentials_are_a_bad_request() {
    let h = Harness::new(5);
    sign_up(&h).await;

    let res = warp::test::request()
        .method("POST")
        .path("/users/api/v1/signIn")
        .remote_addr(remote())
        .json(&json!({ "email": "ann@example.com", "password": "wrong-password" }))
        .reply(&filter(&h))
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body(&res)["slug"], "invalid-credentials");
}

#[tokio::test]
async fn duplicate_sign_up_is_refused() {
    let h = Harness::new(5);
    sign_up(&h).await;

    let res = warp::test::request()
        .method("POST")
        .path("/users/api/v1/signUp")
        .remote_addr(remote())
        .json(&json!({ "email": "ann@example.com", "password": PASSWORD, "name": "Ann" }))
        .reply(&filter(&h))
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body(&res)["slug"], "email-in-use");
}

#[tokio::test]
async fn refresh_honours_forwarded_address() {
    let h = Harness::new(5);
    let pair = sign_up(&h).await;
    let refresh = pair["refresh"].as_str().unwrap();

    // Same token from a different client address is refused.
    let res = warp::test::request()
        .method("POST")
        .path("/users/api/v1/refresh")
        .remote_addr(remote())
        .header("X-Forwarded-For", "198.51.100.9, 10.0.0.1")
        .json(&json!({ "refresh": refresh }))
        .reply(&filter(&h))
        .await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = warp::test::request()
        .method("POST")
        .path("/users/api/v1/refresh")
        .remote_addr(remote())
        .json(&json!({ "refresh": refresh }))
        .reply(&filter(&h))
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_ne!(body(&res)["refresh"], pair["refresh"]);
}

#[tokio::test]
async fn logout_then_refresh_fails() {
    let h = Harness::new(5);
    let pair = sign_up(&h).await;
    let refresh = pair["refresh"].as_str().unwrap();

    let res = warp::test::request()
        .method("POST")
        .path("/users/api/v1/logout")
        .remote_addr(remote())
        .json(&json!({ "refresh": refresh }))
        .reply(&filter(&h))
        .await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = warp::test::request()
        .method("POST")
        .path("/users/api/v1/refresh")
        .remote_addr(remote())
        .json(&json!({ "refresh": refresh }))
        .reply(&filter(&h))
        .await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn settings_update_validates_currency() {
    let h = Harness::new(5);
    let pair = sign_up(&h).await;
    let access = pair["access"].as_str().unwrap();

    let res = warp::test::request()
        .method("PUT")
        .path("/users/api/v1/settings")
        .header("X-API-Token", access)
        .json(&json!({ "currency": "USD" }))
        .reply(&filter(&h))
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body(&res)["settings"]["currency"], "USD");

    let res = warp::test::request()
        .method("PUT")
        .path("/users/api/v1/settings")
        .header("X-API-Token", access)
        .json(&json!({ "currency": "DOGE" }))
        .reply(&filter(&h))
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_body_is_a_bad_request() {
    let h = Harness::new(5);
    let res = warp::test::request()
        .method("POST")
        .path("/users/api/v1/signIn")
        .remote_addr(remote())
        .header("content-type", "application/json")
        .body("{not json")
        .reply(&filter(&h))
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body(&res)["slug"], "invalid-input");
}
