//! Tile endpoint integration tests.
//!
//! Tests verify:
//! - A template minted by `/style.json` unlocks tiles until it expires
//! - Missing, malformed, tampered and expired tokens are rejected
//! - Path validation and origin key mapping
//! - Origin failures map to 404 and 502

use axum::http::StatusCode;

use tile_proxy::store::OriginObject;
use tile_proxy::token::{SharedSecret, Signer};
use tile_proxy::ManualClock;

use super::test_utils::{
    assert_cors_headers, body_bytes, body_json, get, router_for, sample_store, signed_template,
    test_config, tile_path, token_params, MockOriginStore, T0, TEST_SECRET,
};

fn signed_query(exp: u64) -> String {
    Signer::new(SharedSecret::new(TEST_SECRET))
        .mint(exp)
        .query()
}

// =============================================================================
// End-to-end Flow
// =============================================================================

#[tokio::test]
async fn test_style_token_unlocks_tiles_until_expiry() {
    let clock = ManualClock::new(T0);
    let store = sample_store();
    let router = router_for(store.clone(), test_config(&clock));

    let template = signed_template(&router).await;
    let path = tile_path(&template, 3, 4, 5);

    // Halfway through the lifetime
    clock.set(T0 + 1800);
    let response = get(&router, &path).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "application/x-protobuf"
    );
    assert_eq!(
        response.headers().get("cache-control").unwrap(),
        "public, max-age=31536000, immutable"
    );
    assert_cors_headers(&response);
    assert_eq!(
        body_bytes(response).await.as_ref(),
        &[0x1a, 0x02, 0x08, 0x01]
    );
    assert!(store.requests().contains(&"3/4/5.pbf".to_string()));

    // Exactly at expiry the token is still valid
    clock.set(T0 + 3600);
    let response = get(&router, &path).await;
    assert_eq!(response.status(), StatusCode::OK);

    // One second later it is not
    clock.set(T0 + 3601);
    let response = get(&router, &path).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_cors_headers(&response);
    let body = body_json(response).await;
    assert_eq!(body["error"], "signature_expired");
}

#[tokio::test]
async fn test_token_covers_any_coordinate() {
    let clock = ManualClock::new(T0);
    let store = sample_store().with_bytes("0/0/0.pbf", vec![0u8; 3]);
    let router = router_for(store, test_config(&clock));

    let template = signed_template(&router).await;
    let response = get(&router, &tile_path(&template, 0, 0, 0)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let response = get(&router, &tile_path(&template, 3, 4, 5)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

// =============================================================================
// Rejections
// =============================================================================

#[tokio::test]
async fn test_missing_token() {
    let clock = ManualClock::new(T0);
    let store = sample_store();
    let router = router_for(store.clone(), test_config(&clock));

    for uri in [
        "/tiles/3/4/5.pbf",
        "/tiles/3/4/5.pbf?exp=1700003600",
        "/tiles/3/4/5.pbf?sig=abc",
        "/tiles/3/4/5.pbf?exp=&sig=abc",
        "/tiles/3/4/5.pbf?exp=0&sig=abc",
        "/tiles/3/4/5.pbf?exp=soon&sig=abc",
    ] {
        let response = get(&router, uri).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "uri: {}", uri);
        let body = body_json(response).await;
        assert_eq!(body["error"], "missing_credentials", "uri: {}", uri);
    }

    // Rejected requests never reach the origin
    assert_eq!(store.request_count(), 0);
}

#[tokio::test]
async fn test_tampered_signature() {
    let clock = ManualClock::new(T0);
    let router = router_for(sample_store(), test_config(&clock));

    let template = signed_template(&router).await;
    let (exp, sig) = token_params(&template);

    // Flip the first character of the signature
    let first = sig.chars().next().unwrap();
    let replacement = if first == 'A' { 'B' } else { 'A' };
    let tampered = format!("{}{}", replacement, &sig[1..]);

    let uri = format!("/tiles/3/4/5.pbf?exp={}&sig={}", exp, tampered);
    let response = get(&router, &uri).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["error"], "invalid_signature");
}

#[tokio::test]
async fn test_extended_expiry_rejected() {
    let clock = ManualClock::new(T0);
    let router = router_for(sample_store(), test_config(&clock));

    let template = signed_template(&router).await;
    let (exp, sig) = token_params(&template);
    let extended: u64 = exp.parse::<u64>().unwrap() + 86_400;

    let uri = format!("/tiles/3/4/5.pbf?exp={}&sig={}", extended, sig);
    let response = get(&router, &uri).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["error"], "invalid_signature");
}

#[tokio::test]
async fn test_signature_from_other_secret_rejected() {
    let clock = ManualClock::new(T0);
    let router = router_for(sample_store(), test_config(&clock));

    let query = Signer::new(SharedSecret::new("another-secret"))
        .mint(T0 + 60)
        .query();
    let response = get(&router, &format!("/tiles/3/4/5.pbf?{}", query)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_undecodable_signature_rejected() {
    let clock = ManualClock::new(T0);
    let router = router_for(sample_store(), test_config(&clock));

    let uri = format!("/tiles/3/4/5.pbf?exp={}&sig=%21%21%21", T0 + 60);
    let response = get(&router, &uri).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["error"], "invalid_signature");
}

#[tokio::test]
async fn test_padded_standard_alphabet_signature_accepted() {
    let clock = ManualClock::new(T0);
    let router = router_for(sample_store(), test_config(&clock));

    // Clients may re-encode the signature with padding and `+`/`/`
    let (exp, sig) = token_params(&signed_template(&router).await);
    let standard = format!("{}=", sig.replace('-', "+").replace('_', "/"));
    let encoded = standard.replace('+', "%2B").replace('/', "%2F").replace('=', "%3D");

    let uri = format!("/tiles/3/4/5.pbf?exp={}&sig={}", exp, encoded);
    let response = get(&router, &uri).await;
    assert_eq!(response.status(), StatusCode::OK);
}

// =============================================================================
// Path Validation
// =============================================================================

#[tokio::test]
async fn test_bad_tile_path() {
    let clock = ManualClock::new(T0);
    let store = sample_store();
    let router = router_for(store.clone(), test_config(&clock));
    let query = signed_query(T0 + 60);

    for path in [
        "/tiles/abc/0/0.pbf",
        "/tiles/1/2.pbf",
        "/tiles/1/2/3/4.pbf",
        "/tiles/-1/0/0.pbf",
        "/tiles/1/2/3x.pbf",
        "/tiles/99999999999/0/0.pbf",
    ] {
        let response = get(&router, &format!("{}?{}", path, query)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "path: {}", path);
        assert_cors_headers(&response);
        let body = body_json(response).await;
        assert_eq!(body["error"], "bad_tile_path", "path: {}", path);
    }

    // Path checks come before token checks
    let response = get(&router, "/tiles/abc/0/0.pbf").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert_eq!(store.request_count(), 0);
}

#[tokio::test]
async fn test_non_pbf_tile_path_not_found() {
    let clock = ManualClock::new(T0);
    let router = router_for(sample_store(), test_config(&clock));

    let query = signed_query(T0 + 60);
    let response = get(&router, &format!("/tiles/3/4/5.png?{}", query)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_tiles_prefix_and_normalized_coordinates() {
    let clock = ManualClock::new(T0);
    let store = MockOriginStore::new().with_bytes("planet/3/4/5.pbf", vec![1u8, 2, 3]);
    let config = test_config(&clock).with_tiles_prefix("planet");
    let router = router_for(store.clone(), config);

    let query = signed_query(T0 + 60);
    let response = get(&router, &format!("/tiles/03/004/5.pbf?{}", query)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(store.requests(), vec!["planet/3/4/5.pbf"]);
}

// =============================================================================
// Origin Outcomes
// =============================================================================

#[tokio::test]
async fn test_missing_tile_not_found() {
    let clock = ManualClock::new(T0);
    let router = router_for(sample_store(), test_config(&clock));

    let query = signed_query(T0 + 60);
    let response = get(&router, &format!("/tiles/14/0/0.pbf?{}", query)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_cors_headers(&response);
    assert_eq!(body_json(response).await["error"], "not_found");
}

#[tokio::test]
async fn test_unreachable_origin_bad_gateway() {
    let clock = ManualClock::new(T0);
    let router = router_for(MockOriginStore::unavailable(), test_config(&clock));

    let query = signed_query(T0 + 60);
    let response = get(&router, &format!("/tiles/3/4/5.pbf?{}", query)).await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_origin_headers_forwarded() {
    let clock = ManualClock::new(T0);
    let object = OriginObject {
        body: vec![0x1f, 0x8b].into(),
        content_type: Some("application/octet-stream".to_string()),
        content_encoding: Some("gzip".to_string()),
        etag: Some("\"abc123\"".to_string()),
        last_modified: Some("Tue, 14 Nov 2023 22:13:20 GMT".to_string()),
    };
    let store = MockOriginStore::new().with_object("3/4/5.pbf", object);
    let router = router_for(store, test_config(&clock));

    let query = signed_query(T0 + 60);
    let response = get(&router, &format!("/tiles/3/4/5.pbf?{}", query)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let headers = response.headers();
    // Content-Type is always protobuf, whatever the origin says
    assert_eq!(
        headers.get("content-type").unwrap(),
        "application/x-protobuf"
    );
    assert_eq!(headers.get("content-encoding").unwrap(), "gzip");
    assert_eq!(headers.get("etag").unwrap(), "\"abc123\"");
    assert_eq!(
        headers.get("last-modified").unwrap(),
        "Tue, 14 Nov 2023 22:13:20 GMT"
    );
}

#[tokio::test]
async fn test_custom_asset_max_age() {
    let clock = ManualClock::new(T0);
    let config = test_config(&clock).with_asset_max_age(86_400);
    let router = router_for(sample_store(), config);

    let query = signed_query(T0 + 60);
    let response = get(&router, &format!("/tiles/3/4/5.pbf?{}", query)).await;
    assert_eq!(
        response.headers().get("cache-control").unwrap(),
        "public, max-age=86400, immutable"
    );
}
