#![allow(dead_code)]

// Shared helpers for integration tests.
//
// These helpers intentionally use `tower_cookies::Cookie` parsing/encoding to match what the
// middleware emits in `Set-Cookie` and what browsers send back in `Cookie`.
use std::convert::Infallible;

use axum::body::Body;
use http::{HeaderMap, Request, Response, header};
use http_body_util::BodyExt as _;
use signed_session::{
    Secret, Session, SessionCookieConfig, SessionData, SessionManagerLayer, SignedSessionCodec,
};
use tower_cookies::Cookie;

pub async fn send(app: &axum::Router, req: Request<Body>) -> Response<Body> {
    // Drive one request through a router, as a browser round-trip would.
    use tower::ServiceExt as _;
    app.clone()
        .oneshot(req)
        .await
        .expect("service call succeeds")
}

pub async fn body_string(body: Body) -> String {
    // Collect an Axum body into a UTF-8 string for assertions.
    let bytes = body
        .collect()
        .await
        .expect("body collects successfully")
        .to_bytes();
    String::from_utf8_lossy(&bytes).into_owned()
}

pub async fn handler(req: Request<Body>) -> Result<Response<Body>, Infallible> {
    // Basic handler used by many tests: write a single key into the session.
    let session = req
        .extensions()
        .get::<Session>()
        .cloned()
        .expect("request includes Session extension");

    session.insert("foo", 42).expect("session insert succeeds");

    Ok(Response::new(Body::empty()))
}

pub async fn noop_handler(_: Request<Body>) -> Result<Response<Body>, Infallible> {
    // Handler that does not access the session at all.
    Ok(Response::new(Body::empty()))
}

pub fn make_layer(config: SessionCookieConfig) -> (Secret, SessionManagerLayer) {
    // Create a session layer and return both the secret and the layer for tests that need to
    // decode cookie values out-of-band.
    let secret = Secret::generate();
    let layer = SessionManagerLayer::new(secret.clone()).with_config(config);
    (secret, layer)
}

pub fn get_session_cookie(res: &Response<Body>) -> Cookie<'static> {
    // Convenience: parse the session cookie from a response.
    get_session_cookie_from_headers(res.headers())
}

pub fn get_session_cookie_from_headers(headers: &HeaderMap) -> Cookie<'static> {
    // Parse the `Set-Cookie` header into a `Cookie` structure.
    let set_cookie = headers
        .get(header::SET_COOKIE)
        .expect("response includes set-cookie header");
    let set_cookie = set_cookie
        .to_str()
        .expect("set-cookie header is valid utf-8");
    Cookie::parse_encoded(set_cookie)
        .expect("set-cookie parses successfully")
        .into_owned()
}

pub fn cookie_header_value(cookie: &Cookie<'_>) -> String {
    // Encode a cookie for use in a `Cookie` request header.
    cookie.encoded().to_string()
}

pub fn decode_data(secret: &Secret, cookie_value: &str) -> SessionData {
    // Decode a cookie value into the session data payload using a fresh codec.
    SignedSessionCodec::new(secret.clone()).decode(Some(cookie_value))
}
