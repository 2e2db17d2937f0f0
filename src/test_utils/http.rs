use axum::{
    body::Body,
    http::{StatusCode, header::SET_COOKIE},
    response::Response,
};
use axum_extra::extract::cookie::Cookie;
use serde_json::Value;

/// Read the body of `response` and parse it as JSON.
pub(crate) async fn parse_json_body(response: Response<Body>) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Could not read response body");

    serde_json::from_slice(&body).expect("Response body is not valid JSON")
}

#[track_caller]
pub(crate) fn assert_status(response: &Response<Body>, status: StatusCode) {
    assert_eq!(response.status(), status);
}

#[track_caller]
pub(crate) fn assert_error_message(body: &Value, want: &str) {
    let got = body["error"]
        .as_str()
        .unwrap_or_else(|| panic!("Response body has no error message: {body}"));

    assert_eq!(got, want);
}

#[track_caller]
pub(crate) fn get_set_cookie(response: &Response<Body>, name: &str) -> Option<Cookie<'static>> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|header| header.to_str().ok())
        .filter_map(|header| Cookie::parse(header.to_owned()).ok())
        .find(|cookie| cookie.name() == name)
}
