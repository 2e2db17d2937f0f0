//! Log-out route handler that invalidates the authentication cookie.

use axum::Json;
use axum_extra::extract::PrivateCookieJar;
use serde_json::{Value, json};

use crate::auth::invalidate_auth_cookie;

/// Invalidate the auth cookie.
///
/// Always succeeds, even if the client was not logged in.
pub async fn post_log_out(jar: PrivateCookieJar) -> (PrivateCookieJar, Json<Value>) {
    let jar = invalidate_auth_cookie(jar);

    (jar, Json(json!({ "message": "Logged out" })))
}
