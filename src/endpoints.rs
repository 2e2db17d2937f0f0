//! The API endpoints URIs.
//!
//! For endpoints that take a parameter, e.g., '/api/subscriptions/{subscription_id}/cancellation',
//! use [format_endpoint].

/// The route for creating a user.
pub const USERS: &str = "/api/users";
/// The route for logging in a user.
pub const LOG_IN: &str = "/api/log_in";
/// The route for the client to log out the current user.
pub const LOG_OUT: &str = "/api/log_out";
/// The route to list, create and delete categories.
pub const CATEGORIES: &str = "/api/categories";
/// The route to list the subscriptions in a category.
pub const CATEGORY_SUBSCRIPTIONS: &str = "/api/categories/{category_id}/subscriptions";
/// The route to create, update and delete subscriptions.
pub const SUBSCRIPTIONS: &str = "/api/subscriptions";
/// The route to start a cancellation and check on its progress.
pub const CANCELLATION: &str = "/api/subscriptions/{subscription_id}/cancellation";
/// The route for categories with their subscriptions and cost subtotals.
pub const OVERVIEW: &str = "/api/overview";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/users/{user_id}', '{user_id}' is the parameter.
///
/// This function assumes that an endpoint path only contains ASCII characters
/// and a single parameter.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// the original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let param_start = match endpoint_path.find('{') {
        Some(start) => start,
        None => return endpoint_path.to_string(),
    };

    let param_end = endpoint_path[param_start..]
        .find('}')
        .map(|end| param_start + end + 1)
        .unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}
