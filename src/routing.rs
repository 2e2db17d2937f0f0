//! Application router configuration with protected and unprotected route definitions.

use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::{
    AppState,
    auth::{auth_guard, post_log_in, post_log_out, register_user},
    cancellation::{confirm_cancellation_endpoint, get_cancellation_status_endpoint},
    category::{create_category_endpoint, delete_category_endpoint, list_categories_endpoint},
    endpoints,
    not_found::get_404_not_found,
    overview::get_overview_endpoint,
    subscription::{
        create_subscription_endpoint, delete_subscription_endpoint,
        list_category_subscriptions_endpoint, update_cancellation_endpoint,
    },
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::USERS, post(register_user))
        .route(endpoints::LOG_IN, post(post_log_in))
        .route(endpoints::LOG_OUT, post(post_log_out));

    let protected_routes = Router::new()
        .route(
            endpoints::CATEGORIES,
            get(list_categories_endpoint)
                .post(create_category_endpoint)
                .delete(delete_category_endpoint),
        )
        .route(
            endpoints::CATEGORY_SUBSCRIPTIONS,
            get(list_category_subscriptions_endpoint),
        )
        .route(
            endpoints::SUBSCRIPTIONS,
            post(create_subscription_endpoint)
                .put(update_cancellation_endpoint)
                .delete(delete_subscription_endpoint),
        )
        .route(
            endpoints::CANCELLATION,
            get(get_cancellation_status_endpoint).post(confirm_cancellation_endpoint),
        )
        .route(endpoints::OVERVIEW, get(get_overview_endpoint))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    protected_routes
        .merge(unprotected_routes)
        .fallback(get_404_not_found)
        .with_state(state)
}

#[cfg(test)]
mod routing_tests {
    use std::time::Duration;

    use axum::http::StatusCode;
    use axum_extra::extract::cookie::Cookie;
    use axum_test::TestServer;
    use rusqlite::Connection;
    use serde_json::{Value, json};
    use time::{OffsetDateTime, format_description::well_known::Rfc3339};

    use crate::{
        AppState, PasswordHash, Username,
        auth::{COOKIE_TOKEN, create_user},
        endpoints::{self, format_endpoint},
    };

    use super::build_router;

    const PASSWORD: &str = "asomewhatlongpassword1";
    const GRACE_PERIOD: Duration = Duration::from_secs(10);

    fn get_test_server() -> TestServer {
        let state = AppState::new(Connection::open_in_memory().unwrap(), "foobar", GRACE_PERIOD)
        .unwrap();

        {
            let connection = state.db_connection.lock().unwrap();
            create_user(
                Username::new("alice").unwrap(),
                PasswordHash::from_raw_password(PASSWORD, 4).unwrap(),
                &connection,
            )
            .unwrap();
        }

        TestServer::try_new(build_router(state)).expect("Could not create test server.")
    }

    async fn log_in(server: &TestServer) -> Cookie<'static> {
        let response = server
            .post(endpoints::LOG_IN)
            .json(&json!({ "username": "alice", "password": PASSWORD }))
            .await;

        response.assert_status_ok();
        response.cookie(COOKIE_TOKEN)
    }

    #[tokio::test]
    async fn protected_routes_require_log_in() {
        let server = get_test_server();

        server
            .get(endpoints::CATEGORIES)
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
        server
            .get(endpoints::OVERVIEW)
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
        server
            .post(endpoints::SUBSCRIPTIONS)
            .json(&json!({}))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
        server
            .get(&format_endpoint(endpoints::CANCELLATION, 1))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let server = get_test_server();

        let response = server.get("/api/does_not_exist").await;

        response.assert_status_not_found();
        response.assert_json(&json!({ "error": "Not found" }));
    }

    #[tokio::test]
    async fn can_register_without_logging_in() {
        let server = get_test_server();

        let response = server
            .post(endpoints::USERS)
            .json(&json!({ "username": "bob", "password": PASSWORD }))
            .await;

        response.assert_status(StatusCode::CREATED);
        assert_eq!(response.json::<Value>()["username"], "bob");
    }

    #[tokio::test]
    async fn tracks_subscriptions_after_logging_in() {
        let server = get_test_server();
        let token = log_in(&server).await;

        let category = server
            .post(endpoints::CATEGORIES)
            .add_cookie(token.clone())
            .json(&json!({ "name": "Streaming" }))
            .await;
        category.assert_status(StatusCode::CREATED);
        let category_id = category.json::<Value>()["id"].as_i64().unwrap();

        for (name, cost) in [("Video", "9.99"), ("Music", "5")] {
            server
                .post(endpoints::SUBSCRIPTIONS)
                .add_cookie(token.clone())
                .json(&json!({
                    "name": name,
                    "cost": cost,
                    "billing_cycle": "month",
                    "renewal_date": 15,
                    "category_id": category_id,
                }))
                .await
                .assert_status(StatusCode::CREATED);
        }

        let listed = server
            .get(&format_endpoint(
                endpoints::CATEGORY_SUBSCRIPTIONS,
                category_id,
            ))
            .add_cookie(token.clone())
            .await;
        listed.assert_status_ok();
        assert_eq!(listed.json::<Value>().as_array().unwrap().len(), 2);

        let overview = server
            .get(endpoints::OVERVIEW)
            .add_cookie(token.clone())
            .await;
        overview.assert_status_ok();
        let overview = overview.json::<Value>();
        assert_eq!(overview["grand_total"], "14.99");
        assert_eq!(overview["categories"][0]["name"], "Streaming");
        assert_eq!(overview["categories"][0]["subtotal"], "14.99");
    }

    async fn get_overview(server: &TestServer, token: &Cookie<'static>) -> Value {
        let response = server.get(endpoints::OVERVIEW).add_cookie(token.clone()).await;
        response.assert_status_ok();

        response.json()
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_takes_effect_after_grace_period() {
        let server = get_test_server();
        let token = log_in(&server).await;

        let category = server
            .post(endpoints::CATEGORIES)
            .add_cookie(token.clone())
            .json(&json!({ "name": "Streaming" }))
            .await;
        let category_id = category.json::<Value>()["id"].as_i64().unwrap();

        let mut subscription_ids = Vec::new();
        for (name, cost) in [("Video", "9.99"), ("Music", "5")] {
            let response = server
                .post(endpoints::SUBSCRIPTIONS)
                .add_cookie(token.clone())
                .json(&json!({
                    "name": name,
                    "cost": cost,
                    "billing_cycle": "month",
                    "renewal_date": 15,
                    "category_id": category_id,
                }))
                .await;
            response.assert_status(StatusCode::CREATED);
            subscription_ids.push(response.json::<Value>()["id"].as_i64().unwrap());
        }
        let video_id = subscription_ids[0];
        let cancellation = format_endpoint(endpoints::CANCELLATION, video_id);
        let confirmed_at = OffsetDateTime::now_utc();

        let response = server
            .post(&cancellation)
            .add_cookie(token.clone())
            .json(&json!({ "confirm": true }))
            .await;

        response.assert_status(StatusCode::ACCEPTED);
        assert_eq!(response.json::<Value>()["state"], "processing");

        let overview = get_overview(&server, &token).await;
        assert_eq!(overview["categories"][0]["subtotal"], "14.99");
        assert_eq!(overview["grand_total"], "14.99");
        let video = overview["categories"][0]["subscriptions"]
            .as_array()
            .unwrap()
            .iter()
            .find(|subscription| subscription["id"] == video_id)
            .unwrap();
        assert_eq!(video["status"], "processing");

        server
            .put(endpoints::SUBSCRIPTIONS)
            .add_cookie(token.clone())
            .json(&json!({ "id": video_id, "cancelled_at": "2020-01-01T00:00:00Z" }))
            .await
            .assert_status(StatusCode::CONFLICT);

        tokio::time::sleep(GRACE_PERIOD + Duration::from_secs(1)).await;

        let status = server.get(&cancellation).add_cookie(token.clone()).await;
        status.assert_status_ok();
        let status = status.json::<Value>();
        assert_eq!(status["state"], "cancelled");
        let cancelled_at =
            OffsetDateTime::parse(status["cancelled_at"].as_str().unwrap(), &Rfc3339).unwrap();
        assert!(cancelled_at >= confirmed_at);

        let overview = get_overview(&server, &token).await;
        assert_eq!(overview["categories"][0]["subtotal"], "5.00");
        assert_eq!(overview["grand_total"], "5.00");
    }

    #[tokio::test]
    async fn log_out_clears_session() {
        let server = get_test_server();
        let token = log_in(&server).await;

        let response = server.post(endpoints::LOG_OUT).add_cookie(token).await;

        response.assert_status_ok();
        response.assert_json(&json!({ "message": "Logged out" }));
        assert_eq!(
            response.cookie(COOKIE_TOKEN).max_age(),
            Some(time::Duration::ZERO)
        );
    }
}
