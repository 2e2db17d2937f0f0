#![allow(missing_docs)]

pub(crate) mod db;
pub(crate) mod http;

pub(crate) use db::{
    create_test_category, create_test_subscription, create_test_user, get_test_connection,
};
pub(crate) use http::{assert_error_message, assert_status, get_set_cookie, parse_json_body};
