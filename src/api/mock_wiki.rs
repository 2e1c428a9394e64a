//! wiremock-backed action API used by the HTTP client and session tests.

use serde_json::{Value, json};
use std::time::Duration;
use wiremock::matchers::{body_string_contains, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub(crate) const API_PATH: &str = "/w/api.php";
pub(crate) const LOGIN_TOKEN: &str = "b5780b6e2f27e20b450921d9461010b4+\\";
pub(crate) const CSRF_TOKEN: &str = "9ed1499d99c0c34c73faa07157b3b6075b427365+\\";
/// `CSRF_TOKEN` as it appears in a form-encoded body.
pub(crate) const CSRF_TOKEN_FORM: &str = "9ed1499d99c0c34c73faa07157b3b6075b427365%2B%5C";

pub(crate) fn api_url(server: &MockServer) -> String {
    format!("{}{}", server.uri(), API_PATH)
}

fn json_response(body: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(body)
}

pub(crate) async fn mount_login_token(server: &MockServer, delay: Option<Duration>) {
    let mut response = json_response(json!({
        "batchcomplete": "",
        "query": {"tokens": {"logintoken": LOGIN_TOKEN}}
    }));
    if let Some(delay) = delay {
        response = response.set_delay(delay);
    }
    Mock::given(method("GET"))
        .and(path(API_PATH))
        .and(query_param("meta", "tokens"))
        .and(query_param("type", "login"))
        .respond_with(response)
        .mount(server)
        .await;
}

/// `action=login` answering with `result`; must be called `times` times.
pub(crate) async fn mount_login_result(server: &MockServer, result: &str, times: u64) {
    let body = if result == "Success" {
        json!({"login": {"result": "Success", "lguserid": 7, "lgusername": "Sweeper"}})
    } else {
        json!({"login": {"result": result, "reason": "Incorrect username or password entered."}})
    };
    Mock::given(method("POST"))
        .and(path(API_PATH))
        .and(body_string_contains("action=login"))
        .respond_with(json_response(body))
        .expect(times)
        .mount(server)
        .await;
}

pub(crate) async fn mount_csrf_token(server: &MockServer, token: &str) {
    Mock::given(method("GET"))
        .and(path(API_PATH))
        .and(query_param("meta", "tokens"))
        .and(query_param_is_missing("type"))
        .respond_with(json_response(json!({
            "batchcomplete": "",
            "query": {"tokens": {"csrftoken": token}}
        })))
        .mount(server)
        .await;
}

/// Full successful login sequence, logging in exactly `times` times.
pub(crate) async fn mount_successful_login(server: &MockServer, times: u64) {
    mount_login_token(server, None).await;
    mount_login_result(server, "Success", times).await;
    mount_csrf_token(server, CSRF_TOKEN).await;
}
