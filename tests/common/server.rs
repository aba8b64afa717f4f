//! wiremock helpers answering HEAD probes

use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Mount a HEAD responder returning `status` at `path_str`
pub async fn mount_status(server: &MockServer, path_str: &str, status: u16) {
    Mock::given(method("HEAD"))
        .and(path(path_str))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

/// Mount a HEAD responder that answers only after `delay`
pub async fn mount_delayed(server: &MockServer, path_str: &str, delay: Duration) {
    Mock::given(method("HEAD"))
        .and(path(path_str))
        .respond_with(ResponseTemplate::new(200).set_delay(delay))
        .mount(server)
        .await;
}

/// Mount a HEAD responder expected to be hit exactly `times` times
pub async fn mount_counted(server: &MockServer, path_str: &str, status: u16, times: u64) {
    Mock::given(method("HEAD"))
        .and(path(path_str))
        .respond_with(ResponseTemplate::new(status))
        .expect(times)
        .mount(server)
        .await;
}
