use once_cell::sync::Lazy;
use reqwest::Client;
use std::time::Duration;

// Per-request timeouts are applied by callers; this only bounds connection setup.
static HTTP_CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .build()
        .expect("Failed to build HTTP client")
});

pub fn get_http_client() -> &'static Client {
    &HTTP_CLIENT
}
