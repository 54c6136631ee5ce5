use std::time::Instant;

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use tracing::info;

pub const TIMING_TARGET: &str = "recipe.timing";

const LOGGED_TEXT_LIMIT: usize = 300;

#[derive(Debug)]
pub struct RequestTimer {
    route: String,
    text: Option<String>,
    image_count: usize,
    started_at: DateTime<Utc>,
    started_perf: Instant,
    completed: bool,
}

impl RequestTimer {
    pub fn start(route: &str, text: Option<&str>, image_count: usize) -> Self {
        let text = text.map(|value| {
            let flattened = value.replace('\n', " ");
            if flattened.chars().count() > LOGGED_TEXT_LIMIT {
                flattened.chars().take(LOGGED_TEXT_LIMIT).collect()
            } else {
                flattened
            }
        });
        let timer = RequestTimer {
            route: route.to_string(),
            text,
            image_count,
            started_at: Utc::now(),
            started_perf: Instant::now(),
            completed: false,
        };
        info!(
            target: TIMING_TARGET,
            "event=request_received route={} received_at={} image_count={} text={:?}",
            timer.route,
            timer.started_at.to_rfc3339(),
            timer.image_count,
            timer.text
        );
        timer
    }

    pub fn complete(&mut self, status: &str, detail: Option<&str>) {
        if self.completed {
            return;
        }
        self.completed = true;
        let completed_at = Utc::now();
        let duration = self.started_perf.elapsed().as_secs_f64();
        info!(
            target: TIMING_TARGET,
            "event=request_completed route={} started_at={} responded_at={} duration_s={:.3} status={} detail={}",
            self.route,
            self.started_at.to_rfc3339(),
            completed_at.to_rfc3339(),
            duration,
            status,
            detail.unwrap_or_default()
        );
    }
}

pub async fn log_llm_timing<T, E, F, Fut>(
    provider: &str,
    model: &str,
    operation: &str,
    metadata: Option<JsonValue>,
    call: F,
) -> Result<T, E>
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
{
    let started_at = Utc::now();
    let started_perf = Instant::now();
    let metadata_text = metadata
        .as_ref()
        .map(|value| value.to_string())
        .unwrap_or_else(|| "{}".to_string());
    info!(
        target: TIMING_TARGET,
        "event=llm_request provider={} model={} operation={} started_at={} metadata={}",
        provider,
        model,
        operation,
        started_at.to_rfc3339(),
        metadata_text
    );

    let result = call().await;
    let status = if result.is_ok() { "success" } else { "error" };

    let completed_at = Utc::now();
    let duration = started_perf.elapsed().as_secs_f64();
    info!(
        target: TIMING_TARGET,
        "event=llm_response provider={} model={} operation={} completed_at={} duration_s={:.3} status={} metadata={}",
        provider,
        model,
        operation,
        completed_at.to_rfc3339(),
        duration,
        status,
        metadata_text
    );

    result
}
