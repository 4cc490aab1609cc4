//! Webhook delivery engine: formatter → rate limiter → circuit
//! breaker → retry-with-backoff → blocking HTTP POST.
//!
//! Runs on a spawned `std::thread` per send so the caller (the hook's
//! main pipeline) can fire-and-continue; `shutdown` gives the caller a
//! bounded way to wait for in-flight sends before the process exits.

pub mod circuit;
pub mod formatter;
pub mod ratelimit;
pub mod retry;

use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use circuit::{Admission, CircuitBreaker};
use formatter::WebhookMessage;
use ratelimit::TokenBucket;

use crate::config::WebhookConfig;

/// Default wait for [`WebhookEngine::shutdown`] when the caller has no
/// stronger requirement of its own.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared resilience state for one configured webhook destination.
/// Constructed once per process and held for the lifetime of the
/// invocation; its internal state does not outlive the process, which is
/// fine since a short-lived hook binary never needs the breaker/limiter
/// to persist across invocations.
pub struct WebhookEngine {
    config: WebhookConfig,
    limiter: TokenBucket,
    breaker: CircuitBreaker,
    agent: ureq::Agent,
    inflight: Mutex<u32>,
    inflight_cvar: Condvar,
}

impl WebhookEngine {
    pub fn new(config: WebhookConfig) -> Arc<Self> {
        let limiter = TokenBucket::new(config.rate_limit.rate_per_minute(), config.rate_limit.capacity());
        let breaker = CircuitBreaker::new(
            config.circuit_breaker.failure_threshold(),
            config.circuit_breaker.success_threshold(),
            Duration::from_secs(config.circuit_breaker.open_timeout_secs()),
        );
        let agent_config = ureq::Agent::config_builder().timeout_global(Some(Duration::from_secs(10))).build();
        let agent = ureq::Agent::new_with_config(agent_config);
        Arc::new(Self {
            config,
            limiter,
            breaker,
            agent,
            inflight: Mutex::new(0),
            inflight_cvar: Condvar::new(),
        })
    }

    /// Spawn a thread that formats and sends `message`, retrying on
    /// retryable failures up to `retry.max_attempts`. Drops the send
    /// entirely (no thread spawned) if the engine is disabled, the rate
    /// limiter has no tokens, or the circuit breaker rejects it.
    pub fn send_async(self: &Arc<Self>, message: WebhookMessage) -> Option<std::thread::JoinHandle<()>> {
        if !self.config.is_enabled() {
            return None;
        }
        if !self.limiter.try_acquire() {
            tracing::warn!("webhook rate limit exceeded, dropping send");
            return None;
        }
        if self.breaker.try_acquire() == Admission::Rejected {
            tracing::warn!("webhook circuit breaker open, dropping send");
            return None;
        }

        *self.inflight.lock().unwrap() += 1;
        let engine = Arc::clone(self);
        Some(std::thread::spawn(move || {
            engine.send_with_retry(&message);
            let mut count = engine.inflight.lock().unwrap();
            *count = count.saturating_sub(1);
            if *count == 0 {
                engine.inflight_cvar.notify_all();
            }
        }))
    }

    /// Block until every send spawned by this engine has finished, or
    /// `timeout` elapses, whichever comes first. Sends still running past
    /// the timeout are left detached — their spawned thread keeps running
    /// and its result is discarded.
    pub fn shutdown(&self, timeout: Duration) {
        let count = self.inflight.lock().unwrap();
        let (count, timeout_result) = self.inflight_cvar.wait_timeout_while(count, timeout, |c| *c > 0).unwrap();
        if timeout_result.timed_out() {
            tracing::warn!(in_flight = *count, "webhook shutdown timed out, sends still in flight");
        }
    }

    fn send_with_retry(&self, message: &WebhookMessage) {
        let (body, content_type) = formatter::format(&self.config, message);
        let url = self.config.url.clone().unwrap_or_default();
        let max_attempts = self.config.retry.max_attempts();

        for attempt in 1..=max_attempts {
            match self.post_once(&url, &body, content_type) {
                Ok(()) => {
                    self.breaker.record_success();
                    return;
                }
                Err(Outcome::Retryable(status)) => {
                    self.breaker.record_failure();
                    if attempt == max_attempts {
                        tracing::warn!(status, attempt, "webhook send exhausted retries");
                        return;
                    }
                    let delay = retry::backoff_delay(
                        attempt,
                        self.config.retry.initial_backoff_ms(),
                        self.config.retry.max_backoff_ms(),
                    );
                    std::thread::sleep(delay);
                }
                Err(Outcome::Fatal(msg)) => {
                    self.breaker.record_failure();
                    tracing::warn!(error = %msg, "webhook send failed, not retrying");
                    return;
                }
            }
        }
    }

    fn post_once(&self, url: &str, body: &[u8], content_type: &str) -> Result<(), Outcome> {
        let mut request = self.agent.post(url).header("Content-Type", content_type);
        for (key, value) in &self.config.headers {
            request = request.header(key, value);
        }
        match request.send(body) {
            Ok(_) => Ok(()),
            Err(ureq::Error::StatusCode(status)) => {
                if retry::is_retryable_status(status) {
                    Err(Outcome::Retryable(status))
                } else {
                    Err(Outcome::Fatal(format!("webhook returned status {status}")))
                }
            }
            // Transport-level errors (DNS, timeout, connection reset) are
            // retried rather than treated as fatal.
            Err(e) => Err(Outcome::Retryable(0).with_context(&e)),
        }
    }
}

enum Outcome {
    Retryable(u16),
    Fatal(String),
}

impl Outcome {
    fn with_context(self, e: &ureq::Error) -> Outcome {
        match self {
            Outcome::Retryable(status) => {
                tracing::debug!(error = %e, "transport error sending webhook");
                Outcome::Retryable(status)
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_engine_does_not_send() {
        let config = WebhookConfig { enabled: Some(false), url: Some("http://example.invalid".into()), ..Default::default() };
        let engine = WebhookEngine::new(config);
        let handle = engine.send_async(WebhookMessage { title: "t".into(), body: "b".into(), ..Default::default() });
        assert!(handle.is_none());
    }

    #[test]
    fn test_missing_url_is_disabled() {
        let config = WebhookConfig { enabled: Some(true), url: None, ..Default::default() };
        let engine = WebhookEngine::new(config);
        let handle = engine.send_async(WebhookMessage { title: "t".into(), body: "b".into(), ..Default::default() });
        assert!(handle.is_none());
    }

    #[test]
    fn test_rate_limited_engine_drops_send() {
        let mut config = WebhookConfig {
            enabled: Some(true),
            url: Some("http://example.invalid".into()),
            ..Default::default()
        };
        config.rate_limit.capacity = Some(0.0);
        config.rate_limit.rate_per_minute = Some(0.0);
        let engine = WebhookEngine::new(config);
        let handle = engine.send_async(WebhookMessage { title: "t".into(), body: "b".into(), ..Default::default() });
        assert!(handle.is_none());
    }

    #[test]
    fn test_shutdown_with_no_inflight_sends_returns_immediately() {
        let config = WebhookConfig { enabled: Some(false), ..Default::default() };
        let engine = WebhookEngine::new(config);
        let start = std::time::Instant::now();
        engine.shutdown(Duration::from_secs(5));
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
