use super::{AskRequest, Oracle, OracleDiag, OracleError, RawPrediction, VisionRequest};
use crate::config::Config;
use anyhow::{anyhow, Result};
use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

/// HTTP adapter for the inference service. Two endpoints: `/ask` for text
/// batches and `/process-pdf` for single-page images; both reply with a
/// JSON object carrying free text under `result`.
pub struct HttpOracle {
    agent: ureq::Agent,
    base_url: String,
    api_key: String,
    model: String,
    max_retries: u32,
    backoff_base: f64,
    backoff_max: f64,
    calls: AtomicU64,
}

impl HttpOracle {
    pub fn new(cfg: &Config) -> Result<Self> {
        let api_key = std::env::var(&cfg.oracle.api_key_env).map_err(|_| {
            anyhow!(
                "missing oracle API key: set {} in the environment",
                cfg.oracle.api_key_env
            )
        })?;

        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(cfg.oracle.request_timeout_seconds.max(1)))
            .build();

        Ok(HttpOracle {
            agent,
            base_url: cfg.oracle.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: cfg.oracle.model.clone(),
            max_retries: cfg.oracle.max_retries.max(1),
            backoff_base: cfg.oracle.backoff_base_seconds.max(0.0),
            backoff_max: cfg.oracle.backoff_max_seconds.max(0.0),
            calls: AtomicU64::new(0),
        })
    }

    fn post_result(&self, endpoint: &str, body: &serde_json::Value) -> Result<String, OracleError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let mut last_error = String::new();

        for attempt in 0..self.max_retries {
            self.calls.fetch_add(1, Ordering::Relaxed);
            let sent = self
                .agent
                .post(&url)
                .set("Authorization", &format!("Bearer {}", self.api_key))
                .send_json(body.clone());

            match sent {
                Ok(resp) => match resp.into_json::<serde_json::Value>() {
                    Ok(value) => {
                        let result = value
                            .get("result")
                            .and_then(|v| v.as_str())
                            .unwrap_or_default()
                            .to_string();
                        return Ok(result);
                    }
                    Err(err) => {
                        last_error = format!("reading reply body: {err}");
                    }
                },
                Err(ureq::Error::Status(status @ (401 | 403), _)) => {
                    return Err(OracleError::Auth { status });
                }
                Err(ureq::Error::Status(status, _)) => {
                    last_error = format!("HTTP {status}");
                }
                Err(ureq::Error::Transport(t)) => {
                    last_error = t.to_string();
                }
            }

            if attempt + 1 < self.max_retries {
                self.back_off(attempt, &last_error);
            }
        }

        Err(OracleError::Exhausted {
            attempts: self.max_retries,
            message: last_error,
        })
    }

    fn back_off(&self, attempt: u32, reason: &str) {
        let exp = self.backoff_base * f64::powi(2.0, attempt as i32);
        let cap = exp.min(self.backoff_max);
        let delay = if cap > 0.0 {
            rand::thread_rng().gen_range(0.0..cap)
        } else {
            0.0
        };
        warn!("oracle call failed ({reason}); retrying in {delay:.2}s");
        std::thread::sleep(Duration::from_secs_f64(delay));
    }
}

impl Oracle for HttpOracle {
    fn ask(&self, req: &AskRequest) -> Result<Vec<RawPrediction>, OracleError> {
        let body = serde_json::json!({
            "query": req.prompt,
            "model": req.model,
        });
        let raw = self.post_result("ask", &body)?;
        let predictions = super::parse_reply(&raw);
        debug!(
            "oracle ask returned {} predictions ({} chars)",
            predictions.len(),
            raw.len()
        );
        Ok(predictions)
    }

    fn vision(&self, req: &VisionRequest) -> Result<Vec<RawPrediction>, OracleError> {
        let body = serde_json::json!({
            "pdfPage": req.page_image,
            "prompt": req.prompt,
            "model": req.model,
        });
        let raw = self.post_result("process-pdf", &body)?;
        let predictions = super::parse_reply(&raw);
        debug!(
            "oracle vision page {} returned {} predictions",
            req.page_index + 1,
            predictions.len()
        );
        Ok(predictions)
    }

    fn health(&self) -> Result<OracleDiag, OracleError> {
        let body = serde_json::json!({
            "query": "Reply with the single word: ok",
            "model": self.model,
        });
        let diag = match self.post_result("ask", &body) {
            Ok(_) => OracleDiag {
                base_url: self.base_url.clone(),
                model: self.model.clone(),
                ok: true,
                error: None,
            },
            Err(err @ OracleError::Auth { .. }) => return Err(err),
            Err(err) => OracleDiag {
                base_url: self.base_url.clone(),
                model: self.model.clone(),
                ok: false,
                error: Some(err.to_string()),
            },
        };
        Ok(diag)
    }

    fn calls_made(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }
}
