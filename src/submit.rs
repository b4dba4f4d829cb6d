//! Submission of classification results to the assessment endpoint.
//!
//! Every failure mode (non-200, timeout, transport) comes back as a
//! [`SubmissionError`] value; nothing here panics or propagates.

use std::cell::RefCell;

use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;

use crate::config::ApiConfig;
use crate::pipeline::{Classification, API_KEY_HEADER};

/// Uniform error object for a failed submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{error}: {message}")]
pub struct SubmissionError {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    pub message: String,
}

impl SubmissionError {
    pub fn http_status(status: u16, body: String) -> Self {
        Self {
            error: format!("HTTP {status}"),
            status_code: Some(status),
            message: body,
        }
    }

    pub fn timeout() -> Self {
        Self {
            error: "Request timeout".into(),
            status_code: None,
            message: "Request timed out".into(),
        }
    }

    pub fn request_failed(message: impl Into<String>) -> Self {
        Self {
            error: "Request failed".into(),
            status_code: None,
            message: message.into(),
        }
    }
}

/// Response body on success, passed through unmodified.
pub type SubmissionOutcome = Result<Value, SubmissionError>;

/// Receiver of the three classification lists.
pub trait AssessmentSink {
    fn submit(&self, classification: &Classification) -> SubmissionOutcome;
}

/// Blocking HTTP client for `POST /submit-assessment`.
pub struct HttpSubmitter {
    url: String,
    api_key: Option<String>,
    client: reqwest::blocking::Client,
}

impl HttpSubmitter {
    pub fn new(config: &ApiConfig) -> Result<Self, SubmissionError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| SubmissionError::request_failed(e.to_string()))?;

        Ok(Self {
            url: config.submit_url(),
            api_key: config.api_key.clone(),
            client,
        })
    }
}

impl AssessmentSink for HttpSubmitter {
    fn submit(&self, classification: &Classification) -> SubmissionOutcome {
        tracing::info!(
            high_risk = classification.high_risk_patients.len(),
            fever = classification.fever_patients.len(),
            data_quality = classification.data_quality_issues.len(),
            "Submitting assessment"
        );

        let mut request = self.client.post(&self.url).json(classification);
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key.as_str());
        }

        let response = request.send().map_err(|e| {
            if e.is_timeout() {
                SubmissionError::timeout()
            } else {
                SubmissionError::request_failed(e.to_string())
            }
        })?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "Assessment submission rejected");
            return Err(SubmissionError::http_status(status.as_u16(), body));
        }

        response
            .json::<Value>()
            .map_err(|e| SubmissionError::request_failed(e.to_string()))
    }
}

/// Test sink: records every submission and replies with a fixed outcome.
pub struct MockSubmitter {
    response: SubmissionOutcome,
    submissions: RefCell<Vec<Classification>>,
}

impl MockSubmitter {
    pub fn new(response: SubmissionOutcome) -> Self {
        Self {
            response,
            submissions: RefCell::new(Vec::new()),
        }
    }

    pub fn accepting() -> Self {
        Self::new(Ok(serde_json::json!({"success": true})))
    }

    pub fn submissions(&self) -> Vec<Classification> {
        self.submissions.borrow().clone()
    }
}

impl AssessmentSink for MockSubmitter {
    fn submit(&self, classification: &Classification) -> SubmissionOutcome {
        self.submissions.borrow_mut().push(classification.clone());
        self.response.clone()
    }
}
