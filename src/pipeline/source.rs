use std::cell::RefCell;
use std::collections::VecDeque;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::FetchError;
use crate::config::ApiConfig;

/// Header carrying the static API credential.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Accept any JSON for the field and keep it only if it has the expected shape.
/// A null, mistyped or out-of-range value reads as absent.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Pagination block returned alongside each page. Every field is optional upstream,
/// and a field of the wrong type is treated as missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Pagination {
    #[serde(deserialize_with = "lenient")]
    pub page: Option<u32>,
    #[serde(deserialize_with = "lenient")]
    pub limit: Option<u32>,
    #[serde(deserialize_with = "lenient")]
    pub total: Option<u32>,
    #[serde(deserialize_with = "lenient")]
    pub total_pages: Option<u32>,
    #[serde(deserialize_with = "lenient")]
    pub has_next: Option<bool>,
    #[serde(deserialize_with = "lenient")]
    pub has_previous: Option<bool>,
}

/// Body of `GET /patients?page=n`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PatientPage {
    /// Raw records; `None` when upstream omitted, nulled or mistyped the field.
    #[serde(default, deserialize_with = "lenient")]
    pub data: Option<Vec<Value>>,
    /// Missing or unreadable pagination means there is nothing after this page.
    #[serde(default, deserialize_with = "lenient")]
    pub pagination: Option<Pagination>,
}

impl PatientPage {
    pub fn new(data: Vec<Value>, pagination: Option<Pagination>) -> Self {
        Self {
            data: Some(data),
            pagination,
        }
    }

    pub fn has_next(&self) -> bool {
        self.pagination.as_ref().and_then(|p| p.has_next).unwrap_or(false)
    }

    pub fn total_pages(&self) -> Option<u32> {
        self.pagination.as_ref().and_then(|p| p.total_pages)
    }

    pub fn records(&self) -> &[Value] {
        self.data.as_deref().unwrap_or_default()
    }
}

/// Anything that can hand back one page of raw patient records.
pub trait PageSource {
    fn fetch_page(&self, page: u32) -> Result<PatientPage, FetchError>;
}

/// Blocking HTTP client for the upstream patients endpoint.
pub struct HttpPageSource {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl HttpPageSource {
    pub fn new(config: &ApiConfig) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            client,
            timeout_secs: config.request_timeout.as_secs(),
        })
    }

    pub fn patients_url(&self) -> String {
        format!("{}/patients", self.base_url)
    }
}

impl PageSource for HttpPageSource {
    fn fetch_page(&self, page: u32) -> Result<PatientPage, FetchError> {
        let mut request = self
            .client
            .get(self.patients_url())
            .query(&[("page", page)])
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key.as_str());
        }

        let response = request.send().map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(self.timeout_secs)
            } else if e.is_connect() {
                FetchError::Connection(self.base_url.clone())
            } else {
                FetchError::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(self.timeout_secs)
            } else {
                FetchError::Transport(e.to_string())
            }
        })?;

        serde_json::from_str(&body).map_err(|e| FetchError::Decode(e.to_string()))
    }
}

/// Scripted page source for tests: replays queued responses in order
/// and records every page number requested.
#[derive(Default)]
pub struct MockPageSource {
    script: RefCell<VecDeque<Result<PatientPage, FetchError>>>,
    requests: RefCell<Vec<u32>>,
}

impl MockPageSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then_page(self, records: Vec<Value>, has_next: bool) -> Self {
        let page = self.script.borrow().len() as u32 + 1;
        let pagination = Pagination {
            page: Some(page),
            has_next: Some(has_next),
            ..Pagination::default()
        };
        self.then(Ok(PatientPage::new(records, Some(pagination))))
    }

    pub fn then_status(self, status: u16) -> Self {
        self.then(Err(FetchError::Status {
            status,
            body: format!("status {status}"),
        }))
    }

    pub fn then(self, response: Result<PatientPage, FetchError>) -> Self {
        self.script.borrow_mut().push_back(response);
        self
    }

    /// Page numbers requested so far, in order.
    pub fn requests(&self) -> Vec<u32> {
        self.requests.borrow().clone()
    }
}

impl PageSource for MockPageSource {
    fn fetch_page(&self, page: u32) -> Result<PatientPage, FetchError> {
        self.requests.borrow_mut().push(page);
        self.script
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(FetchError::Connection("script exhausted".into())))
    }
}
