use std::cell::RefCell;
use std::time::Duration;

use serde_json::Value;

use super::retry::{RetryDecision, RetryPolicy};
use super::sanitize::Sanitizer;
use super::source::{PageSource, PatientPage};
use super::FetchError;
use crate::models::CanonicalPatient;

/// Pause between successful page requests.
pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_secs(1);

/// Suspension point for backoff waits and the inter-page delay.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

/// Blocks the current thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

/// Records requested waits instead of sleeping.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    waits: RefCell<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn waits(&self) -> Vec<Duration> {
        self.waits.borrow().clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.waits.borrow_mut().push(duration);
    }
}

impl<T: Sleeper + ?Sized> Sleeper for &T {
    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

/// A page that was given up on, and why.
#[derive(Debug, Clone, PartialEq)]
pub struct PageFailure {
    pub page: u32,
    /// Requests made for this page before giving up.
    pub attempts: u32,
    pub error: FetchError,
}

impl std::fmt::Display for PageFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "page {} abandoned after {} attempt(s): {}",
            self.page, self.attempts, self.error
        )
    }
}

/// Everything retrieved in one pagination run.
#[derive(Debug, Clone, Default)]
pub struct FetchOutcome {
    /// Sanitized records from every page fetched, in page order.
    pub patients: Vec<CanonicalPatient>,
    pub failures: Vec<PageFailure>,
    pub pages_fetched: u32,
    /// Last `totalPages` value the upstream reported.
    pub source_pages: Option<u32>,
}

impl FetchOutcome {
    /// True when pagination ended because a page was abandoned.
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Walks the upstream pages in order, retrying each one per the [`RetryPolicy`].
///
/// Strictly sequential: page N+1 is never requested before page N has either
/// succeeded or been abandoned. Abandoning a page ends the run, keeping
/// everything already accumulated.
pub struct PaginatedFetcher<S, Z = ThreadSleeper> {
    source: S,
    sanitizer: Sanitizer,
    policy: RetryPolicy,
    page_delay: Duration,
    sleeper: Z,
}

impl<S: PageSource> PaginatedFetcher<S, ThreadSleeper> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            sanitizer: Sanitizer::default(),
            policy: RetryPolicy::default(),
            page_delay: DEFAULT_PAGE_DELAY,
            sleeper: ThreadSleeper,
        }
    }
}

impl<S: PageSource, Z: Sleeper> PaginatedFetcher<S, Z> {
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_sanitizer(mut self, sanitizer: Sanitizer) -> Self {
        self.sanitizer = sanitizer;
        self
    }

    pub fn with_page_delay(mut self, page_delay: Duration) -> Self {
        self.page_delay = page_delay;
        self
    }

    pub fn with_sleeper<Z2: Sleeper>(self, sleeper: Z2) -> PaginatedFetcher<S, Z2> {
        PaginatedFetcher {
            source: self.source,
            sanitizer: self.sanitizer,
            policy: self.policy,
            page_delay: self.page_delay,
            sleeper,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Fetch every page until upstream reports no next page or a page is abandoned.
    pub fn fetch_all(&self) -> FetchOutcome {
        let mut outcome = FetchOutcome::default();
        let mut page = 1u32;

        loop {
            let body = match self.fetch_page_with_retry(page) {
                Ok(body) => body,
                Err(failure) => {
                    tracing::warn!(
                        page = failure.page,
                        attempts = failure.attempts,
                        error = %failure.error,
                        kept_records = outcome.patients.len(),
                        "Page abandoned, stopping pagination"
                    );
                    outcome.failures.push(failure);
                    break;
                }
            };

            let before = outcome.patients.len();
            self.accumulate(page, &body, &mut outcome.patients);
            outcome.pages_fetched += 1;
            if let Some(total) = body.total_pages() {
                outcome.source_pages = Some(total);
            }

            tracing::info!(
                page,
                total_pages = ?body.total_pages(),
                records = outcome.patients.len() - before,
                "Fetched page"
            );

            if !body.has_next() {
                break;
            }
            self.sleeper.sleep(self.page_delay);
            page += 1;
        }

        tracing::info!(
            patients = outcome.patients.len(),
            pages = outcome.pages_fetched,
            abandoned = outcome.is_partial(),
            "Pagination finished"
        );
        outcome
    }

    /// Request one page until it succeeds or the policy says to give up.
    pub fn fetch_page_with_retry(&self, page: u32) -> Result<PatientPage, PageFailure> {
        let mut attempt = 0u32;
        loop {
            let error = match self.source.fetch_page(page) {
                Ok(body) => return Ok(body),
                Err(error) => error,
            };

            match self.policy.decide(attempt, &error) {
                RetryDecision::Retry(wait) => {
                    tracing::warn!(
                        page,
                        attempt = attempt + 1,
                        status = ?error.status(),
                        error = %error,
                        wait_ms = wait.as_millis() as u64,
                        "Page request failed, retrying"
                    );
                    self.sleeper.sleep(wait);
                    attempt += 1;
                }
                RetryDecision::Abandon => {
                    return Err(PageFailure {
                        page,
                        attempts: attempt + 1,
                        error,
                    });
                }
            }
        }
    }

    fn accumulate(&self, page: u32, body: &PatientPage, into: &mut Vec<CanonicalPatient>) {
        for (index, record) in body.records().iter().enumerate() {
            match record {
                Value::Object(raw) => into.push(self.sanitizer.sanitize(raw)),
                _ => tracing::warn!(page, index, "Skipping non-object patient record"),
            }
        }
    }
}
