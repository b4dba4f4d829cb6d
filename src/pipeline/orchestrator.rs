use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::classify::{data_quality_details, Classification, DataQualityIssue};
use super::fetch::{FetchOutcome, PageFailure, PaginatedFetcher, Sleeper};
use super::source::PageSource;
use crate::submit::{AssessmentSink, SubmissionOutcome};

/// Result of one full assessment run.
#[derive(Debug, Clone)]
pub struct AssessmentSummary {
    pub run_id: Uuid,
    pub fetched_at: DateTime<Utc>,
    pub total_patients: usize,
    pub pages_fetched: u32,
    pub source_pages: Option<u32>,
    pub failures: Vec<PageFailure>,
    pub classification: Classification,
    pub data_quality_details: Vec<DataQualityIssue>,
    pub submission: SubmissionOutcome,
}

impl AssessmentSummary {
    /// Whether pagination stopped early and some records may be missing.
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Orchestrates a single run: fetch → classify → submit.
pub struct AssessmentRunner<S, Z, K> {
    fetcher: PaginatedFetcher<S, Z>,
    sink: K,
}

impl<S, Z, K> AssessmentRunner<S, Z, K>
where
    S: PageSource,
    Z: Sleeper,
    K: AssessmentSink,
{
    pub fn new(fetcher: PaginatedFetcher<S, Z>, sink: K) -> Self {
        Self { fetcher, sink }
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn fetcher(&self) -> &PaginatedFetcher<S, Z> {
        &self.fetcher
    }

    /// Run the pipeline once. Always returns a summary, however little was retrieved.
    pub fn run(&self) -> AssessmentSummary {
        let run_id = Uuid::new_v4();
        tracing::info!(run_id = %run_id, "Assessment run starting");

        let FetchOutcome {
            patients,
            failures,
            pages_fetched,
            source_pages,
        } = self.fetcher.fetch_all();
        let fetched_at = Utc::now();

        let classification = Classification::from_patients(&patients);
        let details = data_quality_details(&patients);
        tracing::info!(
            run_id = %run_id,
            patients = patients.len(),
            high_risk = classification.high_risk_patients.len(),
            fever = classification.fever_patients.len(),
            data_quality = classification.data_quality_issues.len(),
            "Classification complete"
        );

        let submission = self.sink.submit(&classification);
        if let Err(e) = &submission {
            tracing::warn!(run_id = %run_id, error = %e, "Assessment submission failed");
        }

        AssessmentSummary {
            run_id,
            fetched_at,
            total_patients: patients.len(),
            pages_fetched,
            source_pages,
            failures,
            classification,
            data_quality_details: details,
            submission,
        }
    }
}
