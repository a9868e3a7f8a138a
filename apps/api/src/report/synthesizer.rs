//! Report Synthesizer — builds one evaluation report per interview and caches
//! it forever.
//!
//! Storage sits behind the `ReportStore` trait so the synthesis algorithm can
//! be exercised against in-memory fakes; production uses `PgReportStore`. The
//! UNIQUE constraint on `interview_id` is the only safeguard against two
//! first-time callers racing: the loser's insert conflicts and it falls back
//! to re-reading the winner's copy instead of failing.

use async_trait::async_trait;
use serde::Serialize;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::llm_client::{ChatMessage, GenerationClient, GenerationRequest};
use crate::models::interview::InterviewRow;
use crate::models::report::EvaluationReportRow;
use crate::models::transcript::TranscriptRecord;
use crate::report::prompts::{build_report_prompt, REPORT_SYSTEM};
use crate::transcript;

const REPORT_TEMPERATURE: f32 = 0.6;
const REPORT_MAX_TOKENS: u32 = 1200;

/// Whether the report came from the cache or was synthesized on this call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportSource {
    Database,
    Ai,
}

#[derive(Debug, Clone, Serialize)]
pub struct SynthesizedReport {
    pub report_text: String,
    pub source: ReportSource,
}

/// Outcome of a first-time report insert.
pub enum ReportWrite {
    Inserted,
    /// A concurrent caller already wrote one; re-read instead of failing.
    Conflicted,
}

/// Storage boundary for the synthesizer.
#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn find_report(&self, interview_id: Uuid)
        -> Result<Option<EvaluationReportRow>, AppError>;
    async fn insert_report(&self, interview_id: Uuid, report_text: &str)
        -> Result<ReportWrite, AppError>;
    async fn load_interview(&self, interview_id: Uuid) -> Result<Option<InterviewRow>, AppError>;
    async fn load_transcript(
        &self,
        interview_id: Uuid,
    ) -> Result<Option<TranscriptRecord>, AppError>;
}

/// Returns the evaluation report for `interview_id`, synthesizing it on first
/// demand. At most one generation call is ever made per interview id; every
/// later request is a cache read.
pub async fn get_report(
    store: &dyn ReportStore,
    llm: &dyn GenerationClient,
    interview_id: Uuid,
) -> Result<SynthesizedReport, AppError> {
    if let Some(cached) = store.find_report(interview_id).await? {
        return Ok(SynthesizedReport {
            report_text: cached.report_text,
            source: ReportSource::Database,
        });
    }

    let interview = store
        .load_interview(interview_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Interview {interview_id} not found")))?;
    let record = store
        .load_transcript(interview_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("No transcript recorded for interview {interview_id}"))
        })?;

    let prompt = build_report_prompt(&interview, &record);
    let request = GenerationRequest {
        messages: vec![ChatMessage::system(REPORT_SYSTEM), ChatMessage::user(prompt)],
        temperature: REPORT_TEMPERATURE,
        max_tokens: REPORT_MAX_TOKENS,
    };

    let report_text = llm
        .generate(request)
        .await
        .map_err(AppError::service_unavailable)?;

    match store.insert_report(interview_id, &report_text).await? {
        ReportWrite::Inserted => {
            info!("Synthesized evaluation report for interview {interview_id}");
            Ok(SynthesizedReport {
                report_text,
                source: ReportSource::Ai,
            })
        }
        ReportWrite::Conflicted => {
            // Lost the first-write race; the cached copy is authoritative.
            warn!("Concurrent report write for interview {interview_id}, re-reading cached copy");
            let cached = store.find_report(interview_id).await?.ok_or_else(|| {
                AppError::Internal(anyhow::anyhow!(
                    "report insert conflicted but no cached report found for {interview_id}"
                ))
            })?;
            Ok(SynthesizedReport {
                report_text: cached.report_text,
                source: ReportSource::Database,
            })
        }
    }
}

/// PostgreSQL-backed store. The transcript is keyed by the interview id
/// rendered as the session id string — sessions are started with the
/// interview's id.
pub struct PgReportStore {
    pool: PgPool,
}

impl PgReportStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReportStore for PgReportStore {
    async fn find_report(
        &self,
        interview_id: Uuid,
    ) -> Result<Option<EvaluationReportRow>, AppError> {
        Ok(
            sqlx::query_as("SELECT * FROM evaluation_reports WHERE interview_id = $1")
                .bind(interview_id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn insert_report(
        &self,
        interview_id: Uuid,
        report_text: &str,
    ) -> Result<ReportWrite, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO evaluation_reports (interview_id, report_text)
            VALUES ($1, $2)
            ON CONFLICT (interview_id) DO NOTHING
            "#,
        )
        .bind(interview_id)
        .bind(report_text)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            Ok(ReportWrite::Conflicted)
        } else {
            Ok(ReportWrite::Inserted)
        }
    }

    async fn load_interview(&self, interview_id: Uuid) -> Result<Option<InterviewRow>, AppError> {
        crate::interview::store::get_interview(&self.pool, interview_id).await
    }

    async fn load_transcript(
        &self,
        interview_id: Uuid,
    ) -> Result<Option<TranscriptRecord>, AppError> {
        transcript::load_transcript(&self.pool, &interview_id.to_string()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::LlmError;
    use crate::models::transcript::{TranscriptEntryRow, TranscriptRow};
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct CountingClient {
        reply: String,
        calls: AtomicUsize,
    }

    impl CountingClient {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl GenerationClient for CountingClient {
        async fn generate(&self, _request: GenerationRequest) -> Result<String, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.reply.clone())
        }
    }

    /// In-memory store. `conflict_on_insert` simulates losing the first-write
    /// race: the insert reports a conflict and plants the "winner's" report.
    #[derive(Default)]
    struct MemReportStore {
        reports: Mutex<HashMap<Uuid, String>>,
        interviews: Mutex<HashMap<Uuid, InterviewRow>>,
        transcripts: Mutex<HashMap<Uuid, TranscriptRecord>>,
        conflict_on_insert: Option<String>,
    }

    #[async_trait]
    impl ReportStore for MemReportStore {
        async fn find_report(
            &self,
            interview_id: Uuid,
        ) -> Result<Option<EvaluationReportRow>, AppError> {
            Ok(self.reports.lock().unwrap().get(&interview_id).map(|text| {
                EvaluationReportRow {
                    id: Uuid::new_v4(),
                    interview_id,
                    report_text: text.clone(),
                    created_at: Utc::now(),
                }
            }))
        }

        async fn insert_report(
            &self,
            interview_id: Uuid,
            report_text: &str,
        ) -> Result<ReportWrite, AppError> {
            if let Some(winner) = &self.conflict_on_insert {
                self.reports
                    .lock()
                    .unwrap()
                    .insert(interview_id, winner.clone());
                return Ok(ReportWrite::Conflicted);
            }
            self.reports
                .lock()
                .unwrap()
                .insert(interview_id, report_text.to_string());
            Ok(ReportWrite::Inserted)
        }

        async fn load_interview(
            &self,
            interview_id: Uuid,
        ) -> Result<Option<InterviewRow>, AppError> {
            Ok(self.interviews.lock().unwrap().get(&interview_id).cloned())
        }

        async fn load_transcript(
            &self,
            interview_id: Uuid,
        ) -> Result<Option<TranscriptRecord>, AppError> {
            Ok(self.transcripts.lock().unwrap().get(&interview_id).cloned())
        }
    }

    fn seed(store: &MemReportStore) -> Uuid {
        let interview_id = Uuid::new_v4();
        let interview = InterviewRow {
            id: interview_id,
            owner_id: Uuid::new_v4(),
            job_position: "Backend Engineer".to_string(),
            job_description: "Rust services".to_string(),
            duration_minutes: 30,
            types: vec!["Technical".to_string()],
            questions: vec!["Q1".to_string(), "Q2".to_string()],
            created_at: Utc::now(),
        };
        let record = TranscriptRecord {
            transcript: TranscriptRow {
                id: Uuid::new_v4(),
                session_id: interview_id.to_string(),
                candidate_name: "Jordan Lee".to_string(),
                candidate_email: "jordan@example.com".to_string(),
                created_at: Utc::now(),
            },
            entries: vec![TranscriptEntryRow {
                id: 1,
                session_id: interview_id.to_string(),
                time_label: "00:30".to_string(),
                user_text: "my answer".to_string(),
                ai_text: "first question".to_string(),
                created_at: Utc::now(),
            }],
        };
        store
            .interviews
            .lock()
            .unwrap()
            .insert(interview_id, interview);
        store
            .transcripts
            .lock()
            .unwrap()
            .insert(interview_id, record);
        interview_id
    }

    #[tokio::test]
    async fn test_first_call_synthesizes_and_caches() {
        let store = MemReportStore::default();
        let id = seed(&store);
        let llm = CountingClient::new("the report");

        let report = get_report(&store, &llm, id).await.unwrap();
        assert_eq!(report.report_text, "the report");
        assert_eq!(report.source, ReportSource::Ai);
        assert_eq!(llm.calls(), 1);
        assert!(store.reports.lock().unwrap().contains_key(&id));
    }

    #[tokio::test]
    async fn test_repeated_calls_hit_cache_with_at_most_one_generation() {
        let store = MemReportStore::default();
        let id = seed(&store);
        let llm = CountingClient::new("the report");

        let first = get_report(&store, &llm, id).await.unwrap();
        let second = get_report(&store, &llm, id).await.unwrap();
        let third = get_report(&store, &llm, id).await.unwrap();

        assert_eq!(first.report_text, second.report_text);
        assert_eq!(second.report_text, third.report_text);
        assert_eq!(second.source, ReportSource::Database);
        assert_eq!(third.source, ReportSource::Database);
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test]
    async fn test_missing_interview_is_not_found_and_nothing_cached() {
        let store = MemReportStore::default();
        let llm = CountingClient::new("unused");

        let err = get_report(&store, &llm, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(llm.calls(), 0);
        assert!(store.reports.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_transcript_is_not_found_and_nothing_cached() {
        let store = MemReportStore::default();
        let id = seed(&store);
        store.transcripts.lock().unwrap().remove(&id);
        let llm = CountingClient::new("unused");

        let err = get_report(&store, &llm, id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(llm.calls(), 0);
        assert!(store.reports.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_write_conflict_falls_back_to_cached_copy() {
        let mut store = MemReportStore::default();
        store.conflict_on_insert = Some("the winner's report".to_string());
        let id = seed(&store);
        let llm = CountingClient::new("the loser's report");

        let report = get_report(&store, &llm, id).await.unwrap();
        assert_eq!(report.report_text, "the winner's report");
        assert_eq!(report.source, ReportSource::Database);
    }

    #[tokio::test]
    async fn test_generation_failure_surfaces_and_caches_nothing() {
        struct FailingClient;

        #[async_trait]
        impl GenerationClient for FailingClient {
            async fn generate(&self, _request: GenerationRequest) -> Result<String, LlmError> {
                Err(LlmError::Timeout { secs: 30 })
            }
        }

        let store = MemReportStore::default();
        let id = seed(&store);

        let err = get_report(&store, &FailingClient, id).await.unwrap_err();
        assert!(matches!(err, AppError::ServiceUnavailable(_)));
        assert!(store.reports.lock().unwrap().is_empty());
    }
}
