//! Dialogue Controller — drives one interview turn.
//!
//! The whole turn runs under the session's own lock: build the prompt, make
//! the single generation call, parse the embedded control signal, mutate the
//! cursor, then run the caller's `record` step (the transcript append). The
//! generation call is the only suspension point; nothing is mutated before it
//! succeeds, so a failed or timed-out turn is safe to retry verbatim. Because
//! `record` also runs before the lock is released, entries from overlapping
//! retried turns can never land in the transcript out of arrival order.

use std::future::Future;

use tracing::{debug, warn};

use crate::errors::AppError;
use crate::interview::control::{extract_control, ControlAction};
use crate::interview::prompts::{build_turn_prompt, CLOSING_UTTERANCE, TURN_SYSTEM};
use crate::interview::session::SessionRegistry;
use crate::llm_client::{ChatMessage, GenerationClient, GenerationRequest};

const TURN_TEMPERATURE: f32 = 0.7;
const TURN_MAX_TOKENS: u32 = 500;

/// Result of one turn: what the candidate sees, and where the cursor landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    pub visible_reply: String,
    pub cursor: usize,
}

/// Conducts one turn for `session_id`.
///
/// Preconditions (`session` exists, `utterance` non-empty) are the caller's:
/// the HTTP handler rejects empty input before calling in, and an unknown id
/// fails here with `SessionNotFound`.
///
/// `record` is the caller's side effect for a successful turn (the transcript
/// append). It is awaited while the session lock is still held and is skipped
/// entirely when the turn fails.
pub async fn conduct_turn<F, Fut>(
    registry: &SessionRegistry,
    llm: &dyn GenerationClient,
    session_id: &str,
    utterance: &str,
    record: F,
) -> Result<TurnOutcome, AppError>
where
    F: FnOnce(TurnOutcome) -> Fut,
    Fut: Future<Output = Result<TurnOutcome, AppError>>,
{
    let handle = registry
        .get(session_id)
        .ok_or_else(|| AppError::SessionNotFound(session_id.to_string()))?;

    // Single-flight: the lock is held for the whole turn, so overlapping
    // requests for one session serialize instead of racing on the cursor.
    let mut session = handle.lock().await;
    session.touch();

    let outcome = if session.ended || session.cursor >= session.questions.len() {
        // Closed interview: fixed closing text, no remote call, no mutation.
        TurnOutcome {
            visible_reply: CLOSING_UTTERANCE.to_string(),
            cursor: session.cursor,
        }
    } else {
        let current = &session.questions[session.cursor];
        let next = session.questions.get(session.cursor + 1);
        let prompt = build_turn_prompt(
            session.cursor + 1,
            current,
            next.map(String::as_str),
            utterance,
        );

        let request = GenerationRequest {
            messages: vec![ChatMessage::system(TURN_SYSTEM), ChatMessage::user(prompt)],
            temperature: TURN_TEMPERATURE,
            max_tokens: TURN_MAX_TOKENS,
        };

        // Sole suspension point of the turn.
        let raw = llm
            .generate(request)
            .await
            .map_err(AppError::service_unavailable)?;

        let control = extract_control(&raw);
        if !control.parsed {
            // Malformed or missing token degrades to "stay"; not an error.
            warn!(
                session_id,
                cursor = session.cursor,
                "could not locate control token in model reply, holding on current question"
            );
        }

        match control.action {
            ControlAction::Stay => {
                debug!(session_id, cursor = session.cursor, "turn held");
                TurnOutcome {
                    visible_reply: control.visible,
                    cursor: session.cursor,
                }
            }
            ControlAction::Next => {
                session.cursor += 1;
                if session.cursor == session.questions.len() {
                    // Terminal turn: freeze the cursor and substitute the
                    // fixed closing text for whatever the model said.
                    session.ended = true;
                    debug!(session_id, "interview completed");
                    TurnOutcome {
                        visible_reply: CLOSING_UTTERANCE.to_string(),
                        cursor: session.cursor,
                    }
                } else {
                    debug!(session_id, cursor = session.cursor, "turn advanced");
                    TurnOutcome {
                        visible_reply: control.visible,
                        cursor: session.cursor,
                    }
                }
            }
        }
    };

    // Still under the session lock: appends from retried overlapping turns
    // serialize with the turns themselves.
    record(outcome).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::LlmError;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Generation fake that plays back scripted replies and counts calls.
    struct ScriptedClient {
        replies: Mutex<VecDeque<Result<String, LlmError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedClient {
        fn new(replies: Vec<Result<String, LlmError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into_iter().collect()),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl GenerationClient for ScriptedClient {
        async fn generate(&self, _request: GenerationRequest) -> Result<String, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .expect("scripted client ran out of replies")
        }
    }

    fn stay(text: &str) -> Result<String, LlmError> {
        Ok(format!("{text}\n{{\"action\": \"stay\"}}"))
    }

    fn next(text: &str) -> Result<String, LlmError> {
        Ok(format!("{text}\n{{\"action\": \"next\"}}"))
    }

    /// A turn with a pass-through recorder.
    async fn turn(
        registry: &SessionRegistry,
        llm: &dyn GenerationClient,
        session_id: &str,
        utterance: &str,
    ) -> Result<TurnOutcome, AppError> {
        conduct_turn(registry, llm, session_id, utterance, |outcome| async move {
            Ok(outcome)
        })
        .await
    }

    async fn registry_with(session_id: &str, questions: &[&str]) -> SessionRegistry {
        let registry = SessionRegistry::new();
        registry
            .start(session_id, questions.iter().map(|q| q.to_string()).collect())
            .await;
        registry
    }

    #[tokio::test]
    async fn test_turn_on_unknown_session_fails() {
        let registry = SessionRegistry::new();
        let llm = ScriptedClient::new(vec![]);
        let err = turn(&registry, &llm, "ghost", "hello").await.unwrap_err();
        assert!(matches!(err, AppError::SessionNotFound(id) if id == "ghost"));
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_three_question_walkthrough() {
        let registry = registry_with("s1", &["Q1", "Q2", "Q3"]).await;
        let llm = ScriptedClient::new(vec![
            stay("Hi! Nice to meet you. So, tell me about yourself."),
            next("Great answer. Now, how about this next topic?"),
            next("Understood, let's move forward."),
            next("Wonderful, that wraps things up."),
        ]);

        // Greeting → stay → cursor 0.
        let t1 = turn(&registry, &llm, "s1", "hi").await.unwrap();
        assert_eq!(t1.cursor, 0);
        assert_eq!(t1.visible_reply, "Hi! Nice to meet you. So, tell me about yourself.");

        // Substantive answer → next → cursor 1.
        let t2 = turn(&registry, &llm, "s1", "I have five years of experience")
            .await
            .unwrap();
        assert_eq!(t2.cursor, 1);

        // Explicit move on → next → cursor 2.
        let t3 = turn(&registry, &llm, "s1", "move on").await.unwrap();
        assert_eq!(t3.cursor, 2);

        // Final answer → next → cursor reaches count → fixed closing text.
        let t4 = turn(&registry, &llm, "s1", "my answer to the last question")
            .await
            .unwrap();
        assert_eq!(t4.cursor, 3);
        assert_eq!(t4.visible_reply, CLOSING_UTTERANCE);

        let handle = registry.get("s1").unwrap();
        let session = handle.lock().await;
        assert!(session.ended);
        assert_eq!(session.cursor, session.questions.len());
    }

    #[tokio::test]
    async fn test_ended_session_answers_closing_text_without_remote_call() {
        let registry = registry_with("s1", &["Q1"]).await;
        let llm = ScriptedClient::new(vec![next("done")]);

        let terminal = turn(&registry, &llm, "s1", "answer").await.unwrap();
        assert_eq!(terminal.visible_reply, CLOSING_UTTERANCE);
        assert_eq!(llm.calls(), 1);

        // Every further turn: closing text, no generation call, no mutation.
        for _ in 0..3 {
            let after = turn(&registry, &llm, "s1", "anything").await.unwrap();
            assert_eq!(after.visible_reply, CLOSING_UTTERANCE);
            assert_eq!(after.cursor, 1);
        }
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test]
    async fn test_all_next_sequence_strictly_increments_cursor() {
        let registry = registry_with("s1", &["Q1", "Q2", "Q3", "Q4"]).await;
        let llm = ScriptedClient::new(vec![next("a"), next("b"), next("c"), next("d")]);

        for expected in 1..=4usize {
            let outcome = turn(&registry, &llm, "s1", "answer").await.unwrap();
            assert_eq!(outcome.cursor, expected);
        }
    }

    #[tokio::test]
    async fn test_malformed_token_holds_cursor_and_returns_raw_reply() {
        let registry = registry_with("s1", &["Q1", "Q2"]).await;
        let raw = "I'll advance now {\"action\": \"next\"".to_string(); // truncated JSON
        let llm = ScriptedClient::new(vec![Ok(raw.clone())]);

        let outcome = turn(&registry, &llm, "s1", "answer").await.unwrap();
        assert_eq!(outcome.cursor, 0, "ambiguity must never advance the cursor");
        assert_eq!(outcome.visible_reply, raw);
    }

    #[tokio::test]
    async fn test_missing_token_holds_cursor() {
        let registry = registry_with("s1", &["Q1", "Q2"]).await;
        let llm = ScriptedClient::new(vec![Ok("plain reply, no token".to_string())]);

        let outcome = turn(&registry, &llm, "s1", "answer").await.unwrap();
        assert_eq!(outcome.cursor, 0);
        assert_eq!(outcome.visible_reply, "plain reply, no token");
    }

    #[tokio::test]
    async fn test_generation_failure_maps_to_service_unavailable_without_mutation() {
        let registry = registry_with("s1", &["Q1", "Q2"]).await;
        let llm = ScriptedClient::new(vec![
            Err(LlmError::Timeout { secs: 30 }),
            next("retry succeeded"),
        ]);

        let err = turn(&registry, &llm, "s1", "answer").await.unwrap_err();
        assert!(matches!(err, AppError::ServiceUnavailable(_)));

        // State untouched, so the identical retry works and advances once.
        let outcome = turn(&registry, &llm, "s1", "answer").await.unwrap();
        assert_eq!(outcome.cursor, 1);
    }

    #[tokio::test]
    async fn test_stay_reply_strips_token_from_visible_text() {
        let registry = registry_with("s1", &["Q1", "Q2"]).await;
        let llm = ScriptedClient::new(vec![stay("Could you elaborate a little?")]);

        let outcome = turn(&registry, &llm, "s1", "hmm").await.unwrap();
        assert_eq!(outcome.visible_reply, "Could you elaborate a little?");
        assert!(!outcome.visible_reply.contains("action"));
    }

    #[tokio::test]
    async fn test_record_step_is_skipped_when_generation_fails() {
        let registry = registry_with("s1", &["Q1"]).await;
        let llm = ScriptedClient::new(vec![Err(LlmError::EmptyContent)]);
        let recorded = Arc::new(AtomicUsize::new(0));

        let counter = recorded.clone();
        let result = conduct_turn(&registry, &llm, "s1", "answer", move |outcome| async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(outcome)
        })
        .await;

        assert!(result.is_err());
        assert_eq!(recorded.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_overlapping_turns_record_in_arrival_order() {
        // Two concurrent turns for one session, with a slow recorder on each.
        // The session lock covers the record step, so the second turn cannot
        // record before the first turn's record has finished.
        let registry = registry_with("s1", &["Q1", "Q2", "Q3"]).await;
        let llm = ScriptedClient::new(vec![next("first"), next("second")]);
        let recorded: Arc<Mutex<Vec<usize>>> = Arc::new(Mutex::new(Vec::new()));

        let slow_recorder = |log: Arc<Mutex<Vec<usize>>>| {
            move |outcome: TurnOutcome| async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                log.lock().unwrap().push(outcome.cursor);
                Ok(outcome)
            }
        };

        let (a, b) = tokio::join!(
            conduct_turn(&registry, &llm, "s1", "answer one", slow_recorder(recorded.clone())),
            conduct_turn(&registry, &llm, "s1", "answer two", slow_recorder(recorded.clone())),
        );
        a.unwrap();
        b.unwrap();

        assert_eq!(*recorded.lock().unwrap(), vec![1, 2]);
    }
}
