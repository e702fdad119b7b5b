//! Correction session: the stateful validation/repair loop.
//!
//! A session owns one conversation with the collaborator and the current
//! best-known record list. Each correction round resends the full
//! conversation history plus the currently-invalid identifiers, then
//! re-validates whatever comes back. Two invariants hold throughout:
//!
//! - **Count protection**: an accepted candidate list never has fewer
//!   records than the count first detected. A shorter response is rejected
//!   and the previous best-known list is retained.
//! - **Bounded rounds**: the session stops after `max_iterations` total
//!   collaborator rounds (the initial extraction counts as round one), so
//!   `max_iterations = 1` disables correction entirely.

use super::parser::parse_record_array;
use super::prompt::correction_prompt;
use super::types::{AnnotatedRecord, ContainerRecord, SessionOutcome, SessionState};
use super::validator;
use crate::llm::{ChatClient, ChatMessage};

/// Append-only conversation history for one session.
///
/// Grows by one exchange per round and is never truncated; the full history
/// is resent with every correction request. Owned exclusively by one
/// session — nothing is shared across concurrent extractions.
#[derive(Debug, Clone, Default)]
pub struct ConversationContext {
    messages: Vec<ChatMessage>,
}

impl ConversationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Placeholder sent to the collaborator for records with no usable
/// identifier.
const UNKNOWN_ID: &str = "Unknown";

/// One image's validation/correction loop.
pub struct CorrectionSession {
    /// Best-known record list; replaced wholesale when a candidate passes
    /// the count floor, never edited in place.
    records: Vec<ContainerRecord>,
    /// Number of records first detected — the floor below which no
    /// correction may regress.
    protected_count: usize,
    context: ConversationContext,
    /// Total collaborator rounds spent, including the initial extraction.
    rounds: u32,
    seeded_rounds: u32,
    max_iterations: u32,
}

impl CorrectionSession {
    /// Start a session from an initial extraction.
    ///
    /// `rounds_used` counts the collaborator rounds already spent producing
    /// `records` (at least one: the initial extraction itself). The session
    /// issues correction rounds until every identifier validates or
    /// `max_iterations` total rounds are spent.
    pub fn new(
        records: Vec<ContainerRecord>,
        context: ConversationContext,
        rounds_used: u32,
        max_iterations: u32,
    ) -> Self {
        let records = normalize_ids(records);
        let rounds = rounds_used.max(1);
        Self {
            protected_count: records.len(),
            records,
            context,
            rounds,
            seeded_rounds: rounds,
            max_iterations,
        }
    }

    /// Drive the session to a terminal state.
    ///
    /// Always returns the best-known list. A collaborator transport failure
    /// ends the session in `Exhausted` with the error recorded on the
    /// outcome — the rounds it prevented are not silently retried.
    pub fn run(mut self, client: &dyn ChatClient, model: &str) -> SessionOutcome {
        loop {
            let invalid = self.invalid_ids();
            if invalid.is_empty() {
                return self.finish(SessionState::Converged, None);
            }
            if self.rounds >= self.max_iterations {
                tracing::info!(
                    invalid = invalid.len(),
                    rounds = self.rounds,
                    "round budget exhausted with invalid identifiers remaining"
                );
                return self.finish(SessionState::Exhausted, None);
            }

            self.rounds += 1;
            tracing::info!(
                round = self.rounds,
                invalid = ?invalid,
                "requesting corrections for invalid container IDs"
            );

            let prompt = correction_prompt(&invalid, self.protected_count);
            self.context.push(ChatMessage::user_text(&prompt));

            let response = match client.chat(model, self.context.messages()) {
                Ok(response) => response,
                Err(e) if e.is_transport() => {
                    tracing::warn!(round = self.rounds, error = %e, "collaborator unreachable, ending session");
                    return self.finish(SessionState::Exhausted, Some(e.to_string()));
                }
                Err(e) => {
                    // Content-level failure: the round is burned but the
                    // session carries on with the previous best-known list.
                    tracing::warn!(round = self.rounds, error = %e, "collaborator returned unusable response");
                    continue;
                }
            };

            self.context.push(ChatMessage::assistant(&response));

            let candidate = match parse_record_array(&response) {
                Ok(candidate) => candidate,
                Err(e) => {
                    tracing::warn!(round = self.rounds, error = %e, "correction response failed to parse, keeping previous records");
                    continue;
                }
            };

            if candidate.len() < self.protected_count {
                tracing::warn!(
                    round = self.rounds,
                    candidate = candidate.len(),
                    protected = self.protected_count,
                    "correction dropped containers, rejecting response"
                );
                continue;
            }

            self.records = normalize_ids(candidate);
        }
    }

    /// Identifiers in the best-known list that fail validation, in record
    /// order. Records with no identifier report as "Unknown".
    fn invalid_ids(&self) -> Vec<String> {
        self.records
            .iter()
            .filter_map(|record| match record.container_id.as_deref() {
                Some(id) if validator::validate(id).is_valid => None,
                Some(id) if !id.is_empty() => Some(id.to_string()),
                _ => Some(UNKNOWN_ID.to_string()),
            })
            .collect()
    }

    fn finish(self, state: SessionState, transport_error: Option<String>) -> SessionOutcome {
        let records = self
            .records
            .into_iter()
            .map(|record| {
                let id_valid = record
                    .container_id
                    .as_deref()
                    .is_some_and(|id| validator::validate(id).is_valid);
                AnnotatedRecord { record, id_valid }
            })
            .collect();

        SessionOutcome {
            records,
            state,
            correction_attempts: self.rounds - self.seeded_rounds,
            transport_error,
        }
    }
}

/// Normalize every record's identifier in place (uppercase, separators
/// stripped). Missing identifiers stay missing.
fn normalize_ids(records: Vec<ContainerRecord>) -> Vec<ContainerRecord> {
    records
        .into_iter()
        .map(|mut record| {
            if let Some(id) = record.container_id.take() {
                record.container_id = Some(validator::normalize(&id));
            }
            record
        })
        .collect()
}
