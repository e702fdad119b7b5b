//! Extraction orchestrator: image → initial extraction → correction session.
//!
//! The initial extraction shares its round budget with the correction loop:
//! an unparseable first response is retried (same prompt, fresh request)
//! until a record list parses or the budget runs out. Once a list exists,
//! the session takes over and only the remaining rounds are available for
//! corrections.

use std::path::Path;

use uuid::Uuid;

use super::parser::parse_record_array;
use super::prompt::extraction_prompt;
use super::session::{ConversationContext, CorrectionSession};
use super::types::SessionOutcome;
use super::ExtractionError;
use crate::llm::{ChatClient, ChatMessage};

/// Drives one extraction session per image against a vision model.
pub struct ContainerExtractor {
    client: Box<dyn ChatClient>,
    model: String,
    max_iterations: u32,
}

impl ContainerExtractor {
    pub fn new(client: Box<dyn ChatClient>, model: &str, max_iterations: u32) -> Self {
        Self {
            client,
            model: model.to_string(),
            // Zero rounds cannot even extract; clamp to one.
            max_iterations: max_iterations.max(1),
        }
    }

    /// Extract container records from an image file.
    pub fn extract_from_path(&self, path: &Path) -> Result<SessionOutcome, ExtractionError> {
        let data_url = crate::image::load_as_data_url(path)?;
        self.extract(&data_url)
    }

    /// Extract container records from an already-encoded image data URL.
    pub fn extract(&self, image_data_url: &str) -> Result<SessionOutcome, ExtractionError> {
        let session_id = Uuid::new_v4();
        let _span = tracing::info_span!(
            "extract_containers",
            session = %session_id,
            model = %self.model,
        )
        .entered();
        let start = std::time::Instant::now();

        let mut context = ConversationContext::new();
        context.push(ChatMessage::user_with_image(
            &extraction_prompt(),
            image_data_url,
        ));

        // Initial extraction, retrying unparseable responses within the
        // shared round budget. Transport failures are fatal here: with no
        // record list yet, there is nothing best-known to fall back to.
        let mut rounds = 0u32;
        let records = loop {
            rounds += 1;
            tracing::info!(round = rounds, "requesting container extraction");

            let response = self.client.chat(&self.model, context.messages())?;
            match parse_record_array(&response) {
                Ok(records) => {
                    context.push(ChatMessage::assistant(&response));
                    break records;
                }
                Err(e) if rounds < self.max_iterations => {
                    tracing::warn!(round = rounds, error = %e, "initial extraction unparseable, retrying");
                }
                Err(_) => {
                    return Err(ExtractionError::InitialExtractionFailed(rounds));
                }
            }
        };

        tracing::info!(
            detected = records.len(),
            rounds,
            "initial extraction complete"
        );

        let session = CorrectionSession::new(records, context, rounds, self.max_iterations);
        let outcome = session.run(self.client.as_ref(), &self.model);

        tracing::info!(
            state = ?outcome.state,
            records = outcome.records.len(),
            correction_attempts = outcome.correction_attempts,
            elapsed_ms = %start.elapsed().as_millis(),
            "extraction session finished"
        );

        Ok(outcome)
    }
}
