//! Set-based accuracy metrics for one (model, test case) run.
//!
//! Predicted and expected identifiers are compared as normalized sets:
//! order and duplicates don't matter, and `"CMCU 455 7746"` matches
//! `CMCU4557746`. Empty identifiers are discarded on both sides.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::extraction::{validator, AnnotatedRecord, ContainerRecord};

#[derive(Debug, Clone, Serialize)]
pub struct CaseMetrics {
    pub total_predicted: usize,
    pub total_expected: usize,
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub missing_ids: Vec<String>,
    pub extra_ids: Vec<String>,
}

impl CaseMetrics {
    /// Every expected identifier found, nothing extra.
    pub fn is_perfect(&self) -> bool {
        (self.f1_score - 1.0).abs() < f64::EPSILON
    }
}

/// Compare a session's final records against the expected answer list.
pub fn calculate(predicted: &[AnnotatedRecord], expected: &[ContainerRecord]) -> CaseMetrics {
    let predicted_ids = id_set(predicted.iter().map(|r| r.record.container_id.as_deref()));
    let expected_ids = id_set(expected.iter().map(|r| r.container_id.as_deref()));

    let true_positives = predicted_ids.intersection(&expected_ids).count();
    let false_positives = predicted_ids.difference(&expected_ids).count();
    let false_negatives = expected_ids.difference(&predicted_ids).count();

    let precision = if predicted_ids.is_empty() {
        0.0
    } else {
        true_positives as f64 / predicted_ids.len() as f64
    };
    let recall = if expected_ids.is_empty() {
        0.0
    } else {
        true_positives as f64 / expected_ids.len() as f64
    };
    let f1_score = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };

    CaseMetrics {
        total_predicted: predicted_ids.len(),
        total_expected: expected_ids.len(),
        true_positives,
        false_positives,
        false_negatives,
        precision,
        recall,
        f1_score,
        missing_ids: expected_ids.difference(&predicted_ids).cloned().collect(),
        extra_ids: predicted_ids.difference(&expected_ids).cloned().collect(),
    }
}

/// Normalized, de-duplicated identifier set; empty and missing IDs dropped.
fn id_set<'a>(ids: impl Iterator<Item = Option<&'a str>>) -> BTreeSet<String> {
    ids.flatten()
        .map(validator::normalize)
        .filter(|id| !id.is_empty())
        .collect()
}
