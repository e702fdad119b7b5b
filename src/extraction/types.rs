use serde::{Deserialize, Serialize};

/// One physical container as extracted by the model.
///
/// Only `container_id` is inspected; every other field the model reports
/// (carrier, type, dimensions, weights, ...) passes through untouched and is
/// written back out as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerRecord {
    #[serde(default)]
    pub container_id: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ContainerRecord {
    pub fn with_id(id: &str) -> Self {
        Self {
            container_id: Some(id.to_string()),
            extra: serde_json::Map::new(),
        }
    }
}

/// A container record annotated with its identifier's validity verdict.
#[derive(Debug, Clone, Serialize)]
pub struct AnnotatedRecord {
    #[serde(flatten)]
    pub record: ContainerRecord,
    pub id_valid: bool,
}

/// Terminal state of a correction session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Every identifier in the best-known list validates.
    Converged,
    /// The round budget ran out (or the collaborator became unreachable)
    /// with at least one identifier still invalid.
    Exhausted,
}

/// Final result of one extraction session: the best-known record list,
/// annotated per record, plus how the session ended.
#[derive(Debug)]
pub struct SessionOutcome {
    pub records: Vec<AnnotatedRecord>,
    pub state: SessionState,
    /// Correction rounds actually issued (the initial extraction is not
    /// counted here).
    pub correction_attempts: u32,
    /// Set when the session stopped early because the collaborator became
    /// unreachable mid-loop. The records above are still the best known.
    pub transport_error: Option<String>,
}

impl SessionOutcome {
    pub fn converged(&self) -> bool {
        self.state == SessionState::Converged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_roundtrips_passthrough_fields() {
        let json = r#"{"container_id":"CSQU3054383","carrier":"CROWLEY","type":"LPG1","dimensions":{"length":"45'","height":"102\""}}"#;
        let record: ContainerRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.container_id.as_deref(), Some("CSQU3054383"));
        assert_eq!(record.extra["carrier"], "CROWLEY");
        assert_eq!(record.extra["dimensions"]["length"], "45'");

        let back = serde_json::to_value(&record).unwrap();
        assert_eq!(back["carrier"], "CROWLEY");
        assert_eq!(back["type"], "LPG1");
    }

    #[test]
    fn record_tolerates_missing_id() {
        let record: ContainerRecord = serde_json::from_str(r#"{"carrier":"CROWLEY"}"#).unwrap();
        assert!(record.container_id.is_none());
        assert_eq!(record.extra["carrier"], "CROWLEY");
    }

    #[test]
    fn annotated_record_flattens_in_output() {
        let annotated = AnnotatedRecord {
            record: ContainerRecord::with_id("CSQU3054383"),
            id_valid: true,
        };
        let json = serde_json::to_value(&annotated).unwrap();
        assert_eq!(json["container_id"], "CSQU3054383");
        assert_eq!(json["id_valid"], true);
    }

    #[test]
    fn session_state_serializes_snake_case() {
        assert_eq!(
            serde_json::to_value(SessionState::Converged).unwrap(),
            "converged"
        );
        assert_eq!(
            serde_json::to_value(SessionState::Exhausted).unwrap(),
            "exhausted"
        );
    }
}
