//! Prompt construction for the extraction and correction rounds.
//!
//! The initial prompt embeds the container JSON schema and asks for one
//! structured object per container, ordered left to right, top to bottom.
//! The correction prompt names only the invalid identifiers and restates the
//! count floor so the model never silently drops a detected container.

/// JSON schema for the expected response array, embedded in the initial
/// prompt. `container_id` is the only field this tool inspects; the rest is
/// passthrough.
pub const CONTAINER_SCHEMA_JSON: &str = r#"{
  "$schema": "http://json-schema.org/draft-07/schema#",
  "title": "Container Data",
  "description": "Array of shipping container information, one object per container.",
  "type": "array",
  "items": {
    "type": "object",
    "required": ["container_id"],
    "properties": {
      "container_id": {
        "type": "string",
        "description": "Unique identifier for the container, e.g. 'CMCU 455 7748' or 'SEKU 920653 4'."
      },
      "carrier": {
        "type": "string",
        "description": "Name of the shipping carrier, or 'Unknown'."
      },
      "type": {
        "type": "string",
        "description": "Container type marking, e.g. 'LPG1' or 'Reefer (45R1)'."
      },
      "dimensions": {
        "type": "object",
        "properties": {
          "length": { "type": "string" },
          "height": { "type": "string" }
        }
      },
      "weight_capacity": {
        "type": "object",
        "description": "M.G.W, TARE, NET and CUB.CAP markings with kgs/lbs values."
      },
      "marked_details": {
        "type": "object",
        "description": "Any additional markings visible on the container."
      }
    }
  }
}"#;

/// Build the initial extraction prompt.
pub fn extraction_prompt() -> String {
    format!(
        "Extract all the text from each container in the image.\n\
         \n\
         Output the information on each container as a structured JSON object \
         according to the schema below.\n\
         \n\
         ```json\n{CONTAINER_SCHEMA_JSON}\n```\n\
         \n\
         Focus on:\n\
         1. Container IDs (e.g., CMCU 455 7748)\n\
         2. Carrier names (e.g., CROWLEY)\n\
         3. Container types (e.g., LPG1)\n\
         4. Dimensions (length and height)\n\
         5. Weight specifications (M.G.W, TARE, NET)\n\
         6. Cubic capacity (CUB.CAP)\n\
         7. Any additional markings\n\
         \n\
         The JSON array should be in the same order as the containers in the \
         image: left to right, top to bottom.\n\
         \n\
         Return only the JSON array, no additional text or formatting."
    )
}

/// Build the correction prompt for one round.
///
/// `invalid_ids` are the identifiers that failed check-digit validation this
/// round; `protected_count` is the number of containers first detected, the
/// floor the corrected response must not drop below.
pub fn correction_prompt(invalid_ids: &[String], protected_count: usize) -> String {
    format!(
        "IMPORTANT: Only correct the INVALID container IDs listed below. Do \
         NOT change any container IDs that are already correct.\n\
         \n\
         The following {count} container IDs are INVALID and need correction:\n\
         {ids}\n\
         \n\
         Requirements for correction:\n\
         1. Look at the image again and ONLY fix the invalid container IDs listed above\n\
         2. Keep ALL other valid container IDs exactly as they were in your previous response\n\
         3. The response must contain at least {protected_count} containers, in the same order as before\n\
         4. Only change the invalid container IDs to match what you actually see in the image\n\
         5. Use proper container ID format: 4 letters + 7 digits with a valid check digit\n\
         \n\
         Container ID format rules:\n\
         - 4 letters (owner code + equipment category) + 6 serial digits + 1 check digit\n\
         - The 11th character is a check digit calculated from the first 10 characters\n\
         \n\
         Return only the corrected JSON array with all containers, no \
         additional text or formatting.",
        count = invalid_ids.len(),
        ids = invalid_ids.join(", "),
    )
}
