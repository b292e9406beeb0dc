// SPDX-License-Identifier: MIT

//! Gemini API client for equipment recognition and data-plate OCR

use reqwest::Client;
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::GeminiConfig;
use crate::{PlatescanError, Result};

/// The validated five-field record returned by the model.
///
/// `item_name` and `description` are always populated. The other three fields
/// come back as `null` when the information is not visible on the equipment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recognition {
    pub item_name: String,
    #[serde(deserialize_with = "nullable_string")]
    pub model_number: Option<String>,
    #[serde(deserialize_with = "nullable_string")]
    pub serial_number: Option<String>,
    #[serde(deserialize_with = "nullable_string")]
    pub manufacturer: Option<String>,
    pub description: String,
}

// A `deserialize_with` attribute keeps the key itself required; only an
// explicit null maps to None. Plain Option fields would accept a missing key.
fn nullable_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
    response_schema: serde_json::Value,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ModelsResponse {
    #[serde(default)]
    models: Vec<ModelInfo>,
}

#[derive(Deserialize)]
struct ModelInfo {
    name: String,
}

/// Structured-output schema declared on every request. All five fields are
/// formally required; the model is directed via the descriptions to return
/// null for data-plate fields it cannot read.
fn response_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "OBJECT",
        "properties": {
            "itemName": {
                "type": "STRING",
                "description": "The primary name of the equipment or item (e.g., 'Electric Motor', 'Control Panel', 'Hydraulic Pump')."
            },
            "modelNumber": {
                "type": "STRING",
                "description": "The model number found on the equipment's data plate. Should be null if not found."
            },
            "serialNumber": {
                "type": "STRING",
                "description": "The serial number found on the equipment's data plate. Should be null if not found."
            },
            "manufacturer": {
                "type": "STRING",
                "description": "The manufacturer or brand name of the equipment (e.g., 'Siemens', 'Allen-Bradley', 'Parker'). Should be null if not found."
            },
            "description": {
                "type": "STRING",
                "description": "A brief, one or two sentence summary of the equipment's appearance, condition, and any other relevant details visible in the image."
            }
        },
        "required": ["itemName", "modelNumber", "serialNumber", "manufacturer", "description"]
    })
}

/// Concatenate the text parts of the first candidate.
fn candidate_text(response: GenerateResponse) -> Option<String> {
    let content = response.candidates.into_iter().next()?.content?;
    let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Parse the candidate text into a validated [`Recognition`].
///
/// Anything that is not JSON, or parses but violates the field shapes, is a
/// validation error. The raw body stays in the logs; the caller only sees the
/// generic failure.
pub fn parse_recognition(text: &str) -> Result<Recognition> {
    serde_json::from_str(text.trim()).map_err(|e| {
        warn!("Recognition response failed validation: {}", e);
        debug!("Raw response body: {}", text);
        PlatescanError::InvalidResponse(e.to_string())
    })
}

/// Gemini API client
pub struct GeminiClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    prompt: String,
}

impl GeminiClient {
    /// Create a new Gemini client
    pub fn new(config: &GeminiConfig, api_key: String, prompt: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            prompt,
        }
    }

    /// Run one recognition call for a staged image.
    ///
    /// Exactly one request per invocation: no retry, no streaming. The request
    /// carries the fixed instruction prompt, the inline image payload, and the
    /// structured-output schema.
    pub async fn analyze(&self, image_base64: &str, mime_type: &str) -> Result<Recognition> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );

        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part {
                        text: Some(self.prompt.clone()),
                        inline_data: None,
                    },
                    Part {
                        text: None,
                        inline_data: Some(InlineData {
                            mime_type: mime_type.to_string(),
                            data: image_base64.to_string(),
                        }),
                    },
                ],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: response_schema(),
            },
        };

        debug!("Sending recognition request: model={}", self.model);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Gemini returned status {}: {}", status, body);
            return Err(PlatescanError::ServiceUnavailable(format!(
                "Gemini returned status {}",
                status
            )));
        }

        let envelope: GenerateResponse = response.json().await?;
        let text = candidate_text(envelope).ok_or_else(|| {
            PlatescanError::InvalidResponse("response contained no candidate text".to_string())
        })?;

        parse_recognition(&text)
    }

    /// List models visible to the configured key. Used by the status command
    /// as a reachability check.
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let url = format!("{}/v1beta/models", self.base_url);

        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PlatescanError::ServiceUnavailable(format!(
                "Gemini returned status {}",
                status
            )));
        }

        let models: ModelsResponse = response.json().await?;
        Ok(models.into_names())
    }

    /// The configured model identifier
    pub fn model(&self) -> &str {
        &self.model
    }
}

impl ModelsResponse {
    fn into_names(self) -> Vec<String> {
        self.models
            .into_iter()
            .map(|m| m.name.trim_start_matches("models/").to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_well_formed_response_keeps_all_fields() {
        let rec = parse_recognition(
            r#"{
                "itemName": "Electric Motor",
                "modelNumber": "1LA7-096",
                "serialNumber": "N-20448812",
                "manufacturer": "Siemens",
                "description": "Three-phase induction motor, grey housing, mounted on a steel skid."
            }"#,
        )
        .unwrap();

        assert_eq!(rec.item_name, "Electric Motor");
        assert_eq!(rec.model_number.as_deref(), Some("1LA7-096"));
        assert_eq!(rec.serial_number.as_deref(), Some("N-20448812"));
        assert_eq!(rec.manufacturer.as_deref(), Some("Siemens"));
        assert!(rec.description.starts_with("Three-phase"));
    }

    #[test]
    fn test_nulls_preserved() {
        let rec = parse_recognition(
            r#"{
                "itemName": "Hydraulic Pump",
                "modelNumber": null,
                "serialNumber": null,
                "manufacturer": "Parker",
                "description": "Compact gear pump, worn paint, no visible serial plate."
            }"#,
        )
        .unwrap();

        assert_eq!(rec.model_number, None);
        assert_eq!(rec.serial_number, None);
        assert_eq!(rec.manufacturer.as_deref(), Some("Parker"));
    }

    #[test]
    fn test_missing_item_name_fails() {
        let err = parse_recognition(
            r#"{
                "modelNumber": "X-1",
                "serialNumber": null,
                "manufacturer": null,
                "description": "Unlabeled control cabinet."
            }"#,
        )
        .unwrap_err();
        assert!(matches!(err, PlatescanError::InvalidResponse(_)));
    }

    #[test]
    fn test_non_string_item_name_fails() {
        let err = parse_recognition(
            r#"{
                "itemName": 42,
                "modelNumber": null,
                "serialNumber": null,
                "manufacturer": null,
                "description": "Something."
            }"#,
        )
        .unwrap_err();
        assert!(matches!(err, PlatescanError::InvalidResponse(_)));
    }

    #[test]
    fn test_null_description_fails() {
        let err = parse_recognition(
            r#"{
                "itemName": "Conveyor Drive",
                "modelNumber": null,
                "serialNumber": null,
                "manufacturer": null,
                "description": null
            }"#,
        )
        .unwrap_err();
        assert!(matches!(err, PlatescanError::InvalidResponse(_)));
    }

    #[test]
    fn test_missing_nullable_key_fails() {
        // All five keys are formally required; null is fine, absence is not.
        let err = parse_recognition(
            r#"{
                "itemName": "Gearbox",
                "serialNumber": null,
                "manufacturer": null,
                "description": "Cast-iron worm gearbox."
            }"#,
        )
        .unwrap_err();
        assert!(matches!(err, PlatescanError::InvalidResponse(_)));
    }

    #[test]
    fn test_extra_fields_ignored() {
        let rec = parse_recognition(
            r#"{
                "itemName": "Air Compressor",
                "modelNumber": "GA-11",
                "serialNumber": null,
                "manufacturer": "Atlas Copco",
                "description": "Rotary screw compressor.",
                "confidence": 0.97
            }"#,
        )
        .unwrap();
        assert_eq!(rec.item_name, "Air Compressor");
    }

    #[test]
    fn test_non_json_fails() {
        let err = parse_recognition("I could not identify the equipment.").unwrap_err();
        assert!(matches!(err, PlatescanError::InvalidResponse(_)));
    }

    #[test]
    fn test_candidate_text_concatenates_parts() {
        let envelope: GenerateResponse = serde_json::from_str(
            r#"{
                "candidates": [
                    {"content": {"parts": [{"text": "{\"a\":"}, {"text": "1}"}]}}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(candidate_text(envelope).as_deref(), Some("{\"a\":1}"));
    }

    #[test]
    fn test_candidate_text_empty_response() {
        let envelope: GenerateResponse = serde_json::from_str(r#"{"candidates": []}"#).unwrap();
        assert_eq!(candidate_text(envelope), None);

        let envelope: GenerateResponse = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(candidate_text(envelope), None);
    }

    #[test]
    fn test_request_wire_format() {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part {
                        text: Some("prompt".to_string()),
                        inline_data: None,
                    },
                    Part {
                        text: None,
                        inline_data: Some(InlineData {
                            mime_type: "image/png".to_string(),
                            data: "AAAA".to_string(),
                        }),
                    },
                ],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: response_schema(),
            },
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "prompt");
        assert_eq!(
            json["contents"][0]["parts"][1]["inlineData"]["mimeType"],
            "image/png"
        );
        assert_eq!(
            json["generationConfig"]["responseMimeType"],
            "application/json"
        );
        let required = json["generationConfig"]["responseSchema"]["required"]
            .as_array()
            .unwrap();
        assert_eq!(required.len(), 5);
    }

    #[test]
    fn test_model_names_strip_prefix() {
        let response: ModelsResponse = serde_json::from_str(
            r#"{"models": [{"name": "models/gemini-2.5-flash"}, {"name": "models/gemini-2.5-pro"}]}"#,
        )
        .unwrap();
        assert_eq!(
            response.into_names(),
            vec!["gemini-2.5-flash", "gemini-2.5-pro"]
        );
    }
}
