use std::collections::HashMap;
use std::str::FromStr;

use coordinator_adapters::{Adapter, AdapterOp, AdapterOutcome, LlmAdapter};
use tracing::instrument;

use crate::error::{ClassifyError, Result};
use crate::types::{Intent, IntentResult};

const SYSTEM_PROMPT: &str = "You classify a chat message into exactly one task-coordination intent. \
Respond with a single JSON object: {\"intent\": string, \"confidence\": number 0..1, \"reasoning\": string, \
\"extracted_fields\": object of string to string}. Do not include any other text.";

/// Deterministic-first intent classification. A slash command is
/// resolved entirely without a model call; everything else is delegated to
/// the configured [`LlmAdapter`], whose free-form date/priority/id fields
/// are advisory only — the dialog and task layers re-extract those
/// deterministically.
pub struct IntentClassifier {
    llm: LlmAdapter,
}

impl IntentClassifier {
    pub fn new(llm: LlmAdapter) -> Self {
        Self { llm }
    }

    #[instrument(skip(self, message, context_snapshot))]
    pub async fn classify(&self, message: &str, context_snapshot: &str) -> Result<IntentResult> {
        let trimmed = message.trim();
        if let Some(cmd) = trimmed.split_whitespace().next() {
            if let Some(intent) = Intent::from_slash_command(cmd) {
                return Ok(IntentResult {
                    intent,
                    confidence: 1.0,
                    reasoning: format!("exact slash command match: {cmd}"),
                    extracted_fields: HashMap::new(),
                });
            }
        }

        let op = AdapterOp::CompleteChat {
            system_prompt: SYSTEM_PROMPT.to_string(),
            messages: vec![serde_json::json!({
                "role": "user",
                "content": format!("conversation context:\n{context_snapshot}\n\nmessage:\n{message}"),
            })],
        };

        let outcome = self.llm.execute(op).await?;
        let AdapterOutcome::Completion { text } = outcome else {
            return Err(ClassifyError::MalformedOutput(
                "llm adapter returned a non-completion outcome".into(),
            ));
        };

        parse_completion(&text)
    }
}

fn parse_completion(text: &str) -> Result<IntentResult> {
    let json_slice = extract_json_object(text)
        .ok_or_else(|| ClassifyError::MalformedOutput("no JSON object found in completion".into()))?;

    let value: serde_json::Value = serde_json::from_str(json_slice)
        .map_err(|e| ClassifyError::MalformedOutput(e.to_string()))?;

    let intent_str = value["intent"]
        .as_str()
        .ok_or_else(|| ClassifyError::MalformedOutput("missing 'intent' field".into()))?;
    let intent = Intent::from_str(intent_str).map_err(ClassifyError::MalformedOutput)?;

    let confidence = value["confidence"]
        .as_f64()
        .ok_or_else(|| ClassifyError::MalformedOutput("missing 'confidence' field".into()))?
        .clamp(0.0, 1.0);

    let reasoning = value["reasoning"].as_str().unwrap_or_default().to_string();

    let extracted_fields = value["extracted_fields"]
        .as_object()
        .map(|obj| {
            obj.iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect()
        })
        .unwrap_or_default();

    Ok(IntentResult {
        intent,
        confidence,
        reasoning,
        extracted_fields,
    })
}

/// The model is instructed to emit only JSON, but defensively scan for the
/// outermost `{...}` in case of stray wrapping text.
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_completion() {
        let text = r#"{"intent": "create_task", "confidence": 0.92, "reasoning": "clear ask", "extracted_fields": {"title": "fix bug"}}"#;
        let result = parse_completion(text).unwrap();
        assert_eq!(result.intent, Intent::CreateTask);
        assert!((result.confidence - 0.92).abs() < f64::EPSILON);
        assert_eq!(result.extracted_fields.get("title").unwrap(), "fix bug");
    }

    #[test]
    fn tolerates_prose_wrapped_around_the_json_object() {
        let text = "Sure thing!\n{\"intent\": \"help\", \"confidence\": 1.0, \"reasoning\": \"\", \"extracted_fields\": {}}\nLet me know if you need more.";
        let result = parse_completion(text).unwrap();
        assert_eq!(result.intent, Intent::Help);
    }

    #[test]
    fn rejects_unknown_intent_names() {
        let text = r#"{"intent": "do_a_barrel_roll", "confidence": 0.9, "reasoning": "", "extracted_fields": {}}"#;
        assert!(parse_completion(text).is_err());
    }

    #[test]
    fn clamps_out_of_range_confidence() {
        let text = r#"{"intent": "help", "confidence": 1.5, "reasoning": "", "extracted_fields": {}}"#;
        let result = parse_completion(text).unwrap();
        assert_eq!(result.confidence, 1.0);
    }
}
