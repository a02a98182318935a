//! Structured Extractor: list-shaped fragments (approach points, impact points).
//!
//! The backend is told the exact JSON shape to return. Its raw reply is then
//! parsed against that shape; anything that does not fit is a
//! `SchemaValidation` error carrying the raw text. A `Points` value only ever
//! comes out of a successful parse or an explicit user edit.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::generation::DraftError;
use crate::llm_client::prompts::{JSON_ONLY_INSTRUCTION, SYSTEM_SCOPE, USER_REQUEST_SEPARATOR};
use crate::llm_client::{strip_json_fences, LlmClient};
use crate::prompts::format_prompt;

const POINTS_FIELD: &str = "points";

// "- ", "* ", "• ", "1. ", "2) ", "(3) "
static LIST_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:[-*•–]|[0-9]+[.)]|\([0-9]+\))\s+").expect("valid list marker regex")
});

/// A validated, ordered, non-empty list of trimmed points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Points(Vec<String>);

impl Points {
    /// Points typed in by the user. Markers are stripped and blank lines
    /// dropped; no arity check applies to manual edits.
    pub fn from_user_edit<I, S>(items: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let points: Vec<String> = items
            .into_iter()
            .filter_map(|item| clean_point(item.as_ref()))
            .collect();
        (!points.is_empty()).then_some(Points(points))
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

}

/// Shape of a list-valued fragment: `{"points": [string, ...]}` with an
/// inclusive item-count range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulletSchema {
    pub min_items: usize,
    pub max_items: usize,
}

impl BulletSchema {
    pub const fn between(min_items: usize, max_items: usize) -> Self {
        Self {
            min_items,
            max_items,
        }
    }

    pub const fn exactly(items: usize) -> Self {
        Self::between(items, items)
    }

    pub fn json_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                POINTS_FIELD: {
                    "type": "array",
                    "description": "Ordered list of short, concise points",
                    "items": { "type": "string" },
                    "minItems": self.min_items,
                    "maxItems": self.max_items
                }
            },
            "required": [POINTS_FIELD]
        })
    }

    /// Machine-readable instructions prepended to the user prompt.
    pub fn format_instructions(&self) -> String {
        format!(
            "{JSON_ONLY_INSTRUCTION}\n\
             The output must be a JSON object that conforms to the JSON schema below.\n\
             ```\n{}\n```\n\
             Each point is a plain string without bullet characters or numbering.",
            self.json_schema()
        )
    }

    /// Parses raw backend output against the schema. The error is a
    /// human-readable description of the mismatch.
    pub fn parse(&self, raw: &str) -> Result<Points, String> {
        let body = strip_json_fences(raw);
        if body.is_empty() {
            return Err("response is empty".to_string());
        }

        // A fully marked list wins; brackets inside it are citations, not JSON.
        let items = match items_from_list_lines(body) {
            Ok(items) => items,
            Err(list_err) => match embedded_json(body) {
                Some(json) => items_from_json(first_json_value(json)?)?,
                None => return Err(list_err),
            },
        };

        let points: Vec<String> = items.iter().filter_map(|i| clean_point(i)).collect();
        if points.len() < self.min_items || points.len() > self.max_items {
            return Err(if self.min_items == self.max_items {
                format!("expected {} points, got {}", self.min_items, points.len())
            } else {
                format!(
                    "expected {}-{} points, got {}",
                    self.min_items,
                    self.max_items,
                    points.len()
                )
            });
        }
        Ok(Points(points))
    }
}

/// Slice from the first `{`/`[` to the matching last `}`/`]`, if the text
/// looks like it carries JSON at all.
fn embedded_json(body: &str) -> Option<&str> {
    let start = body.find(|c| c == '{' || c == '[')?;
    let closer = if body[start..].starts_with('{') { '}' } else { ']' };
    let end = body.rfind(closer)?;
    (end > start).then(|| &body[start..=end])
}

/// First complete JSON value in `json`; anything after it is ignored.
fn first_json_value(json: &str) -> Result<Value, String> {
    match serde_json::Deserializer::from_str(json).into_iter::<Value>().next() {
        Some(Ok(value)) => Ok(value),
        Some(Err(e)) => Err(format!("response is not valid JSON: {e}")),
        None => Err("response is not valid JSON".to_string()),
    }
}

fn items_from_json(value: Value) -> Result<Vec<String>, String> {
    let array = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove(POINTS_FIELD) {
            Some(Value::Array(items)) => items,
            Some(other) => return Err(format!("field '{POINTS_FIELD}' is {}, not an array", kind(&other))),
            None => {
                // Tolerate a renamed key when it is the only list in the object.
                let mut arrays = map.into_iter().filter_map(|(_, v)| match v {
                    Value::Array(items) => Some(items),
                    _ => None,
                });
                match (arrays.next(), arrays.next()) {
                    (Some(items), None) => items,
                    _ => return Err(format!("missing required field '{POINTS_FIELD}'")),
                }
            }
        },
        other => return Err(format!("expected a JSON object, got {}", kind(&other))),
    };

    array
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::String(s) => Ok(s),
            other => Err(format!("point {} is {}, not a string", i + 1, kind(&other))),
        })
        .collect()
}

/// Fallback for replies that ignored the JSON instruction but are still a
/// plain marked list. Every non-blank line must carry a list marker.
fn items_from_list_lines(body: &str) -> Result<Vec<String>, String> {
    let lines: Vec<&str> = body.lines().filter(|l| !l.trim().is_empty()).collect();
    if let Some(line) = lines.iter().find(|l| !LIST_MARKER.is_match(l)) {
        return Err(format!("response is neither JSON nor a marked list (line: {:?})", line.trim()));
    }
    Ok(lines.into_iter().map(str::to_string).collect())
}

fn clean_point(item: &str) -> Option<String> {
    let stripped = LIST_MARKER.replace(item, "");
    let point = stripped.trim();
    (!point.is_empty()).then(|| point.to_string())
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Formats the prompt, prepends the schema's format instructions, completes
/// once and validates the reply. No retry on validation failure.
pub async fn generate_structured(
    llm: &LlmClient,
    prompt_name: &str,
    main_text: &str,
    secondary_text: Option<&str>,
    schema: BulletSchema,
    max_output_tokens: u32,
    temperature: f32,
) -> Result<Points, DraftError> {
    let prompt = format_prompt(prompt_name, main_text, secondary_text)?;
    let user_text = format!(
        "{}{}{}",
        schema.format_instructions(),
        USER_REQUEST_SEPARATOR,
        prompt
    );

    let request = llm.request(SYSTEM_SCOPE, &user_text, max_output_tokens, temperature);
    let raw = llm.complete(&request).await?;

    match schema.parse(&raw) {
        Ok(points) => {
            info!("Structured fragment '{}' parsed: {} points", prompt_name, points.len());
            Ok(points)
        }
        Err(message) => {
            warn!("Structured fragment '{}' failed validation: {}", prompt_name, message);
            Err(DraftError::SchemaValidation { message, raw })
        }
    }
}
