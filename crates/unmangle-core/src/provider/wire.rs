//! OpenAI-compatible chat wire format.
//!
//! Both provider variants speak the `/chat/completions` shape, so the
//! payload builder and response parser live here and the backends only
//! differ in endpoint and auth. The response content is expected to be a
//! JSON array of suggestion objects; models that wrap it in a fenced code
//! block are tolerated.

use super::{ProviderError, RenameSuggestion, RequestConfig, SuggestionKind};
use serde::Deserialize;
use serde_json::{json, Value};

/// System prompt instructing the model to emit a parseable suggestion list.
pub const SYSTEM_PROMPT: &str = "\
You are a reverse-engineering assistant. You are given a fragment of \
obfuscated or minified JavaScript. Propose descriptive replacement names \
for the obfuscated identifiers you can understand from context. Respond \
with ONLY a JSON array, no prose, where each element is an object with \
keys: \"originalName\", \"suggestedName\", \"confidence\" (0 to 1), \
\"kind\" (one of \"variable\", \"function\", \"class\", \"method\", \
\"property\"), and optionally \"reasoning\". Never suggest a name equal \
to the original. Only include identifiers that actually appear in the \
fragment.";

/// Build the chat-completions request body for one chunk.
#[must_use]
pub fn build_chat_payload(code: &str, req: &RequestConfig) -> Value {
    json!({
        "model": req.model,
        "temperature": req.temperature,
        "messages": [
            { "role": "system", "content": SYSTEM_PROMPT },
            { "role": "user", "content": code },
        ],
    })
}

/// POST a chat payload and classify HTTP-level failures.
///
/// Status mapping: 401/403 is an auth failure, 429 a rate limit, 5xx a
/// transient server fault; any other non-success status means the request
/// we built was not accepted, which fails only this chunk.
pub(crate) async fn post_chat(
    http: &reqwest::Client,
    url: url::Url,
    bearer: Option<&str>,
    payload: &Value,
) -> Result<Value, ProviderError> {
    let mut request = http.post(url).json(payload);
    if let Some(token) = bearer {
        request = request.bearer_auth(token);
    }

    let response = request.send().await?;
    let status = response.status();

    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(ProviderError::Auth(format!(
            "provider rejected credentials (status {status})"
        )));
    }
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(ProviderError::RateLimit(format!(
            "provider rate limit hit (status {status})"
        )));
    }
    if status.is_server_error() {
        return Err(ProviderError::Transient(format!(
            "provider returned status {status}"
        )));
    }
    if !status.is_success() {
        let excerpt: String = response.text().await.unwrap_or_default().chars().take(200).collect();
        return Err(ProviderError::MalformedResponse(format!(
            "provider returned status {status}: {excerpt}"
        )));
    }

    let body: Value = response.json().await?;
    Ok(body)
}

/// Suggestion object as models actually emit it: loosely typed, with
/// optional fields. Normalized into [`RenameSuggestion`] before anything
/// downstream sees it.
#[derive(Debug, Deserialize)]
struct RawSuggestion {
    #[serde(rename = "originalName", alias = "original_name")]
    original_name: String,
    #[serde(rename = "suggestedName", alias = "suggested_name")]
    suggested_name: String,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    reasoning: Option<String>,
}

/// Parse a chat-completions response body into normalized suggestions plus
/// the reported token usage.
pub fn parse_chat_response(body: &Value) -> Result<(Vec<RenameSuggestion>, u64), ProviderError> {
    let content = body
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(Value::as_str)
        .ok_or_else(|| {
            ProviderError::MalformedResponse("response has no message content".to_string())
        })?;

    let suggestions = parse_suggestion_content(content)?;

    let tokens = body
        .get("usage")
        .and_then(|u| u.get("total_tokens"))
        .and_then(Value::as_u64)
        .unwrap_or(0);

    Ok((suggestions, tokens))
}

/// Parse the message content (a JSON array, possibly fenced) into
/// normalized suggestions.
pub fn parse_suggestion_content(content: &str) -> Result<Vec<RenameSuggestion>, ProviderError> {
    let stripped = strip_code_fence(content);

    let raw: Vec<RawSuggestion> = serde_json::from_str(stripped).map_err(|e| {
        ProviderError::MalformedResponse(format!("suggestion list is not valid JSON: {e}"))
    })?;

    let mut suggestions = Vec::with_capacity(raw.len());
    for r in raw {
        match normalize(r) {
            Some(s) => suggestions.push(s),
            None => tracing::debug!("dropped suggestion with empty name"),
        }
    }
    Ok(suggestions)
}

/// Validate and normalize one raw suggestion. Empty names are dropped;
/// confidence is clamped; unknown kinds map to `variable`.
fn normalize(raw: RawSuggestion) -> Option<RenameSuggestion> {
    let original_name = raw.original_name.trim().to_string();
    let suggested_name = raw.suggested_name.trim().to_string();
    if original_name.is_empty() || suggested_name.is_empty() {
        return None;
    }

    let kind = raw
        .kind
        .as_deref()
        .map_or(SuggestionKind::Variable, SuggestionKind::from_label);

    let mut suggestion = RenameSuggestion::new(
        original_name,
        suggested_name,
        raw.confidence.unwrap_or(0.5),
        kind,
    );
    suggestion.reasoning = raw.reasoning.filter(|r| !r.trim().is_empty());
    Some(suggestion)
}

/// Strip a Markdown code fence (```json ... ``` or ``` ... ```) if present.
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string on the opening fence line.
    let rest = rest.split_once('\n').map_or("", |(_, body)| body);
    rest.rsplit_once("```").map_or(rest, |(body, _)| body).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_shape() {
        let req = RequestConfig {
            model: "gpt-4o-mini".to_string(),
            temperature: 0.2,
        };
        let payload = build_chat_payload("var a = 1;", &req);
        assert_eq!(payload["model"], "gpt-4o-mini");
        assert_eq!(payload["messages"][0]["role"], "system");
        assert_eq!(payload["messages"][1]["content"], "var a = 1;");
    }

    #[test]
    fn test_parse_plain_array() {
        let suggestions = parse_suggestion_content(
            r#"[{"originalName":"a","suggestedName":"increment","confidence":0.9,"kind":"function"}]"#,
        )
        .unwrap();
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].original_name, "a");
        assert_eq!(suggestions[0].suggested_name, "increment");
        assert_eq!(suggestions[0].kind, SuggestionKind::Function);
    }

    #[test]
    fn test_parse_fenced_array() {
        let content = "```json\n[{\"originalName\":\"b\",\"suggestedName\":\"value\"}]\n```";
        let suggestions = parse_suggestion_content(content).unwrap();
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].suggested_name, "value");
        // Missing fields get defaults.
        assert_eq!(suggestions[0].kind, SuggestionKind::Variable);
        assert!((suggestions[0].confidence - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_garbage_is_malformed() {
        let err = parse_suggestion_content("Sure! Here are some names you could use:").unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse(_)));
    }

    #[test]
    fn test_empty_names_dropped_and_confidence_clamped() {
        let suggestions = parse_suggestion_content(
            r#"[
                {"originalName":"", "suggestedName":"x"},
                {"originalName":"a", "suggestedName":"  "},
                {"originalName":"a", "suggestedName":"b", "confidence": 7.0, "kind": "widget"}
            ]"#,
        )
        .unwrap();
        assert_eq!(suggestions.len(), 1);
        assert!((suggestions[0].confidence - 1.0).abs() < f64::EPSILON);
        assert_eq!(suggestions[0].kind, SuggestionKind::Variable);
    }

    #[test]
    fn test_parse_full_response_body() {
        let body = serde_json::json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": "[{\"originalName\":\"a\",\"suggestedName\":\"sum\",\"confidence\":0.8,\"kind\":\"function\",\"reasoning\":\"adds things\"}]"
                }
            }],
            "usage": { "prompt_tokens": 90, "completion_tokens": 30, "total_tokens": 120 }
        });
        let (suggestions, tokens) = parse_chat_response(&body).unwrap();
        assert_eq!(tokens, 120);
        assert_eq!(suggestions[0].reasoning.as_deref(), Some("adds things"));
    }

    #[test]
    fn test_missing_content_is_malformed() {
        let body = serde_json::json!({ "choices": [] });
        assert!(matches!(
            parse_chat_response(&body),
            Err(ProviderError::MalformedResponse(_))
        ));
    }
}
