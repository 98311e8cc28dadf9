//! LLM text generator client (spec §6, §9): prompt → JSON, core must
//! tolerate missing/invalid responses. `extract_first_json_object` is the
//! "untrusted JSON producer" lenient parser spec §9 calls for — callers
//! validate the extracted value against their own schema and fall back to
//! a deterministic template on failure.

use std::borrow::Cow;

use serde::Deserialize;
use serde_json::Value;

use crate::error::RepurposeError;

const LLM_BASE: &str = "https://api.openai.com/v1";
const LLM_API: &str = "llm";
const LLM_BASE_ENV: &str = "REPURPOSER_LLM_BASE";
const LLM_KEY_ENV: &str = "REPURPOSER_LLM_API_KEY";
const LLM_MODEL_ENV: &str = "REPURPOSER_LLM_MODEL";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

#[derive(Clone)]
pub struct LlmClient {
    client: reqwest_middleware::ClientWithMiddleware,
    base: Cow<'static, str>,
    api_key: Option<String>,
    model: String,
}

impl LlmClient {
    pub fn new() -> Result<Self, RepurposeError> {
        Ok(Self {
            client: crate::sources::shared_client()?,
            base: crate::sources::env_base(LLM_BASE, LLM_BASE_ENV),
            api_key: std::env::var(LLM_KEY_ENV).ok().filter(|v| !v.trim().is_empty()),
            model: std::env::var(LLM_MODEL_ENV)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        })
    }

    /// `None` whenever the collaborator is unconfigured or fails — callers
    /// must fall back to a deterministic template (spec §9), never propagate.
    pub async fn complete(&self, prompt: &str) -> Option<String> {
        let api_key = self.api_key.as_ref()?;
        self.try_complete(prompt, api_key).await.ok().flatten()
    }

    async fn try_complete(
        &self,
        prompt: &str,
        api_key: &str,
    ) -> Result<Option<String>, RepurposeError> {
        let url = format!("{}/chat/completions", self.base.as_ref().trim_end_matches('/'));
        let body = serde_json::json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": 0.0,
        });
        let req = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body);
        let resp = crate::sources::guarded_send(LLM_API, req).await?;
        if !resp.status().is_success() {
            return Ok(None);
        }
        let bytes = crate::sources::read_limited_body(resp, LLM_API).await?;
        let parsed: ChatCompletion = match serde_json::from_slice(&bytes) {
            Ok(v) => v,
            Err(_) => return Ok(None),
        };
        Ok(parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content))
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

/// Extracts the first balanced `{…}` substring and parses it as JSON
/// (spec §9: "parse leniently, extract the first balanced object").
pub fn extract_first_json_object(text: &str) -> Option<Value> {
    let bytes = text.as_bytes();
    let start = bytes.iter().position(|&b| b == b'{')?;
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, &byte) in bytes[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    let end = start + offset + 1;
                    return serde_json::from_str(&text[start..end]).ok();
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_first_json_object_ignores_leading_prose() {
        let text = "Sure, here you go: {\"a\": 1, \"b\": [1,2]} — hope that helps.";
        let value = extract_first_json_object(text).expect("should parse");
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn extract_first_json_object_handles_braces_inside_strings() {
        let text = "{\"note\": \"uses { and } inside a string\", \"n\": 2}";
        let value = extract_first_json_object(text).expect("should parse");
        assert_eq!(value["n"], 2);
    }

    #[test]
    fn extract_first_json_object_returns_none_without_braces() {
        assert!(extract_first_json_object("no json here").is_none());
    }
}
