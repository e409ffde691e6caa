//! HTTP client for an Anthropic-style messages endpoint.

use async_trait::async_trait;
use serde_json::Value;

use score::MusicDescription;

use crate::{extract, prompt, Composer, ComposerError};

/// Model requested when the caller does not pick one.
pub const DEFAULT_MODEL: &str = "claude-3-7-sonnet-latest";

const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 4000;
const TEMPERATURE: f64 = 0.7;

/// Composer backed by a messages API.
///
/// Sends the user's idea with a system prompt that pins the reply to the
/// music description wire format, then parses the first text block of the
/// response.
pub struct LlmComposer {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
    system_prompt: String,
}

impl LlmComposer {
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        LlmComposer {
            client: reqwest::Client::new(),
            api_url: api_url.into(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            system_prompt: prompt::SYSTEM_PROMPT.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Tell the model which patch names it may use in `soundfont_name`.
    pub fn with_soundfont_hints<S: AsRef<str>>(mut self, names: &[S]) -> Self {
        self.system_prompt = prompt::system_prompt_with_soundfonts(names);
        self
    }

    async fn request_text(&self, idea: &str) -> Result<String, ComposerError> {
        let mut body = serde_json::Map::new();
        body.insert("model".to_string(), serde_json::json!(self.model));
        body.insert("max_tokens".to_string(), serde_json::json!(MAX_TOKENS));
        body.insert("temperature".to_string(), serde_json::json!(TEMPERATURE));
        body.insert("system".to_string(), serde_json::json!(self.system_prompt));
        body.insert(
            "messages".to_string(),
            serde_json::json!([{"role": "user", "content": idea}]),
        );

        let resp = self
            .client
            .post(format!("{}/v1/messages", self.api_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_else(|_| "<no body>".into());
            return Err(ComposerError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let reply: Value = resp.json().await?;
        let text = reply
            .get("content")
            .and_then(|c| c.as_array())
            .and_then(|blocks| {
                blocks
                    .iter()
                    .find(|b| b.get("type").and_then(|t| t.as_str()) == Some("text"))
            })
            .and_then(|b| b.get("text"))
            .and_then(|t| t.as_str())
            .ok_or_else(|| ComposerError::MalformedResponse {
                message: "reply has no text content block".to_string(),
            })?;
        Ok(text.to_string())
    }
}

#[async_trait]
impl Composer for LlmComposer {
    #[tracing::instrument(name = "composer.compose", skip(self, idea))]
    async fn compose(&self, idea: &str) -> Result<MusicDescription, ComposerError> {
        let text = self.request_text(idea).await?;
        parse_description(&text)
    }
}

/// Parse a model reply, tolerating prose around the JSON object.
pub fn parse_description(text: &str) -> Result<MusicDescription, ComposerError> {
    match serde_json::from_str(text) {
        Ok(description) => Ok(description),
        Err(first_err) => {
            let Some(span) = extract::outermost_object(text) else {
                return Err(malformed(&first_err, text));
            };
            serde_json::from_str(span).map_err(|err| malformed(&err, text))
        }
    }
}

fn malformed(err: &serde_json::Error, text: &str) -> ComposerError {
    let mut snippet: String = text.chars().take(120).collect();
    if text.chars().count() > 120 {
        snippet.push_str("...");
    }
    ComposerError::MalformedResponse {
        message: format!("{err}; reply began {snippet:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn demo_description_json() -> String {
        serde_json::json!({
            "title": "Night Drive",
            "tempo": 104,
            "instruments": [
                {
                    "program": 81,
                    "name": "Lead Synth",
                    "patterns": [
                        {
                            "type": "melody",
                            "notes": [
                                {"pitch": 69, "start": 0.0, "duration": 0.5, "velocity": 96}
                            ]
                        }
                    ]
                }
            ]
        })
        .to_string()
    }

    fn messages_reply(text: &str) -> serde_json::Value {
        serde_json::json!({
            "id": "msg_01",
            "role": "assistant",
            "content": [{"type": "text", "text": text}]
        })
    }

    #[test]
    fn test_parse_description_accepts_bare_json() {
        let description = parse_description(&demo_description_json()).unwrap();
        assert_eq!(description.title, "Night Drive");
        assert_eq!(description.tempo, 104);
        assert_eq!(description.instruments.len(), 1);
    }

    #[test]
    fn test_parse_description_strips_prose() {
        let text = format!("Sure! Here is the piece:\n\n{}\n\nHave fun.", demo_description_json());
        let description = parse_description(&text).unwrap();
        assert_eq!(description.title, "Night Drive");
    }

    #[test]
    fn test_parse_description_rejects_garbage() {
        let err = parse_description("I cannot help with that.").unwrap_err();
        assert!(matches!(err, ComposerError::MalformedResponse { .. }));
    }

    #[test]
    fn test_parse_description_rejects_broken_object() {
        let err = parse_description("{\"title\": \"X\", \"tempo\":}").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("reply began"), "got: {message}");
    }

    #[tokio::test]
    async fn test_compose_round_trip() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "test-key"))
            .and(header("anthropic-version", ANTHROPIC_VERSION))
            .and(body_partial_json(serde_json::json!({
                "model": DEFAULT_MODEL,
                "max_tokens": 4000,
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(messages_reply(&demo_description_json())),
            )
            .expect(1)
            .mount(&server)
            .await;

        let composer = LlmComposer::new(server.uri(), "test-key");
        let description = composer.compose("a synthwave track").await.unwrap();
        assert_eq!(description.title, "Night Drive");
        assert_eq!(description.instruments[0].name, "Lead Synth");
    }

    #[tokio::test]
    async fn test_compose_skips_non_text_blocks() {
        let server = MockServer::start().await;
        let reply = serde_json::json!({
            "id": "msg_02",
            "role": "assistant",
            "content": [
                {"type": "thinking", "thinking": "hmm"},
                {"type": "text", "text": demo_description_json()}
            ]
        });
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply))
            .mount(&server)
            .await;

        let composer = LlmComposer::new(server.uri(), "test-key");
        let description = composer.compose("anything").await.unwrap();
        assert_eq!(description.tempo, 104);
    }

    #[tokio::test]
    async fn test_compose_maps_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let composer = LlmComposer::new(server.uri(), "test-key");
        let err = composer.compose("anything").await.unwrap_err();
        match err {
            ComposerError::Api { status, message } => {
                assert_eq!(status, 429);
                assert_eq!(message, "rate limited");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_compose_rejects_reply_without_text() {
        let server = MockServer::start().await;
        let reply = serde_json::json!({"id": "msg_03", "role": "assistant", "content": []});
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply))
            .mount(&server)
            .await;

        let composer = LlmComposer::new(server.uri(), "test-key");
        let err = composer.compose("anything").await.unwrap_err();
        assert!(err.to_string().contains("no text content block"));
    }

    #[tokio::test]
    async fn test_soundfont_hints_reach_the_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(body_partial_json(serde_json::json!({
                "system": prompt::system_prompt_with_soundfonts(&["Violin", "Cello"]),
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(messages_reply(&demo_description_json())),
            )
            .expect(1)
            .mount(&server)
            .await;

        let composer = LlmComposer::new(server.uri(), "test-key")
            .with_soundfont_hints(&["Violin", "Cello"]);
        composer.compose("strings").await.unwrap();
    }
}
