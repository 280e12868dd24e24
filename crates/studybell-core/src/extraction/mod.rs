//! Timetable extraction from a photo, via the Gemini `generateContent` API.
//!
//! The service is asked for a JSON array of
//! `{subject, day, startTime, endTime}` objects. Replies are trimmed to the
//! outermost `[...]`, parsed, and missing fields filled with defaults.

mod prompt;

use std::future::Future;
use std::time::Duration;

use base64::Engine as _;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tracing::{debug, warn};

pub use prompt::build_prompt;

use crate::error::ExtractionError;
use crate::schedule::{NewScheduleEntry, Weekday};
use crate::storage::ExtractionConfig;

pub const DEFAULT_SUBJECT: &str = "Môn không tên";
pub const DEFAULT_START: &str = "07:00";
pub const DEFAULT_END: &str = "07:45";
pub const DEFAULT_MIME: &str = "image/jpeg";

/// Turns a timetable image into schedule entries.
pub trait ScheduleExtractor {
    fn extract(
        &self,
        image: &[u8],
        mime_type: &str,
        instruction: &str,
    ) -> impl Future<Output = Result<Vec<NewScheduleEntry>, ExtractionError>> + Send;
}

/// Client for Gemini image extraction.
pub struct GeminiExtractor {
    http_client: Client,
    endpoint: String,
    model: String,
    api_key: String,
    max_attempts: u32,
    retry_delay: Duration,
    temperature: f64,
}

impl GeminiExtractor {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_config(api_key, &ExtractionConfig::default())
    }

    /// Build from config; the key comes from `GEMINI_API_KEY` or the config.
    ///
    /// # Errors
    /// Returns [`ExtractionError::MissingApiKey`] if neither is set.
    pub fn from_config(config: &ExtractionConfig) -> Result<Self, ExtractionError> {
        let key = config.resolved_api_key().ok_or(ExtractionError::MissingApiKey)?;
        Ok(Self::with_config(key, config))
    }

    fn with_config(api_key: impl Into<String>, config: &ExtractionConfig) -> Self {
        Self {
            http_client: Client::new(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: api_key.into(),
            max_attempts: config.max_attempts.max(1),
            retry_delay: Duration::from_millis(config.retry_delay_ms),
            temperature: config.temperature,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }

    fn request_body(&self, image: &[u8], mime_type: &str, instruction: &str) -> Value {
        let mime = if mime_type.trim().is_empty() {
            DEFAULT_MIME
        } else {
            mime_type
        };
        json!({
            "contents": [{
                "parts": [
                    { "inlineData": {
                        "mimeType": mime,
                        "data": base64::engine::general_purpose::STANDARD.encode(image),
                    }},
                    { "text": build_prompt(instruction) },
                ]
            }],
            "generationConfig": { "temperature": self.temperature },
        })
    }

    async fn attempt(&self, body: &Value) -> Result<Vec<NewScheduleEntry>, ExtractionError> {
        let resp = self
            .http_client
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ExtractionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let reply: Value = resp.json().await?;
        let text = response_text(&reply).ok_or(ExtractionError::InvalidResponse)?;
        parse_entries(&text)
    }

    /// Send the image, retrying failed attempts.
    ///
    /// Rate-limit and overload answers (429, 503) wait the retry delay
    /// first. Other client errors (4xx) are returned without retrying.
    ///
    /// # Errors
    /// Returns [`ExtractionError::Unrecognized`] once all attempts fail.
    pub async fn extract(
        &self,
        image: &[u8],
        mime_type: &str,
        instruction: &str,
    ) -> Result<Vec<NewScheduleEntry>, ExtractionError> {
        let body = self.request_body(image, mime_type, instruction);
        for attempt in 1..=self.max_attempts {
            match self.attempt(&body).await {
                Ok(entries) => {
                    debug!(attempt, count = entries.len(), "schedule extracted");
                    return Ok(entries);
                }
                Err(ExtractionError::Status { status, body })
                    if is_fatal(status) =>
                {
                    return Err(ExtractionError::Status { status, body });
                }
                Err(e) => {
                    warn!(attempt, error = %e, "extraction attempt failed");
                    if is_throttled(&e) && attempt < self.max_attempts {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
            }
        }
        Err(ExtractionError::Unrecognized {
            attempts: self.max_attempts,
        })
    }
}

impl ScheduleExtractor for GeminiExtractor {
    async fn extract(
        &self,
        image: &[u8],
        mime_type: &str,
        instruction: &str,
    ) -> Result<Vec<NewScheduleEntry>, ExtractionError> {
        GeminiExtractor::extract(self, image, mime_type, instruction).await
    }
}

fn is_throttled(err: &ExtractionError) -> bool {
    matches!(
        err,
        ExtractionError::Status { status, .. }
            if *status == StatusCode::TOO_MANY_REQUESTS.as_u16()
                || *status == StatusCode::SERVICE_UNAVAILABLE.as_u16()
    )
}

fn is_fatal(status: u16) -> bool {
    (400..500).contains(&status) && status != StatusCode::TOO_MANY_REQUESTS.as_u16()
}

/// Concatenated text parts of the first candidate.
fn response_text(reply: &Value) -> Option<String> {
    let parts = reply
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .as_array()?;
    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(Value::as_str))
        .collect();
    (!text.trim().is_empty()).then_some(text)
}

/// The span from the first `[` to the last `]`, or the text with markdown
/// code fences removed when there is no such span.
pub fn clean_response(text: &str) -> String {
    let text = text.trim();
    match (text.find('['), text.rfind(']')) {
        (Some(first), Some(last)) if first < last => text[first..=last].to_string(),
        _ => text.replace("```json", "").replace("```", "").trim().to_string(),
    }
}

/// Parse a reply into entries, filling blanks with defaults.
///
/// Items whose day is present but unrecognized are dropped.
///
/// # Errors
/// Returns [`ExtractionError::InvalidResponse`] unless at least one entry
/// survives.
pub fn parse_entries(text: &str) -> Result<Vec<NewScheduleEntry>, ExtractionError> {
    let cleaned = clean_response(text);
    let parsed: Value = serde_json::from_str(&cleaned).map_err(|e| {
        debug!(error = %e, raw = text, "reply is not JSON");
        ExtractionError::InvalidResponse
    })?;
    let items = parsed.as_array().ok_or(ExtractionError::InvalidResponse)?;

    let entries: Vec<NewScheduleEntry> = items.iter().filter_map(entry_from_item).collect();
    if entries.is_empty() {
        return Err(ExtractionError::InvalidResponse);
    }
    Ok(entries)
}

fn entry_from_item(item: &Value) -> Option<NewScheduleEntry> {
    let field = |name: &str, default: &str| {
        item.get(name)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(default)
            .to_string()
    };
    if !item.is_object() {
        return None;
    }
    let day = match item.get("day").and_then(Value::as_str).map(str::trim) {
        None | Some("") => Weekday::Monday,
        Some(label) => match label.parse::<Weekday>() {
            Ok(day) => day,
            Err(e) => {
                warn!(error = %e, "dropping extracted entry");
                return None;
            }
        },
    };
    Some(NewScheduleEntry {
        subject: field("subject", DEFAULT_SUBJECT),
        day,
        start_time: field("startTime", DEFAULT_START),
        end_time: field("endTime", DEFAULT_END),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gemini_reply(text: &str) -> String {
        json!({
            "candidates": [{ "content": { "parts": [{ "text": text }] } }]
        })
        .to_string()
    }

    fn extractor(server: &mockito::Server) -> GeminiExtractor {
        GeminiExtractor::new("test-key")
            .with_endpoint(server.url())
            .with_retry_delay(Duration::from_millis(1))
    }

    const PATH: &str = "/models/gemini-1.5-pro-latest:generateContent";

    #[test]
    fn clean_response_trims_to_brackets() {
        assert_eq!(clean_response("Here:\n[1, 2]\nthanks"), "[1, 2]");
        assert_eq!(clean_response("```json\n{\"a\":1}\n```"), "{\"a\":1}");
    }

    #[test]
    fn parse_fills_defaults() {
        let entries = parse_entries(r#"[{"subject": "Toán"}, {"day": "Thứ 3", "startTime": "08:45"}]"#).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].subject, "Toán");
        assert_eq!(entries[0].day, Weekday::Monday);
        assert_eq!(entries[0].start_time, "07:00");
        assert_eq!(entries[0].end_time, "07:45");
        assert_eq!(entries[1].subject, DEFAULT_SUBJECT);
        assert_eq!(entries[1].day, Weekday::Tuesday);
        assert_eq!(entries[1].start_time, "08:45");
    }

    #[test]
    fn parse_rejects_empty_and_non_arrays() {
        assert!(parse_entries("[]").is_err());
        assert!(parse_entries("{\"subject\":\"x\"}").is_err());
        assert!(parse_entries("no json here").is_err());
        assert!(parse_entries(r#"[{"day": "Someday"}]"#).is_err());
    }

    #[test]
    fn prompt_mentions_instruction() {
        assert!(build_prompt("10A1").contains("\"10A1\""));
    }

    #[tokio::test]
    async fn extracts_from_markdown_wrapped_reply() {
        let mut server = mockito::Server::new_async().await;
        let reply = gemini_reply(
            "```json\n[{\"subject\":\"Toán\",\"day\":\"Thứ 2\",\"startTime\":\"07:00\",\"endTime\":\"07:45\"}]\n```",
        );
        let mock = server
            .mock("POST", PATH)
            .match_header("x-goog-api-key", "test-key")
            .match_body(mockito::Matcher::PartialJson(json!({
                "generationConfig": { "temperature": 0.2 }
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(reply)
            .expect(1)
            .create_async()
            .await;

        let entries = extractor(&server).extract(b"img", "image/png", "10A1").await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].subject, "Toán");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn retries_after_overload_then_succeeds() {
        let mut server = mockito::Server::new_async().await;
        let busy = server
            .mock("POST", PATH)
            .with_status(503)
            .expect(1)
            .create_async()
            .await;
        let ok = server
            .mock("POST", PATH)
            .with_status(200)
            .with_body(gemini_reply("[{\"subject\":\"Lý\"}]"))
            .expect(1)
            .create_async()
            .await;

        let entries = extractor(&server).extract(b"img", "", "").await.unwrap();
        assert_eq!(entries[0].subject, "Lý");
        busy.assert_async().await;
        ok.assert_async().await;
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", PATH)
            .with_status(200)
            .with_body(gemini_reply("I could not read this image."))
            .expect(3)
            .create_async()
            .await;

        let err = extractor(&server).extract(b"img", "", "").await.unwrap_err();
        assert!(matches!(err, ExtractionError::Unrecognized { attempts: 3 }));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn auth_failure_is_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", PATH)
            .with_status(403)
            .with_body("forbidden")
            .expect(1)
            .create_async()
            .await;

        let err = extractor(&server).extract(b"img", "", "").await.unwrap_err();
        assert!(matches!(err, ExtractionError::Status { status: 403, .. }));
        mock.assert_async().await;
    }

    #[test]
    fn from_config_requires_key() {
        let cfg = ExtractionConfig {
            api_key: Some("cfg-key".into()),
            ..ExtractionConfig::default()
        };
        if std::env::var(crate::storage::API_KEY_ENV).is_err() {
            assert_eq!(GeminiExtractor::from_config(&cfg).unwrap().api_key, "cfg-key");
            assert!(matches!(
                GeminiExtractor::from_config(&ExtractionConfig::default()),
                Err(ExtractionError::MissingApiKey)
            ));
        }
    }
}
