// Gemini text generation client for episode descriptions
// API Documentation: https://ai.google.dev/api/generate-content

use anyhow::{anyhow, bail, Result};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);
const MAX_ATTEMPTS: u32 = 5;
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Gemini API client
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
}

// === API Response Types ===

#[derive(Debug, Default, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    pub content: Option<Content>,
}

#[derive(Debug, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
pub struct Part {
    pub text: Option<String>,
}

impl GenerateContentResponse {
    /// Trimmed text of the first part of the first candidate, if non-empty
    pub fn first_text(&self) -> Option<String> {
        let text = self
            .candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .first()?
            .text
            .as_deref()?
            .trim();

        (!text.is_empty()).then(|| text.to_string())
    }
}

impl GeminiClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_else(|_| Client::new()),
            api_key,
            model,
        }
    }

    fn endpoint_url(&self) -> String {
        format!(
            "{}/{}:generateContent?key={}",
            GEMINI_API_BASE,
            urlencoding::encode(&self.model),
            urlencoding::encode(&self.api_key)
        )
    }

    /// Generate a short catalog description, retrying with exponential backoff.
    ///
    /// Rate limiting (429), HTTP and transport errors, and empty answers all
    /// count as failed attempts.
    pub async fn generate_description(
        &self,
        series: &str,
        season: &str,
        number: usize,
        filename: &str,
    ) -> Result<String> {
        let prompt = build_prompt(series, season, number, filename);
        let payload = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let mut delay = INITIAL_BACKOFF;
        for attempt in 1..=MAX_ATTEMPTS {
            tracing::debug!(
                "Gemini attempt {}/{} for {} / {} / {}",
                attempt,
                MAX_ATTEMPTS,
                series,
                season,
                number
            );

            match self.request_once(&payload).await {
                Ok(Some(text)) => return Ok(text),
                Ok(None) => tracing::debug!("Gemini returned an empty answer"),
                Err(e) => tracing::warn!("Gemini request failed: {:#}", e),
            }

            if attempt < MAX_ATTEMPTS {
                tracing::debug!("Retrying Gemini in {:?}", delay);
                tokio::time::sleep(delay).await;
                delay = next_backoff(delay);
            }
        }

        bail!("No description from Gemini after {} attempts", MAX_ATTEMPTS)
    }

    async fn request_once(&self, payload: &serde_json::Value) -> Result<Option<String>> {
        let response = self
            .client
            .post(self.endpoint_url())
            .json(payload)
            .send()
            .await
            // Errors carry the URL, which holds the API key
            .map_err(|e| anyhow!("Failed to reach Gemini: {}", e.without_url()))?;

        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            return Err(anyhow!("rate limited (429)"));
        }

        let body: GenerateContentResponse = response
            .error_for_status()
            .map_err(|e| anyhow!("HTTP error: {}", e.without_url()))?
            .json()
            .await
            .map_err(|e| anyhow!("Failed to parse Gemini response: {}", e.without_url()))?;

        Ok(body.first_text())
    }
}

/// Doubling delay, capped at [`MAX_BACKOFF`]
fn next_backoff(current: Duration) -> Duration {
    (current * 2).min(MAX_BACKOFF)
}

/// Filename without its last extension
pub fn title_from_filename(filename: &str) -> &str {
    filename
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(filename)
}

pub fn build_prompt(series: &str, season: &str, number: usize, filename: &str) -> String {
    format!(
        r#"Gere uma descrição curta (até 2 frases) para um episódio:

Série: {series}
Temporada: {season}
Episódio: {number}
Título: "{title}"

Regras:
- Responda em português.
- Estilo de catálogo Netflix.
- No máximo 2 frases.
"#,
        title = title_from_filename(filename)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_text_extraction() {
        let json = r#"{
            "candidates": [
                {"content": {"parts": [{"text": "  Uma descrição.  \n"}, {"text": "ignored"}]}},
                {"content": {"parts": [{"text": "second"}]}}
            ]
        }"#;
        let resp: GenerateContentResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.first_text().as_deref(), Some("Uma descrição."));
    }

    #[test]
    fn test_first_text_missing_or_blank() {
        for json in [
            r#"{}"#,
            r#"{"candidates": []}"#,
            r#"{"candidates": [{}]}"#,
            r#"{"candidates": [{"content": {"parts": []}}]}"#,
            r#"{"candidates": [{"content": {"parts": [{"text": "   "}]}}]}"#,
        ] {
            let resp: GenerateContentResponse = serde_json::from_str(json).unwrap();
            assert!(resp.first_text().is_none(), "{}", json);
        }
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let mut delay = INITIAL_BACKOFF;
        let mut schedule = Vec::new();
        for _ in 0..7 {
            schedule.push(delay.as_secs());
            delay = next_backoff(delay);
        }
        assert_eq!(schedule, vec![1, 2, 4, 8, 16, 30, 30]);
    }

    #[test]
    fn test_prompt_contents() {
        let prompt = build_prompt("Dark", "Temporada 01", 3, "S01E03 - Passado.mkv");
        assert!(prompt.contains("Série: Dark"));
        assert!(prompt.contains("Temporada: Temporada 01"));
        assert!(prompt.contains("Episódio: 3"));
        assert!(prompt.contains("Título: \"S01E03 - Passado\""));
    }

    #[test]
    fn test_title_from_filename() {
        assert_eq!(title_from_filename("a.b.mkv"), "a.b");
        assert_eq!(title_from_filename("noext"), "noext");
    }

    #[test]
    fn test_endpoint_url() {
        let client = GeminiClient::new("k y".to_string(), "gemini-1.5-flash".to_string());
        assert_eq!(
            client.endpoint_url(),
            format!("{}/gemini-1.5-flash:generateContent?key=k%20y", GEMINI_API_BASE)
        );
    }
}
