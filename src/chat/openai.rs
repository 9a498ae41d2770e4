//! Minimal OpenAI chat-completions client for the ask panel.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct Client {
    api_key: String,
    base_url: String,
}

/// A completed answer plus the token count reported by the API.
#[derive(Debug, Clone)]
pub struct Answer {
    pub content: String,
    pub total_tokens: u64,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<RequestMessage<'a>>,
}

#[derive(Serialize)]
struct RequestMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    total_tokens: u64,
}

impl Client {
    pub fn new<S: Into<String>>(api_key: S) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn from_env() -> Option<Self> {
        match env::var("OPENAI_API_KEY") {
            Ok(key) if !key.trim().is_empty() => Some(Self::new(key)),
            _ => None,
        }
    }

    /// Ask one question about a JSON data sample. One user message, no
    /// conversation history; the dashboard chat is a pass-through.
    pub async fn ask(&self, model: &str, question: &str, data_sample: &str) -> Result<Answer> {
        let prompt = format!("Given this data:\n{data_sample}\nAnswer this question: {question}");
        let request = ChatRequest {
            model,
            messages: vec![RequestMessage { role: "user", content: prompt }],
        };

        let http = reqwest::Client::builder()
            .user_agent("filedeck/0.1")
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        let response: ChatResponse = http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .context("API response contained no answer")?;

        Ok(Answer {
            content,
            total_tokens: response.usage.map(|u| u.total_tokens).unwrap_or(0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_to_expected_shape() {
        let request = ChatRequest {
            model: "gpt-3.5-turbo",
            messages: vec![RequestMessage { role: "user", content: "hi".into() }],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "gpt-3.5-turbo");
        assert_eq!(json["messages"][0]["role"], "user");
    }

    #[test]
    fn response_parses_without_usage() {
        let body = r#"{"choices":[{"message":{"content":"42"}}]}"#;
        let response: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.choices[0].message.content.as_deref(), Some("42"));
        assert!(response.usage.is_none());
    }
}
