use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::RefinementError;
use crate::pipeline_config::RefinementConfig;

/// Text-generation backend used by the LLM refiner (allows mocking).
pub trait LlmClient {
    fn generate(&self, model: &str, prompt: &str, system: &str)
        -> Result<String, RefinementError>;

    fn is_model_available(&self, model: &str) -> Result<bool, RefinementError>;

    fn list_models(&self) -> Result<Vec<String>, RefinementError>;
}

/// True when `model` names one of the served tags. A bare name matches any
/// tag of that name ("llama3" matches "llama3:8b" but not "llama3.1").
fn model_served(served: &[String], model: &str) -> bool {
    served.iter().any(|name| {
        name == model
            || name
                .strip_prefix(model)
                .is_some_and(|rest| rest.starts_with(':'))
    })
}

/// Blocking client for an Ollama server.
pub struct OllamaClient {
    base_url: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl OllamaClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, RefinementError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| RefinementError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout_secs,
        })
    }

    pub fn from_config(config: &RefinementConfig) -> Result<Self, RefinementError> {
        Self::new(&config.base_url, config.timeout_secs)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/{path}", self.base_url)
    }

    fn map_send_error(&self, e: reqwest::Error) -> RefinementError {
        if e.is_connect() {
            RefinementError::LlmConnection(self.base_url.clone())
        } else if e.is_timeout() {
            RefinementError::HttpClient(format!("Request timed out after {}s", self.timeout_secs))
        } else {
            RefinementError::HttpClient(e.to_string())
        }
    }

    /// Send a request and decode a successful JSON body.
    fn fetch<T: DeserializeOwned>(
        &self,
        request: reqwest::blocking::RequestBuilder,
    ) -> Result<T, RefinementError> {
        let response = request.send().map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RefinementError::LlmError {
                status: status.as_u16(),
                body: response.text().unwrap_or_default(),
            });
        }

        response
            .json()
            .map_err(|e| RefinementError::ResponseParsing(e.to_string()))
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
    options: SamplingOptions,
}

/// Zero temperature so reruns over the same case propose the same decisions.
#[derive(Serialize)]
struct SamplingOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Deserialize)]
struct TagsResponse {
    models: Vec<TagEntry>,
}

#[derive(Deserialize)]
struct TagEntry {
    name: String,
}

impl LlmClient for OllamaClient {
    fn generate(
        &self,
        model: &str,
        prompt: &str,
        system: &str,
    ) -> Result<String, RefinementError> {
        let body = GenerateRequest {
            model,
            prompt,
            system,
            stream: false,
            options: SamplingOptions { temperature: 0.0 },
        };
        let parsed: GenerateResponse =
            self.fetch(self.client.post(self.endpoint("generate")).json(&body))?;
        Ok(parsed.response)
    }

    fn is_model_available(&self, model: &str) -> Result<bool, RefinementError> {
        Ok(model_served(&self.list_models()?, model))
    }

    fn list_models(&self) -> Result<Vec<String>, RefinementError> {
        let parsed: TagsResponse = self.fetch(self.client.get(self.endpoint("tags")))?;
        Ok(parsed.models.into_iter().map(|m| m.name).collect())
    }
}

/// Canned reply for tests and offline runs.
pub struct MockLlmClient {
    response: String,
    available_models: Vec<String>,
}

impl MockLlmClient {
    pub fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
            available_models: vec!["llama3:latest".to_string()],
        }
    }

    pub fn with_models(mut self, models: Vec<String>) -> Self {
        self.available_models = models;
        self
    }
}

impl LlmClient for MockLlmClient {
    fn generate(
        &self,
        _model: &str,
        _prompt: &str,
        _system: &str,
    ) -> Result<String, RefinementError> {
        Ok(self.response.clone())
    }

    fn is_model_available(&self, model: &str) -> Result<bool, RefinementError> {
        Ok(model_served(&self.available_models, model))
    }

    fn list_models(&self) -> Result<Vec<String>, RefinementError> {
        Ok(self.available_models.clone())
    }
}

/// Behaves like an unreachable server.
pub struct FailingLlmClient;

impl FailingLlmClient {
    fn unreachable() -> RefinementError {
        RefinementError::LlmConnection("http://localhost:11434".into())
    }
}

impl LlmClient for FailingLlmClient {
    fn generate(
        &self,
        _model: &str,
        _prompt: &str,
        _system: &str,
    ) -> Result<String, RefinementError> {
        Err(Self::unreachable())
    }

    fn is_model_available(&self, _model: &str) -> Result<bool, RefinementError> {
        Err(Self::unreachable())
    }

    fn list_models(&self) -> Result<Vec<String>, RefinementError> {
        Err(Self::unreachable())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_model_name_matches_any_tag() {
        let served = tags(&["llama3:8b", "mistral:7b"]);
        assert!(model_served(&served, "llama3"));
        assert!(model_served(&served, "mistral:7b"));
        assert!(!model_served(&served, "mistral:latest"));
    }

    #[test]
    fn model_prefix_is_not_a_match() {
        let served = tags(&["llama3.1:latest"]);
        assert!(!model_served(&served, "llama3"));
    }

    #[test]
    fn mock_client_returns_configured_response() {
        let client = MockLlmClient::new("test response");
        assert_eq!(client.generate("model", "prompt", "system").unwrap(), "test response");
    }

    #[test]
    fn mock_client_reports_served_models() {
        let client = MockLlmClient::new("").with_models(tags(&["llama3:latest", "mistral:7b"]));
        assert_eq!(client.list_models().unwrap().len(), 2);
        assert!(client.is_model_available("mistral").unwrap());
        assert!(!client.is_model_available("phi3").unwrap());
    }

    #[test]
    fn failing_client_reports_connection_error() {
        assert!(matches!(
            FailingLlmClient.generate("m", "p", "s"),
            Err(RefinementError::LlmConnection(_))
        ));
        assert!(FailingLlmClient.is_model_available("llama3").is_err());
    }

    #[test]
    fn client_from_config_trims_trailing_slash() {
        let config = RefinementConfig {
            base_url: "http://gpu-box:11434/".into(),
            timeout_secs: 45,
            ..RefinementConfig::default()
        };
        let client = OllamaClient::from_config(&config).unwrap();
        assert_eq!(client.base_url, "http://gpu-box:11434");
        assert_eq!(client.timeout_secs, 45);
        assert_eq!(client.endpoint("tags"), "http://gpu-box:11434/api/tags");
    }

    #[test]
    fn generate_request_is_deterministic_and_unstreamed() {
        let body = GenerateRequest {
            model: "llama3",
            prompt: "p",
            system: "s",
            stream: false,
            options: SamplingOptions { temperature: 0.0 },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["stream"], false);
        assert_eq!(json["options"]["temperature"], 0.0);
    }
}
