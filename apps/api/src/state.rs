use std::sync::Arc;

use crate::analysis::pipeline::AnalysisSettings;
use crate::config::Config;
use crate::llm_client::TextGenerator;

/// Shared application state injected into all route handlers via Axum extractors.
/// Holds no per-request data; every request is handled independently.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Pluggable text generator. Default: GeminiClient.
    pub generator: Arc<dyn TextGenerator>,
    pub analysis: AnalysisSettings,
}

#[cfg(test)]
pub(crate) mod tests {
    use std::time::Duration;

    use super::*;

    pub(crate) fn test_config() -> Config {
        Config {
            gemini_api_key: Some("test-key".to_string()),
            gemini_model: "gemini-test".to_string(),
            llm_timeout: Duration::from_secs(5),
            recover_embedded_json: false,
            frontend_origin: "http://localhost:3000".to_string(),
            max_upload_bytes: 1024 * 1024,
            port: 0,
            rust_log: "debug".to_string(),
        }
    }

    pub(crate) fn test_state(
        generator: Arc<dyn TextGenerator>,
        analysis: AnalysisSettings,
    ) -> AppState {
        AppState {
            config: test_config(),
            generator,
            analysis,
        }
    }
}
