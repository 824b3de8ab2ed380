//! Analysis pipeline: extracted resume text + job description → `AnalysisResult`.
//!
//! Like the normalizer, this never fails: an empty resume, an upstream error or a
//! timeout all come back as a result with `error` set.

use std::time::Duration;

use tracing::{error, info};

use crate::analysis::models::AnalysisResult;
use crate::analysis::normalizer::{normalize, normalize_with_recovery};
use crate::analysis::prompts::build_analysis_prompt;
use crate::config::Config;
use crate::llm_client::{LlmError, TextGenerator};

pub const EMPTY_EXTRACTION_MESSAGE: &str = "Could not extract text from resume.";
pub const UPSTREAM_FAILURE_PREFIX: &str = "Error calling Gemini API";

/// Per-request knobs for the pipeline, derived from `Config` once at startup.
#[derive(Debug, Clone)]
pub struct AnalysisSettings {
    pub llm_timeout: Duration,
    /// Fall back to the first embedded `{...}` block when the reply is not clean JSON.
    pub recover_embedded_json: bool,
}

impl AnalysisSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            llm_timeout: config.llm_timeout,
            recover_embedded_json: config.recover_embedded_json,
        }
    }
}

/// Runs one analysis. Makes at most one upstream call, and none for an empty resume.
pub async fn analyze_resume_text(
    resume_text: &str,
    job_description: &str,
    generator: &dyn TextGenerator,
    settings: &AnalysisSettings,
) -> AnalysisResult {
    if resume_text.trim().is_empty() {
        info!("Resume produced no text; skipping LLM call");
        return AnalysisResult::failed(EMPTY_EXTRACTION_MESSAGE);
    }

    let prompt = build_analysis_prompt(resume_text, job_description);

    let reply = match tokio::time::timeout(settings.llm_timeout, generator.generate(&prompt)).await
    {
        Ok(Ok(reply)) => reply,
        Ok(Err(e)) => return upstream_failure(e),
        Err(_) => return upstream_failure(LlmError::Timeout(settings.llm_timeout.as_secs())),
    };

    if settings.recover_embedded_json {
        normalize_with_recovery(&reply)
    } else {
        normalize(&reply)
    }
}

fn upstream_failure(err: LlmError) -> AnalysisResult {
    error!("LLM call failed: {err}");
    AnalysisResult::failed(format!("{UPSTREAM_FAILURE_PREFIX}: {err}"))
}
