//! Axum route handlers for the Analysis API.

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use tracing::{error, info};

use crate::analysis::models::AnalysisResult;
use crate::analysis::pipeline::analyze_resume_text;
use crate::errors::AppError;
use crate::extract::{extract_text, DocumentKind};
use crate::state::AppState;

const RESUME_FIELD: &str = "resume";
const JOB_DESC_FIELD: &str = "job_desc";

/// The two fields of an analysis upload.
#[derive(Debug)]
struct AnalyzeForm {
    filename: String,
    resume: Bytes,
    job_desc: String,
}

/// POST /analyze, POST /api/analyze
///
/// Multipart form: `resume` (PDF/DOCX file) and `job_desc` (text).
/// Rejects unsupported extensions with 400 before reading the document. Every later
/// failure is reported inside a normally shaped `AnalysisResult`.
pub async fn handle_analyze(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<AnalysisResult>), AppError> {
    let form = read_analyze_form(multipart).await?;
    let kind = DocumentKind::from_filename(&form.filename)
        .map_err(|e| AppError::Validation(e.to_string()))?;

    info!(
        filename = %form.filename,
        ?kind,
        size = form.resume.len(),
        "Analyzing resume"
    );

    let AnalyzeForm {
        filename,
        resume,
        job_desc,
    } = form;

    // Document parsing is CPU-bound; keep it off the async workers.
    let extracted = tokio::task::spawn_blocking(move || extract_text(&resume, &filename))
        .await
        .map_err(|e| AppError::Internal(e.into()))?;

    let resume_text = match extracted {
        Ok(text) => text,
        Err(e) => {
            error!("Text extraction failed: {e}");
            return Ok((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(AnalysisResult::failed(format!("Server error: {e}"))),
            ));
        }
    };

    let result = analyze_resume_text(
        &resume_text,
        &job_desc,
        state.generator.as_ref(),
        &state.analysis,
    )
    .await;

    Ok((StatusCode::OK, Json(result)))
}

async fn read_analyze_form(mut multipart: Multipart) -> Result<AnalyzeForm, AppError> {
    let mut resume: Option<(String, Bytes)> = None;
    let mut job_desc: Option<String> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            RESUME_FIELD => {
                let filename = field.file_name().unwrap_or_default().to_string();
                resume = Some((filename, field.bytes().await?));
            }
            JOB_DESC_FIELD => job_desc = Some(field.text().await?),
            _ => {}
        }
    }

    let (filename, resume) = resume
        .ok_or_else(|| AppError::Validation(format!("'{RESUME_FIELD}' file is required")))?;
    let job_desc = job_desc
        .ok_or_else(|| AppError::Validation(format!("'{JOB_DESC_FIELD}' field is required")))?;

    Ok(AnalyzeForm {
        filename,
        resume,
        job_desc,
    })
}
