// Prompt template for resume analysis.
// Placeholders are substituted verbatim; nothing is escaped or truncated.

pub const ANALYSIS_PROMPT_TEMPLATE: &str = r#"
You are an AI resume analyzer. Compare the following resume to the job description and return ONLY valid JSON.
Do NOT include any explanations or formatting like ```json.
JSON format:
{
  "score": int,
  "matching_skills": [string],
  "missing_skills": [string],
  "missing_qualifications": [string],
  "suggestions": [string]
}

Resume:
{resume_text}

Job Description:
{job_description}
"#;

/// Fills the analysis template with the extracted resume and the job description.
pub fn build_analysis_prompt(resume_text: &str, job_description: &str) -> String {
    // Job description goes in first so placeholder-looking text inside the resume
    // is never substituted.
    let (head, tail) = ANALYSIS_PROMPT_TEMPLATE
        .split_once("{resume_text}")
        .unwrap_or((ANALYSIS_PROMPT_TEMPLATE, ""));
    let tail = tail.replace("{job_description}", job_description);
    format!("{head}{resume_text}{tail}")
}
