//! Multipart resume upload: a PDF `resume` part plus the recommend form fields.

use axum::extract::Multipart;
use tracing::{debug, info};

use crate::errors::AppError;
use crate::jobs::handlers::RecommendRequest;

const RESUME_FIELD: &str = "resume";

/// Reads the upload form into a recommend request.
///
/// Text extracted from the PDF replaces any `resume_text` form field.
/// `tech_skills` is a comma-separated list.
pub async fn read_upload(mut multipart: Multipart) -> Result<RecommendRequest, AppError> {
    let mut request = RecommendRequest::default();
    let mut pdf: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if name == RESUME_FIELD {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(format!("Could not read resume file: {e}")))?;
            pdf = Some(bytes.to_vec());
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| AppError::Validation(format!("Could not read field '{name}': {e}")))?;
        apply_form_field(&mut request, &name, value)?;
    }

    match pdf {
        Some(bytes) => {
            // pdf parsing is CPU-bound and may panic on hostile input
            let text = tokio::task::spawn_blocking(move || extract_resume_text(&bytes))
                .await
                .map_err(|e| AppError::UnprocessableEntity(format!("Could not read resume PDF: {e}")))??;
            request.profile.resume_text = Some(text);
        }
        None => return Err(AppError::Validation("resume file is required".to_string())),
    }

    Ok(request)
}

fn apply_form_field(request: &mut RecommendRequest, name: &str, value: String) -> Result<(), AppError> {
    let trimmed = value.trim();
    match name {
        "query" => request.query = value,
        "page" => request.page.page = parse_number(name, trimmed)?,
        "page_size" => request.page.page_size = parse_number(name, trimmed)?,
        "resume_text" => request.profile.resume_text = non_empty(trimmed),
        "user_name" => request.profile.user_name = non_empty(trimmed),
        "user_age" if trimmed.is_empty() => request.profile.user_age = None,
        "user_age" => request.profile.user_age = Some(parse_number(name, trimmed)?),
        "tech_skills" => {
            let skills: Vec<String> = trimmed
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            request.profile.tech_skills = (!skills.is_empty()).then_some(skills);
        }
        "experience" => request.profile.experience = non_empty(trimmed),
        other => debug!("Ignoring unknown upload field '{other}'"),
    }
    Ok(())
}

fn parse_number<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T, AppError> {
    raw.parse()
        .map_err(|_| AppError::Validation(format!("{name} must be a number, got '{raw}'")))
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

/// Extracts plain text from PDF bytes. Unreadable or text-less files are 422.
pub fn extract_resume_text(bytes: &[u8]) -> Result<String, AppError> {
    let text = pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| AppError::UnprocessableEntity(format!("Could not read resume PDF: {e}")))?;

    let text = text.trim();
    if text.is_empty() {
        return Err(AppError::UnprocessableEntity(
            "Resume PDF contains no extractable text".to_string(),
        ));
    }

    info!("Extracted {} chars of resume text", text.chars().count());
    Ok(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(fields: &[(&str, &str)]) -> Result<RecommendRequest, AppError> {
        let mut request = RecommendRequest::default();
        for (name, value) in fields {
            apply_form_field(&mut request, name, value.to_string())?;
        }
        Ok(request)
    }

    #[test]
    fn test_form_fields_fill_request() {
        let request = apply(&[
            ("query", "rust developer"),
            ("page", "2"),
            ("page_size", "6"),
            ("user_name", " Asha "),
            ("user_age", "24"),
            ("tech_skills", "rust, go, ,sql"),
            ("experience", "2 years backend"),
        ])
        .unwrap();

        assert_eq!(request.query, "rust developer");
        assert_eq!(request.page.page, 2);
        assert_eq!(request.page.page_size, 6);
        assert_eq!(request.profile.user_name.as_deref(), Some("Asha"));
        assert_eq!(request.profile.user_age, Some(24));
        assert_eq!(
            request.profile.tech_skills,
            Some(vec!["rust".to_string(), "go".to_string(), "sql".to_string()])
        );
        assert_eq!(request.profile.experience.as_deref(), Some("2 years backend"));
    }

    #[test]
    fn test_blank_fields_stay_unset() {
        let request = apply(&[("user_age", ""), ("tech_skills", " , "), ("user_name", "  ")]).unwrap();
        assert!(request.profile.user_age.is_none());
        assert!(request.profile.tech_skills.is_none());
        assert!(request.profile.user_name.is_none());
    }

    #[test]
    fn test_non_numeric_age_is_rejected() {
        let err = apply(&[("user_age", "twenty")]).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        assert!(apply(&[("favourite_colour", "blue")]).is_ok());
    }

    #[test]
    fn test_garbage_pdf_is_unprocessable() {
        let err = extract_resume_text(b"definitely not a pdf").unwrap_err();
        assert!(matches!(err, AppError::UnprocessableEntity(_)));
    }
}
