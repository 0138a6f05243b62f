//! Input validation for the administrative write paths.
//!
//! Validators collect every violation into a list instead of failing on the
//! first one, so a caller can fix all problems in one round trip. Each
//! validator returns the sanitized input on success.

use serde::Deserialize;
use url::Url;

use crate::db::entities::pdf::PdfCategory;

/// Maximum accepted PDF file size (100 MiB).
pub const MAX_FILE_SIZE: i64 = 100 * 1024 * 1024;

/// Sanitize string input: trim, strip angle brackets, cap the length.
pub fn sanitize_string(input: &str) -> String {
    let trimmed: String = input.trim().chars().filter(|c| *c != '<' && *c != '>').collect();
    trimmed.chars().take(1000).collect()
}

pub fn is_valid_url(url: &str) -> bool {
    Url::parse(url).is_ok()
}

fn check_text(
    errors: &mut Vec<String>,
    value: Option<&String>,
    field: &str,
    min: usize,
    max: usize,
) -> bool {
    match value {
        None => {
            errors.push(format!("{} is required", field));
            false
        }
        Some(v) if v.trim().chars().count() < min => {
            errors.push(format!("{} must be at least {} characters", field, min));
            false
        }
        Some(v) if v.chars().count() > max => {
            errors.push(format!("{} must be less than {} characters", field, max));
            false
        }
        Some(_) => true,
    }
}

// University

#[derive(Debug, Deserialize)]
pub struct UniversityPayload {
    pub name: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub logo: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
pub struct UniversityInput {
    pub name: String,
    pub description: String,
    pub location: String,
    pub logo: Option<String>,
}

pub fn validate_university(data: &UniversityPayload) -> Result<UniversityInput, Vec<String>> {
    let mut errors = Vec::new();

    check_text(&mut errors, data.name.as_ref(), "University name", 2, 200);
    check_text(&mut errors, data.description.as_ref(), "Description", 10, 1000);
    check_text(&mut errors, data.location.as_ref(), "Location", 2, 200);

    let logo = data.logo.as_deref().map(str::trim).filter(|l| !l.is_empty());
    if let Some(logo) = logo {
        if !is_valid_url(logo) {
            errors.push("Logo must be a valid URL".to_string());
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(UniversityInput {
        name: sanitize_string(data.name.as_deref().unwrap_or_default()),
        description: sanitize_string(data.description.as_deref().unwrap_or_default()),
        location: sanitize_string(data.location.as_deref().unwrap_or_default()),
        logo: logo.map(str::to_string),
    })
}

// Course

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoursePayload {
    pub university_id: Option<i32>,
    pub name: Option<String>,
    pub code: Option<String>,
    pub description: Option<String>,
    pub duration: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
pub struct CourseInput {
    pub university_id: i32,
    pub name: String,
    pub code: String,
    pub description: String,
    pub duration: String,
}

pub fn validate_course(data: &CoursePayload) -> Result<CourseInput, Vec<String>> {
    let mut errors = Vec::new();

    match data.university_id {
        None => errors.push("University ID is required".to_string()),
        Some(id) if id < 1 => errors.push("Invalid university ID format".to_string()),
        Some(_) => {}
    }
    check_text(&mut errors, data.name.as_ref(), "Course name", 2, 200);
    check_text(&mut errors, data.code.as_ref(), "Course code", 2, 50);
    check_text(&mut errors, data.description.as_ref(), "Description", 10, 1000);
    check_text(&mut errors, data.duration.as_ref(), "Duration", 2, 50);

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(CourseInput {
        university_id: data.university_id.unwrap_or_default(),
        name: sanitize_string(data.name.as_deref().unwrap_or_default()),
        code: sanitize_string(data.code.as_deref().unwrap_or_default()).to_uppercase(),
        description: sanitize_string(data.description.as_deref().unwrap_or_default()),
        duration: sanitize_string(data.duration.as_deref().unwrap_or_default()),
    })
}

// Subject

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectPayload {
    pub semester_id: Option<i32>,
    pub course_id: Option<i32>,
    pub name: Option<String>,
    pub code: Option<String>,
    pub credits: Option<i32>,
    pub description: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
pub struct SubjectInput {
    pub semester_id: i32,
    pub course_id: i32,
    pub name: String,
    pub code: String,
    pub credits: i32,
    pub description: String,
}

pub fn validate_subject(data: &SubjectPayload) -> Result<SubjectInput, Vec<String>> {
    let mut errors = Vec::new();

    match data.semester_id {
        None => errors.push("Semester ID is required".to_string()),
        Some(id) if id < 1 => errors.push("Invalid semester ID format".to_string()),
        Some(_) => {}
    }
    match data.course_id {
        None => errors.push("Course ID is required".to_string()),
        Some(id) if id < 1 => errors.push("Invalid course ID format".to_string()),
        Some(_) => {}
    }
    check_text(&mut errors, data.name.as_ref(), "Subject name", 2, 200);
    check_text(&mut errors, data.code.as_ref(), "Subject code", 2, 50);
    match data.credits {
        None => errors.push("Credits must be a number".to_string()),
        Some(c) if !(1..=20).contains(&c) => {
            errors.push("Credits must be between 1 and 20".to_string())
        }
        Some(_) => {}
    }
    check_text(&mut errors, data.description.as_ref(), "Description", 10, 1000);

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(SubjectInput {
        semester_id: data.semester_id.unwrap_or_default(),
        course_id: data.course_id.unwrap_or_default(),
        name: sanitize_string(data.name.as_deref().unwrap_or_default()),
        code: sanitize_string(data.code.as_deref().unwrap_or_default()).to_uppercase(),
        credits: data.credits.unwrap_or_default(),
        description: sanitize_string(data.description.as_deref().unwrap_or_default()),
    })
}

// PDF metadata

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PdfPayload {
    pub subject_id: Option<i32>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub file_name: Option<String>,
    pub file_url: Option<String>,
    pub file_size: Option<i64>,
    pub storage_key: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
pub struct PdfInput {
    pub subject_id: i32,
    pub title: String,
    pub description: String,
    pub file_name: String,
    pub file_url: String,
    pub file_size: i64,
    pub storage_key: Option<String>,
    pub category: PdfCategory,
}

pub fn validate_pdf(data: &PdfPayload) -> Result<PdfInput, Vec<String>> {
    let mut errors = Vec::new();

    match data.subject_id {
        None => errors.push("Subject ID is required".to_string()),
        Some(id) if id < 1 => errors.push("Invalid subject ID format".to_string()),
        Some(_) => {}
    }
    check_text(&mut errors, data.title.as_ref(), "Title", 2, 200);
    check_text(&mut errors, data.description.as_ref(), "Description", 10, 1000);

    match data.file_name.as_deref() {
        None | Some("") => errors.push("File name is required".to_string()),
        Some(name) if !name.to_lowercase().ends_with(".pdf") => {
            errors.push("File name must end with .pdf".to_string())
        }
        Some(_) => {}
    }

    match data.file_url.as_deref() {
        None | Some("") => errors.push("File URL is required".to_string()),
        Some(url) if !is_valid_url(url) => errors.push("File URL must be valid".to_string()),
        Some(_) => {}
    }

    match data.file_size {
        None => errors.push("File size must be a number".to_string()),
        Some(size) if size < 1 => errors.push("File size must be greater than 0".to_string()),
        Some(size) if size > MAX_FILE_SIZE => {
            errors.push("File size must be less than 100MB".to_string())
        }
        Some(_) => {}
    }

    let category = match data.category.as_deref() {
        None => Some(PdfCategory::default()),
        Some(raw) => PdfCategory::parse(raw),
    };
    if category.is_none() {
        errors.push("Category must be one of: notes, assignments, papers, other".to_string());
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(PdfInput {
        subject_id: data.subject_id.unwrap_or_default(),
        title: sanitize_string(data.title.as_deref().unwrap_or_default()),
        description: sanitize_string(data.description.as_deref().unwrap_or_default()),
        file_name: sanitize_string(data.file_name.as_deref().unwrap_or_default()),
        file_url: data.file_url.as_deref().unwrap_or_default().trim().to_string(),
        file_size: data.file_size.unwrap_or_default(),
        storage_key: data.storage_key.as_deref().map(str::trim).map(str::to_string),
        category: category.unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_string() {
        assert_eq!(sanitize_string("  hello  "), "hello");
        assert_eq!(sanitize_string("<script>x</script>"), "scriptx/script");
        assert_eq!(sanitize_string("plain"), "plain");
    }

    #[test]
    fn test_university_valid() {
        let input = validate_university(&UniversityPayload {
            name: Some("Test University".to_string()),
            description: Some("A place of higher learning".to_string()),
            location: Some("Springfield".to_string()),
            logo: None,
        })
        .unwrap();
        assert_eq!(input.name, "Test University");
        assert_eq!(input.logo, None);
    }

    #[test]
    fn test_university_collects_all_errors() {
        let errors = validate_university(&UniversityPayload {
            name: Some("X".to_string()),
            description: Some("short".to_string()),
            location: None,
            logo: Some("not a url".to_string()),
        })
        .unwrap_err();
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn test_course_code_uppercased() {
        let input = validate_course(&CoursePayload {
            university_id: Some(1),
            name: Some("Computer Science".to_string()),
            code: Some("cs101".to_string()),
            description: Some("Fundamentals of computing".to_string()),
            duration: Some("4 years".to_string()),
        })
        .unwrap();
        assert_eq!(input.code, "CS101");
    }

    #[test]
    fn test_subject_credits_bounds() {
        let base = |credits| SubjectPayload {
            semester_id: Some(1),
            course_id: Some(1),
            name: Some("Algorithms".to_string()),
            code: Some("CS201".to_string()),
            credits,
            description: Some("Design and analysis".to_string()),
        };
        assert!(validate_subject(&base(Some(4))).is_ok());
        assert!(validate_subject(&base(Some(0))).is_err());
        assert!(validate_subject(&base(Some(21))).is_err());
        assert!(validate_subject(&base(None)).is_err());
    }

    #[test]
    fn test_pdf_rules() {
        let base = PdfPayload {
            subject_id: Some(1),
            title: Some("Lecture notes".to_string()),
            description: Some("Week one lecture notes".to_string()),
            file_name: Some("notes.pdf".to_string()),
            file_url: Some("https://example.com/notes.pdf".to_string()),
            file_size: Some(1024),
            storage_key: None,
            category: Some("notes".to_string()),
        };
        let input = validate_pdf(&base).unwrap();
        assert_eq!(input.category, PdfCategory::Notes);

        let errors = validate_pdf(&PdfPayload {
            file_name: Some("notes.txt".to_string()),
            file_size: Some(MAX_FILE_SIZE + 1),
            category: Some("homework".to_string()),
            ..base
        })
        .unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_pdf_category_defaults_to_other() {
        let input = validate_pdf(&PdfPayload {
            subject_id: Some(1),
            title: Some("Old exam".to_string()),
            description: Some("Previous year question paper".to_string()),
            file_name: Some("exam.pdf".to_string()),
            file_url: Some("https://example.com/exam.pdf".to_string()),
            file_size: Some(2048),
            storage_key: None,
            category: None,
        })
        .unwrap();
        assert_eq!(input.category, PdfCategory::Other);
    }
}
