//! Resume intake: text extraction and best-effort contact pre-fill.
//!
//! PDFs go through `pdf-extract`; plain text is decoded as UTF-8. Word
//! documents are accepted but yield no text, so the candidate lands in
//! `CollectingInfo` and fills in the form by hand.

use thiserror::Error;

use crate::interview::models::NewCandidate;
use crate::interview::validation::{is_valid_email, is_valid_phone};

pub const MAX_RESUME_BYTES: usize = 10 * 1024 * 1024;

/// Shorter digit runs are more likely years or date ranges.
const MIN_PHONE_DIGITS: usize = 10;
const MAX_PHONE_DIGITS: usize = 15;

#[derive(Debug, Error)]
pub enum ResumeError {
    #[error("resume is {size} bytes, the limit is 10 MB")]
    TooLarge { size: usize },

    #[error("unsupported resume format: {0}")]
    UnsupportedFormat(String),

    #[error("could not extract text: {0}")]
    Extraction(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeFormat {
    Pdf,
    Docx,
    Doc,
    PlainText,
}

impl ResumeFormat {
    pub fn from_filename(filename: &str) -> Result<Self, ResumeError> {
        let ext = filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "pdf" => Ok(ResumeFormat::Pdf),
            "docx" => Ok(ResumeFormat::Docx),
            "doc" => Ok(ResumeFormat::Doc),
            "txt" | "md" => Ok(ResumeFormat::PlainText),
            _ => Err(ResumeError::UnsupportedFormat(filename.to_string())),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedContact {
    pub name: String,
    pub email: String,
    pub phone: String,
}

/// Extracts text and contact fields, ready to hand to `add_candidate`.
pub fn extract_resume(filename: &str, bytes: &[u8]) -> Result<NewCandidate, ResumeError> {
    if bytes.len() > MAX_RESUME_BYTES {
        return Err(ResumeError::TooLarge { size: bytes.len() });
    }

    let text = match ResumeFormat::from_filename(filename)? {
        ResumeFormat::Pdf => Some(
            pdf_extract::extract_text_from_mem(bytes)
                .map_err(|e| ResumeError::Extraction(e.to_string()))?,
        ),
        ResumeFormat::PlainText => Some(String::from_utf8_lossy(bytes).into_owned()),
        ResumeFormat::Docx | ResumeFormat::Doc => None,
    };
    let text = text.filter(|t| !t.trim().is_empty());

    let contact = text.as_deref().map(extract_contact).unwrap_or_default();

    Ok(NewCandidate {
        name: contact.name,
        email: contact.email,
        phone: contact.phone,
        resume_text: text,
    })
}

pub fn extract_contact(text: &str) -> ExtractedContact {
    ExtractedContact {
        name: find_name(text).unwrap_or_default(),
        email: find_email(text).unwrap_or_default(),
        phone: find_phone(text).unwrap_or_default(),
    }
}

fn find_email(text: &str) -> Option<String> {
    text.split_whitespace()
        .map(|token| {
            token.trim_matches(|c: char| {
                !(c.is_alphanumeric() || c == '@' || c == '.' || c == '_' || c == '-' || c == '+')
            })
        })
        .map(|token| token.strip_prefix("mailto:").unwrap_or(token))
        .map(|token| token.trim_end_matches('.'))
        .find(|token| is_valid_email(token))
        .map(str::to_string)
}

fn find_phone(text: &str) -> Option<String> {
    for line in text.lines() {
        let mut run = String::new();
        for c in line.chars().chain(std::iter::once('\n')) {
            if c.is_ascii_digit() || "+-() ".contains(c) {
                run.push(c);
                continue;
            }
            let candidate = run.trim();
            let digits = candidate.chars().filter(char::is_ascii_digit).count();
            if (MIN_PHONE_DIGITS..=MAX_PHONE_DIGITS).contains(&digits) && is_valid_phone(candidate) {
                return Some(candidate.to_string());
            }
            run.clear();
        }
    }
    None
}

/// First short line made only of letters and name punctuation.
fn find_name(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .take(5)
        .find(|line| {
            let words = line.split_whitespace().count();
            (2..=4).contains(&words)
                && line
                    .chars()
                    .all(|c| c.is_alphabetic() || c.is_whitespace() || "'-.".contains(c))
        })
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESUME: &str = "Jordan Avery\n\
        Senior Frontend Engineer\n\
        Email: jordan.avery@example.com | Phone: +1 (555) 123-4567\n\
        Experience: 2019 - 2024 at Acme";

    #[test]
    fn test_extract_contact_from_header() {
        let contact = extract_contact(RESUME);
        assert_eq!(contact.name, "Jordan Avery");
        assert_eq!(contact.email, "jordan.avery@example.com");
        assert_eq!(contact.phone, "+1 (555) 123-4567");
    }

    #[test]
    fn test_year_ranges_are_not_phones() {
        assert_eq!(find_phone("Experience: 2019 - 2024 at Acme"), None);
    }

    #[test]
    fn test_email_with_mailto_and_trailing_period() {
        assert_eq!(
            find_email("Reach me at mailto:sam@x.io."),
            Some("sam@x.io".to_string())
        );
    }

    #[test]
    fn test_missing_contact_fields_are_empty() {
        let contact = extract_contact("skills: rust, go, typescript");
        assert_eq!(contact, ExtractedContact::default());
    }

    #[test]
    fn test_plain_text_resume_prefills_candidate() {
        let new = extract_resume("cv.txt", RESUME.as_bytes()).unwrap();
        assert!(new.has_contact_info());
        assert_eq!(new.resume_text.as_deref(), Some(RESUME));
    }

    #[test]
    fn test_docx_accepted_without_text() {
        let new = extract_resume("cv.DOCX", b"PK\x03\x04").unwrap();
        assert!(new.resume_text.is_none());
        assert!(!new.has_contact_info());
    }

    #[test]
    fn test_unsupported_extension_rejected() {
        assert!(matches!(
            extract_resume("cv.exe", b"MZ"),
            Err(ResumeError::UnsupportedFormat(_))
        ));
        assert!(ResumeFormat::from_filename("no_extension").is_err());
    }

    #[test]
    fn test_oversized_resume_rejected() {
        let bytes = vec![b'a'; MAX_RESUME_BYTES + 1];
        assert!(matches!(
            extract_resume("cv.txt", &bytes),
            Err(ResumeError::TooLarge { .. })
        ));
    }

    #[test]
    fn test_invalid_pdf_is_extraction_error() {
        assert!(matches!(
            extract_resume("cv.pdf", b"not a pdf"),
            Err(ResumeError::Extraction(_))
        ));
    }
}
