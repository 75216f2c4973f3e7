// src/utils.rs
use std::collections::BTreeSet;

const COMPANY_SUFFIXES: &[&str] = &[" pty ltd", " ltd", " inc", " corp", " llc", " limited"];

/// Derive a stable company id from a display name.
pub fn derive_company_id(company_name: &str) -> String {
    let mut clean_name = company_name.trim().to_lowercase();

    for suffix in COMPANY_SUFFIXES {
        if let Some(stripped) = clean_name.strip_suffix(suffix) {
            clean_name = stripped.trim().to_string();
            break;
        }
    }

    clean_name
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect()
}

/// Collapse whitespace and blank lines into single spaces.
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Requirement tags recognised in a job description.
pub fn extract_requirements(description: &str) -> BTreeSet<String> {
    let mut requirements = BTreeSet::new();
    if description.trim().is_empty() {
        return requirements;
    }

    let lower = description.to_lowercase();

    if lower.contains("cfa") {
        requirements.insert("CFA certification".to_string());
    }
    if lower.contains("cfp") {
        requirements.insert("CFP certification".to_string());
    }
    if lower.contains("years experience") || lower.contains("years of experience") {
        requirements.insert("Relevant experience required".to_string());
    }
    if lower.contains("degree") || lower.contains("bachelor") {
        requirements.insert("Bachelor's degree".to_string());
    }
    if lower.contains("license") || lower.contains("licence") {
        requirements.insert("Relevant licensing".to_string());
    }

    requirements
}

/// Lower-case alphanumeric words of a free-form location or phrase.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(|token| token.to_lowercase())
        .collect()
}
