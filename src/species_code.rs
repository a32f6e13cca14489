//! Six-letter species codes
//!
//! Codes follow the eBird banding-code style: three letters of the first word
//! and three of the last ("American Woodcock" → `amewoo`). Collisions within a
//! region are resolved by trying alternative letter splits, then a numeric
//! suffix.

use crate::validation::{ValidationError, SPECIES_CODE_LENGTH};
use std::collections::HashSet;

/// Generate a code for `name` that is not already in `existing`.
///
/// The caller is responsible for inserting the returned code into `existing`
/// before generating the next one.
pub fn generate_species_code(
    name: &str,
    existing: &HashSet<String>,
) -> Result<String, ValidationError> {
    let words = code_words(name);
    if words.is_empty() {
        return Err(ValidationError::InvalidSpeciesName {
            name: name.to_string(),
            reason: "no letters or digits to build a species code from".to_string(),
        });
    }

    let first = &words[0];
    let last = &words[words.len() - 1];

    let base = match words.len() {
        1 => pad(first.clone()),
        _ => pad(join(first, 3, last, 3)),
    };
    if !existing.contains(&base) {
        return Ok(base);
    }

    let mut alternatives = Vec::new();
    if words.len() >= 2 && last.len() >= 4 {
        alternatives.push(join(first, 2, last, 4));
    }
    if words.len() >= 3 {
        alternatives.push(join(first, 3, &words[1], 3));
    }
    if words.len() >= 2 {
        alternatives.push(join(first, 4, last, 2));
    }

    if let Some(code) = alternatives
        .into_iter()
        .map(pad)
        .find(|code| !existing.contains(code))
    {
        return Ok(code);
    }

    Ok(numbered(&base, existing))
}

/// Lowercased ASCII alphanumeric words, with parenthesised text removed
fn code_words(name: &str) -> Vec<String> {
    let mut depth = 0usize;
    let stripped: String = name
        .chars()
        .filter(|c| match c {
            '(' => {
                depth += 1;
                false
            }
            ')' => {
                depth = depth.saturating_sub(1);
                false
            }
            _ => depth == 0,
        })
        .collect();

    stripped
        .split_whitespace()
        .map(|word| {
            word.chars()
                .filter(char::is_ascii_alphanumeric)
                .map(|c| c.to_ascii_lowercase())
                .collect::<String>()
        })
        .filter(|word| !word.is_empty())
        .collect()
}

fn join(a: &str, a_len: usize, b: &str, b_len: usize) -> String {
    let mut code: String = a.chars().take(a_len).collect();
    code.extend(b.chars().take(b_len));
    code
}

/// Repeat short codes until they fill the code length
fn pad(code: String) -> String {
    if code.len() >= SPECIES_CODE_LENGTH {
        return code.chars().take(SPECIES_CODE_LENGTH).collect();
    }
    code.chars().cycle().take(SPECIES_CODE_LENGTH).collect()
}

/// `base` truncated to make room for a counter starting at 2
fn numbered(base: &str, existing: &HashSet<String>) -> String {
    (2usize..)
        .map(|n| {
            let suffix = n.to_string();
            let keep = SPECIES_CODE_LENGTH.saturating_sub(suffix.len());
            format!("{}{}", &base[..keep], suffix)
        })
        .find(|code| !existing.contains(code))
        .unwrap_or_else(|| base.to_string())
}
