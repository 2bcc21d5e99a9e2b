//! Project code generation.
//!
//! A project code reads `VX{index:03}_{slug}_{date}`, for example
//! `VX001_boda-ana_2025-06-15`. Generation is pure; uniqueness is the
//! caller's job, done by [`allocate_project_code`] against a project store.

use chrono::NaiveDate;

use projectdrive_common::{Error, ProjectCode, Result};

use crate::store::ProjectStore;

/// Highest index tried before allocation gives up.
pub const MAX_CODE_INDEX: u32 = 999;

const CODE_PREFIX: &str = "VX";
const MAX_SLUG_LEN: usize = 40;
const DATE_FORMAT: &str = "%Y-%m-%d";

fn fold_char(c: char) -> Option<char> {
    let folded = match c {
        'á' | 'à' | 'ä' | 'â' | 'ã' | 'å' => 'a',
        'é' | 'è' | 'ë' | 'ê' => 'e',
        'í' | 'ì' | 'ï' | 'î' => 'i',
        'ó' | 'ò' | 'ö' | 'ô' | 'õ' => 'o',
        'ú' | 'ù' | 'ü' | 'û' => 'u',
        'ñ' => 'n',
        'ç' => 'c',
        c if c.is_ascii_alphanumeric() => c,
        _ => return None,
    };
    Some(folded)
}

/// Turn an event name into a lowercase, hyphen-separated ASCII slug.
///
/// Accented Latin letters are folded to their base letter. Every other run
/// of non-alphanumeric characters becomes a single hyphen. The result holds
/// at most 40 characters and never starts or ends with a hyphen.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_hyphen = false;

    for c in name.chars().flat_map(char::to_lowercase) {
        match fold_char(c) {
            Some(c) => {
                if pending_hyphen && !slug.is_empty() {
                    slug.push('-');
                }
                pending_hyphen = false;
                slug.push(c);
            }
            None => pending_hyphen = true,
        }
        if slug.len() >= MAX_SLUG_LEN {
            break;
        }
    }

    slug.truncate(MAX_SLUG_LEN);
    slug.trim_end_matches('-').to_string()
}

/// Build the candidate project code for an event and index.
///
/// # Preconditions
/// - `event_name` contains at least one letter or digit
/// - `event_date` is a calendar date in `YYYY-MM-DD` form
/// - `index` is within `1..=MAX_CODE_INDEX`
///
/// # Errors
/// - `Error::InvalidInput` if any precondition does not hold
pub fn make_project_code(event_name: &str, event_date: &str, index: u32) -> Result<ProjectCode> {
    if !(1..=MAX_CODE_INDEX).contains(&index) {
        return Err(Error::InvalidInput(format!(
            "Project code index {} is outside 1..={}",
            index, MAX_CODE_INDEX
        )));
    }

    let slug = slugify(event_name);
    if slug.is_empty() {
        return Err(Error::InvalidInput(format!(
            "Event name '{}' has no usable characters",
            event_name
        )));
    }

    let date = NaiveDate::parse_from_str(event_date.trim(), DATE_FORMAT).map_err(|_| {
        Error::InvalidInput(format!(
            "Event date '{}' is not a YYYY-MM-DD date",
            event_date
        ))
    })?;

    ProjectCode::new(format!(
        "{}{:03}_{}_{}",
        CODE_PREFIX,
        index,
        slug,
        date.format(DATE_FORMAT)
    ))
}

/// Find the first free project code for an event.
///
/// Tries indices `1..=MAX_CODE_INDEX` in order and returns the first
/// candidate the store does not already hold. Two concurrent allocations can
/// pick the same code; the store's `create` rejects the second one.
///
/// # Errors
/// - `Error::InvalidInput` if the name or date is unusable
/// - `Error::CodeExhausted` if every index is taken
/// - Any store error
pub async fn allocate_project_code(
    store: &dyn ProjectStore,
    event_name: &str,
    event_date: &str,
) -> Result<ProjectCode> {
    for index in 1..=MAX_CODE_INDEX {
        let candidate = make_project_code(event_name, event_date, index)?;
        if !store.exists(&candidate).await? {
            return Ok(candidate);
        }
        tracing::debug!(code = %candidate, "Project code taken");
    }

    Err(Error::CodeExhausted(format!(
        "{} on {} after {} attempts",
        event_name, event_date, MAX_CODE_INDEX
    )))
}
