//! System prompt loading for resume extraction.
//!
//! The prompt is operator-supplied text stored at
//! [`crate::config::Settings::prompt_path`] and re-read on every extraction, so
//! it can be edited without restarting the service. It uses format-string
//! placeholders:
//!
//! * `{date}` becomes today's date in ISO form (`2026-03-14`), which lets the
//!   model resolve "present" / "en cours" end dates;
//! * `{{` and `}}` are literal braces, so JSON examples can be embedded;
//! * any other `{name}` is left untouched.

use crate::error::Cv2DocError;
use chrono::NaiveDate;
use std::path::Path;

/// Read the prompt template at `path` and fill it for `today`.
pub fn load_prompt(path: &Path, today: NaiveDate) -> Result<String, Cv2DocError> {
    let template = std::fs::read_to_string(path).map_err(|source| Cv2DocError::PromptRead {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(render_prompt(&template, today))
}

/// Today's date in the local time zone.
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Substitute `{date}` and unescape doubled braces.
pub fn render_prompt(template: &str, today: NaiveDate) -> String {
    let date = today.format("%Y-%m-%d").to_string();
    let mut out = String::with_capacity(template.len() + date.len());
    let mut rest = template;

    while let Some(pos) = rest.find(['{', '}']) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        if tail.starts_with("{{") || tail.starts_with("}}") {
            out.push_str(&tail[..1]);
            rest = &tail[2..];
        } else if tail.starts_with("{date}") {
            out.push_str(&date);
            rest = &tail["{date}".len()..];
        } else {
            out.push_str(&tail[..1]);
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    out
}
