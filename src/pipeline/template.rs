//! Document templating: fill a `.docx` template from a JSON record.
//!
//! A `.docx` file is a zip of WordprocessingML parts. The parts that can hold
//! text (document body, headers, footers, footnotes, endnotes) are rendered
//! as Jinja templates with `minijinja`; every other entry is copied through
//! byte for byte.
//!
//! ## Tag repair
//!
//! Word splits typed text into runs whenever formatting, spell-check or
//! revision marks change, so a placeholder typed as `{{ nom }}` is often
//! stored as `{{</w:t></w:r><w:r><w:t> nom }}`. Before rendering, XML
//! between the delimiters is stripped and typographic quotes inside tags are
//! straightened.
//!
//! ## Structural tags
//!
//! `{%p …%}`, `{%tr …%}`, `{%tc …%}` and `{%r …%}` replace the whole
//! enclosing paragraph, table row, table cell or run with a plain `{% … %}`
//! tag. A loop written as
//!
//! ```text
//! {%tr for e in expériences %}
//! | {{ e.société }} | {{ e.poste }} |
//! {%tr endfor %}
//! ```
//!
//! therefore repeats the middle row instead of leaving empty rows behind.
//!
//! ## Values
//!
//! Values are XML-escaped. `\n` becomes a Word line break and `\t` a tab.
//! Undefined and null values render as empty text.

use crate::error::Cv2DocError;
use minijinja::{Environment, Error as TemplateError, Output, State, UndefinedBehavior, Value};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Map;
use std::borrow::Cow;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;
use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Render `template_path` with the JSON object stored at `json_path` and
/// write the result to `output_path` (parents are created).
///
/// # Errors
/// * [`Cv2DocError::SchemaViolation`] when the file is not valid JSON
/// * [`Cv2DocError::TemplateRootNotObject`] when the JSON root is not an object
/// * [`Cv2DocError::InvalidTemplate`] when the template is not a `.docx` archive
/// * [`Cv2DocError::TemplateRender`] when a template part has a syntax error
pub fn render_json_to_docx(
    template_path: &Path,
    output_path: &Path,
    json_path: &Path,
) -> Result<(), Cv2DocError> {
    let json = std::fs::read_to_string(json_path).map_err(|e| {
        Cv2DocError::Internal(format!("Cannot read '{}': {}", json_path.display(), e))
    })?;
    let context = context_from_json(&json)?;
    render_docx(template_path, output_path, &context)
}

/// Parse a template context. The root must be a JSON object.
pub fn context_from_json(json: &str) -> Result<Map<String, serde_json::Value>, Cv2DocError> {
    let value: serde_json::Value =
        serde_json::from_str(json).map_err(|e| Cv2DocError::SchemaViolation {
            detail: format!("invalid JSON: {e}"),
        })?;

    match value {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(Cv2DocError::TemplateRootNotObject {
            found: json_kind(&other).to_string(),
        }),
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

/// Render a `.docx` template with any serialisable context.
pub fn render_docx<S: Serialize>(
    template_path: &Path,
    output_path: &Path,
    context: &S,
) -> Result<(), Cv2DocError> {
    let invalid = |detail: String| Cv2DocError::InvalidTemplate {
        path: template_path.to_path_buf(),
        detail,
    };
    let write_failed = |source: io::Error| Cv2DocError::OutputWriteFailed {
        path: output_path.to_path_buf(),
        source,
    };

    let file = File::open(template_path).map_err(|e| invalid(e.to_string()))?;
    let mut archive = ZipArchive::new(file).map_err(|e| invalid(e.to_string()))?;

    let parent = match output_path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(write_failed)?;
    let mut staged = super::output_staging_file(parent).map_err(write_failed)?;

    let env = template_environment();
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    {
        let mut writer = ZipWriter::new(staged.as_file_mut());

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i).map_err(|e| invalid(e.to_string()))?;
            let name = entry.name().to_string();

            if is_text_part(&name) {
                let mut xml = String::new();
                entry
                    .read_to_string(&mut xml)
                    .map_err(|e| invalid(format!("{name}: {e}")))?;
                drop(entry);

                let rendered = render_part(&env, &xml, context).map_err(|e| {
                    Cv2DocError::TemplateRender {
                        detail: format!("{name}: {e}"),
                    }
                })?;
                debug!("Rendered {} ({} → {} bytes)", name, xml.len(), rendered.len());

                writer
                    .start_file(name.as_str(), options)
                    .map_err(|e| write_failed(io::Error::other(e)))?;
                writer
                    .write_all(rendered.as_bytes())
                    .map_err(write_failed)?;
            } else {
                writer
                    .raw_copy_file(entry)
                    .map_err(|e| write_failed(io::Error::other(e)))?;
            }
        }

        writer
            .finish()
            .map_err(|e| write_failed(io::Error::other(e)))?;
    }

    staged
        .persist(output_path)
        .map_err(|e| write_failed(e.error))?;
    info!("Document written to {}", output_path.display());
    Ok(())
}

/// True for the WordprocessingML parts that may carry text.
fn is_text_part(name: &str) -> bool {
    let Some(file) = name.strip_prefix("word/") else {
        return false;
    };
    if file.contains('/') || !file.ends_with(".xml") {
        return false;
    }
    file == "document.xml"
        || file == "footnotes.xml"
        || file == "endnotes.xml"
        || file.starts_with("header")
        || file.starts_with("footer")
}

/// Environment shared by all parts of one document.
pub fn template_environment() -> Environment<'static> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Chainable);
    env.set_formatter(write_xml_value);
    env
}

/// Repair and render one XML part.
pub fn render_part<S: Serialize>(
    env: &Environment<'_>,
    xml: &str,
    context: &S,
) -> Result<String, TemplateError> {
    env.render_str(&prepare_xml(xml), context)
}

fn write_xml_value(out: &mut Output, _state: &State, value: &Value) -> Result<(), TemplateError> {
    if value.is_undefined() || value.is_none() {
        return Ok(());
    }
    let text: Cow<'_, str> = match value.as_str() {
        Some(s) => Cow::Borrowed(s),
        None => Cow::Owned(value.to_string()),
    };
    out.write_str(&escape_text(&text))?;
    Ok(())
}

/// XML-escape a value and map control characters to WordprocessingML.
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => {
                if chars.peek() != Some(&'\n') {
                    out.push_str(LINE_BREAK);
                }
            }
            '\n' => out.push_str(LINE_BREAK),
            '\t' => out.push_str(TAB),
            _ => out.push(c),
        }
    }
    out
}

const LINE_BREAK: &str = r#"</w:t><w:br/><w:t xml:space="preserve">"#;
const TAB: &str = r#"</w:t><w:tab/><w:t xml:space="preserve">"#;

// ── Tag repair ───────────────────────────────────────────────────────────

static RE_SPLIT_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{(?:<[^>]*>)+([{%#])").unwrap());
static RE_SPLIT_CLOSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([%}#])(?:<[^>]*>)+\}").unwrap());
static RE_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\{%.*?%\}|\{\{.*?\}\}|\{#.*?#\}").unwrap());
static RE_RUN_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)</w:t>.*?<w:t(?:\s[^>]*)?>").unwrap());

/// Elements a structural tag can stand for, outermost first.
const STRUCTURAL_ELEMENTS: &[&str] = &["tr", "tc", "p", "r"];

/// Make a Word XML part renderable: rejoin split delimiters, strip run
/// markup inside tags, then collapse structural tags onto their element.
pub fn prepare_xml(xml: &str) -> String {
    let xml = RE_SPLIT_OPEN.replace_all(xml, "{$1");
    let xml = RE_SPLIT_CLOSE.replace_all(&xml, "${1}}");
    let xml = RE_TAG.replace_all(&xml, |caps: &regex::Captures<'_>| {
        let inner = RE_RUN_BREAK.replace_all(&caps[0], "");
        clean_tag(&inner)
    });

    let mut out = xml.into_owned();
    for element in STRUCTURAL_ELEMENTS {
        out = collapse_structural(&out, element);
    }
    out
}

fn clean_tag(tag: &str) -> String {
    tag.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace(['\u{201C}', '\u{201D}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'")
}

/// Replace each `<w:{element}>` holding a `{%{element} …%}` tag with `{% … %}`.
fn collapse_structural(xml: &str, element: &str) -> String {
    let open_attrs = format!("<w:{element} ");
    let open_bare = format!("<w:{element}>");
    let close = format!("</w:{element}>");
    let markers = [format!("{{%{element} "), format!("{{{{{element} ")];

    let mut out = xml.to_string();
    let mut from = 0;

    loop {
        let found = markers
            .iter()
            .filter_map(|m| out[from..].find(m.as_str()).map(|i| (from + i, m.len())))
            .min_by_key(|(i, _)| *i);
        let Some((tag_start, marker_len)) = found else {
            break;
        };

        let delimiter = &out[tag_start..tag_start + 2];
        let closing = if delimiter == "{%" { "%}" } else { "}}" };
        let body_start = tag_start + marker_len;
        let Some(rel) = out[body_start..].find(closing) else {
            break;
        };
        let tag_end = body_start + rel + closing.len();

        let before = &out[..tag_start];
        let elem_start = match (before.rfind(&open_attrs), before.rfind(&open_bare)) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        let elem_end = out[tag_end..]
            .find(&close)
            .map(|rel| tag_end + rel + close.len());

        match (elem_start, elem_end) {
            (Some(start), Some(end)) => {
                let replacement = format!("{delimiter} {}", &out[body_start..tag_end]);
                out.replace_range(start..end, &replacement);
                from = start + replacement.len();
            }
            _ => from = tag_end,
        }
    }
    out
}
