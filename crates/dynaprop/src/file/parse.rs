//! Parsing property files into flat `name -> raw value` maps.
//!
//! Every format is first parsed into a [`serde_json::Value`] and then
//! flattened:
//!
//! - nested tables become dotted names (`db.pool.size`)
//! - strings are kept verbatim, numbers and booleans are rendered
//! - arrays become their scalar items joined with `,`
//! - nulls are omitted

use std::collections::BTreeMap;
use std::path::Path;

use miette::{NamedSource, SourceSpan};
use serde_json as SJSON;

#[cfg(feature = "yaml")]
use serde_saphyr as YAML;

#[cfg(feature = "toml")]
use toml as TOML;

use super::error::FileError;
use super::format::FileFormat;

/// Reads and flattens the file at `path`.
pub(crate) fn read_file(path: &Path, format: FileFormat) -> Result<BTreeMap<String, String>, FileError> {
    let path_str = path.display().to_string();

    if !path.exists() {
        return Err(FileError::NotFound { path: path_str });
    }

    let content = std::fs::read_to_string(path).map_err(|e| FileError::ReadError {
        path: path_str.clone(),
        source: e,
    })?;

    let value = parse_str(&content, format, path)?;
    flatten_root(&value, &path_str)
}

/// Parses `content` as `format`. `path` only labels errors.
pub(crate) fn parse_str(content: &str, format: FileFormat, path: &Path) -> Result<SJSON::Value, FileError> {
    match format {
        FileFormat::Json => {
            SJSON::from_str(content).map_err(|e| json_parse_error(&e, content, path))
        }

        #[cfg(feature = "toml")]
        FileFormat::Toml => {
            let toml_value: TOML::Value =
                TOML::from_str(content).map_err(|e| toml_parse_error(&e, content, path))?;
            Ok(toml_to_json(toml_value))
        }

        #[cfg(feature = "yaml")]
        FileFormat::Yaml => {
            YAML::from_str(content).map_err(|e| yaml_parse_error(&e, content, path))
        }
    }
}

/// Flattens a document whose root must be an object.
pub(crate) fn flatten_root(value: &SJSON::Value, path: &str) -> Result<BTreeMap<String, String>, FileError> {
    let found = match value {
        SJSON::Value::Object(_) => {
            let mut out = BTreeMap::new();
            flatten_into(&mut out, "", value);
            return Ok(out);
        }

        // An empty YAML document parses as null.
        SJSON::Value::Null => return Ok(BTreeMap::new()),

        SJSON::Value::Bool(_) => "a boolean",
        SJSON::Value::Number(_) => "a number",
        SJSON::Value::String(_) => "a string",
        SJSON::Value::Array(_) => "an array",
    };

    Err(FileError::InvalidRoot {
        path: path.to_string(),
        found,
    })
}

fn flatten_into(out: &mut BTreeMap<String, String>, prefix: &str, value: &SJSON::Value) {
    match value {
        SJSON::Value::Object(map) => {
            for (key, child) in map {
                if prefix.is_empty() {
                    flatten_into(out, key, child);
                } else {
                    flatten_into(out, &format!("{prefix}.{key}"), child);
                }
            }
        }

        SJSON::Value::Array(items) => {
            let joined = items
                .iter()
                .filter_map(render_scalar)
                .collect::<Vec<_>>()
                .join(",");
            out.insert(prefix.to_string(), joined);
        }

        scalar => {
            if let Some(rendered) = render_scalar(scalar) {
                out.insert(prefix.to_string(), rendered);
            }
        }
    }
}

fn render_scalar(value: &SJSON::Value) -> Option<String> {
    match value {
        SJSON::Value::String(s) => Some(s.clone()),
        SJSON::Value::Number(n) => Some(n.to_string()),
        SJSON::Value::Bool(b) => Some(b.to_string()),
        SJSON::Value::Null | SJSON::Value::Array(_) | SJSON::Value::Object(_) => None,
    }
}

/// Converts a byte offset to a [`SourceSpan`] covering the token there.
fn offset_to_span(offset: usize, content: &str) -> SourceSpan {
    let remaining = content.get(offset.min(content.len())..).unwrap_or_default();
    let len = remaining
        .find(|c: char| c.is_whitespace() || (c == ',') || (c == '}') || (c == ']'))
        .unwrap_or(remaining.len().min(20))
        .max(1);

    SourceSpan::new(offset.into(), len)
}

/// Converts a 1-indexed line and column to a byte offset.
fn line_col_to_offset(content: &str, line: usize, col: usize) -> usize {
    let mut offset = 0;

    for (i, l) in content.lines().enumerate() {
        if (i + 1) == line {
            return offset + col.saturating_sub(1);
        }

        offset += l.len() + 1;
    }

    offset
}

fn json_parse_error(e: &SJSON::Error, content: &str, path: &Path) -> FileError {
    let offset = line_col_to_offset(content, e.line(), e.column());

    FileError::Parse {
        format: "JSON",
        path: path.display().to_string(),
        src: NamedSource::new(path.display().to_string(), content.to_string()),
        span: offset_to_span(offset, content),
        message: e.to_string(),
        help: "check for missing commas, quotes, or brackets".to_string(),
    }
}

#[cfg(feature = "toml")]
fn toml_parse_error(e: &TOML::de::Error, content: &str, path: &Path) -> FileError {
    let help = "check for missing quotes, invalid values, or syntax errors".to_string();

    match e.span() {
        Some(span) => FileError::Parse {
            format: "TOML",
            path: path.display().to_string(),
            src: NamedSource::new(path.display().to_string(), content.to_string()),
            span: SourceSpan::new(span.start.into(), span.end - span.start),
            message: e.message().to_string(),
            help,
        },

        None => FileError::ParseNoSpan {
            format: "TOML",
            message: e.to_string(),
            help,
        },
    }
}

#[cfg(feature = "yaml")]
fn yaml_parse_error(e: &YAML::Error, content: &str, path: &Path) -> FileError {
    let msg = e.to_string();
    let help = "check indentation and ensure proper YAML syntax".to_string();

    match extract_yaml_location(&msg) {
        Some((line, col)) => {
            let offset = line_col_to_offset(content, line, col);

            FileError::Parse {
                format: "YAML",
                path: path.display().to_string(),
                src: NamedSource::new(path.display().to_string(), content.to_string()),
                span: offset_to_span(offset, content),
                message: msg,
                help,
            }
        }

        None => FileError::ParseNoSpan {
            format: "YAML",
            message: msg,
            help,
        },
    }
}

/// Extracts `line N column M` from a YAML error message.
#[cfg(feature = "yaml")]
fn extract_yaml_location(msg: &str) -> Option<(usize, usize)> {
    let line_idx = msg.find("line ")?;
    let after_line = &msg[(line_idx + 5)..];
    let line_end = after_line.find(|c: char| !c.is_ascii_digit())?;
    let line = after_line[..line_end].parse::<usize>().ok()?;

    let col_idx = after_line.find("column ")?;
    let after_col = &after_line[(col_idx + 7)..];
    let col_end = after_col
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(after_col.len());
    let col = after_col[..col_end].parse::<usize>().ok()?;

    Some((line, col))
}

#[cfg(feature = "toml")]
fn toml_to_json(toml: TOML::Value) -> SJSON::Value {
    match toml {
        TOML::Value::String(s) => SJSON::Value::String(s),

        TOML::Value::Integer(i) => SJSON::Value::Number(i.into()),

        // NaN and infinities have no JSON number; keep their TOML spelling.
        TOML::Value::Float(f) => SJSON::Number::from_f64(f)
            .map_or_else(|| SJSON::Value::String(f.to_string()), SJSON::Value::Number),

        TOML::Value::Boolean(b) => SJSON::Value::Bool(b),

        TOML::Value::Datetime(dt) => SJSON::Value::String(dt.to_string()),

        TOML::Value::Array(arr) => SJSON::Value::Array(arr.into_iter().map(toml_to_json).collect()),

        TOML::Value::Table(table) => SJSON::Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}
