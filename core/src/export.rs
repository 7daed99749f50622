//! Detailed export of a status response as pretty JSON.
//!
//! Every object carrying an `@type` key is an `Any` payload. Registered types
//! are expanded: field names normalized to proto JSON and nested payloads
//! expanded in turn. Unregistered types, including bare names without the
//! `type.googleapis.com/` prefix, are written exactly as received.

use crate::{registry, ClientStatusResponse, Error, Result};
use serde_json::{Map, Value};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Printed before the JSON when exporting to the output stream.
pub const DETAILED_CONFIG_HEADER: &str = "Detailed Config:";

/// Key proto JSON uses for an `Any` payload's type URL.
const ANY_TYPE_KEY: &str = "@type";

/// Where the detailed export goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// The output stream, after [`DETAILED_CONFIG_HEADER`].
    Stdout,
    /// A file, created or truncated.
    File(PathBuf),
}

impl Destination {
    /// Interpret a `--file_to_save_config` value; empty means stdout.
    #[must_use]
    pub fn from_flag(value: &str) -> Self {
        if value.is_empty() {
            Self::Stdout
        } else {
            Self::File(PathBuf::from(value))
        }
    }
}

/// Serialize the response as two-space indented JSON with payloads expanded.
///
/// # Errors
///
/// Returns [`Error::Serialize`] if the response cannot be serialized.
pub fn to_pretty_json(response: &ClientStatusResponse) -> Result<String> {
    let value = expand_payloads(serde_json::to_value(response)?);
    Ok(serde_json::to_string_pretty(&value)?)
}

/// Write the detailed export.
///
/// For [`Destination::Stdout`] the header, JSON, and a newline go to `out`.
/// For [`Destination::File`] the JSON goes to the file and a confirmation
/// line goes to `out`.
///
/// # Errors
///
/// - [`Error::Write`] if the file cannot be created or written
/// - [`Error::Output`] if writing to `out` fails
/// - [`Error::Serialize`] if the response cannot be serialized
pub fn export<W: Write>(
    response: &ClientStatusResponse,
    destination: &Destination,
    out: &mut W,
) -> Result<()> {
    let json = to_pretty_json(response)?;

    match destination {
        Destination::Stdout => {
            writeln!(out, "{DETAILED_CONFIG_HEADER}")
                .and_then(|()| writeln!(out, "{json}"))
                .map_err(Error::Output)?;
        }
        Destination::File(path) => {
            write_file(path, json.as_bytes())?;
            info!(path = %path.display(), bytes = json.len(), "saved detailed config");
            writeln!(out, "Config has been saved to {}", path.display()).map_err(Error::Output)?;
        }
    }
    Ok(())
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    let to_error = |source| Error::Write {
        path: path.to_path_buf(),
        source,
    };
    let mut file = File::create(path).map_err(to_error)?;
    file.write_all(bytes).map_err(to_error)?;
    file.flush().map_err(to_error)
}

fn expand_payloads(value: Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.into_iter().map(expand_payloads).collect()),
        Value::Object(map) => expand_object(map),
        scalar => scalar,
    }
}

fn expand_object(map: Map<String, Value>) -> Value {
    let Some(type_url) = map.get(ANY_TYPE_KEY).and_then(Value::as_str) else {
        return Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, expand_payloads(v)))
                .collect(),
        );
    };

    let Some(schema) = registry::resolve(type_url) else {
        debug!(type_url, "unregistered payload type, exporting as received");
        return Value::Object(map);
    };

    Value::Object(
        schema
            .normalize(map)
            .into_iter()
            .map(|(k, v)| (k, expand_payloads(v)))
            .collect(),
    )
}
