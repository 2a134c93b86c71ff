//! Stored-code extraction.
//!
//! Normalizes whatever the platform stored for a project's frontend into a
//! [`GeneratedCode`]. Extraction never fails: anything unreadable degrades
//! to a default welcome app.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::literal::{LiteralError, parse_literal};
use crate::types::Project;

/// Key of the application entry in stored payloads.
pub const ENTRY_KEY: &str = "App.tsx";
/// Key of the component mapping in stored payloads.
pub const COMPONENTS_KEY: &str = "components";

const WELCOME: &str = "Welcome";
const DEFAULT_TAGLINE: &str = "Built with Shipyard";
const MAX_DESCRIPTION_CHARS: usize = 100;

/// Generated frontend sources of a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedCode {
    /// Contents of `App.tsx`.
    pub entry: String,
    /// Component name → source.
    pub components: BTreeMap<String, String>,
}

impl GeneratedCode {
    /// Canonical file set, relative to the source directory.
    pub fn files(&self) -> BTreeMap<String, String> {
        let mut files = BTreeMap::new();
        files.insert(ENTRY_KEY.to_string(), self.entry.clone());
        for (name, source) in &self.components {
            files.insert(format!("components/{name}.tsx"), source.clone());
        }
        files
    }
}

/// A stored payload string, tagged with the syntax it was decoded from.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredPayload {
    /// Strict JSON (current format).
    Structured(Value),
    /// Legacy dictionary literal.
    Legacy(Value),
}

/// Neither decoder accepted the payload.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("not JSON ({json}) and not a legacy literal ({legacy})")]
pub struct UnreadablePayload {
    pub json: String,
    pub legacy: LiteralError,
}

impl StoredPayload {
    /// Decodes as JSON first, then as a legacy literal.
    pub fn parse(raw: &str) -> Result<Self, UnreadablePayload> {
        let json_err = match serde_json::from_str::<Value>(raw) {
            Ok(v) => return Ok(StoredPayload::Structured(v)),
            Err(e) => e.to_string(),
        };
        match parse_literal(raw) {
            Ok(v) => Ok(StoredPayload::Legacy(v)),
            Err(legacy) => Err(UnreadablePayload {
                json: json_err,
                legacy,
            }),
        }
    }

    pub fn format(&self) -> &'static str {
        match self {
            StoredPayload::Structured(_) => "json",
            StoredPayload::Legacy(_) => "legacy",
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            StoredPayload::Structured(v) | StoredPayload::Legacy(v) => v,
        }
    }
}

/// Extracts a project's generated code, falling back to the default app.
pub fn extract(project: &Project) -> GeneratedCode {
    match stored_mapping(project) {
        Some(map) => from_mapping(&map, project),
        None => default_code(project),
    }
}

/// Decodes the stored payload into a mapping, or `None` for the default app.
fn stored_mapping(project: &Project) -> Option<Map<String, Value>> {
    let value = match project.frontend_code.as_ref()? {
        Value::Null => return None,
        Value::String(s) if s.trim().is_empty() => return None,
        Value::String(s) => match StoredPayload::parse(s) {
            Ok(payload) => {
                debug!(project_id = project.id, format = payload.format(), "decoded stored code");
                payload.into_value()
            }
            Err(e) => {
                warn!(
                    project_id = project.id,
                    error = %e,
                    "unreadable stored code, using default app"
                );
                return None;
            }
        },
        other => other.clone(),
    };

    match value {
        Value::Object(map) if map.is_empty() => None,
        Value::Object(map) => Some(map),
        other => {
            warn!(
                project_id = project.id,
                kind = json_kind(&other),
                "stored code is not a mapping, using default app"
            );
            None
        }
    }
}

fn from_mapping(map: &Map<String, Value>, project: &Project) -> GeneratedCode {
    let mut components = BTreeMap::new();
    match map.get(COMPONENTS_KEY) {
        None | Some(Value::Null) => {}
        Some(Value::Object(entries)) => {
            for (name, source) in entries {
                match source.as_str() {
                    Some(src) => {
                        components.insert(name.clone(), src.to_string());
                    }
                    None => warn!(
                        project_id = project.id,
                        component = %name,
                        "dropping non-text component"
                    ),
                }
            }
        }
        Some(other) => warn!(
            project_id = project.id,
            kind = json_kind(other),
            "components is not a mapping, ignoring"
        ),
    }

    let entry = map
        .get(ENTRY_KEY)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string);

    let entry = match entry {
        Some(entry) => entry,
        None => {
            // The default entry renders Welcome, so it must exist.
            components
                .entry(WELCOME.to_string())
                .or_insert_with(|| default_welcome(project));
            default_entry()
        }
    };

    GeneratedCode { entry, components }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// The welcome app used when no usable code is stored.
pub fn default_code(project: &Project) -> GeneratedCode {
    let mut components = BTreeMap::new();
    components.insert(WELCOME.to_string(), default_welcome(project));
    GeneratedCode {
        entry: default_entry(),
        components,
    }
}

fn default_entry() -> String {
    r#"import React from 'react';
import Welcome from './components/Welcome';

function App() {
  return <Welcome />;
}

export default App;
"#
    .to_string()
}

/// JSX string-literal expression, safe for arbitrary text.
fn jsx_text(s: &str) -> String {
    let literal = serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string());
    format!("{{{literal}}}")
}

fn default_welcome(project: &Project) -> String {
    let tagline = project
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(|d| d.chars().take(MAX_DESCRIPTION_CHARS).collect::<String>())
        .unwrap_or_else(|| DEFAULT_TAGLINE.to_string());

    WELCOME_TEMPLATE
        .replace("__TITLE__", &jsx_text(&project.name))
        .replace("__TAGLINE__", &jsx_text(&tagline))
}

const WELCOME_TEMPLATE: &str = r#"import React from 'react';

function Welcome() {
  return (
    <div style={{
      minHeight: '100vh',
      display: 'flex',
      alignItems: 'center',
      justifyContent: 'center',
      background: 'linear-gradient(135deg, #667eea 0%, #764ba2 100%)',
      color: 'white',
      fontFamily: 'system-ui',
      textAlign: 'center',
      padding: '20px'
    }}>
      <div>
        <h1 style={{ fontSize: '48px', marginBottom: '20px' }}>
          🚀 __TITLE__
        </h1>
        <p style={{ fontSize: '20px', opacity: 0.9 }}>
          __TAGLINE__
        </p>
      </div>
    </div>
  );
}

export default Welcome;
"#;
