#![forbid(unsafe_code)]

//! Browser host for Dimmer modals.
//!
//! On `wasm32` this crate exports `ModalHost`, a wasm-bindgen class with
//! `open(element, options?)`, `close()` and `setOptions(options)`, backed by
//! a `web-sys` implementation of [`dimmer_core::Document`]. Option objects
//! use the same camelCase keys as [`ModalOptionsPatch`] under serde.
//!
//! Option parsing and input translation are plain Rust and build on every
//! target, so they are tested natively.
//!
//! # Failure Modes
//!
//! - Option values that are not JSON objects (or `null`) are rejected with
//!   [`WebError::NotAnObject`].
//! - Known keys with the wrong type are rejected with [`WebError::Json`].
//! - Unknown keys are ignored.

use std::fmt;

use dimmer_core::{Event, KeyCode, KeyEvent};
use dimmer_widgets::{ModalError, ModalOptionsPatch};

#[cfg(target_arch = "wasm32")]
mod browser;

#[cfg(target_arch = "wasm32")]
pub use browser::{BrowserDocument, ModalHost};

/// Errors surfaced to script callers.
#[derive(Debug)]
pub enum WebError {
    /// The options value was not an object.
    NotAnObject { found: &'static str },
    /// The options object did not match the expected shape.
    Json(serde_json::Error),
    /// The manager rejected the call.
    Modal(ModalError),
    /// A browser API call failed.
    Host(String),
}

impl fmt::Display for WebError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAnObject { found } => write!(f, "modal options must be an object, got {found}"),
            Self::Json(err) => write!(f, "invalid modal options: {err}"),
            Self::Modal(err) => write!(f, "{err}"),
            Self::Host(msg) => write!(f, "browser error: {msg}"),
        }
    }
}

impl std::error::Error for WebError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Json(err) => Some(err),
            Self::Modal(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for WebError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}

impl From<ModalError> for WebError {
    fn from(err: ModalError) -> Self {
        Self::Modal(err)
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

/// Parse a JSON options object into a patch. `null` and an empty string
/// yield an empty patch.
pub fn parse_options(json: &str) -> Result<ModalOptionsPatch, WebError> {
    if json.trim().is_empty() {
        return Ok(ModalOptionsPatch::new());
    }
    let value: serde_json::Value = serde_json::from_str(json)?;
    match value {
        serde_json::Value::Null => Ok(ModalOptionsPatch::new()),
        serde_json::Value::Object(_) => Ok(serde_json::from_value(value)?),
        other => Err(WebError::NotAnObject {
            found: json_kind(&other),
        }),
    }
}

/// Translate a DOM `KeyboardEvent.key` into a key press.
pub fn key_event(key: &str) -> Event {
    Event::Key(KeyEvent::press(KeyCode::from_key(key)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_camel_case_options() {
        let patch = parse_options(
            r#"{
                "containerClasses": ["mask", "dark"],
                "closeClass": "x",
                "fadeDuration": 120,
                "fadeDelay": 0,
                "showClose": false,
                "allowDrag": true
            }"#,
        )
        .unwrap();
        assert_eq!(
            patch,
            ModalOptionsPatch::new()
                .container_classes(["mask", "dark"])
                .close_class("x")
                .fade_duration_ms(120)
                .fade_delay(0.0)
                .show_close(false)
                .allow_drag(true)
        );
    }

    #[test]
    fn null_and_empty_are_empty_patches() {
        assert!(parse_options("null").unwrap().is_empty());
        assert!(parse_options("  ").unwrap().is_empty());
        assert!(parse_options("{}").unwrap().is_empty());
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let patch = parse_options(r#"{"escapeClose": false, "theme": "dark"}"#).unwrap();
        assert_eq!(patch, ModalOptionsPatch::new().escape_close(false));
    }

    #[test]
    fn non_objects_are_rejected() {
        let err = parse_options("[1, 2]").unwrap_err();
        assert_eq!(err.to_string(), "modal options must be an object, got an array");
        assert!(matches!(parse_options("true"), Err(WebError::NotAnObject { found: "a boolean" })));
    }

    #[test]
    fn mistyped_values_are_rejected() {
        assert!(matches!(
            parse_options(r#"{"fadeDuration": "slow"}"#),
            Err(WebError::Json(_))
        ));
        assert!(matches!(
            parse_options(r#"{"fadeDuration": -5}"#),
            Err(WebError::Json(_))
        ));
    }

    #[test]
    fn escape_keys_translate() {
        assert_eq!(key_event("Escape"), Event::escape());
        assert_eq!(key_event("Esc"), Event::escape());
        assert_ne!(key_event("Enter"), Event::escape());
    }
}
