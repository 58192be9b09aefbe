//! Argument declarations and normalization of raw model arguments.
//!
//! Models routinely send a bare string where a list was declared, or use a
//! key from an older prompt revision. Normalization fixes what is
//! unambiguous and reports everything else before a tool runs.

use std::collections::HashMap;

use serde_json::{json, Map, Value};
use thiserror::Error;

/// Shape of a declared argument
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    Text,
    TextList,
    /// Text restricted to the listed values (matched case-insensitively)
    Choice(&'static [&'static str]),
}

/// One declared tool argument
#[derive(Debug, Clone, Copy)]
pub struct ArgSpec {
    pub name: &'static str,
    pub kind: ArgKind,
    pub required: bool,
    /// Older key names accepted in place of `name`
    pub aliases: &'static [&'static str],
    pub description: &'static str,
}

impl ArgSpec {
    pub const fn text(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            kind: ArgKind::Text,
            required: true,
            aliases: &[],
            description,
        }
    }

    pub const fn list(name: &'static str, description: &'static str) -> Self {
        Self {
            kind: ArgKind::TextList,
            ..Self::text(name, description)
        }
    }

    pub const fn choice(name: &'static str, values: &'static [&'static str], description: &'static str) -> Self {
        Self {
            kind: ArgKind::Choice(values),
            ..Self::text(name, description)
        }
    }

    pub const fn optional(self) -> Self {
        Self { required: false, ..self }
    }

    pub const fn aliases(self, aliases: &'static [&'static str]) -> Self {
        Self { aliases, ..self }
    }

    fn lookup<'a>(&self, args: &'a Map<String, Value>) -> Option<&'a Value> {
        std::iter::once(self.name)
            .chain(self.aliases.iter().copied())
            .filter_map(|key| args.get(key))
            .find(|v| !v.is_null())
    }
}

/// Why arguments were rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgError {
    #[error("missing {}", .0.join(", "))]
    Missing(Vec<&'static str>),

    #[error("malformed arguments: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ArgValue {
    Text(String),
    List(Vec<String>),
}

/// Normalized, validated arguments
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolArgs {
    values: HashMap<&'static str, ArgValue>,
}

impl ToolArgs {
    /// Text value of a declared argument, if present.
    pub fn text(&self, name: &str) -> Option<&str> {
        match self.values.get(name)? {
            ArgValue::Text(s) => Some(s),
            ArgValue::List(_) => None,
        }
    }

    /// List value of a declared argument; empty when absent.
    pub fn list(&self, name: &str) -> &[String] {
        match self.values.get(name) {
            Some(ArgValue::List(items)) => items,
            _ => &[],
        }
    }
}

/// Normalize raw model arguments against the declarations.
pub fn normalize(specs: &[ArgSpec], raw: &Value) -> Result<ToolArgs, ArgError> {
    let empty = Map::new();
    let object = match raw {
        Value::Object(map) => map,
        Value::Null => &empty,
        other => {
            return Err(ArgError::Malformed(format!(
                "expected an object of named arguments, got {}",
                type_name(other)
            )))
        }
    };

    let mut args = ToolArgs::default();
    let mut missing = Vec::new();

    for spec in specs {
        let value = match spec.lookup(object) {
            Some(raw) => coerce(spec, raw)?,
            None => None,
        };
        match value {
            Some(v) => {
                args.values.insert(spec.name, v);
            }
            None if spec.required => missing.push(spec.name),
            None => {}
        }
    }

    if missing.is_empty() {
        Ok(args)
    } else {
        Err(ArgError::Missing(missing))
    }
}

/// `Ok(None)` means "present but blank", which counts as missing.
fn coerce(spec: &ArgSpec, raw: &Value) -> Result<Option<ArgValue>, ArgError> {
    match spec.kind {
        ArgKind::Text => Ok(scalar_text(spec, raw)?.map(ArgValue::Text)),
        ArgKind::Choice(values) => {
            let Some(text) = scalar_text(spec, raw)? else {
                return Ok(None);
            };
            let canonical = values
                .iter()
                .find(|v| v.eq_ignore_ascii_case(&text))
                .map(|v| v.to_string())
                .unwrap_or(text);
            Ok(Some(ArgValue::Text(canonical)))
        }
        ArgKind::TextList => {
            let items: Vec<String> = match raw {
                Value::String(s) => vec![s.trim().to_string()],
                Value::Array(values) => values
                    .iter()
                    .map(|v| match v {
                        Value::String(s) => Ok(s.trim().to_string()),
                        Value::Number(n) => Ok(n.to_string()),
                        other => Err(ArgError::Malformed(format!(
                            "'{}' must contain only strings, found {}",
                            spec.name,
                            type_name(other)
                        ))),
                    })
                    .collect::<Result<_, _>>()?,
                other => {
                    return Err(ArgError::Malformed(format!(
                        "'{}' must be a list of strings, got {}",
                        spec.name,
                        type_name(other)
                    )))
                }
            };
            let items: Vec<String> = items.into_iter().filter(|s| !s.is_empty()).collect();
            Ok((!items.is_empty()).then_some(ArgValue::List(items)))
        }
    }
}

fn scalar_text(spec: &ArgSpec, raw: &Value) -> Result<Option<String>, ArgError> {
    let text = match raw {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(values) if values.len() == 1 => return scalar_text(spec, &values[0]),
        other => {
            return Err(ArgError::Malformed(format!(
                "'{}' must be a string, got {}",
                spec.name,
                type_name(other)
            )))
        }
    };
    Ok((!text.is_empty()).then_some(text))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

/// JSON schema for the provider's function declaration.
pub fn schema(specs: &[ArgSpec]) -> Value {
    let mut properties = Map::new();
    for spec in specs {
        let property = match spec.kind {
            ArgKind::Text => json!({"type": "string", "description": spec.description}),
            ArgKind::TextList => json!({
                "type": "array",
                "items": {"type": "string"},
                "description": spec.description
            }),
            ArgKind::Choice(values) => json!({
                "type": "string",
                "enum": values,
                "description": spec.description
            }),
        };
        properties.insert(spec.name.to_string(), property);
    }

    let required: Vec<&str> = specs.iter().filter(|s| s.required).map(|s| s.name).collect();
    json!({
        "type": "object",
        "properties": properties,
        "required": required
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPECS: &[ArgSpec] = &[
        ArgSpec::list("item_names", "Items").aliases(&["item_name"]),
        ArgSpec::text("customer_email", "Email"),
        ArgSpec::choice("meeting_type", &["video_call", "phone_call"], "Type").optional(),
    ];

    #[test]
    fn test_string_wrapped_into_list() {
        let args = normalize(SPECS, &json!({"item_names": "Disc Harrow", "customer_email": "a@b.cl"})).unwrap();
        assert_eq!(args.list("item_names"), ["Disc Harrow".to_string()]);
    }

    #[test]
    fn test_legacy_alias_accepted() {
        let args = normalize(SPECS, &json!({"item_name": "Sprayer", "customer_email": "a@b.cl"})).unwrap();
        assert_eq!(args.list("item_names"), ["Sprayer".to_string()]);
    }

    #[test]
    fn test_canonical_key_wins_over_alias() {
        let raw = json!({"item_names": ["A"], "item_name": "B", "customer_email": "a@b.cl"});
        let args = normalize(SPECS, &raw).unwrap();
        assert_eq!(args.list("item_names"), ["A".to_string()]);
    }

    #[test]
    fn test_values_are_trimmed_and_blanks_missing() {
        let raw = json!({"item_names": ["  A ", ""], "customer_email": "   "});
        let err = normalize(SPECS, &raw).unwrap_err();
        assert_eq!(err, ArgError::Missing(vec!["customer_email"]));
        assert_eq!(err.to_string(), "missing customer_email");
    }

    #[test]
    fn test_all_missing_fields_reported() {
        let err = normalize(SPECS, &json!({})).unwrap_err();
        assert_eq!(err.to_string(), "missing item_names, customer_email");

        let err = normalize(SPECS, &Value::Null).unwrap_err();
        assert_eq!(err, ArgError::Missing(vec!["item_names", "customer_email"]));
    }

    #[test]
    fn test_choice_canonicalized_case_insensitively() {
        let raw = json!({"item_names": ["A"], "customer_email": "a@b.cl", "meeting_type": "PHONE_CALL"});
        let args = normalize(SPECS, &raw).unwrap();
        assert_eq!(args.text("meeting_type"), Some("phone_call"));
    }

    #[test]
    fn test_malformed_shapes_rejected() {
        assert!(matches!(normalize(SPECS, &json!("Disc Harrow")), Err(ArgError::Malformed(_))));

        let raw = json!({"item_names": {"name": "A"}, "customer_email": "a@b.cl"});
        assert!(matches!(normalize(SPECS, &raw), Err(ArgError::Malformed(_))));

        let raw = json!({"item_names": ["A", {"x": 1}], "customer_email": "a@b.cl"});
        assert!(matches!(normalize(SPECS, &raw), Err(ArgError::Malformed(_))));
    }

    #[test]
    fn test_arg_error_messages() {
        let err = normalize(SPECS, &json!([1, 2])).unwrap_err();
        assert_eq!(err.to_string(), "malformed arguments: expected an object of named arguments, got a list");

        let boxed: Box<dyn std::error::Error + Send + Sync> = Box::new(ArgError::Missing(vec!["a", "b"]));
        assert_eq!(boxed.to_string(), "missing a, b");
    }

    #[test]
    fn test_numbers_accepted_as_text() {
        let specs = [ArgSpec::text("customer_phone", "Phone")];
        let args = normalize(&specs, &json!({"customer_phone": 56912345678u64})).unwrap();
        assert_eq!(args.text("customer_phone"), Some("56912345678"));
    }

    #[test]
    fn test_schema_lists_required_fields() {
        let schema = schema(SPECS);
        assert_eq!(schema["required"], json!(["item_names", "customer_email"]));
        assert_eq!(schema["properties"]["item_names"]["type"], "array");
        assert_eq!(schema["properties"]["meeting_type"]["enum"], json!(["video_call", "phone_call"]));
    }
}
