//! Tool specifications advertised to the model and checked at dispatch.

use crate::error::ToolError;
use serde::Serialize;
use serde_json::{json, Map, Value};

/// Primitive parameter types understood by the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    Number,
    Integer,
    String,
    Boolean,
}

impl ParamType {
    fn accepts(self, value: &Value) -> bool {
        match self {
            Self::Number => value.is_number(),
            Self::Integer => match value {
                Value::Number(n) => {
                    n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.fract() == 0.0)
                }
                _ => false,
            },
            Self::String => value.is_string(),
            Self::Boolean => value.is_boolean(),
        }
    }
}

/// One named parameter of a tool.
#[derive(Debug, Clone, Serialize)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamType,
    pub description: &'static str,
    pub required: bool,
}

/// Machine-readable advertisement of a tool.
#[derive(Debug, Clone, Serialize)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    /// Ordered parameter list.
    pub params: Vec<ParamSpec>,
}

impl ToolSpec {
    /// Render the parameter list as a JSON Schema object.
    pub fn json_schema(&self) -> Value {
        let mut properties = Map::new();
        for p in &self.params {
            properties.insert(
                p.name.to_string(),
                json!({ "type": p.kind, "description": p.description }),
            );
        }
        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name)
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Check `args` against the schema and return the normalized argument
    /// object (null optional values dropped).
    pub fn validate(&self, args: &Value) -> Result<Map<String, Value>, ToolError> {
        let object = match args {
            Value::Null => Map::new(),
            Value::Object(map) => map.clone(),
            other => {
                return Err(ToolError::invalid(
                    self.name,
                    format!("expected an object, got {}", type_name(other)),
                ))
            }
        };

        if let Some(unknown) = object
            .keys()
            .find(|k| !self.params.iter().any(|p| p.name == k.as_str()))
        {
            return Err(ToolError::invalid(self.name, format!("unknown parameter '{unknown}'")));
        }

        let mut normalized = Map::new();
        for p in &self.params {
            match object.get(p.name) {
                None | Some(Value::Null) => {
                    if p.required {
                        return Err(ToolError::invalid(
                            self.name,
                            format!("missing required parameter '{}'", p.name),
                        ));
                    }
                }
                Some(value) if !p.kind.accepts(value) => {
                    return Err(ToolError::invalid(
                        self.name,
                        format!(
                            "parameter '{}' must be {:?}, got {}",
                            p.name,
                            p.kind,
                            type_name(value)
                        ),
                    ));
                }
                Some(value) => {
                    normalized.insert(p.name.to_string(), value.clone());
                }
            }
        }

        Ok(normalized)
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
