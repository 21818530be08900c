//! Parameter validation keyed by `(type, method)`.
//!
//! A [`Schema`] maps scheme names such as `SelectorsCreateSelectorParams` to
//! [`Scheme`] descriptions. Validating raw JSON against a scheme normalizes it
//! into a [`Payload`]: unknown object keys are dropped, absent optionals are
//! omitted and `{guid}` tokens under a [`Scheme::Channel`] are resolved into
//! live dispatchers through a [`ChannelResolver`].

use std::collections::HashMap;
use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::dispatcher::Dispatcher;
use crate::payload::Payload;

#[cfg(test)]
mod tests;

/// Expected type name matching any dispatcher type in [`Scheme::Channel`].
pub const ANY_CHANNEL: &str = "*";

/// Failure to validate params, naming the offending path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    /// Error at `path`; the root path is empty and renders as the bare reason.
    pub fn at(path: &str, reason: impl std::fmt::Display) -> Self {
        let message = if path.is_empty() {
            reason.to_string()
        } else {
            format!("{path}: {reason}")
        };
        Self { message }
    }

    pub fn unknown_scheme(type_name: &str, method: &str) -> Self {
        Self {
            message: format!("Unknown scheme for {type_name}.{method}"),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Resolves guids found in reference tokens to live dispatchers.
pub trait ChannelResolver {
    fn resolve(&self, guid: &str) -> Option<Arc<Dispatcher>>;
}

/// Description of an accepted value shape.
///
/// Deserializes from `{"type": "<kind>", ...}`, so scheme tables can be
/// loaded from JSON as well as built in code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Scheme {
    Any,
    String,
    Number,
    Boolean,
    Null,
    /// Base64-encoded bytes carried as a string.
    Binary,
    Optional {
        of: Box<Scheme>,
    },
    Array {
        of: Box<Scheme>,
    },
    Object {
        #[serde(default)]
        properties: IndexMap<String, Scheme>,
    },
    Enum {
        values: Vec<String>,
    },
    /// Reference token resolved to a dispatcher of type `name` (or any, for `*`).
    Channel {
        name: String,
    },
}

impl Scheme {
    pub fn optional(of: Scheme) -> Self {
        Scheme::Optional { of: Box::new(of) }
    }

    pub fn array(of: Scheme) -> Self {
        Scheme::Array { of: Box::new(of) }
    }

    pub fn object<K, I>(properties: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Scheme)>,
    {
        Scheme::Object {
            properties: properties.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Object scheme with no properties; accepts any object and yields `{}`.
    pub fn empty_object() -> Self {
        Scheme::Object {
            properties: IndexMap::new(),
        }
    }

    pub fn enumeration<S: Into<String>>(values: impl IntoIterator<Item = S>) -> Self {
        Scheme::Enum {
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn channel(name: impl Into<String>) -> Self {
        Scheme::Channel { name: name.into() }
    }

    /// Validates `arg` (`None` when the key is absent).
    ///
    /// Returns `Ok(None)` only for an absent optional, which callers omit.
    pub fn validate(
        &self,
        arg: Option<&Value>,
        path: &str,
        resolver: &dyn ChannelResolver,
    ) -> Result<Option<Payload>, ValidationError> {
        match self {
            Scheme::Any => Ok(arg.cloned().map(Payload::from)),
            Scheme::String => match arg {
                Some(Value::String(s)) => Ok(Some(Payload::String(s.clone()))),
                other => Err(ValidationError::at(
                    path,
                    format!("expected string, got {}", describe(other)),
                )),
            },
            Scheme::Number => match arg {
                Some(Value::Number(n)) => Ok(Some(Payload::Number(n.clone()))),
                other => Err(ValidationError::at(
                    path,
                    format!("expected number, got {}", describe(other)),
                )),
            },
            Scheme::Boolean => match arg {
                Some(Value::Bool(b)) => Ok(Some(Payload::Bool(*b))),
                other => Err(ValidationError::at(
                    path,
                    format!("expected boolean, got {}", describe(other)),
                )),
            },
            Scheme::Null => match arg {
                Some(Value::Null) => Ok(Some(Payload::Null)),
                other => Err(ValidationError::at(
                    path,
                    format!("expected null, got {}", describe(other)),
                )),
            },
            Scheme::Binary => match arg {
                Some(Value::String(s)) if BASE64.decode(s).is_ok() => {
                    Ok(Some(Payload::String(s.clone())))
                }
                other => Err(ValidationError::at(
                    path,
                    format!("expected base64-encoded buffer, got {}", describe(other)),
                )),
            },
            Scheme::Optional { of } => match arg {
                None => Ok(None),
                Some(_) => of.validate(arg, path, resolver),
            },
            Scheme::Array { of } => match arg {
                Some(Value::Array(items)) => {
                    let mut out = Vec::with_capacity(items.len());
                    for (index, item) in items.iter().enumerate() {
                        let item_path = format!("{path}[{index}]");
                        out.push(
                            of.validate(Some(item), &item_path, resolver)?
                                .unwrap_or_default(),
                        );
                    }
                    Ok(Some(Payload::Array(out)))
                }
                other => Err(ValidationError::at(
                    path,
                    format!("expected array, got {}", describe(other)),
                )),
            },
            Scheme::Object { properties } => match arg {
                Some(Value::Object(map)) => {
                    let mut out = IndexMap::with_capacity(properties.len());
                    for (key, scheme) in properties {
                        let key_path = if path.is_empty() {
                            key.clone()
                        } else {
                            format!("{path}.{key}")
                        };
                        if let Some(value) = scheme.validate(map.get(key), &key_path, resolver)? {
                            out.insert(key.clone(), value);
                        }
                    }
                    Ok(Some(Payload::Object(out)))
                }
                other => Err(ValidationError::at(
                    path,
                    format!("expected object, got {}", describe(other)),
                )),
            },
            Scheme::Enum { values } => match arg {
                Some(Value::String(s)) if values.iter().any(|v| v == s) => {
                    Ok(Some(Payload::String(s.clone())))
                }
                _ => Err(ValidationError::at(
                    path,
                    format!("expected one of ({})", values.join("|")),
                )),
            },
            Scheme::Channel { name } => {
                let Some(guid) = arg.and_then(pw_dispatch_protocol::ObjectRef::from_value) else {
                    return Err(ValidationError::at(path, format!("expected {name}")));
                };
                let Some(dispatcher) = resolver.resolve(guid) else {
                    return Err(ValidationError::at(path, format!("no object with guid {guid}")));
                };
                if name != ANY_CHANNEL && dispatcher.type_name() != name {
                    return Err(ValidationError::at(
                        path,
                        format!(
                            "object with guid {guid} has type {}, expected {name}",
                            dispatcher.type_name()
                        ),
                    ));
                }
                Ok(Some(Payload::Node(dispatcher)))
            }
        }
    }
}

fn describe(arg: Option<&Value>) -> &'static str {
    match arg {
        None => "undefined",
        Some(Value::Null) => "null",
        Some(Value::Bool(_)) => "boolean",
        Some(Value::Number(_)) => "number",
        Some(Value::String(_)) => "string",
        Some(Value::Array(_)) => "array",
        Some(Value::Object(_)) => "object",
    }
}

/// Registry of params schemes by name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema {
    schemes: HashMap<String, Scheme>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Schema::insert`].
    pub fn with(mut self, name: impl Into<String>, scheme: Scheme) -> Self {
        self.insert(name, scheme);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, scheme: Scheme) {
        self.schemes.insert(name.into(), scheme);
    }

    /// Merges `other` over this schema; its schemes win on name clashes.
    pub fn extend(&mut self, other: Schema) {
        self.schemes.extend(other.schemes);
    }

    pub fn get(&self, name: &str) -> Option<&Scheme> {
        self.schemes.get(name)
    }

    pub fn len(&self) -> usize {
        self.schemes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemes.is_empty()
    }

    /// `("Selectors", "createSelector")` → `SelectorsCreateSelectorParams`.
    pub fn scheme_name(type_name: &str, method: &str) -> String {
        let mut chars = method.chars();
        let capitalized: String = match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        };
        format!("{type_name}{capitalized}Params")
    }

    /// Validates the params of `type_name.method`.
    ///
    /// Missing (`null`) params validate as `{}`.
    pub fn validate_params(
        &self,
        type_name: &str,
        method: &str,
        params: &Value,
        resolver: &dyn ChannelResolver,
    ) -> Result<Payload, ValidationError> {
        let scheme = self
            .get(&Self::scheme_name(type_name, method))
            .ok_or_else(|| ValidationError::unknown_scheme(type_name, method))?;

        let empty = Value::Object(serde_json::Map::new());
        let params = if params.is_null() { &empty } else { params };
        Ok(scheme.validate(Some(params), "", resolver)?.unwrap_or_default())
    }
}
