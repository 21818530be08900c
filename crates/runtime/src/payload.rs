//! Structured values that may hold live dispatcher references.
//!
//! Validated params and method results are [`Payload`]s. On the way in the
//! validator replaces `{guid}` reference tokens with [`Payload::Node`]; on the
//! way out [`Payload::encode`] turns nodes back into tokens.

use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::{Map, Number, Value};

use crate::dispatcher::Dispatcher;
use crate::error::{Error, Result};
use crate::validator::ValidationError;

/// JSON-like value whose leaves may be live dispatchers.
#[derive(Clone, Default)]
pub enum Payload {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Array(Vec<Payload>),
    Object(IndexMap<String, Payload>),
    Node(Arc<Dispatcher>),
}

impl Payload {
    /// Empty keyed structure, `{}` on the wire.
    pub fn empty_object() -> Self {
        Payload::Object(IndexMap::new())
    }

    /// Builds a keyed structure from `(key, value)` pairs, keeping their order.
    pub fn object<K, V, I>(entries: I) -> Self
    where
        K: Into<String>,
        V: Into<Payload>,
        I: IntoIterator<Item = (K, V)>,
    {
        Payload::Object(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Payload::Null)
    }

    pub fn get(&self, key: &str) -> Option<&Payload> {
        match self {
            Payload::Object(map) => map.get(key),
            _ => None,
        }
    }

    /// Like [`Payload::get`] but reports a missing key as a validation error.
    pub fn field(&self, key: &str) -> Result<&Payload> {
        self.get(key)
            .ok_or_else(|| ValidationError::at(key, "expected value, got undefined").into())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Payload::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Payload::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Payload::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Payload]> {
        match self {
            Payload::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<&Arc<Dispatcher>> {
        match self {
            Payload::Node(node) => Some(node),
            _ => None,
        }
    }

    /// Encodes into wire JSON, replacing every dispatcher with `{guid}`.
    ///
    /// With `allow_nodes == false` any dispatcher is rejected with
    /// [`Error::NodeRefNotAllowed`]. Disposed dispatchers are always rejected:
    /// the client could never resolve their guid.
    pub fn encode(&self, allow_nodes: bool) -> Result<Value> {
        Ok(match self {
            Payload::Null => Value::Null,
            Payload::Bool(b) => Value::Bool(*b),
            Payload::Number(n) => Value::Number(n.clone()),
            Payload::String(s) => Value::String(s.clone()),
            Payload::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| item.encode(allow_nodes))
                    .collect::<Result<_>>()?,
            ),
            Payload::Object(map) => {
                let mut out = Map::with_capacity(map.len());
                for (key, value) in map {
                    out.insert(key.clone(), value.encode(allow_nodes)?);
                }
                Value::Object(out)
            }
            Payload::Node(node) => {
                if !allow_nodes {
                    return Err(Error::NodeRefNotAllowed);
                }
                if node.is_disposed() {
                    return Err(Error::DisposedReference {
                        guid: node.guid().to_string(),
                    });
                }
                let mut token = Map::with_capacity(1);
                token.insert("guid".to_string(), Value::String(node.guid().to_string()));
                Value::Object(token)
            }
        })
    }
}

impl std::fmt::Debug for Payload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Payload::Null => f.write_str("Null"),
            Payload::Bool(b) => write!(f, "{b}"),
            Payload::Number(n) => write!(f, "{n}"),
            Payload::String(s) => write!(f, "{s:?}"),
            Payload::Array(items) => f.debug_list().entries(items).finish(),
            Payload::Object(map) => f.debug_map().entries(map).finish(),
            Payload::Node(node) => write!(f, "<{}>", node.guid()),
        }
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Payload::Null,
            Value::Bool(b) => Payload::Bool(b),
            Value::Number(n) => Payload::Number(n),
            Value::String(s) => Payload::String(s),
            Value::Array(items) => Payload::Array(items.into_iter().map(Payload::from).collect()),
            Value::Object(map) => {
                Payload::Object(map.into_iter().map(|(k, v)| (k, Payload::from(v))).collect())
            }
        }
    }
}

impl From<Arc<Dispatcher>> for Payload {
    fn from(node: Arc<Dispatcher>) -> Self {
        Payload::Node(node)
    }
}

impl From<&Arc<Dispatcher>> for Payload {
    fn from(node: &Arc<Dispatcher>) -> Self {
        Payload::Node(Arc::clone(node))
    }
}

impl From<String> for Payload {
    fn from(s: String) -> Self {
        Payload::String(s)
    }
}

impl From<&str> for Payload {
    fn from(s: &str) -> Self {
        Payload::String(s.to_string())
    }
}

impl From<bool> for Payload {
    fn from(b: bool) -> Self {
        Payload::Bool(b)
    }
}

impl From<i64> for Payload {
    fn from(n: i64) -> Self {
        Payload::Number(n.into())
    }
}

impl From<u64> for Payload {
    fn from(n: u64) -> Self {
        Payload::Number(n.into())
    }
}

impl From<f64> for Payload {
    /// Non-finite numbers have no JSON form and become `Null`.
    fn from(n: f64) -> Self {
        Number::from_f64(n).map_or(Payload::Null, Payload::Number)
    }
}

impl<T: Into<Payload>> From<Option<T>> for Payload {
    fn from(value: Option<T>) -> Self {
        value.map_or(Payload::Null, Into::into)
    }
}

impl<T: Into<Payload>> From<Vec<T>> for Payload {
    fn from(items: Vec<T>) -> Self {
        Payload::Array(items.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::connection::Connection;
    use crate::validator::{Scheme, Schema};

    struct Member(u32);

    fn group_of(count: u32) -> (Arc<Connection>, Arc<Dispatcher>, Vec<Arc<Dispatcher>>) {
        let connection = Connection::new(Schema::new());
        let root = connection.root().unwrap();
        let scope = Dispatcher::builder("Group")
            .scope()
            .guid("group@1")
            .create(&root, Arc::new(Member(0)));
        let members = (1..=count)
            .map(|i| {
                Dispatcher::builder("Member")
                    .guid(format!("member@{i}"))
                    .create(&scope, Arc::new(Member(i)))
            })
            .collect();
        (connection, scope, members)
    }

    /// `{options: {groups: [{members: [a, b]}, {members: [c]}]}}`
    fn nested(members: &[Arc<Dispatcher>]) -> Payload {
        let groups = vec![
            Payload::object([("members", vec![&members[0], &members[1]])]),
            Payload::object([("members", vec![&members[2]])]),
        ];
        Payload::object([("options", Payload::object([("groups", groups)]))])
    }

    #[test]
    fn encode_replaces_nodes_at_any_depth() {
        let (_connection, _scope, members) = group_of(3);
        let encoded = nested(&members).encode(true).unwrap();
        assert_eq!(
            encoded,
            json!({"options": {"groups": [
                {"members": [{"guid": "member@1"}, {"guid": "member@2"}]},
                {"members": [{"guid": "member@3"}]},
            ]}})
        );
    }

    #[test]
    fn nested_tokens_resolve_to_the_same_dispatchers() {
        let (connection, _scope, members) = group_of(3);
        let schema = Schema::new().with(
            "GroupAssignParams",
            Scheme::object([(
                "options",
                Scheme::object([(
                    "groups",
                    Scheme::array(Scheme::object([(
                        "members",
                        Scheme::array(Scheme::channel("Member")),
                    )])),
                )]),
            )]),
        );

        let encoded = nested(&members).encode(true).unwrap();
        let resolver: &Connection = &connection;
        let validated = schema
            .validate_params("Group", "assign", &encoded, resolver)
            .unwrap();

        let groups = validated
            .get("options")
            .and_then(|options| options.get("groups"))
            .and_then(Payload::as_array)
            .unwrap();
        let resolved: Vec<&Arc<Dispatcher>> = groups
            .iter()
            .flat_map(|group| group.get("members").and_then(Payload::as_array).unwrap())
            .map(|member| member.as_node().unwrap())
            .collect();
        assert_eq!(resolved.len(), 3);
        for (resolved, member) in resolved.iter().zip(&members) {
            assert!(Arc::ptr_eq(resolved, member));
            assert_eq!(resolved.object::<Member>().unwrap().0, member.object::<Member>().unwrap().0);
        }
    }

    #[test]
    fn deeply_nested_node_is_rejected_when_not_allowed() {
        let (_connection, _scope, members) = group_of(3);
        assert!(matches!(
            nested(&members).encode(false),
            Err(Error::NodeRefNotAllowed)
        ));

        let plain = Payload::object([("options", Payload::object([("groups", vec![Payload::from(1_i64)])]))]);
        assert_eq!(
            plain.encode(false).unwrap(),
            json!({"options": {"groups": [1]}})
        );
    }

    #[test]
    fn deeply_nested_disposed_node_is_rejected() {
        let (_connection, _scope, members) = group_of(3);
        members[2].dispose();
        match nested(&members).encode(true) {
            Err(Error::DisposedReference { guid }) => assert_eq!(guid, "member@3"),
            other => panic!("expected DisposedReference, got {other:?}"),
        }
    }
}
