use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single request parameter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub value: Value,
}

/// Request parameters in capture order.
///
/// Sources are appended in the order query string, form body, JSON body.
/// Rendered as `{"name" => "value", ...}`; no parameters render as `""`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Params(Vec<Param>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.push(Param {
            name: name.into(),
            value: value.into(),
        });
    }

    /// Append every top-level member of a JSON object body.
    pub fn extend_from_json(&mut self, object: &serde_json::Map<String, Value>) {
        for (name, value) in object {
            self.push(name.clone(), value.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Param> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Params
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (name, value) in iter {
            params.push(name, value);
        }
        params
    }
}

impl fmt::Display for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return Ok(());
        }
        f.write_str("{")?;
        for (i, param) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            // Value's Display is compact JSON, so strings come out quoted and escaped.
            write!(f, "{} => {}", Value::String(param.name.clone()), param.value)?;
        }
        f.write_str("}")
    }
}
