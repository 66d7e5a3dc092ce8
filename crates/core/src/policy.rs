//! Identity and equality policy.
//!
//! Two representations of the same workload differ meaningfully only when
//! their version tokens differ. Tokens are compared as parsed JSON values,
//! so `"10"` and `"1e1"` are the same version while `"10"` and `"\"10\""`
//! are not. No ordering is inferred from token content: equal tokens mean
//! "no change", anything else means "replace".

use serde_json::{Number, Value};

use crate::{ObjectKey, Versioned};

/// Parsed form of a `resourceVersion`-like token.
#[derive(Debug, Clone)]
pub enum VersionToken {
    Number(Number),
    Text(String),
}

impl PartialEq for VersionToken {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (VersionToken::Number(a), VersionToken::Number(b)) => numbers_equal(a, b),
            (VersionToken::Text(a), VersionToken::Text(b)) => a == b,
            _ => false,
        }
    }
}

fn numbers_equal(a: &Number, b: &Number) -> bool {
    if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
        return x == y;
    }
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return x == y;
    }
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

/// Parse a version token. Anything that is not valid JSON is kept verbatim.
pub fn parse_version(raw: &str) -> VersionToken {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Number(n)) => VersionToken::Number(n),
        Ok(Value::String(s)) => VersionToken::Text(s),
        Ok(other) => VersionToken::Text(other.to_string()),
        Err(_) => VersionToken::Text(raw.to_string()),
    }
}

pub fn identity<T: Versioned>(entity: &T) -> Option<ObjectKey> {
    entity.key()
}

/// True iff `incoming` has the identity `key`.
pub fn matches<T: Versioned>(key: &ObjectKey, incoming: &T) -> bool {
    incoming.key().as_ref() == Some(key)
}

/// Version equality. Either side lacking identity or a version token is
/// never equal, which forces an update.
pub fn equal<T: Versioned>(a: &T, b: &T) -> bool {
    if a.key().is_none() || b.key().is_none() {
        return false;
    }
    match (a.version(), b.version()) {
        (Some(va), Some(vb)) => parse_version(va) == parse_version(vb),
        _ => false,
    }
}
