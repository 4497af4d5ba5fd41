//! Values produced by evaluating a DEPS file

use serde_json::{Map, Value};

/// A value bound by a DEPS file assignment.
///
/// Mirrors the handful of Python types that can appear in a declarative DEPS
/// file. Dicts keep their insertion order.
#[derive(Debug, Clone, PartialEq)]
pub enum DepsValue {
    /// `None`
    None,
    /// `True` / `False`
    Bool(bool),
    /// Integer literal.
    Int(i128),
    /// Float literal.
    Float(f64),
    /// String literal.
    Str(String),
    /// `[...]`
    List(Vec<DepsValue>),
    /// `(...)`
    Tuple(Vec<DepsValue>),
    /// `{key: value, ...}` in insertion order.
    Dict(Vec<(DepsValue, DepsValue)>),
    /// `{a, b, ...}`
    Set(Vec<DepsValue>),
}

impl DepsValue {
    /// Python type name, used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            DepsValue::None => "NoneType",
            DepsValue::Bool(_) => "bool",
            DepsValue::Int(_) => "int",
            DepsValue::Float(_) => "float",
            DepsValue::Str(_) => "str",
            DepsValue::List(_) => "list",
            DepsValue::Tuple(_) => "tuple",
            DepsValue::Dict(_) => "dict",
            DepsValue::Set(_) => "set",
        }
    }

    /// Whether the value may be used as a dict key or set member.
    pub fn is_hashable(&self) -> bool {
        match self {
            DepsValue::List(_) | DepsValue::Dict(_) | DepsValue::Set(_) => false,
            DepsValue::Tuple(items) => items.iter().all(DepsValue::is_hashable),
            _ => true,
        }
    }

    /// Looks up `key` in a dict value.
    pub fn get(&self, key: &DepsValue) -> Option<&DepsValue> {
        match self {
            DepsValue::Dict(entries) => entries
                .iter()
                .find(|(k, _)| k.same_key(key))
                .map(|(_, v)| v),
            _ => None,
        }
    }

    /// Whether two hashable values select the same dict entry.
    ///
    /// Numbers compare by value across types, so `1`, `1.0` and `True` are
    /// one key.
    pub fn same_key(&self, other: &DepsValue) -> bool {
        match (self.as_number(), other.as_number()) {
            (Some(a), Some(b)) => a == b,
            _ => match (self, other) {
                (DepsValue::Tuple(a), DepsValue::Tuple(b)) => {
                    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same_key(y))
                }
                _ => self == other,
            },
        }
    }

    fn as_number(&self) -> Option<Numeric> {
        match self {
            DepsValue::Bool(b) => Some(Numeric::Int(i128::from(*b))),
            DepsValue::Int(i) => Some(Numeric::Int(*i)),
            DepsValue::Float(f) => Some(Numeric::Float(*f)),
            _ => None,
        }
    }

    /// Python `str()` of the value.
    pub fn to_py_str(&self) -> String {
        match self {
            DepsValue::Str(s) => s.clone(),
            other => other.repr(),
        }
    }

    fn repr(&self) -> String {
        match self {
            DepsValue::None => "None".to_string(),
            DepsValue::Bool(true) => "True".to_string(),
            DepsValue::Bool(false) => "False".to_string(),
            DepsValue::Int(i) => i.to_string(),
            DepsValue::Float(f) => float_repr(*f),
            DepsValue::Str(s) => format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")),
            DepsValue::List(items) => format!("[{}]", join_repr(items)),
            DepsValue::Tuple(items) if items.len() == 1 => format!("({},)", items[0].repr()),
            DepsValue::Tuple(items) => format!("({})", join_repr(items)),
            DepsValue::Set(items) if items.is_empty() => "set()".to_string(),
            DepsValue::Set(items) => format!("{{{}}}", join_repr(items)),
            DepsValue::Dict(entries) => {
                let parts: Vec<String> = entries
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k.repr(), v.repr()))
                    .collect();
                format!("{{{}}}", parts.join(", "))
            }
        }
    }

    /// Converts the value to JSON using the rules of Python's `json` encoder.
    ///
    /// Tuples become arrays and scalar dict keys are stringified. Sets,
    /// non-finite floats and tuple keys have no JSON form.
    pub fn to_json(&self) -> Result<Value, String> {
        Ok(match self {
            DepsValue::None => Value::Null,
            DepsValue::Bool(b) => Value::Bool(*b),
            DepsValue::Int(i) => int_to_json(*i)?,
            DepsValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .ok_or_else(|| format!("out of range float value {}", float_repr(*f)))?,
            DepsValue::Str(s) => Value::String(s.clone()),
            DepsValue::List(items) | DepsValue::Tuple(items) => Value::Array(
                items
                    .iter()
                    .map(DepsValue::to_json)
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            DepsValue::Dict(entries) => {
                let mut map = Map::new();
                for (key, value) in entries {
                    map.insert(json_key(key)?, value.to_json()?);
                }
                Value::Object(map)
            }
            DepsValue::Set(_) => return Err("object of type set is not JSON serializable".to_string()),
        })
    }
}

fn json_key(key: &DepsValue) -> Result<String, String> {
    match key {
        DepsValue::Str(s) => Ok(s.clone()),
        DepsValue::Int(i) => Ok(i.to_string()),
        DepsValue::Float(f) if f.is_finite() => Ok(float_repr(*f)),
        DepsValue::Bool(b) => Ok(b.to_string()),
        DepsValue::None => Ok("null".to_string()),
        other => Err(format!(
            "keys must be str, int, float, bool or None, not {}",
            other.type_name()
        )),
    }
}

fn join_repr(items: &[DepsValue]) -> String {
    items.iter().map(DepsValue::repr).collect::<Vec<_>>().join(", ")
}

fn int_to_json(i: i128) -> Result<Value, String> {
    if let Ok(i) = i64::try_from(i) {
        Ok(Value::from(i))
    } else if let Ok(u) = u64::try_from(i) {
        Ok(Value::from(u))
    } else {
        Err(format!("integer {i} does not fit in 64 bits"))
    }
}

/// Python `repr()` of a float.
///
/// Debug formatting switches to exponent notation at the same magnitudes as
/// Python but writes `1e16` and `1e-5` where Python writes `1e+16` and
/// `1e-05`.
fn float_repr(f: f64) -> String {
    if f.is_nan() {
        return "nan".to_string();
    }
    if f == f64::INFINITY {
        return "inf".to_string();
    }
    if f == f64::NEG_INFINITY {
        return "-inf".to_string();
    }

    let debug = format!("{f:?}");
    let Some((mantissa, exponent)) = debug.split_once('e') else {
        return debug;
    };
    let (sign, digits) = match exponent.strip_prefix('-') {
        Some(digits) => ('-', digits),
        None => ('+', exponent),
    };
    format!("{mantissa}e{sign}{digits:0>2}")
}

#[derive(Clone, Copy)]
enum Numeric {
    Int(i128),
    Float(f64),
}

impl PartialEq for Numeric {
    fn eq(&self, other: &Self) -> bool {
        match (*self, *other) {
            (Numeric::Int(a), Numeric::Int(b)) => a == b,
            (Numeric::Float(a), Numeric::Float(b)) => a == b,
            (Numeric::Int(i), Numeric::Float(f)) | (Numeric::Float(f), Numeric::Int(i)) => {
                f.fract() == 0.0 && f == i as f64 && f as i128 == i
            }
        }
    }
}
