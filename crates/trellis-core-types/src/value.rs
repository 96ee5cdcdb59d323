//! Value domain
//!
//! A `Value` is a tagged union of the scalar and list shapes a leaf can
//! hold, carrying a handle to the resolved data type it was coerced
//! against. Coercion accepts wire-shaped input (`serde_json::Value`):
//! JSON numerics decode as float and are narrowed to the declared format,
//! 64-bit integers additionally accept decimal strings, enumerations
//! accept either label or ordinal, unions try members in declared order,
//! and list formats accept homogeneous arrays or singletons.

use std::fmt;
use std::rc::Rc;

use serde_json::Value as Json;
use thiserror::Error;

use crate::format::Format;

/// Result alias for value coercion
pub type Result<T> = std::result::Result<T, ValueError>;

/// Errors raised while coercing raw input into the value domain
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValueError {
    /// Raw input cannot be represented in the declared format
    #[error("cannot coerce {got} to {want}")]
    TypeMismatch { want: String, got: String },

    /// Enumeration label is not defined by the type
    #[error("not an allowed enumeration: {label}")]
    EnumNotFound { label: String },

    /// Enumeration ordinal is not defined by the type
    #[error("enumeration id {id} not defined")]
    EnumIdNotFound { id: i64 },

    /// No union member accepted the raw input
    #[error("no union member of {ident} accepts value")]
    UnionNoMatch { ident: String },
}

/// One label/id pair of an enumeration type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumEntry {
    pub label: String,
    pub id: i64,
}

/// A resolved data type: terminal format code plus restrictions
///
/// Typedef chains are collapsed before a `Type` reaches the value domain,
/// so `format` is always terminal. Restriction strings (`range`, `length`,
/// patterns) are carried opaquely for providers; the engine does not
/// evaluate them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Type {
    pub ident: String,
    pub format: Format,
    pub range: Option<String>,
    pub length: Option<String>,
    pub patterns: Vec<String>,
    pub enumeration: Vec<EnumEntry>,
    pub union: Vec<Rc<Type>>,
    pub leafref_path: Option<String>,
    pub identity_base: Option<String>,
    pub default_value: Option<String>,
    pub units: Option<String>,
}

impl Type {
    pub fn new(ident: impl Into<String>, format: Format) -> Self {
        Type {
            ident: ident.into(),
            format,
            ..Default::default()
        }
    }

    /// Look up an enumeration entry by label
    pub fn enum_by_label(&self, label: &str) -> Option<&EnumEntry> {
        self.enumeration.iter().find(|e| e.label == label)
    }

    /// Look up an enumeration entry by assigned id
    pub fn enum_by_id(&self, id: i64) -> Option<&EnumEntry> {
        self.enumeration.iter().find(|e| e.id == id)
    }

    pub fn has_default(&self) -> bool {
        self.default_value.is_some()
    }
}

/// The untyped payload of a `Value`
#[derive(Debug, Clone, PartialEq)]
pub enum Val {
    Empty,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Decimal(f64),
    Str(String),
    Enum { id: i64, label: String },
    Any(Json),
    List(Vec<Val>),
}

/// A typed value: payload plus the type it was coerced against
#[derive(Debug, Clone)]
pub struct Value {
    typ: Rc<Type>,
    val: Val,
}

impl Value {
    /// Coerce raw wire-shaped input against a type.
    ///
    /// # Errors
    /// `TypeMismatch` when the raw shape cannot be narrowed;
    /// `EnumNotFound`/`EnumIdNotFound` for undefined enumeration input;
    /// `UnionNoMatch` when no union member accepts the input.
    pub fn coerce(typ: &Rc<Type>, raw: &Json) -> Result<Value> {
        if typ.format == Format::Union {
            for member in &typ.union {
                if let Ok(v) = Value::coerce(member, raw) {
                    return Ok(v);
                }
            }
            return Err(ValueError::UnionNoMatch {
                ident: typ.ident.clone(),
            });
        }
        if typ.format.is_list() {
            let scalar = typ.format.scalar_of();
            let items: Vec<&Json> = match raw {
                Json::Array(a) => a.iter().collect(),
                // singletons auto-wrap
                other => vec![other],
            };
            let mut vals = Vec::with_capacity(items.len());
            for item in items {
                vals.push(coerce_scalar(typ, scalar, item)?);
            }
            return Ok(Value {
                typ: Rc::clone(typ),
                val: Val::List(vals),
            });
        }
        let val = coerce_scalar(typ, typ.format, raw)?;
        Ok(Value {
            typ: Rc::clone(typ),
            val,
        })
    }

    /// Coerce from the canonical string form, as used by URL keys and
    /// schema defaults.
    pub fn from_str_form(typ: &Rc<Type>, s: &str) -> Result<Value> {
        Value::coerce(typ, &Json::String(s.to_string()))
    }

    pub fn data_type(&self) -> &Rc<Type> {
        &self.typ
    }

    pub fn format(&self) -> Format {
        self.typ.format
    }

    pub fn val(&self) -> &Val {
        &self.val
    }

    /// Equality by format then payload; list payloads compare
    /// elementwise. Callers compare absent values through `Option`.
    pub fn equal(&self, other: &Value) -> bool {
        self.typ.format == other.typ.format && self.val == other.val
    }

    /// Wire (JSON) rendering: enumerations as labels, 64-bit integers as
    /// strings, anydata as the raw subtree, empty as null.
    pub fn to_json(&self) -> Json {
        val_to_json(&self.val, self.typ.format)
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.val {
            Val::Str(s) => Some(s),
            Val::Enum { label, .. } => Some(label),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self.val {
            Val::Int(n) => Some(n),
            Val::UInt(n) => i64::try_from(n).ok(),
            Val::Enum { id, .. } => Some(id),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.val {
            Val::Bool(b) => Some(b),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.equal(other)
    }
}

/// Canonical key string for a list item: comma-joined scalar renderings.
/// Reserved-character escaping happens at the URL layer.
pub fn encode_key(key: &[Value]) -> String {
    let parts: Vec<String> = key.iter().map(|v| v.to_string()).collect();
    parts.join(",")
}

fn coerce_scalar(typ: &Rc<Type>, format: Format, raw: &Json) -> Result<Val> {
    let mismatch = || ValueError::TypeMismatch {
        want: format_name(format),
        got: json_shape(raw),
    };
    match format {
        Format::Boolean => match raw {
            Json::Bool(b) => Ok(Val::Bool(*b)),
            Json::String(s) if s == "true" => Ok(Val::Bool(true)),
            Json::String(s) if s == "false" => Ok(Val::Bool(false)),
            _ => Err(mismatch()),
        },
        Format::Int8 | Format::Int16 | Format::Int32 | Format::Int64 => {
            let n = json_int(raw).ok_or_else(mismatch)?;
            let fits = match format {
                Format::Int8 => i8::try_from(n).is_ok(),
                Format::Int16 => i16::try_from(n).is_ok(),
                Format::Int32 => i32::try_from(n).is_ok(),
                _ => true,
            };
            if !fits {
                return Err(mismatch());
            }
            Ok(Val::Int(n))
        }
        Format::UInt8 | Format::UInt16 | Format::UInt32 | Format::UInt64 => {
            let n = json_uint(raw).ok_or_else(mismatch)?;
            let fits = match format {
                Format::UInt8 => u8::try_from(n).is_ok(),
                Format::UInt16 => u16::try_from(n).is_ok(),
                Format::UInt32 => u32::try_from(n).is_ok(),
                _ => true,
            };
            if !fits {
                return Err(mismatch());
            }
            Ok(Val::UInt(n))
        }
        Format::Decimal64 => match raw {
            Json::Number(n) => n.as_f64().map(Val::Decimal).ok_or_else(mismatch),
            Json::String(s) => s.parse::<f64>().map(Val::Decimal).map_err(|_| mismatch()),
            _ => Err(mismatch()),
        },
        Format::String
        | Format::Binary
        | Format::Bits
        | Format::IdentityRef
        | Format::InstanceIdentifier
        | Format::LeafRef => match raw {
            Json::String(s) => Ok(Val::Str(s.clone())),
            _ => Err(mismatch()),
        },
        Format::Enumeration => match raw {
            Json::String(s) => {
                // label first, then a decimal ordinal in string form
                if let Some(e) = typ.enum_by_label(s) {
                    return Ok(Val::Enum {
                        id: e.id,
                        label: e.label.clone(),
                    });
                }
                if let Ok(id) = s.parse::<i64>() {
                    if let Some(e) = typ.enum_by_id(id) {
                        return Ok(Val::Enum {
                            id: e.id,
                            label: e.label.clone(),
                        });
                    }
                }
                Err(ValueError::EnumNotFound { label: s.clone() })
            }
            Json::Number(n) => {
                let id = n.as_i64().ok_or_else(mismatch)?;
                let e = typ
                    .enum_by_id(id)
                    .ok_or(ValueError::EnumIdNotFound { id })?;
                Ok(Val::Enum {
                    id: e.id,
                    label: e.label.clone(),
                })
            }
            _ => Err(mismatch()),
        },
        Format::Empty => match raw {
            Json::Null => Ok(Val::Empty),
            Json::Array(a) if a.len() == 1 && a[0].is_null() => Ok(Val::Empty),
            _ => Err(mismatch()),
        },
        Format::AnyData => Ok(Val::Any(raw.clone())),
        // union and list formats are handled by the caller
        _ => Err(mismatch()),
    }
}

/// JSON-style numeric policy: numbers decode as float then narrow.
/// Decimal strings are accepted too, both for the 64-bit wire rule and
/// for the canonical string forms URL keys and defaults arrive in.
fn json_int(raw: &Json) -> Option<i64> {
    match raw {
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Some(i);
            }
            n.as_f64().map(|f| f as i64)
        }
        Json::String(s) => s.parse::<i64>().ok(),
        _ => None,
    }
}

fn json_uint(raw: &Json) -> Option<u64> {
    match raw {
        Json::Number(n) => {
            if let Some(u) = n.as_u64() {
                return Some(u);
            }
            match n.as_f64() {
                Some(f) if f >= 0.0 => Some(f as u64),
                _ => None,
            }
        }
        Json::String(s) => s.parse::<u64>().ok(),
        _ => None,
    }
}

fn val_to_json(val: &Val, format: Format) -> Json {
    match val {
        Val::Empty => Json::Null,
        Val::Bool(b) => Json::Bool(*b),
        Val::Int(n) => {
            // 64-bit integers travel as strings to survive JSON number loss
            if format.scalar_of() == Format::Int64 {
                Json::String(n.to_string())
            } else {
                Json::Number((*n).into())
            }
        }
        Val::UInt(n) => {
            if format.scalar_of() == Format::UInt64 {
                Json::String(n.to_string())
            } else {
                Json::Number((*n).into())
            }
        }
        Val::Decimal(f) => serde_json::Number::from_f64(*f)
            .map(Json::Number)
            .unwrap_or(Json::Null),
        Val::Str(s) => Json::String(s.clone()),
        Val::Enum { label, .. } => Json::String(label.clone()),
        Val::Any(j) => j.clone(),
        Val::List(items) => Json::Array(
            items
                .iter()
                .map(|i| val_to_json(i, format.scalar_of()))
                .collect(),
        ),
    }
}

fn format_name(f: Format) -> String {
    format!("{:?}", f)
}

fn json_shape(raw: &Json) -> String {
    match raw {
        Json::Null => "null",
        Json::Bool(_) => "boolean",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
    .to_string()
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_val(f, &self.val)
    }
}

fn write_val(f: &mut fmt::Formatter<'_>, val: &Val) -> fmt::Result {
    match val {
        Val::Empty => Ok(()),
        Val::Bool(b) => write!(f, "{}", b),
        Val::Int(n) => write!(f, "{}", n),
        Val::UInt(n) => write!(f, "{}", n),
        Val::Decimal(d) => write!(f, "{}", d),
        Val::Str(s) => write!(f, "{}", s),
        Val::Enum { label, .. } => write!(f, "{}", label),
        Val::Any(j) => write!(f, "{}", j),
        Val::List(items) => {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    write!(f, ",")?;
                }
                write_val(f, item)?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn t(format: Format) -> Rc<Type> {
        Rc::new(Type::new("test", format))
    }

    fn enum_type() -> Rc<Type> {
        let mut ty = Type::new("color", Format::Enumeration);
        ty.enumeration = vec![
            EnumEntry {
                label: "red".into(),
                id: 0,
            },
            EnumEntry {
                label: "blue".into(),
                id: 1,
            },
        ];
        Rc::new(ty)
    }

    #[test]
    fn test_coerce_narrowing() {
        let v = Value::coerce(&t(Format::Int32), &json!(14)).unwrap();
        assert_eq!(v.as_int(), Some(14));

        // JSON float narrows to integer formats
        let v = Value::coerce(&t(Format::Int32), &json!(14.0)).unwrap();
        assert_eq!(v.as_int(), Some(14));

        assert!(Value::coerce(&t(Format::Int8), &json!(1000)).is_err());
        assert!(Value::coerce(&t(Format::UInt8), &json!(-1)).is_err());
    }

    #[test]
    fn test_coerce_int64_string() {
        let v = Value::coerce(&t(Format::Int64), &json!("9007199254740993")).unwrap();
        assert_eq!(v.as_int(), Some(9007199254740993));
        assert_eq!(v.to_json(), json!("9007199254740993"));
    }

    #[test]
    fn test_enum_label_and_ordinal() {
        let ty = enum_type();
        let by_label = Value::coerce(&ty, &json!("blue")).unwrap();
        let by_ordinal = Value::coerce(&ty, &json!(1)).unwrap();
        assert!(by_label.equal(&by_ordinal));
        assert_eq!(by_label.to_json(), json!("blue"));

        let err = Value::coerce(&ty, &json!("green")).unwrap_err();
        assert_eq!(
            err,
            ValueError::EnumNotFound {
                label: "green".into()
            }
        );
    }

    #[test]
    fn test_union_first_success_wins() {
        let mut ty = Type::new("port-or-name", Format::Union);
        ty.union = vec![t(Format::UInt16), t(Format::String)];
        let ty = Rc::new(ty);

        let v = Value::coerce(&ty, &json!(8080)).unwrap();
        assert_eq!(v.format(), Format::UInt16);

        let v = Value::coerce(&ty, &json!("http-alt")).unwrap();
        assert_eq!(v.format(), Format::String);
    }

    #[test]
    fn test_list_singleton_wrap() {
        let v = Value::coerce(&t(Format::StringList), &json!(["a", "b"])).unwrap();
        assert_eq!(v.to_json(), json!(["a", "b"]));

        let v = Value::coerce(&t(Format::StringList), &json!("solo")).unwrap();
        assert_eq!(v.to_json(), json!(["solo"]));
    }

    #[test]
    fn test_equality() {
        let a = Value::coerce(&t(Format::String), &json!("x")).unwrap();
        let b = Value::coerce(&t(Format::String), &json!("x")).unwrap();
        let c = Value::coerce(&t(Format::String), &json!("y")).unwrap();
        assert!(a.equal(&b));
        assert!(!a.equal(&c));
    }

    #[test]
    fn test_encode_key() {
        let k1 = Value::coerce(&t(Format::String), &json!("walter")).unwrap();
        let k2 = Value::coerce(&t(Format::Int32), &json!(7)).unwrap();
        assert_eq!(encode_key(&[k1, k2]), "walter,7");
    }
}
