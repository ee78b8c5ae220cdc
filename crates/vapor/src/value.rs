//! value representation
//!
//! Every attribute of a template element holds a [Value]. The data types are
//! - boolean (true/false)
//! - integer (i64)
//! - decimal (f64)
//! - string (utf-8)
//! - array ("list" of values)
//! - object (order-preserving "map"/"dictionary", where the key is of type string)
//! - reference to another element or pseudo parameter (`{ "Ref": name }`)
//! - intrinsic function call (`{ "Fn::Name": args }`), see [crate::intrinsics]
//!
//! Values are never evaluated by this crate. References and function calls are kept structurally
//! and written out as-is; the provisioning engine resolves them.
//!
//! There is no `null`. Use [crate::intrinsics::Pseudo::NoValue] to drop a property conditionally.
//! Decimals must be finite; serializing `NaN` or an infinity fails.
use crate::intrinsics::{Intrinsic, Pseudo};
use indexmap::IndexMap;
use serde::{
    ser::{Error, SerializeMap, SerializeSeq},
    Serializer,
};

/// Ordered key/value pairs of an [Value::Object]
pub type Object = IndexMap<String, Value>;

/// All possible value types
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Boolean(bool),
    Integer(i64),
    Decimal(f64),
    String(String),
    Array(Vec<Value>),
    Object(Object),
    Ref(String),
    Call(Intrinsic),
}

impl Value {
    /// Build an object from key/value pairs, keeping their order
    pub fn object<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Value::Object(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Reference another element or pseudo parameter by name
    pub fn reference(name: impl Into<String>) -> Self {
        Value::Ref(name.into())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Merge `other` into `self`
    ///
    /// Two objects are merged one level deep: every key of `other` replaces the value under that
    /// key as a whole, existing keys keep their position. Anything else is replaced by `other`.
    pub fn merge(&mut self, other: Value) {
        match (self, other) {
            (Value::Object(existing), Value::Object(incoming)) => existing.extend(incoming),
            (this, other) => *this = other,
        }
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<&String> for Value {
    fn from(value: &String) -> Self {
        Value::String(value.clone())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Integer(value.into())
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Self::Integer(value.into())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Decimal(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Value::Array(value.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for Value {
    fn from(value: [T; N]) -> Self {
        Value::Array(value.into_iter().map(Into::into).collect())
    }
}

impl<K: Into<String>, V: Into<Value>> From<IndexMap<K, V>> for Value {
    fn from(value: IndexMap<K, V>) -> Self {
        Value::object(value)
    }
}

impl From<Intrinsic> for Value {
    fn from(value: Intrinsic) -> Self {
        Value::Call(value)
    }
}

impl From<Pseudo> for Value {
    fn from(value: Pseudo) -> Self {
        Value::Ref(value.name().to_string())
    }
}

impl serde::ser::Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Boolean(value) => serializer.serialize_bool(*value),
            Value::Integer(value) => serializer.serialize_i64(*value),
            Value::Decimal(value) if !value.is_finite() => Err(Error::custom(format!(
                "decimal {value} has no representation in the document"
            ))),
            Value::Decimal(value) => serializer.serialize_f64(*value),
            Value::String(value) => serializer.serialize_str(value),
            Value::Array(value) => {
                let mut ser = serializer.serialize_seq(Some(value.len()))?;
                for element in value {
                    ser.serialize_element(element)?;
                }
                ser.end()
            }
            Value::Object(value) => {
                let mut ser = serializer.serialize_map(Some(value.len()))?;
                for (element_key, element_value) in value {
                    ser.serialize_entry(element_key, element_value)?;
                }
                ser.end()
            }
            Value::Ref(name) => {
                let mut ser = serializer.serialize_map(Some(1))?;
                ser.serialize_entry("Ref", name)?;
                ser.end()
            }
            Value::Call(call) => {
                let mut ser = serializer.serialize_map(Some(1))?;
                let key = format!("Fn::{}", call.function());
                match call.bare_operand() {
                    Some(operand) => ser.serialize_entry(&key, operand)?,
                    None => ser.serialize_entry(&key, call.args())?,
                }
                ser.end()
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::intrinsics;
    use pretty_assertions::assert_eq;

    fn json(value: &Value) -> String {
        serde_json::to_string(value).unwrap()
    }

    #[test]
    fn scalars_and_collections() {
        let value = Value::object([
            ("b", Value::from(true)),
            ("i", 42.into()),
            ("s", "text".into()),
            ("l", vec!["x", "y"].into()),
        ]);

        assert_eq!(json(&value), r#"{"b":true,"i":42,"s":"text","l":["x","y"]}"#);
    }

    #[test]
    fn reference_and_call() {
        assert_eq!(json(&Value::reference("KeyName")), r#"{"Ref":"KeyName"}"#);
        assert_eq!(
            json(&intrinsics::get_att("Db", "Endpoint.Address")),
            r#"{"Fn::GetAtt":["Db","Endpoint.Address"]}"#
        );
        assert_eq!(
            json(&Pseudo::Region.into()),
            r#"{"Ref":"AWS::Region"}"#
        );
    }

    #[test]
    fn merge_keeps_existing_keys_in_place() {
        let mut value = Value::object([("X", 1), ("Y", 2)]);
        value.merge(Value::object([("Y", 3), ("Z", 4)]));

        assert_eq!(value, Value::object([("X", 1), ("Y", 3), ("Z", 4)]));
        assert_eq!(json(&value), r#"{"X":1,"Y":3,"Z":4}"#);
    }

    #[test]
    fn merge_replaces_nested_objects_whole() {
        let mut value = Value::object([(
            "LaunchTemplateData",
            Value::object([("InstanceType", "t3.micro"), ("KeyName", "old")]),
        )]);
        value.merge(Value::object([(
            "LaunchTemplateData",
            Value::object([("InstanceType", "m5.large")]),
        )]));

        assert_eq!(
            json(&value),
            r#"{"LaunchTemplateData":{"InstanceType":"m5.large"}}"#
        );
    }

    #[test]
    fn merge_replaces_non_objects() {
        let mut value = Value::from(vec!["a"]);
        value.merge(Value::from("b"));
        assert_eq!(value, Value::from("b"));
    }

    #[test]
    fn non_finite_decimals_are_rejected() {
        assert_eq!(json(&Value::from(0.5)), "0.5");
        for decimal in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(serde_json::to_string(&Value::from(decimal)).is_err());
        }
    }

    #[test]
    fn serialization_is_repeatable() {
        let value = intrinsics::join(
            "",
            vec![Value::from("stack="), Pseudo::StackId.into(), "\n".into()],
        );

        assert_eq!(json(&value), json(&value));
    }
}
