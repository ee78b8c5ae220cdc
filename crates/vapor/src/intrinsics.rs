//! intrinsic functions and pseudo parameters
//!
//! An [Intrinsic] is a function call that is only evaluated by the provisioning engine. This crate
//! never resolves one; it only checks that known functions get the right number of arguments.
//!
//! The free functions in this module build the common calls with the argument count fixed by their
//! signature. [Intrinsic::new] is the escape hatch for anything else, including functions this crate
//! does not know about (those pass through unchecked).
use crate::error::{Arity, Error, Result};
use crate::value::{Object, Value};

#[derive(Debug, Clone, PartialEq)]
pub struct Intrinsic {
    function: String,
    args: Vec<Value>,
}

impl Intrinsic {
    /// Create a call to `Fn::<function>`
    ///
    /// Fails with [Error::InvalidArity] when `function` is known and `args` has the wrong length.
    pub fn new(function: impl Into<String>, args: Vec<Value>) -> Result<Self> {
        let function = function.into();
        if let Some(expected) = arity(&function) {
            if !expected.accepts(args.len()) {
                return Err(Error::InvalidArity {
                    function,
                    expected,
                    actual: args.len(),
                });
            }
        }

        Ok(Self { function, args })
    }

    fn call<const N: usize>(function: &str, args: [Value; N]) -> Value {
        Value::Call(Self {
            function: function.to_string(),
            args: args.into(),
        })
    }

    pub fn function(&self) -> &str {
        &self.function
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// The operand written without a surrounding list, for single-operand functions
    pub fn bare_operand(&self) -> Option<&Value> {
        match (self.function.as_str(), self.args.as_slice()) {
            ("Base64" | "GetAZs" | "ImportValue" | "Sub", [operand]) => Some(operand),
            _ => None,
        }
    }
}

fn arity(function: &str) -> Option<Arity> {
    let arity = match function {
        "FindInMap" | "If" | "Cidr" => Arity::Exactly(3),
        "GetAtt" | "Select" | "Join" | "Split" | "Equals" => Arity::Exactly(2),
        "Not" | "Base64" | "GetAZs" | "ImportValue" => Arity::Exactly(1),
        "Sub" => Arity::Between(1, 2),
        "And" | "Or" => Arity::Between(2, 10),
        _ => return None,
    };

    Some(arity)
}

/// Values provided by the provisioning engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pseudo {
    AccountId,
    NotificationArns,
    /// Removes the property it is assigned to
    NoValue,
    Partition,
    Region,
    StackId,
    StackName,
    UrlSuffix,
}

impl Pseudo {
    pub fn name(&self) -> &'static str {
        match self {
            Pseudo::AccountId => "AWS::AccountId",
            Pseudo::NotificationArns => "AWS::NotificationARNs",
            Pseudo::NoValue => "AWS::NoValue",
            Pseudo::Partition => "AWS::Partition",
            Pseudo::Region => "AWS::Region",
            Pseudo::StackId => "AWS::StackId",
            Pseudo::StackName => "AWS::StackName",
            Pseudo::UrlSuffix => "AWS::URLSuffix",
        }
    }

    pub fn is_pseudo(name: &str) -> bool {
        name.starts_with("AWS::")
    }
}

/// `{ "Ref": target }`
///
/// The name is copied; the reference does not follow later changes to the target.
pub fn ref_(target: impl AsRef<str>) -> Value {
    Value::Ref(target.as_ref().to_string())
}

pub fn find_in_map(
    mapping: impl AsRef<str>,
    category: impl Into<Value>,
    key: impl Into<Value>,
) -> Value {
    Intrinsic::call(
        "FindInMap",
        [mapping.as_ref().into(), category.into(), key.into()],
    )
}

pub fn get_att(resource: impl AsRef<str>, attribute: impl Into<String>) -> Value {
    Intrinsic::call(
        "GetAtt",
        [resource.as_ref().into(), Value::String(attribute.into())],
    )
}

pub fn select(index: impl Into<Value>, list: impl Into<Value>) -> Value {
    Intrinsic::call("Select", [index.into(), list.into()])
}

pub fn join(delimiter: impl Into<String>, values: impl Into<Value>) -> Value {
    Intrinsic::call("Join", [Value::String(delimiter.into()), values.into()])
}

pub fn split(delimiter: impl Into<String>, source: impl Into<Value>) -> Value {
    Intrinsic::call("Split", [Value::String(delimiter.into()), source.into()])
}

pub fn base64(value: impl Into<Value>) -> Value {
    Intrinsic::call("Base64", [value.into()])
}

/// Availability zones of `region`; an empty string means the current region
pub fn get_azs(region: impl Into<Value>) -> Value {
    Intrinsic::call("GetAZs", [region.into()])
}

pub fn import_value(export_name: impl Into<Value>) -> Value {
    Intrinsic::call("ImportValue", [export_name.into()])
}

pub fn cidr(ip_block: impl Into<Value>, count: impl Into<Value>, cidr_bits: impl Into<Value>) -> Value {
    Intrinsic::call("Cidr", [ip_block.into(), count.into(), cidr_bits.into()])
}

pub fn sub(template: impl Into<String>) -> Value {
    Intrinsic::call("Sub", [Value::String(template.into())])
}

pub fn sub_with(template: impl Into<String>, variables: Object) -> Value {
    Intrinsic::call(
        "Sub",
        [Value::String(template.into()), Value::Object(variables)],
    )
}

pub fn equals(left: impl Into<Value>, right: impl Into<Value>) -> Value {
    Intrinsic::call("Equals", [left.into(), right.into()])
}

pub fn if_(
    condition: impl AsRef<str>,
    when_true: impl Into<Value>,
    when_false: impl Into<Value>,
) -> Value {
    Intrinsic::call(
        "If",
        [condition.as_ref().into(), when_true.into(), when_false.into()],
    )
}

pub fn not(condition: impl Into<Value>) -> Value {
    Intrinsic::call("Not", [condition.into()])
}

pub fn and(conditions: Vec<Value>) -> Result<Value> {
    Intrinsic::new("And", conditions).map(Value::Call)
}

pub fn or(conditions: Vec<Value>) -> Result<Value> {
    Intrinsic::new("Or", conditions).map(Value::Call)
}

/// `{ "Condition": name }`, used inside `Fn::And`/`Fn::Or`/`Fn::Not`
pub fn condition(name: impl AsRef<str>) -> Value {
    Value::object([("Condition", name.as_ref())])
}
