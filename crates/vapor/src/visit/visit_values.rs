use super::Visit;
use crate::attributes::Attributes;
use crate::value::Value;

/// Recursively visit all [Value]s, parents before their children
pub trait VisitValues {
    fn visit_values(&self, visitor: &mut dyn Visit<Value>);
}

impl VisitValues for Value {
    fn visit_values(&self, visitor: &mut dyn Visit<Value>) {
        visitor.visit(self);
        match self {
            Value::Array(array) => {
                for value in array {
                    value.visit_values(visitor);
                }
            }
            Value::Object(object) => {
                for value in object.values() {
                    value.visit_values(visitor);
                }
            }
            Value::Call(call) => {
                for arg in call.args() {
                    arg.visit_values(visitor);
                }
            }
            Value::Boolean(_)
            | Value::Integer(_)
            | Value::Decimal(_)
            | Value::String(_)
            | Value::Ref(_) => {}
        }
    }
}

impl VisitValues for Attributes {
    fn visit_values(&self, visitor: &mut dyn Visit<Value>) {
        for (_, value) in self.iter() {
            value.visit_values(visitor);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::intrinsics;
    use pretty_assertions::assert_eq;

    #[test]
    fn finds_nested_references() {
        let value = Value::object([(
            "SecurityGroupIds",
            Value::from(vec![
                intrinsics::ref_("Default"),
                intrinsics::select("0", intrinsics::ref_("Groups")),
            ]),
        )]);

        let mut found = vec![];
        value.visit_values(&mut |value: &Value| {
            if let Value::Ref(name) = value {
                found.push(name.clone());
            }
        });

        assert_eq!(found, ["Default", "Groups"]);
    }
}
