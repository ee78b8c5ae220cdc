//! ordered attribute store of an element
use crate::value::{Object, Value};

/// Insertion ordered `name -> value` pairs
///
/// Overwriting a name keeps its original position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes {
    entries: Object,
}

impl Attributes {
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.entries.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Merge `value` into the attribute `name`
    ///
    /// Object values are combined key by key, see [Value::merge].
    pub fn merge_value(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.entries.get_mut(&name) {
            Some(existing) => existing.merge(value),
            None => {
                self.entries.insert(name, value);
            }
        }
    }

    /// Merge every attribute of `other` into `self`
    pub fn merge(&mut self, other: Attributes) {
        for (name, value) in other.entries {
            tracing::trace!(%name, "merge attribute");
            self.merge_value(name, value);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.entries.clone())
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Attributes {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn names(attributes: &Attributes) -> Vec<&str> {
        attributes.iter().map(|(name, _)| name.as_str()).collect()
    }

    #[test]
    fn overwrite_keeps_position() {
        let mut attributes = Attributes::default();
        attributes.set("Type", "String");
        attributes.set("Description", "first");
        attributes.set("Type", "Number");

        assert_eq!(names(&attributes), ["Type", "Description"]);
        assert_eq!(attributes.get("Type"), Some(&Value::from("Number")));
    }

    #[test]
    fn missing_attribute_is_none() {
        let attributes = Attributes::default();
        assert_eq!(attributes.get("Default"), None);
    }

    #[test]
    fn merge_combines_object_attributes() {
        let mut base: Attributes = [
            ("Type", Value::from("AWS::EC2::VPC")),
            ("Properties", Value::object([("X", 1), ("Y", 2)])),
        ]
        .into_iter()
        .collect();

        let patch: Attributes = [("Properties", Value::object([("Y", 3), ("Z", 4)]))]
            .into_iter()
            .collect();

        base.merge(patch);

        assert_eq!(names(&base), ["Type", "Properties"]);
        assert_eq!(
            base.get("Properties"),
            Some(&Value::object([("X", 1), ("Y", 3), ("Z", 4)]))
        );
    }
}
