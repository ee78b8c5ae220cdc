//! named elements of a template section
//!
//! An [Element] is a named bag of [Attributes] that belongs to exactly one [Section]. The typed
//! wrappers ([Parameter], [Mapping], [Condition], [Resource], [Output]) only add convenient,
//! chainable setters for the attributes their section knows about. Anything else can still be set
//! through `attribute`.
//!
//! ```
//! use vapor::element::{Parameter, Resource};
//!
//! let key_name = Parameter::new("KeyName").type_("AWS::EC2::KeyPair::KeyName");
//! let server = Resource::new("Server")
//!     .type_("AWS::EC2::Instance")
//!     .properties([("KeyName", &key_name)]);
//! # let _ = server;
//! ```
use crate::attributes::Attributes;
use crate::error::{Error, LookupError, Result};
use crate::intrinsics::{self, Pseudo};
use crate::value::{Object, Value};

/// Attribute a [Condition] stores its expression under
pub(crate) const CONDITION_EXPRESSION: &str = "Expression";

/// Template sections, in output order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Parameters,
    Mappings,
    Conditions,
    Resources,
    Outputs,
}

impl Section {
    pub const ALL: [Section; 5] = [
        Section::Parameters,
        Section::Mappings,
        Section::Conditions,
        Section::Resources,
        Section::Outputs,
    ];

    pub(crate) fn index(&self) -> usize {
        *self as usize
    }

    /// Key of the section in the rendered document
    pub fn key(&self) -> &'static str {
        match self {
            Section::Parameters => "Parameters",
            Section::Mappings => "Mappings",
            Section::Conditions => "Conditions",
            Section::Resources => "Resources",
            Section::Outputs => "Outputs",
        }
    }
}

impl std::fmt::Display for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    name: String,
    section: Section,
    pub(crate) attributes: Attributes,
}

impl Element {
    pub fn new(section: Section, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            section,
            attributes: Default::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn section(&self) -> Section {
        self.section
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut Attributes {
        &mut self.attributes
    }

    /// Merge the attributes of `other` into this element
    pub fn merge(&mut self, other: Element) {
        debug_assert_eq!(self.section, other.section);
        self.attributes.merge(other.attributes);
    }

    /// Handle to this element that can be used for references
    pub fn handle(&self) -> ElementRef {
        ElementRef {
            section: self.section,
            name: self.name.clone(),
        }
    }

    /// Render the element body
    ///
    /// Fails when a field the section requires is missing.
    pub fn to_wire(&self) -> Result<Value> {
        let required = match self.section {
            Section::Conditions => {
                return self
                    .attributes
                    .get(CONDITION_EXPRESSION)
                    .cloned()
                    .ok_or_else(|| {
                        Error::Construction(format!("condition `{}` has no expression", self.name))
                    });
            }
            Section::Parameters | Section::Resources => Some("Type"),
            Section::Outputs => Some("Value"),
            Section::Mappings => None,
        };

        if let Some(required) = required {
            if !self.attributes.contains(required) {
                return Err(Error::Construction(format!(
                    "{} `{}` has no {required}",
                    self.section, self.name
                )));
            }
        }

        Ok(self.attributes.to_value())
    }
}

impl AsRef<str> for Element {
    fn as_ref(&self) -> &str {
        &self.name
    }
}

/// Name of an element that was added to a template
///
/// Only the name is kept, so a reference built from a handle never changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_new::new)]
pub struct ElementRef {
    pub section: Section,
    pub name: String,
}

impl AsRef<str> for ElementRef {
    fn as_ref(&self) -> &str {
        &self.name
    }
}

impl From<&ElementRef> for Value {
    fn from(value: &ElementRef) -> Self {
        intrinsics::ref_(value)
    }
}

impl From<ElementRef> for Value {
    fn from(value: ElementRef) -> Self {
        Value::Ref(value.name)
    }
}

macro_rules! element_kind {
    ($(#[$meta:meta])* $kind:ident => $section:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        pub struct $kind(Element);

        impl $kind {
            pub fn new(name: impl Into<String>) -> Self {
                Self(Element::new($section, name))
            }

            pub fn name(&self) -> &str {
                self.0.name()
            }

            /// Set any attribute, overwriting an existing one of the same name
            pub fn attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
                self.0.attributes.set(name, value);
                self
            }

            pub fn get(&self, name: &str) -> Option<&Value> {
                self.0.attributes.get(name)
            }

            pub fn handle(&self) -> ElementRef {
                self.0.handle()
            }
        }

        impl From<$kind> for Element {
            fn from(value: $kind) -> Element {
                value.0
            }
        }

        impl AsRef<str> for $kind {
            fn as_ref(&self) -> &str {
                self.0.name()
            }
        }
    };
}

element_kind!(
    /// Input value supplied when the stack is created
    Parameter => Section::Parameters
);
element_kind!(
    /// Two level `category -> key -> value` lookup table
    Mapping => Section::Mappings
);
element_kind!(Condition => Section::Conditions);
element_kind!(Resource => Section::Resources);
element_kind!(Output => Section::Outputs);

impl From<&Parameter> for Value {
    fn from(value: &Parameter) -> Self {
        intrinsics::ref_(value)
    }
}

impl From<&Resource> for Value {
    fn from(value: &Resource) -> Self {
        intrinsics::ref_(value)
    }
}

impl Parameter {
    pub fn type_(self, type_name: impl Into<String>) -> Self {
        self.attribute("Type", Value::String(type_name.into()))
    }

    pub fn description(self, description: impl Into<String>) -> Self {
        self.attribute("Description", Value::String(description.into()))
    }

    pub fn default(self, value: impl Into<Value>) -> Self {
        self.attribute("Default", value)
    }

    pub fn allowed_values<V: Into<Value>>(self, values: impl IntoIterator<Item = V>) -> Self {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        self.attribute("AllowedValues", values)
    }

    pub fn allowed_pattern(self, pattern: impl Into<String>) -> Self {
        self.attribute("AllowedPattern", Value::String(pattern.into()))
    }

    pub fn constraint_description(self, description: impl Into<String>) -> Self {
        self.attribute("ConstraintDescription", Value::String(description.into()))
    }

    pub fn no_echo(self, no_echo: bool) -> Self {
        self.attribute("NoEcho", no_echo)
    }

    pub fn min_length(self, length: u32) -> Self {
        self.attribute("MinLength", length)
    }

    pub fn max_length(self, length: u32) -> Self {
        self.attribute("MaxLength", length)
    }

    pub fn min_value(self, value: impl Into<Value>) -> Self {
        self.attribute("MinValue", value)
    }

    pub fn max_value(self, value: impl Into<Value>) -> Self {
        self.attribute("MaxValue", value)
    }
}

/// Argument of [Mapping::find_in_map]
///
/// Literal names are checked against the table, values (like [Pseudo::Region]) are not.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Literal(String),
    Dynamic(Value),
}

impl From<&str> for Lookup {
    fn from(value: &str) -> Self {
        Lookup::Literal(value.to_string())
    }
}

impl From<String> for Lookup {
    fn from(value: String) -> Self {
        Lookup::Literal(value)
    }
}

impl From<Value> for Lookup {
    fn from(value: Value) -> Self {
        match value {
            Value::String(literal) => Lookup::Literal(literal),
            value => Lookup::Dynamic(value),
        }
    }
}

impl From<Pseudo> for Lookup {
    fn from(value: Pseudo) -> Self {
        Lookup::Dynamic(value.into())
    }
}

impl From<Lookup> for Value {
    fn from(value: Lookup) -> Self {
        match value {
            Lookup::Literal(literal) => Value::String(literal),
            Lookup::Dynamic(value) => value,
        }
    }
}

/// Items of one mapping category, see [Mapping::category]
#[derive(Debug, Default)]
pub struct Category {
    items: Object,
}

impl Category {
    pub fn item(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.items.insert(key.into(), value.into());
        self
    }
}

impl Mapping {
    /// Add a category and fill it in one go
    ///
    /// ```
    /// # use vapor::element::Mapping;
    /// let mapping = Mapping::new("RegionToAMI")
    ///     .category("us-east-1", |c| c.item("AMI", "ami-1").item("AZ", "us-east-1a"))
    ///     .category("eu-west-1", |c| c.item("AMI", "ami-2"));
    /// assert!(mapping.find_in_map("eu-west-1", "AMI").is_ok());
    /// ```
    pub fn category(
        mut self,
        name: impl Into<String>,
        items: impl FnOnce(Category) -> Category,
    ) -> Self {
        let category = items(Category::default());
        self.0
            .attributes
            .merge_value(name, Value::Object(category.items));
        self
    }

    /// Add a single item, creating its category if needed
    pub fn item(
        mut self,
        category: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        let mut items = Object::new();
        items.insert(key.into(), value.into());
        self.0.attributes.merge_value(category, Value::Object(items));
        self
    }

    /// `Fn::FindInMap` into this mapping
    ///
    /// Fails with [LookupError] when a literal category or key is not in the table.
    pub fn find_in_map(
        &self,
        category: impl Into<Lookup>,
        key: impl Into<Lookup>,
    ) -> Result<Value> {
        find_in_map(&self.0, category.into(), key.into())
    }
}

pub(crate) fn find_in_map(mapping: &Element, category: Lookup, key: Lookup) -> Result<Value> {
    if let Lookup::Literal(category) = &category {
        let Some(items) = mapping.attributes.get(category) else {
            return Err(LookupError::UnknownCategory {
                mapping: mapping.name.clone(),
                category: category.clone(),
            }
            .into());
        };

        if let Lookup::Literal(key) = &key {
            let found = items.as_object().is_some_and(|items| items.contains_key(key));
            if !found {
                return Err(LookupError::UnknownKey {
                    mapping: mapping.name.clone(),
                    category: category.clone(),
                    key: key.clone(),
                }
                .into());
            }
        }
    }

    tracing::trace!(mapping = %mapping.name, ?category, ?key, "find in map");
    Ok(intrinsics::find_in_map(&mapping.name, category, key))
}

impl Condition {
    pub fn expression(self, expression: impl Into<Value>) -> Self {
        self.attribute(CONDITION_EXPRESSION, expression)
    }
}

impl Resource {
    pub fn type_(self, type_name: impl Into<String>) -> Self {
        self.attribute("Type", Value::String(type_name.into()))
    }

    /// Merge into `Properties`
    ///
    /// Repeated calls add to (and overwrite keys of) the existing properties.
    pub fn properties<K, V>(mut self, properties: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        self.0
            .attributes
            .merge_value("Properties", Value::object(properties));
        self
    }

    pub fn property(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties([(name, value)])
    }

    /// Single dependency, a later call replaces it
    ///
    /// Set `DependsOn` through [Resource::attribute] to depend on several resources.
    pub fn depends_on(self, resource: impl AsRef<str>) -> Self {
        self.attribute("DependsOn", resource.as_ref())
    }

    /// Merge into `Metadata`, see [crate::metadata::CfnInit::build]
    pub fn metadata(mut self, metadata: impl Into<Value>) -> Self {
        self.0.attributes.merge_value("Metadata", metadata);
        self
    }

    pub fn condition(self, condition: impl AsRef<str>) -> Self {
        self.attribute("Condition", condition.as_ref())
    }

    pub fn deletion_policy(self, policy: impl Into<String>) -> Self {
        self.attribute("DeletionPolicy", Value::String(policy.into()))
    }
}

impl Output {
    pub fn description(self, description: impl Into<String>) -> Self {
        self.attribute("Description", Value::String(description.into()))
    }

    pub fn value(self, value: impl Into<Value>) -> Self {
        self.attribute("Value", value)
    }

    pub fn condition(self, condition: impl AsRef<str>) -> Self {
        self.attribute("Condition", condition.as_ref())
    }

    pub fn export(self, name: impl Into<Value>) -> Self {
        self.attribute("Export", Value::object([("Name", name)]))
    }
}
