//! the document root
//!
//! A [Template] owns every element of the document, grouped by [Section]. Elements reference each
//! other by name only; [Template::to_wire] resolves those names against the sections when the
//! document is rendered and refuses to render a document with dangling references.
use crate::element::{self, Element, ElementRef, Lookup, Section};
use crate::error::{Error, LookupError, Result};
use crate::intrinsics::Pseudo;
use crate::value::{Object, Value};
use crate::visit::VisitValues;
use indexmap::IndexMap;

pub const DEFAULT_VERSION: &str = "2010-09-09";

#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    version: String,
    description: String,
    metadata: Option<Value>,
    sections: [IndexMap<String, Element>; 5],
}

impl Default for Template {
    fn default() -> Self {
        Self::new("")
    }
}

impl Template {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            version: DEFAULT_VERSION.to_string(),
            description: description.into(),
            metadata: None,
            sections: Default::default(),
        }
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    /// Merge into the top level `Metadata`
    pub fn metadata(&mut self, metadata: impl Into<Value>) {
        let metadata = metadata.into();
        match &mut self.metadata {
            Some(existing) => existing.merge(metadata),
            None => self.metadata = Some(metadata),
        }
    }

    fn section(&self, section: Section) -> &IndexMap<String, Element> {
        &self.sections[section.index()]
    }

    fn section_mut(&mut self, section: Section) -> &mut IndexMap<String, Element> {
        &mut self.sections[section.index()]
    }

    fn iter_sections(&self) -> impl Iterator<Item = (Section, &IndexMap<String, Element>)> {
        Section::ALL.into_iter().zip(&self.sections)
    }

    /// Append an element to its section
    ///
    /// Fails with [Error::DuplicateName] if the section already has an element of that name.
    pub fn add(&mut self, element: impl Into<Element>) -> Result<ElementRef> {
        let element = element.into();
        let handle = element.handle();
        let section = self.section_mut(handle.section);

        if section.contains_key(element.name()) {
            return Err(Error::DuplicateName {
                section: handle.section,
                name: handle.name,
            });
        }

        tracing::debug!(section = %handle.section, name = %handle.name, "add element");
        section.insert(handle.name.clone(), element);
        Ok(handle)
    }

    /// Add an element or merge its attributes into the existing one of the same name
    pub fn merge(&mut self, element: impl Into<Element>) -> ElementRef {
        let element = element.into();
        let handle = element.handle();
        let section = self.section_mut(handle.section);

        match section.get_mut(element.name()) {
            Some(existing) => {
                tracing::debug!(section = %handle.section, name = %handle.name, "merge element");
                existing.merge(element);
            }
            None => {
                tracing::debug!(section = %handle.section, name = %handle.name, "add element");
                section.insert(handle.name.clone(), element);
            }
        }

        handle
    }

    pub fn get(&self, section: Section, name: &str) -> Option<&Element> {
        self.section(section).get(name)
    }

    pub fn get_mut(&mut self, section: Section, name: &str) -> Option<&mut Element> {
        self.section_mut(section).get_mut(name)
    }

    pub fn elements(&self, section: Section) -> impl Iterator<Item = &Element> {
        self.section(section).values()
    }

    /// `Fn::FindInMap` into a mapping of this template
    ///
    /// See [crate::element::Mapping::find_in_map] for how the arguments are checked.
    pub fn find_in_map(
        &self,
        mapping: &str,
        category: impl Into<Lookup>,
        key: impl Into<Lookup>,
    ) -> Result<Value> {
        let mapping = self
            .get(Section::Mappings, mapping)
            .ok_or_else(|| LookupError::UnknownMapping(mapping.to_string()))?;

        element::find_in_map(mapping, category.into(), key.into())
    }

    /// Render the document
    ///
    /// Pure function of the current state. Either the whole document renders or an error is
    /// returned; there is no partial output.
    pub fn to_wire(&self) -> Result<Value> {
        self.check_references()?;

        let mut document = Object::new();
        document.insert(
            "AWSTemplateFormatVersion".to_string(),
            self.version.clone().into(),
        );
        document.insert("Description".to_string(), self.description.clone().into());
        if let Some(metadata) = &self.metadata {
            document.insert("Metadata".to_string(), metadata.clone());
        }

        for (section, elements) in self.iter_sections() {
            if elements.is_empty() {
                continue;
            }

            let mut rendered = Object::new();
            for (name, element) in elements {
                rendered.insert(name.clone(), element.to_wire()?);
            }
            document.insert(section.key().to_string(), Value::Object(rendered));
        }

        Ok(Value::Object(document))
    }

    /// Render as JSON with two space indentation
    pub fn to_json(&self) -> Result<String> {
        let document = self.to_wire()?;
        serde_json::to_string_pretty(&document)
            .map_err(|err| Error::Construction(format!("unable to render json: {err}")))
    }

    fn check_references(&self) -> Result<()> {
        for (section, elements) in self.iter_sections() {
            for element in elements.values() {
                let from = format!("{section}.{}", element.name());

                if let Some(target) = element.attributes().get("DependsOn") {
                    let targets: Vec<&Value> = match target {
                        Value::Array(targets) => targets.iter().collect(),
                        target => vec![target],
                    };
                    for target in targets.into_iter().filter_map(Value::as_str) {
                        self.expect(&from, Section::Resources, target)?;
                    }
                }

                if section == Section::Conditions {
                    let expression = element
                        .attributes()
                        .get(crate::element::CONDITION_EXPRESSION)
                        .and_then(condition_name);
                    if let Some(condition) = expression {
                        self.expect(&from, Section::Conditions, condition)?;
                    }
                } else if let Some(Value::String(condition)) = element.attributes().get("Condition")
                {
                    self.expect(&from, Section::Conditions, condition)?;
                }

                let mut result = Ok(());
                element.attributes().visit_values(&mut |value: &Value| {
                    if result.is_ok() {
                        result = self.check_value(&from, value);
                    }
                });
                result?;
            }
        }

        Ok(())
    }

    fn check_value(&self, from: &str, value: &Value) -> Result<()> {
        match value {
            Value::Ref(target) if !Pseudo::is_pseudo(target) => {
                let known = self.get(Section::Parameters, target).is_some()
                    || self.get(Section::Resources, target).is_some();
                if !known {
                    return Err(unknown_reference(from, "parameter or resource", target));
                }
            }
            Value::Call(call) => match (call.function(), call.args().first()) {
                ("GetAtt", Some(Value::String(target))) => {
                    self.expect(from, Section::Resources, target)?
                }
                ("FindInMap", Some(Value::String(target))) => {
                    self.expect(from, Section::Mappings, target)?
                }
                ("If", Some(Value::String(target))) => {
                    self.expect(from, Section::Conditions, target)?
                }
                ("And" | "Or" | "Not", _) => {
                    for condition in call.args().iter().filter_map(condition_name) {
                        self.expect(from, Section::Conditions, condition)?;
                    }
                }
                _ => {}
            },
            _ => {}
        }

        Ok(())
    }

    fn expect(&self, from: &str, section: Section, target: &str) -> Result<()> {
        if self.get(section, target).is_none() {
            let expected = match section {
                Section::Parameters => "parameter",
                Section::Mappings => "mapping",
                Section::Conditions => "condition",
                Section::Resources => "resource",
                Section::Outputs => "output",
            };
            return Err(unknown_reference(from, expected, target));
        }

        Ok(())
    }
}

/// Name in a `{ "Condition": name }` operand
fn condition_name(value: &Value) -> Option<&str> {
    match value {
        Value::Object(object) if object.len() == 1 => object.get("Condition")?.as_str(),
        _ => None,
    }
}

fn unknown_reference(from: &str, expected: &'static str, target: &str) -> Error {
    tracing::trace!(from, target, "unknown reference");
    LookupError::UnknownReference {
        from: from.to_string(),
        expected,
        target: target.to_string(),
    }
    .into()
}
