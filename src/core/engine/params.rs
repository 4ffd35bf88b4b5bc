use std::collections::BTreeMap;

use crate::pipeline::{Parameter, ParameterName};
use crate::xml::XmlDocument;

/// Value bound to a stylesheet parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterValue {
    /// A sequence of atomic values with their declared type.
    Atomic { type_name: String, values: Vec<String> },
    /// A whole document, e.g. a validation report.
    Document(XmlDocument),
}

impl ParameterValue {
    pub fn string(value: impl Into<String>) -> Self {
        ParameterValue::Atomic {
            type_name: crate::pipeline::DEFAULT_PARAMETER_TYPE.to_string(),
            values: vec![value.into()],
        }
    }

    pub fn as_document(&self) -> Option<&XmlDocument> {
        match self {
            ParameterValue::Document(document) => Some(document),
            ParameterValue::Atomic { .. } => None,
        }
    }

    pub fn values(&self) -> &[String] {
        match self {
            ParameterValue::Atomic { values, .. } => values,
            ParameterValue::Document(_) => &[],
        }
    }
}

impl From<&Parameter> for ParameterValue {
    fn from(parameter: &Parameter) -> Self {
        ParameterValue::Atomic {
            type_name: parameter.declared_type.clone(),
            values: parameter.values.clone(),
        }
    }
}

/// Stylesheet parameters keyed by expanded name. Inserting an existing name
/// replaces the earlier binding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterSet {
    entries: BTreeMap<ParameterName, ParameterValue>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: ParameterName, value: ParameterValue) {
        self.entries.insert(name, value);
    }

    pub fn with(mut self, name: ParameterName, value: ParameterValue) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &ParameterName) -> Option<&ParameterValue> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &ParameterName) -> bool {
        self.entries.contains_key(name)
    }

    /// Binds declared step parameters in declaration order.
    pub fn extend_declared(&mut self, parameters: &[Parameter]) {
        for parameter in parameters {
            self.insert(parameter.qualified_name(), ParameterValue::from(parameter));
        }
    }

    pub fn merge(&mut self, other: &ParameterSet) {
        for (name, value) in &other.entries {
            self.entries.insert(name.clone(), value.clone());
        }
    }

    /// Moves every binding out, leaving this set empty.
    pub fn take(&mut self) -> ParameterSet {
        std::mem::take(self)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ParameterName, &ParameterValue)> {
        self.entries.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &ParameterName> {
        self.entries.keys()
    }
}

impl From<&[Parameter]> for ParameterSet {
    fn from(parameters: &[Parameter]) -> Self {
        let mut set = ParameterSet::new();
        set.extend_declared(parameters);
        set
    }
}
