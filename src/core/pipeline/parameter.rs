use serde::{Deserialize, Serialize};

/// Declared type used when a `parameter` element carries no `type`.
pub const DEFAULT_PARAMETER_TYPE: &str = "xs:string";

/// Expanded name a stylesheet parameter is bound under.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterName {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub local: String,
}

impl ParameterName {
    pub fn new(namespace: Option<&str>, local: impl Into<String>) -> Self {
        Self {
            namespace: namespace.filter(|ns| !ns.is_empty()).map(str::to_string),
            local: local.into(),
        }
    }

    pub fn local(local: impl Into<String>) -> Self {
        Self::new(None, local)
    }
}

impl std::fmt::Display for ParameterName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{{{}}}{}", ns, self.local),
            None => write!(f, "{}", self.local),
        }
    }
}

/// A typed, possibly multi-valued stylesheet parameter declared on a
/// transform step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default = "default_type", rename = "type")]
    pub declared_type: String,
    #[serde(default)]
    pub values: Vec<String>,
}

fn default_type() -> String {
    DEFAULT_PARAMETER_TYPE.to_string()
}

impl Parameter {
    pub fn new(name: impl Into<String>, uri: Option<String>, declared_type: Option<String>) -> Self {
        Self {
            name: name.into(),
            uri,
            declared_type: declared_type.unwrap_or_else(|| DEFAULT_PARAMETER_TYPE.to_string()),
            values: Vec::new(),
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.values.push(value.into());
        self
    }

    pub fn add_value(&mut self, value: impl Into<String>) {
        self.values.push(value.into());
    }

    pub fn qualified_name(&self) -> ParameterName {
        ParameterName::new(self.uri.as_deref(), self.name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_defaults_to_string() {
        let param = Parameter::new("lang", None, None);
        assert_eq!(param.declared_type, "xs:string");
        assert!(param.values.is_empty());
    }

    #[test]
    fn empty_uri_means_no_namespace() {
        let param = Parameter::new("lang", Some(String::new()), None);
        assert_eq!(param.qualified_name(), ParameterName::local("lang"));
        assert_eq!(
            Parameter::new("x", Some("urn:p".to_string()), None)
                .qualified_name()
                .to_string(),
            "{urn:p}x"
        );
    }
}
