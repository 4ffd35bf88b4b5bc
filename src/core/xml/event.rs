/// Element or attribute name with its resolved namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualifiedName {
    pub prefix: Option<String>,
    pub local: String,
    pub namespace: Option<String>,
}

impl QualifiedName {
    pub fn new(namespace: Option<&str>, local: impl Into<String>) -> Self {
        Self {
            prefix: None,
            local: local.into(),
            namespace: namespace.map(str::to_string),
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Name as written in markup (`prefix:local` or `local`).
    pub fn lexical(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}:{}", prefix, self.local),
            None => self.local.clone(),
        }
    }

    pub fn is(&self, namespace: &str, local: &str) -> bool {
        self.namespace.as_deref() == Some(namespace) && self.local == local
    }

    pub fn in_namespace(&self, namespace: &str) -> bool {
        self.namespace.as_deref() == Some(namespace)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: QualifiedName,
    pub value: String,
}

impl Attribute {
    pub fn new(local: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: QualifiedName::new(None, local),
            value: value.into(),
        }
    }
}

/// `xmlns` / `xmlns:prefix` declaration. `prefix: None` is the default namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceBinding {
    pub prefix: Option<String>,
    pub uri: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementStart {
    pub name: QualifiedName,
    pub attributes: Vec<Attribute>,
    pub namespaces: Vec<NamespaceBinding>,
}

impl ElementStart {
    pub fn new(name: QualifiedName) -> Self {
        Self {
            name,
            attributes: Vec::new(),
            namespaces: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, local: &str, value: &str) -> Self {
        self.attributes.push(Attribute::new(local, value));
        self
    }

    pub fn with_namespace(mut self, prefix: Option<&str>, uri: &str) -> Self {
        self.namespaces.push(NamespaceBinding {
            prefix: prefix.map(str::to_string),
            uri: uri.to_string(),
        });
        self
    }

    /// Value of an attribute in no namespace.
    pub fn attribute(&self, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| attr.name.namespace.is_none() && attr.name.local == local)
            .map(|attr| attr.value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlEvent {
    Open(ElementStart),
    Text(String),
    Close(QualifiedName),
}
