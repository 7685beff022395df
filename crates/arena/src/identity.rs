use std::fmt;

/// The caller a request runs on behalf of. Model config lookups are scoped to it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity(String);

impl Identity {
    pub const ANONYMOUS: &'static str = "anonymous";

    pub fn new<S: Into<String>>(id: S) -> Self {
        Identity(id.into())
    }

    /// The single identity used when no authentication is configured.
    pub fn anonymous() -> Self {
        Identity(Self::ANONYMOUS.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Identity {
    fn default() -> Self {
        Self::anonymous()
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
