use serde::{Deserialize, Serialize};

/// Request attributes the session layer attaches to a principal.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Attrs {
    /// Network origin of the current request, copied into audit entries.
    #[serde(default)]
    pub ip: Option<String>,
    /// Client signature string (browser user agent or API client name).
    #[serde(default)]
    pub user_agent: Option<String>,
}

/// An authenticated identity. Owned by the session layer; the core only reads it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Principal {
    pub user_id: String,
    #[serde(default)]
    pub attrs: Attrs,
}

impl Principal {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self { user_id: user_id.into(), attrs: Attrs::default() }
    }

    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.attrs.ip = Some(ip.into());
        self
    }

    pub fn with_user_agent(mut self, ua: impl Into<String>) -> Self {
        self.attrs.user_agent = Some(ua.into());
        self
    }

    pub fn id(&self) -> &str { &self.user_id }
}
