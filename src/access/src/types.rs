//! Core access types

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Cache key used when a principal carries neither an auth key nor a name
pub const UNKNOWN_PRINCIPAL_KEY: &str = "unknown";

/// Strategy options, as read from the configuration document
pub type StrategyOptions = HashMap<String, String>;

/// Authenticated caller (user or session)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Login name
    pub name: String,

    /// Session / auth-key credential, when key authentication is in use
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_key: Option<String>,

    /// Granted roles
    #[serde(default)]
    pub roles: Vec<String>,
}

impl Principal {
    /// Create a new principal from a login name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            auth_key: None,
            roles: Vec::new(),
        }
    }

    /// Attach a session / auth-key credential
    pub fn with_auth_key(mut self, key: impl Into<String>) -> Self {
        self.auth_key = Some(key.into());
        self
    }

    /// Add a role
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    /// Whether the principal was granted `role`
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Key under which per-principal data is cached
    ///
    /// The auth key wins over the name; a principal with neither maps to
    /// [`UNKNOWN_PRINCIPAL_KEY`].
    pub fn cache_key(&self) -> &str {
        match self.auth_key.as_deref() {
            Some(key) if !key.is_empty() => key,
            _ if !self.name.is_empty() => &self.name,
            _ => UNKNOWN_PRINCIPAL_KEY,
        }
    }
}

/// Cache key for an optional (possibly anonymous) principal
pub fn cache_key_for(principal: Option<&Principal>) -> &str {
    principal
        .map(Principal::cache_key)
        .unwrap_or(UNKNOWN_PRINCIPAL_KEY)
}

/// How the host exposes resources a principal cannot access
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CatalogMode {
    /// Denied resources are invisible
    #[default]
    Hide,
    /// Denied resources are listed but access triggers an authentication challenge
    Challenge,
}

/// Kind of a catalog resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Feature type
    Vector,
    /// Raster coverage
    Coverage,
    /// Cascaded tiled raster service
    TiledService,
    /// Anything else the host catalog knows about
    Other(String),
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vector => write!(f, "vector"),
            Self::Coverage => write!(f, "coverage"),
            Self::TiledService => write!(f, "tiled-service"),
            Self::Other(kind) => write!(f, "{}", kind),
        }
    }
}

/// Coordinate reference system
///
/// `code` carries the identity (e.g. `EPSG:4326`); `name` is metadata and is
/// ignored by [`Crs::equals_ignore_metadata`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Crs {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Crs {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Semantic equality: same authority code, case and whitespace aside
    pub fn equals_ignore_metadata(&self, other: &Crs) -> bool {
        self.code.trim().eq_ignore_ascii_case(other.code.trim())
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code)
    }
}

/// Namespace-qualified layer name (`ns:local` or bare `local`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QualifiedName {
    pub namespace: Option<String>,
    pub local: String,
}

impl QualifiedName {
    pub fn new(namespace: Option<String>, local: impl Into<String>) -> Self {
        Self {
            namespace,
            local: local.into(),
        }
    }

    /// Split on the first colon
    pub fn parse(raw: &str) -> Self {
        match raw.split_once(':') {
            Some((ns, local)) => Self::new(Some(ns.to_string()), local),
            None => Self::new(None, raw),
        }
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}:{}", ns, self.local),
            None => write!(f, "{}", self.local),
        }
    }
}

/// Catalog resource whose access limits are being resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// Workspace the resource's store belongs to
    pub workspace: String,

    /// Resource (layer) name
    pub name: String,

    /// Resource kind
    pub kind: ResourceKind,

    /// Native coordinate reference system
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crs: Option<Crs>,
}

impl Resource {
    pub fn new(workspace: impl Into<String>, name: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            workspace: workspace.into(),
            name: name.into(),
            kind,
            crs: None,
        }
    }

    pub fn vector(workspace: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(workspace, name, ResourceKind::Vector)
    }

    pub fn coverage(workspace: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(workspace, name, ResourceKind::Coverage)
    }

    pub fn tiled_service(workspace: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(workspace, name, ResourceKind::TiledService)
    }

    pub fn with_crs(mut self, crs: Crs) -> Self {
        self.crs = Some(crs);
        self
    }

    /// `workspace:name`
    pub fn qualified_name(&self) -> String {
        format!("{}:{}", self.workspace, self.name)
    }
}
