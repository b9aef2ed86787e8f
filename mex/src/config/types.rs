use crate::error::{MexError, MexResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_MAX_RESOLVED_REFERENCES: usize = 10;
pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;
pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 64 * 1024;

/// Top-level resolver configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Maximum number of distinct references fetched in one resolution call
    pub max_resolved_references: usize,
    /// Follow pointers and imports found inside fetched documents
    pub resolve_nested: bool,
    /// Deadline shared by every fetch of one resolution call
    pub timeout_ms: u64,
    /// URL schemes a location may use
    pub allowed_schemes: Vec<String>,
    pub http: HttpFetchConfig,
    pub reference: ReferenceFetchConfig,
    pub quotas: ReaderQuotas,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_resolved_references: DEFAULT_MAX_RESOLVED_REFERENCES,
            resolve_nested: true,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            allowed_schemes: vec!["http".to_string(), "https".to_string()],
            http: HttpFetchConfig::default(),
            reference: ReferenceFetchConfig::default(),
            quotas: ReaderQuotas::default(),
        }
    }
}

impl ResolverConfig {
    pub fn from_toml_str(content: &str) -> MexResult<Self> {
        let config: ResolverConfig = toml::from_str(content)
            .map_err(|e| MexError::Config(format!("failed to parse configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> MexResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            MexError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> MexResult<()> {
        if self.max_resolved_references == 0 {
            return Err(MexError::Config(
                "max_resolved_references must be at least 1".to_string(),
            ));
        }
        if self.timeout_ms == 0 {
            return Err(MexError::Config("timeout_ms must be positive".to_string()));
        }
        if self.allowed_schemes.is_empty() {
            return Err(MexError::Config(
                "allowed_schemes must name at least one scheme".to_string(),
            ));
        }
        if self.http.max_response_bytes == 0 || self.reference.max_response_bytes == 0 {
            return Err(MexError::Config(
                "max_response_bytes must be positive".to_string(),
            ));
        }
        if self.quotas.max_depth == 0 {
            return Err(MexError::Config("quotas.max_depth must be positive".to_string()));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Settings for location-based (HTTP GET) retrieval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpFetchConfig {
    pub max_response_bytes: usize,
    pub user_agent: String,
    /// Additional headers sent with every GET
    pub headers: HashMap<String, String>,
}

impl Default for HttpFetchConfig {
    fn default() -> Self {
        Self {
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
            user_agent: concat!("mex/", env!("CARGO_PKG_VERSION")).to_string(),
            headers: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SoapVersion {
    #[serde(rename = "1.1")]
    Soap11,
    #[serde(rename = "1.2")]
    Soap12,
}

/// Settings for reference-based (WS-Transfer Get) retrieval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceFetchConfig {
    pub soap_version: SoapVersion,
    pub max_response_bytes: usize,
    pub headers: HashMap<String, String>,
}

impl Default for ReferenceFetchConfig {
    fn default() -> Self {
        Self {
            soap_version: SoapVersion::Soap12,
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
            headers: HashMap::new(),
        }
    }
}

/// Reader-side limits applied while parsing fetched documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderQuotas {
    pub max_depth: usize,
    pub max_text_len: usize,
}

impl Default for ReaderQuotas {
    fn default() -> Self {
        Self {
            max_depth: 32,
            max_text_len: 1024 * 1024,
        }
    }
}

/// Builder for resolver configuration
pub struct ResolverConfigBuilder {
    config: ResolverConfig,
}

impl ResolverConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ResolverConfig::default(),
        }
    }

    pub fn max_resolved_references(mut self, max: usize) -> Self {
        self.config.max_resolved_references = max;
        self
    }

    pub fn resolve_nested(mut self, resolve: bool) -> Self {
        self.config.resolve_nested = resolve;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn allowed_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.config.allowed_schemes.push(scheme.into());
        self
    }

    pub fn max_response_bytes(mut self, limit: usize) -> Self {
        self.config.http.max_response_bytes = limit;
        self.config.reference.max_response_bytes = limit;
        self
    }

    pub fn soap_version(mut self, version: SoapVersion) -> Self {
        self.config.reference.soap_version = version;
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let (key, value) = (key.into(), value.into());
        self.config.http.headers.insert(key.clone(), value.clone());
        self.config.reference.headers.insert(key, value);
        self
    }

    pub fn quotas(mut self, quotas: ReaderQuotas) -> Self {
        self.config.quotas = quotas;
        self
    }

    pub fn build(self) -> MexResult<ResolverConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ResolverConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
