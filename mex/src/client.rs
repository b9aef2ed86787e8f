//! Top-level entry points

use crate::config::ResolverConfig;
use crate::document::{Document, DocumentKind};
use crate::error::{MexError, MexResult};
use crate::resolve;
use crate::retriever::{LocationRetriever, ReferenceRetriever, Retriever};
use crate::transport::Backends;
use serde::Serialize;
use std::sync::OnceLock;
use tokio::runtime::Runtime;

/// How `get_metadata` reaches the seed address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MetadataExchangeClientMode {
    /// Send a get-request to the address
    #[default]
    MetadataExchange,
    /// Plain HTTP GET of the address
    HttpGet,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum SeedTarget {
    Location(String),
    Reference { address: String, via: Option<String> },
}

/// A starting point of a resolution call. Seeds are only validated when a
/// call starts, before anything is fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seed {
    target: SeedTarget,
    dialect: Option<String>,
    identifier: Option<String>,
}

impl Seed {
    pub fn location(url: impl Into<String>) -> Self {
        Self::new(SeedTarget::Location(url.into()))
    }

    pub fn reference(address: impl Into<String>) -> Self {
        Self::new(SeedTarget::Reference {
            address: address.into(),
            via: None,
        })
    }

    pub fn reference_via(address: impl Into<String>, via: impl Into<String>) -> Self {
        Self::new(SeedTarget::Reference {
            address: address.into(),
            via: Some(via.into()),
        })
    }

    fn new(target: SeedTarget) -> Self {
        Self {
            target,
            dialect: None,
            identifier: None,
        }
    }

    pub fn with_dialect(mut self, dialect: impl Into<String>) -> Self {
        self.dialect = Some(dialect.into());
        self
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn into_retriever(self, allowed_schemes: &[String]) -> MexResult<Retriever> {
        let dialect = self.dialect.as_deref();
        let identifier = self.identifier.as_deref();
        let retriever = match &self.target {
            SeedTarget::Location(url) => {
                LocationRetriever::new(url, dialect, identifier, allowed_schemes)?.into()
            }
            SeedTarget::Reference { address, via } => ReferenceRetriever::new(
                address,
                via.as_deref(),
                dialect,
                identifier,
                allowed_schemes,
            )?
            .into(),
        };
        Ok(retriever)
    }
}

/// The flattened result of one resolution call, in visit order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DocumentSet {
    documents: Vec<Document>,
}

impl DocumentSet {
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Document> {
        self.documents.iter()
    }

    pub fn of_kind(&self, kind: DocumentKind) -> impl Iterator<Item = &Document> + '_ {
        self.documents.iter().filter(move |d| d.kind() == kind)
    }

    pub fn interface_descriptions(&self) -> impl Iterator<Item = &Document> + '_ {
        self.of_kind(DocumentKind::InterfaceDescription)
    }

    pub fn schemas(&self) -> impl Iterator<Item = &Document> + '_ {
        self.of_kind(DocumentKind::Schema)
    }
}

impl From<Vec<Document>> for DocumentSet {
    fn from(documents: Vec<Document>) -> Self {
        Self { documents }
    }
}

impl IntoIterator for DocumentSet {
    type Item = Document;
    type IntoIter = std::vec::IntoIter<Document>;

    fn into_iter(self) -> Self::IntoIter {
        self.documents.into_iter()
    }
}

impl<'a> IntoIterator for &'a DocumentSet {
    type Item = &'a Document;
    type IntoIter = std::slice::Iter<'a, Document>;

    fn into_iter(self) -> Self::IntoIter {
        self.documents.iter()
    }
}

/// Resolves complete metadata graphs. One client can serve any number of
/// concurrent calls; each call owns its own crawl state.
#[derive(Debug)]
pub struct MetadataExchangeClient {
    config: ResolverConfig,
    backends: Backends,
    runtime: OnceLock<Runtime>,
}

impl MetadataExchangeClient {
    /// Client backed by reqwest for both location and reference fetches
    pub fn new(config: ResolverConfig) -> MexResult<Self> {
        config.validate()?;
        let backends = Backends::http(&config)?;
        Self::with_backends(config, backends)
    }

    pub fn with_backends(config: ResolverConfig, backends: Backends) -> MexResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            backends,
            runtime: OnceLock::new(),
        })
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub async fn resolve(&self, seeds: impl IntoIterator<Item = Seed>) -> MexResult<DocumentSet> {
        let retrievers = self.retrievers(seeds)?;
        let documents = resolve::resolve(retrievers, &self.config, &self.backends).await?;
        Ok(documents.into())
    }

    /// Blocking twin of [`resolve`](Self::resolve); same walk, same output
    pub fn resolve_blocking(&self, seeds: impl IntoIterator<Item = Seed>) -> MexResult<DocumentSet> {
        let retrievers = self.retrievers(seeds)?;
        let runtime = self.runtime()?;
        let documents =
            runtime.block_on(resolve::resolve(retrievers, &self.config, &self.backends))?;
        Ok(documents.into())
    }

    pub async fn get_metadata(
        &self,
        address: &str,
        mode: MetadataExchangeClientMode,
    ) -> MexResult<DocumentSet> {
        self.resolve([seed_for(address, mode)]).await
    }

    pub fn get_metadata_blocking(
        &self,
        address: &str,
        mode: MetadataExchangeClientMode,
    ) -> MexResult<DocumentSet> {
        self.resolve_blocking([seed_for(address, mode)])
    }

    fn retrievers(&self, seeds: impl IntoIterator<Item = Seed>) -> MexResult<Vec<Retriever>> {
        seeds
            .into_iter()
            .map(|seed| seed.into_retriever(&self.config.allowed_schemes))
            .collect()
    }

    // Reused across blocking calls so pooled connections stay on the
    // runtime that opened them
    fn runtime(&self) -> MexResult<&Runtime> {
        if tokio::runtime::Handle::try_current().is_ok() {
            return Err(MexError::BlockingInAsyncContext);
        }
        if let Some(runtime) = self.runtime.get() {
            return Ok(runtime);
        }
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("mex-blocking")
            .enable_all()
            .build()?;
        // A concurrent caller may have won the race; theirs is kept
        let _ = self.runtime.set(runtime);
        self.runtime
            .get()
            .ok_or_else(|| MexError::Config("blocking runtime unavailable".to_string()))
    }
}

impl Drop for MetadataExchangeClient {
    fn drop(&mut self) {
        // Dropping a runtime from async code panics; the client may be
        // dropped there even if it was used from blocking code
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

fn seed_for(address: &str, mode: MetadataExchangeClientMode) -> Seed {
    match mode {
        MetadataExchangeClientMode::MetadataExchange => Seed::reference(address),
        MetadataExchangeClientMode::HttpGet => Seed::location(address),
    }
}
