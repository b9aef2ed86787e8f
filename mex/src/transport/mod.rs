//! Retrieval backends
//!
//! The resolver never talks to the network directly. It asks a
//! `LocationFetcher` for documents addressed by URL and opens a
//! `MetadataChannel` through a `ChannelFactory` for documents that must be
//! requested from an endpoint. Both seams are trait objects so callers can
//! plug in their own transports.
//!
//! - **HTTP**: `http.rs` - reqwest GET with a response-size cap
//! - **SOAP**: `soap.rs` - one WS-Transfer Get per channel over reqwest
//! - **Body**: `body.rs` - capped body reading and charset decoding

mod body;
pub mod http;
pub mod soap;

pub use http::HttpLocationFetcher;
pub use soap::SoapChannelFactory;

use crate::config::ResolverConfig;
use crate::error::{MexResult, TransportError};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Decoded body of a fetched document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedBody {
    pub text: String,
    pub content_type: Option<String>,
}

impl FetchedBody {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            content_type: None,
        }
    }
}

/// Fetches the byte stream at a location
#[async_trait]
pub trait LocationFetcher: Send + Sync {
    async fn fetch(
        &self,
        location: &Url,
        dialect: Option<&str>,
        identifier: Option<&str>,
        timeout: Duration,
    ) -> Result<FetchedBody, TransportError>;

    fn name(&self) -> &str;
}

/// A stateless metadata get-request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetRequest {
    pub address: Url,
    pub dialect: Option<String>,
    pub identifier: Option<String>,
}

/// Opens channels to endpoints that answer metadata get-requests
#[async_trait]
pub trait ChannelFactory: Send + Sync {
    /// Open a channel to `address`, sending through `via` when present
    async fn open(
        &self,
        address: &Url,
        via: Option<&Url>,
    ) -> Result<Box<dyn MetadataChannel>, TransportError>;

    fn name(&self) -> &str;
}

/// One request, one reply, then `close` or `abort`
#[async_trait]
pub trait MetadataChannel: Send {
    async fn get(
        &mut self,
        request: &GetRequest,
        timeout: Duration,
    ) -> Result<FetchedBody, TransportError>;

    async fn close(&mut self) -> Result<(), TransportError>;

    /// Tear the channel down without a graceful close
    fn abort(&mut self);
}

/// The pair of collaborators a resolution call fetches through
#[derive(Clone)]
pub struct Backends {
    pub locations: Arc<dyn LocationFetcher>,
    pub channels: Arc<dyn ChannelFactory>,
}

impl Backends {
    pub fn new(locations: Arc<dyn LocationFetcher>, channels: Arc<dyn ChannelFactory>) -> Self {
        Self {
            locations,
            channels,
        }
    }

    /// reqwest-backed HTTP GET and SOAP backends
    pub fn http(config: &ResolverConfig) -> MexResult<Self> {
        Ok(Self {
            locations: Arc::new(HttpLocationFetcher::new(config.http.clone())?),
            channels: Arc::new(SoapChannelFactory::new(
                config.reference.clone(),
                config.quotas,
            )?),
        })
    }
}

impl fmt::Debug for Backends {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backends")
            .field("locations", &self.locations.name())
            .field("channels", &self.channels.name())
            .finish()
    }
}
