use super::location::check_scheme;
use super::RetrievalContext;
use crate::document::Document;
use crate::error::{MexError, MexResult};
use crate::transport::{FetchedBody, GetRequest};
use std::time::Duration;
use tokio::time::timeout;
use url::Url;

/// Requests a document from an endpoint, optionally through an intermediary
#[derive(Debug, Clone)]
pub struct ReferenceRetriever {
    address: Url,
    via: Option<Url>,
    dialect: Option<String>,
    identifier: Option<String>,
}

impl ReferenceRetriever {
    pub fn new(
        address: &str,
        via: Option<&str>,
        dialect: Option<&str>,
        identifier: Option<&str>,
        allowed_schemes: &[String],
    ) -> MexResult<Self> {
        let address_url = Url::parse(address.trim())
            .map_err(|e| MexError::construction(address, e.to_string()))?;
        check_scheme(&address_url, allowed_schemes)?;

        let via = match via {
            Some(via) => {
                let via_url = Url::parse(via.trim())
                    .map_err(|e| MexError::construction(via, e.to_string()))?;
                check_scheme(&via_url, allowed_schemes)?;
                Some(via_url)
            }
            None => None,
        };

        Ok(Self {
            address: address_url,
            via,
            dialect: dialect.map(str::to_string),
            identifier: identifier.map(str::to_string),
        })
    }

    pub fn address(&self) -> &Url {
        &self.address
    }

    pub fn via(&self) -> Option<&Url> {
        self.via.as_ref()
    }

    pub fn dialect(&self) -> Option<&str> {
        self.dialect.as_deref()
    }

    pub fn identifier(&self) -> Option<&str> {
        self.identifier.as_deref()
    }

    /// Open a channel, send one get-request, await one reply. The channel
    /// lives exactly as long as this call: closed on success, aborted on
    /// any failure or timeout.
    pub(crate) async fn retrieve(
        &self,
        ctx: &RetrievalContext<'_>,
        remaining: Duration,
    ) -> MexResult<Document> {
        let mut channel = match timeout(
            remaining,
            ctx.backends.channels.open(&self.address, self.via.as_ref()),
        )
        .await
        {
            Ok(Ok(channel)) => channel,
            Ok(Err(_)) if ctx.deadline.is_expired() => return Err(ctx.deadline.expired()),
            Ok(Err(e)) => return Err(MexError::bad_reference(self.address.as_str(), e)),
            Err(_) => return Err(ctx.deadline.expired()),
        };

        let request = GetRequest {
            address: self.address.clone(),
            dialect: self.dialect.clone(),
            identifier: self.identifier.clone(),
        };

        let reply: MexResult<FetchedBody> = match ctx.deadline.remaining() {
            Ok(remaining) => match timeout(remaining, channel.get(&request, remaining)).await {
                Ok(Ok(body)) => Ok(body),
                Ok(Err(_)) if ctx.deadline.is_expired() => Err(ctx.deadline.expired()),
                Ok(Err(e)) => Err(MexError::bad_reference(self.address.as_str(), e)),
                Err(_) => Err(ctx.deadline.expired()),
            },
            Err(e) => Err(e),
        };

        let body = match reply {
            Ok(body) => body,
            Err(err) => {
                channel.abort();
                return Err(err);
            }
        };

        if let Err(e) = channel.close().await {
            channel.abort();
            return Err(MexError::bad_reference(self.address.as_str(), e));
        }

        ctx.classifier
            .classify(
                &body.text,
                Some(self.address.as_str()),
                self.dialect(),
                self.identifier(),
            )
            .map_err(|e| MexError::bad_reference(self.address.as_str(), e))
    }
}
