use super::RetrievalContext;
use crate::document::Document;
use crate::error::{MexError, MexResult};
use std::time::Duration;
use url::Url;

/// Fetches the document stored at a URL
#[derive(Debug, Clone)]
pub struct LocationRetriever {
    location: Url,
    dialect: Option<String>,
    identifier: Option<String>,
}

impl LocationRetriever {
    /// Parse and validate `location`; nothing is fetched here
    pub fn new(
        location: &str,
        dialect: Option<&str>,
        identifier: Option<&str>,
        allowed_schemes: &[String],
    ) -> MexResult<Self> {
        let url = Url::parse(location.trim())
            .map_err(|e| MexError::construction(location, e.to_string()))?;
        Self::from_url(url, dialect, identifier, allowed_schemes)
    }

    pub fn from_url(
        mut location: Url,
        dialect: Option<&str>,
        identifier: Option<&str>,
        allowed_schemes: &[String],
    ) -> MexResult<Self> {
        check_scheme(&location, allowed_schemes)?;
        location.set_fragment(None);

        Ok(Self {
            location,
            dialect: dialect.map(str::to_string),
            identifier: identifier.map(str::to_string),
        })
    }

    pub fn location(&self) -> &Url {
        &self.location
    }

    pub fn dialect(&self) -> Option<&str> {
        self.dialect.as_deref()
    }

    pub fn identifier(&self) -> Option<&str> {
        self.identifier.as_deref()
    }

    pub(crate) async fn retrieve(
        &self,
        ctx: &RetrievalContext<'_>,
        remaining: Duration,
    ) -> MexResult<Document> {
        let fetch = ctx.backends.locations.fetch(
            &self.location,
            self.dialect(),
            self.identifier(),
            remaining,
        );

        // Dropping the fetch future on timeout aborts the pending request
        let body = match tokio::time::timeout(remaining, fetch).await {
            Ok(Ok(body)) => body,
            Ok(Err(_)) if ctx.deadline.is_expired() => return Err(ctx.deadline.expired()),
            Ok(Err(e)) => return Err(MexError::bad_reference(self.location.as_str(), e)),
            Err(_) => return Err(ctx.deadline.expired()),
        };

        ctx.classifier
            .classify(
                &body.text,
                Some(self.location.as_str()),
                self.dialect(),
                self.identifier(),
            )
            .map_err(|e| MexError::bad_reference(self.location.as_str(), e))
    }
}

/// Reject URLs whose scheme is not in `allowed_schemes`
pub(crate) fn check_scheme(url: &Url, allowed_schemes: &[String]) -> MexResult<()> {
    if url.cannot_be_a_base()
        || !allowed_schemes
            .iter()
            .any(|scheme| scheme.eq_ignore_ascii_case(url.scheme()))
    {
        return Err(MexError::construction(
            url.as_str(),
            format!(
                "scheme '{}' is not one of: {}",
                url.scheme(),
                allowed_schemes.join(", ")
            ),
        ));
    }
    Ok(())
}
