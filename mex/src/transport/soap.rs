//! WS-Transfer Get over SOAP/HTTP
//!
//! Each channel carries exactly one request: a SOAP envelope with
//! WS-Addressing headers and an empty body, posted to the `via` address when
//! one is given and to the endpoint address otherwise. The reply's body
//! payload (normally a `mex:Metadata` element) is handed back as text.

use super::body::{content_type, decode, header_map, read_capped};
use super::{ChannelFactory, FetchedBody, GetRequest, MetadataChannel};
use crate::config::{ReaderQuotas, ReferenceFetchConfig, SoapVersion};
use crate::document::dialect;
use crate::document::xml::{self, XmlElement};
use crate::error::{MexError, MexResult, TransportError};
use async_trait::async_trait;
use quick_xml::escape::escape;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use url::Url;
use uuid::Uuid;

pub struct SoapChannelFactory {
    config: ReferenceFetchConfig,
    quotas: ReaderQuotas,
    client: reqwest::Client,
}

impl SoapChannelFactory {
    pub fn new(config: ReferenceFetchConfig, quotas: ReaderQuotas) -> MexResult<Self> {
        let client = reqwest::Client::builder()
            .default_headers(header_map(&config.headers)?)
            .build()
            .map_err(|e| MexError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config,
            quotas,
            client,
        })
    }
}

#[async_trait]
impl ChannelFactory for SoapChannelFactory {
    async fn open(
        &self,
        address: &Url,
        via: Option<&Url>,
    ) -> Result<Box<dyn MetadataChannel>, TransportError> {
        let target = via.unwrap_or(address).clone();
        if !matches!(target.scheme(), "http" | "https") {
            return Err(TransportError::Channel(format!(
                "no SOAP transport for scheme '{}'",
                target.scheme()
            )));
        }

        Ok(Box::new(SoapChannel {
            client: self.client.clone(),
            version: self.config.soap_version,
            max_response_bytes: self.config.max_response_bytes,
            quotas: self.quotas,
            target,
            open: true,
        }))
    }

    fn name(&self) -> &str {
        "SoapTransferGet"
    }
}

struct SoapChannel {
    client: reqwest::Client,
    version: SoapVersion,
    max_response_bytes: usize,
    quotas: ReaderQuotas,
    target: Url,
    open: bool,
}

#[async_trait]
impl MetadataChannel for SoapChannel {
    async fn get(
        &mut self,
        request: &GetRequest,
        timeout: Duration,
    ) -> Result<FetchedBody, TransportError> {
        if !self.open {
            return Err(TransportError::Channel("channel is closed".to_string()));
        }

        let message_id = format!("urn:uuid:{}", Uuid::new_v4());
        let envelope = get_envelope(self.version, request.address.as_str(), &message_id);
        log::debug!(
            "WS-Transfer Get {} via {} ({})",
            request.address,
            self.target,
            message_id
        );

        let mut builder = self
            .client
            .post(self.target.clone())
            .timeout(timeout)
            .body(envelope);
        builder = match self.version {
            SoapVersion::Soap12 => builder.header(
                CONTENT_TYPE,
                format!(
                    "application/soap+xml; charset=utf-8; action=\"{}\"",
                    dialect::TRANSFER_GET_ACTION
                ),
            ),
            SoapVersion::Soap11 => builder
                .header(CONTENT_TYPE, "text/xml; charset=utf-8")
                .header("SOAPAction", format!("\"{}\"", dialect::TRANSFER_GET_ACTION)),
        };

        let response = builder.send().await?;
        let status = response.status();
        let content_type = content_type(&response);
        let bytes = read_capped(response, self.max_response_bytes).await?;
        let text = decode(bytes, content_type.as_deref())?;

        // Faults usually arrive with a 500, so the body is inspected first
        match (body_payload(&text, self.quotas), status.is_success()) {
            (Ok(Payload::Fault(reason)), _) => Err(TransportError::Fault(reason)),
            (Ok(Payload::Content(payload)), true) => Ok(FetchedBody {
                text: payload,
                content_type,
            }),
            (Err(e), true) => Err(e),
            (_, false) => Err(TransportError::Status {
                status: status.as_u16(),
            }),
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.open = false;
        Ok(())
    }

    fn abort(&mut self) {
        if self.open {
            log::debug!("aborting metadata channel to {}", self.target);
        }
        self.open = false;
    }
}

enum Payload {
    Content(String),
    Fault(String),
}

fn envelope_namespace(version: SoapVersion) -> &'static str {
    match version {
        SoapVersion::Soap11 => dialect::SOAP_11_ENVELOPE,
        SoapVersion::Soap12 => dialect::SOAP_12_ENVELOPE,
    }
}

fn get_envelope(version: SoapVersion, to: &str, message_id: &str) -> String {
    format!(
        concat!(
            r#"<s:Envelope xmlns:s="{soap}" xmlns:a="{wsa}">"#,
            r#"<s:Header>"#,
            r#"<a:Action s:mustUnderstand="1">{action}</a:Action>"#,
            r#"<a:MessageID>{message_id}</a:MessageID>"#,
            r#"<a:ReplyTo><a:Address>{anonymous}</a:Address></a:ReplyTo>"#,
            r#"<a:To s:mustUnderstand="1">{to}</a:To>"#,
            r#"</s:Header>"#,
            r#"<s:Body/>"#,
            r#"</s:Envelope>"#
        ),
        soap = envelope_namespace(version),
        wsa = dialect::WS_ADDRESSING_10,
        action = dialect::TRANSFER_GET_ACTION,
        message_id = message_id,
        anonymous = dialect::ANONYMOUS_10,
        to = escape(to),
    )
}

/// First element inside the SOAP body, or the fault reason
fn body_payload(text: &str, quotas: ReaderQuotas) -> Result<Payload, TransportError> {
    let envelope = xml::parse(text, quotas)
        .map_err(|e| TransportError::Channel(format!("unreadable reply: {}", e)))?;

    let soap_ns = [dialect::SOAP_12_ENVELOPE, dialect::SOAP_11_ENVELOPE]
        .into_iter()
        .find(|ns| envelope.is(ns, "Envelope"))
        .ok_or_else(|| TransportError::Channel("reply is not a SOAP envelope".to_string()))?;

    let body = envelope
        .children_named(soap_ns, "Body")
        .next()
        .ok_or_else(|| TransportError::Channel("reply has no SOAP body".to_string()))?;

    let payload = body
        .children
        .first()
        .ok_or_else(|| TransportError::Channel("reply body is empty".to_string()))?;

    if payload.is(soap_ns, "Fault") {
        return Ok(Payload::Fault(fault_reason(payload)));
    }
    Ok(Payload::Content(payload.detached_raw(text)))
}

fn fault_reason(fault: &XmlElement) -> String {
    // SOAP 1.2: Reason/Text, SOAP 1.1: faultstring
    let reason = fault
        .children
        .iter()
        .find(|child| child.local_name == "Reason")
        .and_then(|reason| reason.children.iter().find(|t| t.local_name == "Text"))
        .or_else(|| {
            fault
                .children
                .iter()
                .find(|child| child.local_name == "faultstring")
        })
        .map(|element| element.text.trim().to_string())
        .filter(|text| !text.is_empty());

    reason.unwrap_or_else(|| "unspecified fault".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_addresses_endpoint() {
        let envelope = get_envelope(SoapVersion::Soap12, "http://h/svc/mex?a=1&b=2", "urn:uuid:1");
        assert!(envelope.contains(dialect::SOAP_12_ENVELOPE));
        assert!(envelope.contains("<a:To s:mustUnderstand=\"1\">http://h/svc/mex?a=1&amp;b=2</a:To>"));
        assert!(envelope.contains(dialect::TRANSFER_GET_ACTION));

        let parsed = xml::parse(&envelope, ReaderQuotas::default()).unwrap();
        assert!(parsed.is(dialect::SOAP_12_ENVELOPE, "Envelope"));
    }

    #[test]
    fn test_soap11_envelope_namespace() {
        let envelope = get_envelope(SoapVersion::Soap11, "http://h/mex", "urn:uuid:2");
        assert!(envelope.contains(dialect::SOAP_11_ENVELOPE));
    }

    #[test]
    fn test_body_payload_detaches_metadata() {
        let reply = r#"<s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope" xmlns:wsx="http://schemas.xmlsoap.org/ws/2004/09/mex">
<s:Header/><s:Body><wsx:Metadata><wsx:MetadataSection Dialect="d"><x/></wsx:MetadataSection></wsx:Metadata></s:Body></s:Envelope>"#;

        let Payload::Content(payload) = body_payload(reply, ReaderQuotas::default()).unwrap() else {
            panic!("expected content");
        };
        assert!(payload.starts_with("<wsx:Metadata "));
        assert!(payload.contains("xmlns:wsx=\"http://schemas.xmlsoap.org/ws/2004/09/mex\""));
    }

    #[test]
    fn test_fault_reasons() {
        let soap12 = r#"<s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope"><s:Body><s:Fault><s:Code><s:Value>s:Receiver</s:Value></s:Code><s:Reason><s:Text xml:lang="en">no metadata here</s:Text></s:Reason></s:Fault></s:Body></s:Envelope>"#;
        let soap11 = r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/"><s:Body><s:Fault><faultcode>s:Server</faultcode><faultstring>boom</faultstring></s:Fault></s:Body></s:Envelope>"#;

        assert!(matches!(
            body_payload(soap12, ReaderQuotas::default()),
            Ok(Payload::Fault(reason)) if reason == "no metadata here"
        ));
        assert!(matches!(
            body_payload(soap11, ReaderQuotas::default()),
            Ok(Payload::Fault(reason)) if reason == "boom"
        ));
    }

    #[test]
    fn test_non_envelope_reply() {
        assert!(matches!(
            body_payload("<html/>", ReaderQuotas::default()),
            Err(TransportError::Channel(_))
        ));
    }
}
