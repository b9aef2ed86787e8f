//! Dialect and namespace identifiers for metadata documents

/// WSDL 1.1 interface descriptions
pub const WSDL: &str = "http://schemas.xmlsoap.org/wsdl/";
/// W3C XML Schema
pub const XML_SCHEMA: &str = "http://www.w3.org/2001/XMLSchema";
pub const WS_POLICY: &str = "http://schemas.xmlsoap.org/ws/2004/09/policy";
/// WS-MetadataExchange; also the namespace of the composite set wrapper
pub const METADATA_EXCHANGE: &str = "http://schemas.xmlsoap.org/ws/2004/09/mex";

pub const WS_ADDRESSING_10: &str = "http://www.w3.org/2005/08/addressing";
pub const WS_ADDRESSING_2004: &str = "http://schemas.xmlsoap.org/ws/2004/08/addressing";
pub const ANONYMOUS_10: &str = "http://www.w3.org/2005/08/addressing/anonymous";

pub const SOAP_11_ENVELOPE: &str = "http://schemas.xmlsoap.org/soap/envelope/";
pub const SOAP_12_ENVELOPE: &str = "http://www.w3.org/2003/05/soap-envelope";

pub const TRANSFER_GET_ACTION: &str = "http://schemas.xmlsoap.org/ws/2004/09/transfer/Get";

pub fn is_addressing_namespace(ns: &str) -> bool {
    ns == WS_ADDRESSING_10 || ns == WS_ADDRESSING_2004
}
