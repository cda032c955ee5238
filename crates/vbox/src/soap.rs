//! SOAP transport for the VirtualBox web service.
//!
//! vboxwebsrv exposes every interface method as a document/literal SOAP
//! operation named `<Interface>_<method>`. Arguments are child elements of the
//! operation element and results come back as one `returnval` element per
//! value (arrays repeat the element).

use crate::error::{Result, VboxError};
use hyper::client::HttpConnector;
use hyper::header::CONTENT_TYPE;
use hyper::{Body, Client, Method, Request, Uri};
use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::time::Instant;

const SOAP_ENV_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
const VBOX_NS: &str = "http://www.virtualbox.org/";

/// Build a request envelope for `method` with the given named arguments.
pub fn envelope(method: &str, args: &[(&str, &str)]) -> String {
    let mut xml = String::with_capacity(256);
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    xml.push_str(&format!(
        r#"<SOAP-ENV:Envelope xmlns:SOAP-ENV="{SOAP_ENV_NS}" xmlns:vbox="{VBOX_NS}">"#
    ));
    xml.push_str("<SOAP-ENV:Body>");
    xml.push_str(&format!("<vbox:{method}>"));
    for (name, value) in args {
        xml.push_str(&format!("<{name}>{}</{name}>", escape(*value)));
    }
    xml.push_str(&format!("</vbox:{method}>"));
    xml.push_str("</SOAP-ENV:Body></SOAP-ENV:Envelope>");
    xml
}

#[derive(Clone, Copy)]
enum Field {
    Returnval,
    FaultCode,
    FaultString,
    ResultCode,
}

/// Parse a response envelope into its `returnval` values, in document order.
///
/// A `Fault` body is turned into [`VboxError::Fault`].
pub fn parse_response(xml: &str) -> Result<Vec<String>> {
    // Text is kept verbatim; whitespace between elements is skipped because
    // no field is active there.
    let mut reader = Reader::from_str(xml);

    let mut values = Vec::new();
    let mut in_fault = false;
    let mut field: Option<Field> = None;
    let mut fault_code = String::new();
    let mut fault_string = String::new();
    let mut result_code = String::new();

    loop {
        let event = reader
            .read_event()
            .map_err(|e| VboxError::Protocol(format!("malformed SOAP response: {e}")))?;
        match event {
            Event::Start(e) => {
                field = match e.local_name().as_ref() {
                    b"Fault" => {
                        in_fault = true;
                        None
                    }
                    b"returnval" if !in_fault => {
                        values.push(String::new());
                        Some(Field::Returnval)
                    }
                    b"faultcode" if in_fault => Some(Field::FaultCode),
                    b"faultstring" if in_fault => Some(Field::FaultString),
                    b"resultCode" if in_fault => Some(Field::ResultCode),
                    _ => None,
                };
            }
            Event::Empty(e) => {
                if !in_fault && e.local_name().as_ref() == b"returnval" {
                    values.push(String::new());
                }
            }
            Event::Text(t) => {
                let Some(current) = field else { continue };
                let text = t
                    .unescape()
                    .map_err(|e| VboxError::Protocol(format!("bad text in SOAP response: {e}")))?;
                match current {
                    Field::Returnval => {
                        if let Some(last) = values.last_mut() {
                            last.push_str(&text);
                        }
                    }
                    Field::FaultCode => fault_code.push_str(&text),
                    Field::FaultString => fault_string.push_str(&text),
                    Field::ResultCode => result_code.push_str(&text),
                }
            }
            Event::End(_) => field = None,
            Event::Eof => break,
            _ => {}
        }
    }

    if in_fault {
        return Err(VboxError::Fault {
            code: fault_code,
            message: fault_string,
            result_code: result_code.trim().parse().ok(),
        });
    }

    Ok(values)
}

/// Take the single `returnval` of a scalar method.
pub fn single(method: &str, values: Vec<String>) -> Result<String> {
    values
        .into_iter()
        .next()
        .ok_or_else(|| VboxError::Protocol(format!("{method} returned no value")))
}

/// Normalize a connection string into an HTTP endpoint URI.
///
/// Bare `host:port` values get an `http://` scheme.
pub fn parse_endpoint(endpoint: &str) -> Result<Uri> {
    let endpoint = endpoint.trim();
    if endpoint.is_empty() {
        return Err(VboxError::Config("empty connection string".into()));
    }

    let with_scheme = if endpoint.contains("://") {
        endpoint.to_string()
    } else {
        format!("http://{endpoint}")
    };

    let uri: Uri = with_scheme
        .parse()
        .map_err(|e| VboxError::Config(format!("invalid connection string '{endpoint}': {e}")))?;

    if uri.scheme_str() != Some("http") {
        return Err(VboxError::Config(format!(
            "unsupported scheme in '{endpoint}', only http is supported"
        )));
    }
    if uri.host().is_none() {
        return Err(VboxError::Config(format!(
            "connection string '{endpoint}' has no host"
        )));
    }

    Ok(uri)
}

/// HTTP client that posts SOAP envelopes to one vboxwebsrv endpoint.
#[derive(Debug, Clone)]
pub struct SoapClient {
    client: Client<HttpConnector>,
    endpoint: Uri,
}

impl SoapClient {
    /// Create a client for the given connection string.
    pub fn new(endpoint: &str) -> Result<Self> {
        Ok(Self {
            client: Client::new(),
            endpoint: parse_endpoint(endpoint)?,
        })
    }

    /// Endpoint this client talks to.
    pub fn endpoint(&self) -> &Uri {
        &self.endpoint
    }

    /// Invoke `method` and return its `returnval` values.
    ///
    /// There is no request timeout: some methods, like
    /// `IProgress_waitForCompletion` with `-1`, block server-side for as long
    /// as the operation runs.
    pub async fn call(&self, method: &str, args: &[(&str, &str)]) -> Result<Vec<String>> {
        let start = Instant::now();
        let body = envelope(method, args);
        tracing::trace!(method, body = %body, "SOAP request body");

        let request = Request::builder()
            .method(Method::POST)
            .uri(self.endpoint.clone())
            .header(CONTENT_TYPE, "text/xml; charset=utf-8")
            .header("SOAPAction", "\"\"")
            .body(Body::from(body))
            .map_err(|e| VboxError::Config(format!("failed to build {method} request: {e}")))?;

        let response = self.client.request(request).await.map_err(|e| {
            tracing::error!(method, error = %e, "SOAP request failed");
            VboxError::Http(format!("{method} request failed: {e}"))
        })?;

        let status = response.status();
        let body_bytes = hyper::body::to_bytes(response.into_body())
            .await
            .map_err(|e| VboxError::Http(format!("failed to read {method} response: {e}")))?;
        let body_str = String::from_utf8_lossy(&body_bytes);
        tracing::trace!(method, status = %status, body = %body_str, "SOAP response body");

        let parsed = parse_response(&body_str);
        let elapsed_ms = start.elapsed().as_millis() as u64;

        // vboxwebsrv answers faults with HTTP 500 and a fault envelope.
        if !status.is_success() {
            return match parsed {
                Err(fault @ VboxError::Fault { .. }) => {
                    tracing::debug!(method, elapsed_ms, error = %fault, "SOAP fault");
                    Err(fault)
                }
                _ => Err(VboxError::Status {
                    status: status.as_u16(),
                    body: body_str.into_owned(),
                }),
            };
        }

        tracing::debug!(method, elapsed_ms, "SOAP call completed");
        parsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_shape() {
        let xml = envelope("IVirtualBox_findMachine", &[("_this", "abc"), ("nameOrId", "vm")]);
        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains(r#"xmlns:vbox="http://www.virtualbox.org/""#));
        assert!(xml.contains(
            "<vbox:IVirtualBox_findMachine><_this>abc</_this><nameOrId>vm</nameOrId></vbox:IVirtualBox_findMachine>"
        ));
    }

    #[test]
    fn test_envelope_escapes_arguments() {
        let xml = envelope("IVirtualBox_findMachine", &[("nameOrId", "a<b & \"c\"")]);
        assert!(xml.contains("<nameOrId>a&lt;b &amp; &quot;c&quot;</nameOrId>"));
    }

    #[test]
    fn test_parse_scalar_response() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<SOAP-ENV:Envelope xmlns:SOAP-ENV="http://schemas.xmlsoap.org/soap/envelope/" xmlns:vbox="http://www.virtualbox.org/">
  <SOAP-ENV:Body>
    <vbox:IWebsessionManager_logonResponse>
      <returnval>5d3f0c2e8a1b4f6d-0000000000000001</returnval>
    </vbox:IWebsessionManager_logonResponse>
  </SOAP-ENV:Body>
</SOAP-ENV:Envelope>"#;
        let values = parse_response(xml).unwrap();
        assert_eq!(values, vec!["5d3f0c2e8a1b4f6d-0000000000000001"]);
    }

    #[test]
    fn test_parse_array_response_keeps_order() {
        let xml = r#"<SOAP-ENV:Envelope xmlns:SOAP-ENV="http://schemas.xmlsoap.org/soap/envelope/" xmlns:vbox="http://www.virtualbox.org/"><SOAP-ENV:Body><vbox:IVirtualBox_getMachinesResponse><returnval>m-2</returnval><returnval>m-1</returnval><returnval/></vbox:IVirtualBox_getMachinesResponse></SOAP-ENV:Body></SOAP-ENV:Envelope>"#;
        let values = parse_response(xml).unwrap();
        assert_eq!(values, vec!["m-2", "m-1", ""]);
    }

    #[test]
    fn test_parse_void_response() {
        let xml = r#"<SOAP-ENV:Envelope xmlns:SOAP-ENV="http://schemas.xmlsoap.org/soap/envelope/" xmlns:vbox="http://www.virtualbox.org/"><SOAP-ENV:Body><vbox:ISession_unlockMachineResponse/></SOAP-ENV:Body></SOAP-ENV:Envelope>"#;
        assert!(parse_response(xml).unwrap().is_empty());
    }

    #[test]
    fn test_parse_keeps_surrounding_whitespace() {
        let xml = "<Envelope><Body><r><returnval>  web  </returnval>\n  <returnval>\tdb</returnval></r></Body></Envelope>";
        assert_eq!(parse_response(xml).unwrap(), vec!["  web  ", "\tdb"]);
    }

    #[test]
    fn test_parse_unescapes_text() {
        let xml = r#"<Envelope><Body><r><returnval>web &amp; db</returnval></r></Body></Envelope>"#;
        assert_eq!(parse_response(xml).unwrap(), vec!["web & db"]);
    }

    #[test]
    fn test_parse_fault() {
        let xml = r#"<SOAP-ENV:Envelope xmlns:SOAP-ENV="http://schemas.xmlsoap.org/soap/envelope/" xmlns:vbox="http://www.virtualbox.org/">
  <SOAP-ENV:Body>
    <SOAP-ENV:Fault>
      <faultcode>SOAP-ENV:Client</faultcode>
      <faultstring>VirtualBox error: Could not find a registered machine named 'nope' (0x80bb0001)</faultstring>
      <detail>
        <vbox:RuntimeFault>
          <resultCode>-2135228415</resultCode>
          <returnval>ignored</returnval>
        </vbox:RuntimeFault>
      </detail>
    </SOAP-ENV:Fault>
  </SOAP-ENV:Body>
</SOAP-ENV:Envelope>"#;
        match parse_response(xml) {
            Err(err @ VboxError::Fault { .. }) => {
                assert!(err.is_object_not_found());
                let VboxError::Fault { code, message, .. } = err else {
                    unreachable!()
                };
                assert_eq!(code, "SOAP-ENV:Client");
                assert!(message.contains("nope"));
            }
            other => panic!("expected fault, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_malformed() {
        let err = parse_response("<Envelope><Body></Envelope>").unwrap_err();
        assert!(matches!(err, VboxError::Protocol(_)));
    }

    #[test]
    fn test_single() {
        assert_eq!(single("m", vec!["a".into(), "b".into()]).unwrap(), "a");
        assert!(matches!(single("m", vec![]), Err(VboxError::Protocol(_))));
    }

    #[test]
    fn test_parse_endpoint() {
        let uri = parse_endpoint("http://localhost:18083").unwrap();
        assert_eq!(uri.host(), Some("localhost"));
        assert_eq!(uri.port_u16(), Some(18083));

        let bare = parse_endpoint("10.0.0.5:18083").unwrap();
        assert_eq!(bare.scheme_str(), Some("http"));
        assert_eq!(bare.host(), Some("10.0.0.5"));

        assert!(matches!(parse_endpoint(""), Err(VboxError::Config(_))));
        assert!(matches!(
            parse_endpoint("https://localhost:18083"),
            Err(VboxError::Config(_))
        ));
        assert!(matches!(
            parse_endpoint("http://exa mple"),
            Err(VboxError::Config(_))
        ));
    }
}
