use std::time::Duration;

use quick_xml::escape::escape;

use crate::error::{CastError, Result};

pub const AV_TRANSPORT_SERVICE: &str = "urn:schemas-upnp-org:service:AVTransport:1";

pub struct SoapRequest {
  pub service_type: String,
  pub action: String,
  pub params: Vec<(String, String)>,
}

impl SoapRequest {
  /// AVTransport action on instance 0 with the given extra arguments
  pub fn av_transport(action: &str, extra: &[(&str, &str)]) -> Self {
    let mut params = vec![("InstanceID".to_string(), "0".to_string())];
    params.extend(extra.iter().map(|(k, v)| (k.to_string(), v.to_string())));

    Self {
      service_type: AV_TRANSPORT_SERVICE.to_string(),
      action: action.to_string(),
      params,
    }
  }

  /// Quoted `SOAPACTION` header value
  pub fn soap_action_header(&self) -> String {
    format!("\"{}#{}\"", self.service_type, self.action)
  }
}

#[derive(Debug)]
pub struct SoapResponse {
  pub status: u16,
  pub body: String,
}

/// Posts SOAP envelopes to a control URL. Non-2xx answers become
/// [`CastError::Status`] carrying the status and the error body.
#[derive(Debug, Clone)]
pub struct SoapClient {
  http_client: reqwest::blocking::Client,
}

impl SoapClient {
  pub fn new(timeout: Duration) -> Result<Self> {
    let http_client = reqwest::blocking::Client::builder()
      .connect_timeout(timeout)
      .timeout(timeout)
      .build()?;

    Ok(Self { http_client })
  }

  pub fn call(&self, control_url: &str, request: &SoapRequest) -> Result<SoapResponse> {
    let body = Self::build_soap_envelope(request);

    let response = self
      .http_client
      .post(control_url)
      .header("Content-Type", "text/xml; charset=\"utf-8\"")
      .header("SOAPACTION", request.soap_action_header())
      .body(body)
      .send()?;

    let status = response.status();
    let response_body = response.text()?;

    if !status.is_success() {
      if let Some(fault) = fault_description(&response_body) {
        log::debug!("{} returned SOAP fault: {}", request.action, fault);
      }
      return Err(CastError::Status { status: status.as_u16(), body: response_body });
    }

    Ok(SoapResponse { status: status.as_u16(), body: response_body })
  }

  /// SOAP 1.1 envelope around one action element. Argument values are XML-escaped.
  pub fn build_soap_envelope(request: &SoapRequest) -> String {
    let mut params_xml = String::new();
    for (key, value) in &request.params {
      params_xml.push_str(&format!("<{}>{}</{}>\n", key, escape(value.as_str()), key));
    }

    format!(
      "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
        <s:Envelope xmlns:s=\"http://schemas.xmlsoap.org/soap/envelope/\" \
        s:encodingStyle=\"http://schemas.xmlsoap.org/soap/encoding/\">\n\
        <s:Body>\n\
        <u:{} xmlns:u=\"{}\">\n\
        {}\
        </u:{}>\n\
        </s:Body>\n\
        </s:Envelope>",
      request.action, request.service_type, params_xml, request.action
    )
  }
}

/// Human readable summary of a SOAP fault body, if it carries one
pub fn fault_description(xml: &str) -> Option<String> {
  let code = extract_xml_value(xml, "errorCode");
  let description = extract_xml_value(xml, "errorDescription");

  match (code, description) {
    (Some(code), Some(description)) => Some(format!("UPnP error {}: {}", code, description)),
    (Some(code), None) => Some(format!("UPnP error {}", code)),
    (None, Some(description)) => Some(description),
    (None, None) => extract_xml_value(xml, "faultstring"),
  }
}

/// Text between the first `<tag>` and the following `</tag>`
pub fn extract_xml_value(xml: &str, tag: &str) -> Option<String> {
  let start_tag = format!("<{}>", tag);
  let end_tag = format!("</{}>", tag);

  xml.find(&start_tag).and_then(|start| {
    let content_start = start + start_tag.len();
    xml[content_start..]
      .find(&end_tag)
      .map(|end| xml[content_start..content_start + end].trim().to_string())
  })
}
