/// Errors raised inside the discovery and protocol layers.
///
/// Nothing at the public command boundary returns this type directly: the
/// dispatch layer folds every failure into a [`crate::CommandOutcome`].
#[derive(Debug, thiserror::Error)]
pub enum CastError {
  #[error("HTTP request failed: {0}")]
  Http(#[from] reqwest::Error),

  #[error("HTTP {status} {body}")]
  Status { status: u16, body: String },

  #[error("XML parse error: {0}")]
  Xml(String),

  #[error("invalid URL {url}: {reason}")]
  InvalidUrl { url: String, reason: String },

  #[error("control address missing")]
  MissingControlUrl,

  #[error("discovery error: {0}")]
  Discovery(String),

  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),

  #[error("configuration error: {0}")]
  Config(String),
}

impl From<quick_xml::Error> for CastError {
  fn from(error: quick_xml::Error) -> Self {
    CastError::Xml(error.to_string())
  }
}

pub type Result<T> = std::result::Result<T, CastError>;
