//! Error enum
use std::fmt;

#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    Xml(quick_xml::Error),
    Serde(serde_json::Error),
    Yaml(serde_yaml::Error),
    MalformedInput(String),
    Config(String),
    Segmenter(String),
    Internal(String),
    Custom(String),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Error {
        Error::Io(e)
    }
}

impl From<quick_xml::Error> for Error {
    fn from(e: quick_xml::Error) -> Error {
        Error::Xml(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Error {
        Error::Serde(e)
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Error {
        Error::Yaml(e)
    }
}

impl From<String> for Error {
    fn from(s: String) -> Error {
        Error::Custom(s)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "io error: {}", e),
            Error::Xml(e) => write!(f, "markup error: {}", e),
            Error::Serde(e) => write!(f, "json error: {}", e),
            Error::Yaml(e) => write!(f, "yaml error: {}", e),
            Error::MalformedInput(s) => write!(f, "malformed input: {}", s),
            Error::Config(s) => write!(f, "config error: {}", s),
            Error::Segmenter(s) => write!(f, "segmenter error: {}", s),
            Error::Internal(s) => write!(f, "internal error: {}", s),
            Error::Custom(s) => write!(f, "{}", s),
        }
    }
}

impl std::error::Error for Error {}
