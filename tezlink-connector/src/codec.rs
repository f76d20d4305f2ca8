//! # Deep-Link Codec
//!
//! Builds and parses the custom-scheme URLs exchanged with mobile wallets.
//!
//! An encoded link has the form `<base>?type=<kind>&<key>=<value>...`, with every key
//! and value form-encoded. Decoding is lenient: a link that parses as a URL always
//! yields a parameter map, and absent keys read as the empty string.

use crate::events::ErrorInfo;
use std::{collections::BTreeMap, fmt};
use url::Url;

/// Name of the parameter that carries the link kind.
pub const TYPE_PARAM: &str = "type";
pub const ERROR_ID_PARAM: &str = "errorId";
pub const ERROR_MESSAGE_PARAM: &str = "errorMessage";

/// What a deep link asks for, or answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeepLinkKind {
    Login,
    Operation,
    Sign,
    Originate,
}

impl DeepLinkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeepLinkKind::Login => "login",
            DeepLinkKind::Operation => "operation",
            DeepLinkKind::Sign => "sign",
            DeepLinkKind::Originate => "originate",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "login" => Some(DeepLinkKind::Login),
            "operation" => Some(DeepLinkKind::Operation),
            "sign" => Some(DeepLinkKind::Sign),
            "originate" => Some(DeepLinkKind::Originate),
            _ => None,
        }
    }
}

impl fmt::Display for DeepLinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Encodes deep links against a fixed, validated base URL.
#[derive(Debug, Clone)]
pub struct DeepLinkCodec {
    base: Url,
}

impl DeepLinkCodec {
    pub fn new(base_url: &str) -> Result<Self, url::ParseError> {
        Ok(Self {
            base: Url::parse(base_url)?,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base.as_str()
    }

    /// Builds a link of the given kind.
    ///
    /// The `type` parameter always reflects `kind`; a `type` entry among `fields` is skipped.
    pub fn encode<I, K, V>(&self, kind: DeepLinkKind, fields: I) -> String
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut url = self.base.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair(TYPE_PARAM, kind.as_str());
            for (key, value) in fields {
                if key.as_ref() == TYPE_PARAM {
                    continue;
                }
                query.append_pair(key.as_ref(), value.as_ref());
            }
        }
        url.to_string()
    }
}

/// Parses a deep link into its parameters. Returns `None` when `link` is not a URL.
pub fn decode(link: &str) -> Option<DeepLinkParams> {
    let url = Url::parse(link.trim()).ok()?;
    let params = url.query_pairs().into_owned().collect();
    Some(DeepLinkParams { params })
}

/// The decoded query of a deep link.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeepLinkParams {
    params: BTreeMap<String, String>,
}

impl DeepLinkParams {
    /// The value for `key`, or `""` when absent.
    pub fn get(&self, key: &str) -> &str {
        self.params.get(key).map(String::as_str).unwrap_or("")
    }

    /// The value for `key`, or `None` when absent or empty.
    pub fn non_empty(&self, key: &str) -> Option<&str> {
        Some(self.get(key)).filter(|v| !v.is_empty())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    pub fn raw_type(&self) -> &str {
        self.get(TYPE_PARAM)
    }

    pub fn kind(&self) -> Option<DeepLinkKind> {
        DeepLinkKind::parse(self.raw_type())
    }

    /// The error the wallet reported, if this link is a failure response.
    pub fn error(&self) -> Option<ErrorInfo> {
        let id = self.non_empty(ERROR_ID_PARAM);
        let message = self.non_empty(ERROR_MESSAGE_PARAM);
        if id.is_none() && message.is_none() {
            return None;
        }
        Some(ErrorInfo {
            error_id: id.map(str::to_string),
            error_message: message.map(str::to_string),
            kind: None,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn into_map(self) -> BTreeMap<String, String> {
        self.params
    }
}
