use std::fmt;

use serde::{Deserialize, Serialize};
use shared::error::{Error, Result};
use url::{Host, Url};

pub const DEFAULT_PORT: u16 = 3478;
pub const DEFAULT_TLS_PORT: u16 = 5349;

/// The URL scheme of an ICE server.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub enum SchemeType {
    #[default]
    Unknown,
    Stun,
    Stuns,
    Turn,
    Turns,
}

impl From<&str> for SchemeType {
    fn from(raw: &str) -> Self {
        match raw {
            "stun" => SchemeType::Stun,
            "stuns" => SchemeType::Stuns,
            "turn" => SchemeType::Turn,
            "turns" => SchemeType::Turns,
            _ => SchemeType::Unknown,
        }
    }
}

impl fmt::Display for SchemeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            SchemeType::Stun => "stun",
            SchemeType::Stuns => "stuns",
            SchemeType::Turn => "turn",
            SchemeType::Turns => "turns",
            SchemeType::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

impl SchemeType {
    pub fn is_secure(self) -> bool {
        matches!(self, SchemeType::Stuns | SchemeType::Turns)
    }

    pub fn is_turn(self) -> bool {
        matches!(self, SchemeType::Turn | SchemeType::Turns)
    }
}

/// The transport protocol used to reach an ICE server.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub enum ProtoType {
    #[default]
    Udp,
    Tcp,
}

impl fmt::Display for ProtoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ProtoType::Udp => write!(f, "udp"),
            ProtoType::Tcp => write!(f, "tcp"),
        }
    }
}

/// A parsed `scheme:host[:port][?transport=udp|tcp]` ICE server URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RTCIceServerUrl {
    pub scheme: SchemeType,
    pub host: String,
    pub port: u16,
    pub proto: ProtoType,
}

impl fmt::Display for RTCIceServerUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let host = if self.host.contains(':') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };
        if self.scheme.is_turn() {
            write!(
                f,
                "{}:{}:{}?transport={}",
                self.scheme, host, self.port, self.proto
            )
        } else {
            write!(f, "{}:{}:{}", self.scheme, host, self.port)
        }
    }
}

impl RTCIceServerUrl {
    pub fn parse(raw: &str) -> Result<Self> {
        let (scheme_str, rest) = raw
            .split_once(':')
            .ok_or(Error::ErrMissingProtocolScheme)?;

        let scheme = SchemeType::from(scheme_str.to_ascii_lowercase().as_str());
        if scheme == SchemeType::Unknown {
            return Err(Error::ErrSchemeType(scheme_str.to_owned()));
        }
        if rest.is_empty() || rest.starts_with("//") {
            return Err(Error::ErrInvalidIceServerUrl(raw.to_owned()));
        }

        // ICE URLs are opaque ("stun:host"), reparse them as hierarchical so
        // host and port are split out for us.
        let url = Url::parse(&format!("{scheme}://{rest}")).map_err(|err| match err {
            url::ParseError::InvalidPort => Error::ErrInvalidPortNumber,
            url::ParseError::EmptyHost => Error::ErrInvalidIceServerUrl(raw.to_owned()),
            err => Error::Url(err),
        })?;

        if !url.username().is_empty() || url.password().is_some() || url.fragment().is_some() {
            return Err(Error::ErrInvalidIceServerUrl(raw.to_owned()));
        }
        if !(url.path().is_empty() || url.path() == "/") {
            return Err(Error::ErrInvalidIceServerUrl(raw.to_owned()));
        }

        let host = match url.host() {
            Some(Host::Domain(domain)) if !domain.is_empty() => domain.to_owned(),
            Some(Host::Ipv4(addr)) => addr.to_string(),
            Some(Host::Ipv6(addr)) => addr.to_string(),
            _ => return Err(Error::ErrInvalidIceServerUrl(raw.to_owned())),
        };

        let port = match url.port() {
            Some(0) => return Err(Error::ErrInvalidPortNumber),
            Some(port) => port,
            None if scheme.is_secure() => DEFAULT_TLS_PORT,
            None => DEFAULT_PORT,
        };

        let mut proto = if scheme.is_secure() {
            ProtoType::Tcp
        } else {
            ProtoType::Udp
        };
        if let Some(query) = url.query() {
            if !scheme.is_turn() {
                return Err(Error::ErrStunQuery);
            }
            for (key, value) in url.query_pairs() {
                if key != "transport" {
                    return Err(Error::ErrInvalidIceServerUrl(format!(
                        "{raw}: unsupported query {query}"
                    )));
                }
                proto = match value.as_ref() {
                    "udp" => ProtoType::Udp,
                    "tcp" => ProtoType::Tcp,
                    other => return Err(Error::ErrProtoType(other.to_owned())),
                };
            }
        }

        Ok(RTCIceServerUrl {
            scheme,
            host,
            port,
            proto,
        })
    }
}

/// A STUN or TURN server used by the transport to gather candidates.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RTCIceServer {
    pub urls: Vec<String>,
    pub username: String,
    pub credential: String,
}

impl RTCIceServer {
    /// Parses every URL of this server.
    ///
    /// TURN URLs require both a username and a credential.
    pub fn urls(&self) -> Result<Vec<RTCIceServerUrl>> {
        if self.urls.is_empty() {
            return Err(Error::ErrInvalidIceServerUrl(
                "ice server without urls".to_owned(),
            ));
        }

        let mut urls = Vec::with_capacity(self.urls.len());
        for raw in &self.urls {
            let url = RTCIceServerUrl::parse(raw)?;
            if url.scheme.is_turn() && (self.username.is_empty() || self.credential.is_empty()) {
                return Err(Error::ErrNoTurnCredentials);
            }
            urls.push(url);
        }

        Ok(urls)
    }
}
