//! URI model for connector destinations.
//!
//! Connectors accept strings of the form
//! `scheme://host:port/path?query#fragment`, where the scheme may be absent
//! (a default is prefixed before parsing). IPv6 literals are bracketed in the
//! rendered form; the stored host is unbracketed. A `hostname=` query
//! parameter carries the original hostname down to layers that need it for
//! TLS verification after the host has been replaced by a resolved IP.

use crate::base::neterror::NetError;
use std::net::IpAddr;
use url::form_urlencoded;
use url::Url;

/// A parsed connector URI.
///
/// `unix://` URIs carry a filesystem path rather than an authority and skip
/// host/port handling entirely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedUri {
    original: String,
    scheme: String,
    host: Option<String>,
    port: Option<u16>,
    path: String,
    query: Option<String>,
    fragment: Option<String>,
}

impl ParsedUri {
    /// Parses `input`, prefixing `default_scheme://` when no scheme is given.
    ///
    /// Fails with `InvalidArgument`/EINVAL when the string does not parse or
    /// lacks a host (for authority-carrying schemes).
    pub fn parse(input: &str, default_scheme: &str) -> Result<Self, NetError> {
        let original = input.to_string();
        let prefixed;
        let to_parse = if input.contains("://") {
            input
        } else {
            prefixed = format!("{default_scheme}://{input}");
            &prefixed
        };

        // Unix-domain URIs hold a path, not an authority.
        if let Some(rest) = to_parse.strip_prefix("unix://") {
            if rest.is_empty() {
                return Err(NetError::invalid_uri(input));
            }
            return Ok(ParsedUri {
                original,
                scheme: "unix".to_string(),
                host: None,
                port: None,
                path: rest.to_string(),
                query: None,
                fragment: None,
            });
        }

        let url = Url::parse(to_parse).map_err(|_| NetError::invalid_uri(input))?;
        let host = url
            .host_str()
            .map(|h| h.trim_start_matches('[').trim_end_matches(']').to_string());
        match &host {
            Some(h) if !h.is_empty() => {}
            _ => return Err(NetError::invalid_uri(input)),
        }

        Ok(ParsedUri {
            original,
            scheme: url.scheme().to_string(),
            host,
            port: url.port(),
            path: url.path().to_string(),
            query: url.query().map(str::to_string),
            fragment: url.fragment().map(str::to_string),
        })
    }

    /// The caller's input, verbatim.
    pub fn original(&self) -> &str {
        &self.original
    }

    /// The lowercase scheme.
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// The host, with IPv6 brackets stripped. `None` for `unix://`.
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// The path; for `unix://` this is the socket path.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn fragment(&self) -> Option<&str> {
        self.fragment.as_deref()
    }

    /// The host parsed as an IP literal, if it is one.
    pub fn ip_literal(&self) -> Option<IpAddr> {
        self.host.as_deref()?.parse().ok()
    }

    /// The value of a pre-existing `hostname=` query parameter.
    pub fn hostname_param(&self) -> Option<String> {
        let query = self.query.as_deref()?;
        form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == "hostname")
            .map(|(_, value)| value.into_owned())
    }

    /// The hostname downstream TLS layers should verify against: an explicit
    /// `hostname=` parameter wins over the URI host.
    pub fn hostname_hint(&self) -> Option<String> {
        self.hostname_param().or_else(|| self.host.clone())
    }

    /// Renders a per-IP candidate URI: the authority host replaced by the
    /// literal IP (bracketed if v6) and `hostname=<original>` appended unless
    /// the query already carries one. An existing query keeps its text and
    /// gains the pair after `&`; otherwise the pair starts the query with `?`.
    /// The fragment stays last.
    pub fn candidate_uri(&self, ip: &IpAddr, hostname: &str) -> String {
        let authority = match ip {
            IpAddr::V4(v4) => v4.to_string(),
            IpAddr::V6(v6) => format!("[{v6}]"),
        };
        let mut out = format!("{}://{}", self.scheme, authority);
        if let Some(port) = self.port {
            out.push(':');
            out.push_str(&port.to_string());
        }
        out.push_str(&self.path);

        let inject = self.hostname_param().is_none();
        let pair = form_urlencoded::Serializer::new(String::new())
            .append_pair("hostname", hostname)
            .finish();
        match (self.query.as_deref(), inject) {
            (Some(query), true) => {
                out.push('?');
                out.push_str(query);
                out.push('&');
                out.push_str(&pair);
            }
            (Some(query), false) => {
                out.push('?');
                out.push_str(query);
            }
            (None, true) => {
                out.push('?');
                out.push_str(&pair);
            }
            (None, false) => {}
        }
        if let Some(fragment) = &self.fragment {
            out.push('#');
            out.push_str(fragment);
        }
        out
    }

    /// Reassembles the canonical `scheme://authority[path][?query][#fragment]`
    /// form. Identity for inputs that carried an explicit scheme.
    pub fn render(&self) -> String {
        if self.scheme == "unix" {
            return format!("unix://{}", self.path);
        }
        let host = self.host.as_deref().unwrap_or("");
        let authority = if host.contains(':') {
            format!("[{host}]")
        } else {
            host.to_string()
        };
        let mut out = format!("{}://{}", self.scheme, authority);
        if let Some(port) = self.port {
            out.push(':');
            out.push_str(&port.to_string());
        }
        out.push_str(&self.path);
        if let Some(query) = &self.query {
            out.push('?');
            out.push_str(query);
        }
        if let Some(fragment) = &self.fragment {
            out.push('#');
            out.push_str(fragment);
        }
        out
    }
}
