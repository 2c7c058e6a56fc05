//! SigV4 canonicalization and signature derivation.
//!
//! - [Signature Version 4 signing process](https://docs.aws.amazon.com/general/latest/gr/signature-version-4.html)

use std::borrow::Cow;
use std::fmt;
use std::fmt::Display;
use std::fmt::Write as _;
use std::mem;
use std::str::FromStr;

use http::uri::Authority;
use http::uri::PathAndQuery;
use http::uri::Scheme;
use http::HeaderMap;
use http::HeaderValue;
use http::Method;
use http::Uri;
use percent_encoding::utf8_percent_encode;

use crate::constants::{AWS_QUERY_ENCODE_SET, AWS_URI_ENCODE_SET};
use crate::hash::{hex_sha256, hmac_sha256, EMPTY_STRING_SHA256};
use crate::time::{format_date, format_iso8601, DateTime};
use crate::{Error, Result};

/// Signing context for one request.
///
/// `Display` renders the canonical request string: method, encoded path,
/// canonical query, canonical headers, signed header names, content hash.
#[derive(Debug)]
pub(crate) struct CanonicalRequest {
    /// HTTP method.
    pub method: Method,
    /// HTTP scheme.
    pub scheme: Scheme,
    /// HTTP authority.
    pub authority: Authority,
    /// HTTP path.
    pub path: String,
    /// HTTP query parameters.
    pub query: Vec<(String, String)>,
    /// HTTP headers.
    pub headers: HeaderMap,
    /// Content hash carried into the canonical request. `None` falls back
    /// to the digest of an empty payload.
    pub content_sha256: Option<String>,
}

impl CanonicalRequest {
    /// Build a signing context from http::request::Parts.
    pub fn build(parts: &mut http::request::Parts) -> Result<Self> {
        let uri = mem::take(&mut parts.uri).into_parts();
        let paq = uri
            .path_and_query
            .unwrap_or_else(|| PathAndQuery::from_static("/"));

        Ok(CanonicalRequest {
            method: parts.method.clone(),
            scheme: uri.scheme.unwrap_or(Scheme::HTTP),
            authority: uri.authority.ok_or_else(|| {
                Error::request_invalid("request without authority is invalid for signing")
            })?,
            path: paq.path().to_string(),
            query: paq
                .query()
                .map(|v| {
                    form_urlencoded::parse(v.as_bytes())
                        .map(|(k, v)| (k.into_owned(), v.into_owned()))
                        .collect()
                })
                .unwrap_or_default(),

            // Take the headers out of the request to avoid copy.
            // We will return it back when apply the context.
            headers: mem::take(&mut parts.headers),
            content_sha256: None,
        })
    }

    /// Build a signing context from a plain URL, for presigning.
    ///
    /// Query parameters on the input URL are not part of the presigned
    /// parameter set and are dropped.
    pub fn from_url(method: Method, url: &str) -> Result<Self> {
        let uri = Uri::from_str(url)?.into_parts();
        let paq = uri
            .path_and_query
            .unwrap_or_else(|| PathAndQuery::from_static("/"));
        if let Some(query) = paq.query() {
            log::debug!("query {query} on presign input dropped");
        }

        Ok(CanonicalRequest {
            method,
            scheme: uri.scheme.unwrap_or(Scheme::HTTP),
            authority: uri.authority.ok_or_else(|| {
                Error::request_invalid("url without authority is invalid for presigning")
            })?,
            path: paq.path().to_string(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            content_sha256: None,
        })
    }

    /// Apply the signing context back to http::request::Parts.
    pub fn apply(mut self, parts: &mut http::request::Parts) -> Result<()> {
        let query_size = self
            .query
            .iter()
            .map(|(k, v)| k.len() + v.len())
            .sum::<usize>();

        // Return headers back.
        mem::swap(&mut parts.headers, &mut self.headers);
        parts.method = self.method;
        parts.uri = {
            let mut uri_parts = mem::take(&mut parts.uri).into_parts();
            uri_parts.scheme = Some(self.scheme);
            uri_parts.authority = Some(self.authority);
            // Build path and query.
            uri_parts.path_and_query = {
                let paq = if query_size == 0 {
                    self.path
                } else {
                    let mut s = self.path;
                    s.reserve(query_size + 1);

                    s.push('?');
                    for (i, (k, v)) in self.query.iter().enumerate() {
                        if i > 0 {
                            s.push('&');
                        }

                        s.push_str(k);
                        if !v.is_empty() {
                            s.push('=');
                            s.push_str(v);
                        }
                    }

                    s
                };

                Some(PathAndQuery::from_str(&paq)?)
            };
            Uri::from_parts(uri_parts)?
        };

        Ok(())
    }

    /// Host for the `host` header and presigned output: the authority with
    /// a scheme-default port stripped.
    pub fn host_port(&self) -> String {
        match (self.scheme.as_str(), self.authority.port_u16()) {
            ("http", Some(80)) | ("https", Some(443)) => self.authority.host().to_string(),
            _ => self.authority.as_str().to_string(),
        }
    }

    /// Get the path percent decoded.
    pub fn path_percent_decoded(&self) -> Cow<'_, str> {
        percent_encoding::percent_decode_str(&self.path).decode_utf8_lossy()
    }

    /// Path encoded with the URI set, `/` preserved. Decoding first keeps
    /// already-encoded input from being encoded twice.
    pub fn encoded_path(&self) -> String {
        utf8_percent_encode(&self.path_percent_decoded(), &AWS_URI_ENCODE_SET).to_string()
    }

    /// Percent-encode every query key and value, then sort by the encoded
    /// pair. Encoding happens before the sort: the canonical order is the
    /// byte order of the encoded keys.
    pub fn canonicalize_query(&mut self) {
        self.query = self
            .query
            .iter()
            .map(|(k, v)| {
                (
                    utf8_percent_encode(k, &AWS_QUERY_ENCODE_SET).to_string(),
                    utf8_percent_encode(v, &AWS_QUERY_ENCODE_SET).to_string(),
                )
            })
            .collect();
        self.query.sort();
    }

    /// Normalize header value.
    pub fn header_value_normalize(v: &mut HeaderValue) {
        let bs = v.as_bytes();

        let starting_index = bs.iter().position(|b| *b != b' ').unwrap_or(0);
        let ending_offset = bs.iter().rev().position(|b| *b != b' ').unwrap_or(0);
        let ending_index = bs.len() - ending_offset;

        // Trimming spaces from a valid header value cannot make it invalid.
        *v = HeaderValue::from_bytes(&bs[starting_index..ending_index])
            .expect("header value must be valid")
    }

    /// Get header names as sorted vector.
    pub fn header_name_to_vec_sorted(&self) -> Vec<&str> {
        let mut h = self
            .headers
            .keys()
            .map(|k| k.as_str())
            .collect::<Vec<&str>>();
        h.sort_unstable();

        h
    }
}

impl Display for CanonicalRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.method)?;
        writeln!(f, "{}", self.encoded_path())?;
        writeln!(
            f,
            "{}",
            self.query
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("&")
        )?;

        let signed_headers = self.header_name_to_vec_sorted();
        for header in signed_headers.iter() {
            // Every value was checked to render as a string before the
            // canonical form is built.
            let value = self.headers[*header]
                .to_str()
                .expect("header value must be valid");
            writeln!(f, "{header}:{value}")?;
        }
        writeln!(f)?;
        writeln!(f, "{}", signed_headers.join(";"))?;

        write!(
            f,
            "{}",
            self.content_sha256.as_deref().unwrap_or(EMPTY_STRING_SHA256)
        )
    }
}

/// Scope: "20220313/<region>/<service>/aws4_request"
pub(crate) fn scope(t: DateTime, region: &str, service: &str) -> String {
    format!("{}/{}/{}/aws4_request", format_date(t), region, service)
}

/// StringToSign:
///
/// AWS4-HMAC-SHA256
/// 20220313T072004Z
/// 20220313/<region>/<service>/aws4_request
/// <hashed_canonical_request>
pub(crate) fn string_to_sign(t: DateTime, scope: &str, canonical_request: &str) -> Result<String> {
    let mut f = String::new();
    writeln!(f, "AWS4-HMAC-SHA256")?;
    writeln!(f, "{}", format_iso8601(t))?;
    writeln!(f, "{scope}")?;
    write!(f, "{}", hex_sha256(canonical_request.as_bytes()))?;

    Ok(f)
}

/// Derive the request-scoped signing key out of the secret access key.
pub(crate) fn generate_signing_key(
    secret: &str,
    time: DateTime,
    region: &str,
    service: &str,
) -> Vec<u8> {
    // Sign secret
    let secret = format!("AWS4{secret}");
    // Sign date
    let sign_date = hmac_sha256(secret.as_bytes(), format_date(time).as_bytes());
    // Sign region
    let sign_region = hmac_sha256(sign_date.as_slice(), region.as_bytes());
    // Sign service
    let sign_service = hmac_sha256(sign_region.as_slice(), service.as_bytes());
    // Sign request
    hmac_sha256(sign_service.as_slice(), "aws4_request".as_bytes())
}
