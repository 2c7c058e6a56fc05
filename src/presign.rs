//! Query-based SigV4 signing that produces time-limited URLs.

use std::collections::HashMap;
use std::time::Duration;

use http::header;
use http::Method;
use log::debug;

use crate::constants::UNSIGNED_PAYLOAD;
use crate::hash::hex_hmac_sha256;
use crate::time::{format_iso8601, now, DateTime};
use crate::v4::{generate_signing_key, scope, string_to_sign, CanonicalRequest};
use crate::{Credential, Error, Result};

/// Presigned URLs are an object-storage capability; the scope service is
/// always `s3`.
const SERVICE: &str = "s3";

/// Response header overrides S3 recognizes in a presigned query.
const RESPONSE_OVERRIDES: [&str; 6] = [
    "cache-control",
    "content-disposition",
    "content-encoding",
    "content-language",
    "content-type",
    "expires",
];

/// Options controlling a presigned URL.
#[derive(Debug, Clone)]
pub struct PresignOptions {
    method: Method,
    expires: Duration,
    response_overrides: HashMap<String, String>,
}

impl Default for PresignOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            expires: Duration::from_secs(3600),
            response_overrides: HashMap::new(),
        }
    }
}

impl PresignOptions {
    /// Create options with the defaults: `GET`, one hour expiry, no
    /// response overrides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Specify the HTTP method the URL authorizes.
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Specify how long the URL stays valid.
    pub fn with_expires(mut self, expires: Duration) -> Self {
        self.expires = expires;
        self
    }

    /// Override a response header on the download, e.g. `content-type`.
    ///
    /// Keys are matched case-insensitively, with `_` read as `-` and an
    /// optional `response-` prefix. Keys outside the six overrides S3
    /// recognizes are dropped from the presigned query.
    pub fn with_response_override(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.response_overrides.insert(name.into(), value.into());
        self
    }
}

/// Map an override key to its canonical `response-*` query parameter.
///
/// Returns `None` for keys S3 does not recognize.
fn response_override_param(name: &str) -> Option<String> {
    let name = name.to_lowercase().replace('_', "-");
    let name = name.strip_prefix("response-").unwrap_or(&name);

    RESPONSE_OVERRIDES
        .contains(&name)
        .then(|| format!("response-{name}"))
}

/// UrlPresigner that implements AWS SigV4 query signing.
///
/// - [Authenticating Requests: Using Query Parameters](https://docs.aws.amazon.com/AmazonS3/latest/API/sigv4-query-string-auth.html)
#[derive(Debug, Clone)]
pub struct UrlPresigner {
    region: String,

    time: Option<DateTime>,
}

impl UrlPresigner {
    /// Create a new presigner for the given region.
    pub fn new(region: &str) -> Self {
        Self {
            region: region.to_string(),

            time: None,
        }
    }

    /// Specify the signing time.
    ///
    /// # Note
    ///
    /// We should always take current time to sign requests.
    /// Only use this function for testing.
    #[cfg(test)]
    pub fn with_time(mut self, time: DateTime) -> Self {
        self.time = Some(time);
        self
    }

    /// Presign `url` for `cred`: return a URL carrying the signature in
    /// its query string, valid until the expiry window closes.
    ///
    /// The returned string must reach the server byte for byte; re-encoding
    /// it breaks the signature.
    pub fn presign(&self, cred: &Credential, url: &str, options: PresignOptions) -> Result<String> {
        if !cred.is_valid() {
            return Err(Error::credential_incomplete(
                "access key id and secret access key must not be blank",
            ));
        }

        let now = self.time.unwrap_or_else(now);
        let mut ctx = CanonicalRequest::from_url(options.method, url)?;

        // The only signed header of a presigned URL is host.
        ctx.headers.insert(header::HOST, ctx.host_port().parse()?);

        let scope = scope(now, &self.region, SERVICE);
        ctx.query
            .push(("X-Amz-Algorithm".into(), "AWS4-HMAC-SHA256".into()));
        ctx.query.push((
            "X-Amz-Credential".into(),
            format!("{}/{}", cred.access_key_id, scope),
        ));
        ctx.query.push(("X-Amz-Date".into(), format_iso8601(now)));
        ctx.query.push((
            "X-Amz-Expires".into(),
            options.expires.as_secs().to_string(),
        ));
        ctx.query.push((
            "X-Amz-SignedHeaders".into(),
            ctx.header_name_to_vec_sorted().join(";"),
        ));
        if let Some(token) = &cred.session_token {
            ctx.query.push(("X-Amz-Security-Token".into(), token.into()));
        }

        for (name, value) in options.response_overrides {
            match response_override_param(&name) {
                Some(param) => ctx.query.push((param, value)),
                None => debug!("response override {name} is not recognized, dropped"),
            }
        }

        ctx.content_sha256 = Some(UNSIGNED_PAYLOAD.to_string());
        ctx.canonicalize_query();

        let creq = ctx.to_string();
        debug!("calculated canonical request: {creq}");

        let string_to_sign = string_to_sign(now, &scope, &creq)?;
        debug!("calculated string to sign: {string_to_sign}");

        let signing_key =
            generate_signing_key(&cred.secret_access_key, now, &self.region, SERVICE);
        let signature = hex_hmac_sha256(&signing_key, string_to_sign.as_bytes());

        let query = ctx
            .query
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");

        Ok(format!(
            "{}://{}{}?{}&X-Amz-Signature={}",
            ctx.scheme,
            ctx.host_port(),
            ctx.encoded_path(),
            query,
            signature
        ))
    }
}
