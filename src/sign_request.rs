//! Header-based SigV4 request signing.

use http::header;
use http::request::Parts;
use http::HeaderValue;
use log::debug;

use crate::constants::{UNSIGNED_PAYLOAD, X_AMZ_CONTENT_SHA_256, X_AMZ_DATE, X_AMZ_SECURITY_TOKEN};
use crate::hash::{hex_hmac_sha256, hex_sha256, Payload, EMPTY_STRING_SHA256};
use crate::time::{format_iso8601, now, DateTime};
use crate::v4::{generate_signing_key, scope, string_to_sign, CanonicalRequest};
use crate::{Credential, Error, Result};

/// Service signed for when none is configured.
const DEFAULT_SERVICE: &str = "execute-api";

/// RequestSigner that implements AWS SigV4.
///
/// - [Signature Version 4 signing process](https://docs.aws.amazon.com/general/latest/gr/signature-version-4.html)
#[derive(Debug, Clone)]
pub struct RequestSigner {
    service: String,
    region: String,

    time: Option<DateTime>,
}

impl RequestSigner {
    /// Create a new SigV4 signer for the given region.
    ///
    /// The service defaults to `execute-api`; override it with
    /// [`with_service`][Self::with_service].
    pub fn new(region: &str) -> Self {
        Self {
            service: DEFAULT_SERVICE.to_string(),
            region: region.to_string(),

            time: None,
        }
    }

    /// Specify the service to sign for, e.g. `s3`.
    pub fn with_service(mut self, service: &str) -> Self {
        self.service = service.to_string();
        self
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

    /// Sign the request parts in place: add `x-amz-date`,
    /// `x-amz-content-sha256`, `x-amz-security-token` (only when the
    /// credential carries a session token) and the `Authorization` header.
    ///
    /// The body stays with the caller; `payload` only describes it for
    /// hashing. Streaming payloads are signed as `UNSIGNED-PAYLOAD` since
    /// hashing here would consume them before the transport could send
    /// them. To sign a stream's digest, pre-hash it with
    /// [`hash_payload`][crate::hash_payload] and pass
    /// [`Payload::Precomputed`].
    pub fn sign(&self, req: &mut Parts, payload: &Payload, cred: &Credential) -> Result<()> {
        if !cred.is_valid() {
            return Err(Error::credential_incomplete(
                "access key id and secret access key must not be blank",
            ));
        }

        let now = self.time.unwrap_or_else(now);
        let mut ctx = CanonicalRequest::build(req)?;

        canonicalize_header(&mut ctx, cred, payload, now)?;
        ctx.canonicalize_query();

        ctx.content_sha256 = match ctx.headers.get(X_AMZ_CONTENT_SHA_256) {
            Some(v) => Some(v.to_str()?.to_string()),
            None => None,
        };

        let creq = ctx.to_string();
        debug!("calculated canonical request: {creq}");

        let scope = scope(now, &self.region, &self.service);
        debug!("calculated scope: {scope}");

        let string_to_sign = string_to_sign(now, &scope, &creq)?;
        debug!("calculated string to sign: {string_to_sign}");

        let signing_key =
            generate_signing_key(&cred.secret_access_key, now, &self.region, &self.service);
        let signature = hex_hmac_sha256(&signing_key, string_to_sign.as_bytes());

        let mut authorization = HeaderValue::from_str(&format!(
            "AWS4-HMAC-SHA256 Credential={}/{}, SignedHeaders={}, Signature={}",
            cred.access_key_id,
            scope,
            ctx.header_name_to_vec_sorted().join(";"),
            signature
        ))?;
        authorization.set_sensitive(true);
        ctx.headers.insert(header::AUTHORIZATION, authorization);

        ctx.apply(req)
    }
}

/// Content hash carried in `x-amz-content-sha256`.
///
/// A precomputed digest wins, in-memory bytes are hashed in place and an
/// absent body hashes as the empty string. Streams are never auto-hashed:
/// consuming one here would leave nothing for the transport to send.
fn content_sha256(payload: &Payload) -> String {
    match payload {
        Payload::Precomputed(digest) => digest.clone(),
        Payload::Bytes(bs) => hex_sha256(bs),
        Payload::Empty => EMPTY_STRING_SHA256.to_string(),
        Payload::Reader(_) | Payload::Unsigned => UNSIGNED_PAYLOAD.to_string(),
    }
}

fn canonicalize_header(
    ctx: &mut CanonicalRequest,
    cred: &Credential,
    payload: &Payload,
    now: DateTime,
) -> Result<()> {
    // Header names and values need to be normalized according to Step 4 of https://docs.aws.amazon.com/general/latest/gr/sigv4-create-canonical-request.html
    for (_, value) in ctx.headers.iter_mut() {
        // The canonical form renders values as strings.
        value.to_str()?;
        CanonicalRequest::header_value_normalize(value)
    }

    // Insert HOST header if not present.
    if ctx.headers.get(header::HOST).is_none() {
        ctx.headers.insert(header::HOST, ctx.host_port().parse()?);
    }

    // Insert DATE header if not present.
    if ctx.headers.get(X_AMZ_DATE).is_none() {
        ctx.headers
            .insert(X_AMZ_DATE, HeaderValue::try_from(format_iso8601(now))?);
    }

    // Insert X_AMZ_CONTENT_SHA_256 header if not present.
    if ctx.headers.get(X_AMZ_CONTENT_SHA_256).is_none() {
        ctx.headers.insert(
            X_AMZ_CONTENT_SHA_256,
            HeaderValue::try_from(content_sha256(payload))?,
        );
    }

    // Insert X_AMZ_SECURITY_TOKEN header if security token exists.
    if let Some(token) = &cred.session_token {
        let mut value = HeaderValue::from_str(token)?;
        // Set token value sensitive to avoid leaking.
        value.set_sensitive(true);

        ctx.headers.insert(X_AMZ_SECURITY_TOKEN, value);
    }

    Ok(())
}
