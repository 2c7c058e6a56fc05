//! AWS Signature Version 4 signing and credential loading.
//!
//! This crate signs HTTP requests for AWS services: it canonicalizes the
//! request, derives the signing key, and attaches the signature either as
//! an `Authorization` header or as query parameters of a presigned URL.
//! Credentials come from a composable provider chain with optional caching
//! and TTL-driven background refresh.
//!
//! ## Overview
//!
//! - **[`RequestSigner`]**: header-based SigV4 signing for any AWS service
//! - **[`UrlPresigner`]**: time-limited presigned URLs for object storage
//! - **[`ProvideCredential`]**: the credential source abstraction, with
//!   environment, properties, profile-file and static implementations
//! - **[`Signer`]**: glue that loads a credential and signs with it
//!
//! ## Example
//!
//! ```no_run
//! use awsign::{DefaultCredentialProvider, Payload, RegionLoader, RequestSigner, Signer};
//!
//! fn main() -> awsign::Result<()> {
//!     let region = RegionLoader::new().load_or_default();
//!     let signer = Signer::new(
//!         DefaultCredentialProvider::new(),
//!         RequestSigner::new(&region).with_service("s3"),
//!     );
//!
//!     let mut parts = http::Request::get("https://examplebucket.s3.amazonaws.com/test.txt")
//!         .body(())
//!         .unwrap()
//!         .into_parts()
//!         .0;
//!
//!     signer.sign(&mut parts, &Payload::Empty)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Presigned URLs
//!
//! ```no_run
//! use std::time::Duration;
//! use awsign::{Credential, PresignOptions, UrlPresigner};
//!
//! fn main() -> awsign::Result<()> {
//!     let cred = Credential::new("access_key_id", "secret_access_key");
//!
//!     let url = UrlPresigner::new("us-east-1").presign(
//!         &cred,
//!         "https://examplebucket.s3.amazonaws.com/test.txt",
//!         PresignOptions::new()
//!             .with_expires(Duration::from_secs(600))
//!             .with_response_override("content-type", "application/octet-stream"),
//!     )?;
//!     println!("{url}");
//!     Ok(())
//! }
//! ```
//!
//! ## Caching and refresh
//!
//! Providers load on every call. Wrap them in
//! [`CachedCredentialProvider`] to cache the result and refresh it in the
//! background when it carries a TTL:
//!
//! ```no_run
//! use std::sync::Arc;
//! use awsign::{
//!     CachedCredentialProvider, DefaultCredentialProvider, ProvideCredential, RefreshScheduler,
//! };
//!
//! let scheduler = RefreshScheduler::new();
//! let provider = CachedCredentialProvider::new(
//!     DefaultCredentialProvider::new(),
//!     Arc::new(scheduler.clone()),
//! );
//!
//! let _cred = provider.provide_credential().unwrap();
//!
//! provider.stop();
//! scheduler.shutdown();
//! ```
//!
//! ## Credential Sources
//!
//! The [`DefaultCredentialProvider`] consults, in order:
//!
//! 1. Environment variables `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`
//!    and optionally `AWS_SESSION_TOKEN`
//! 2. The process-local [`Properties`] table (`aws.accessKeyId`,
//!    `aws.secretKey`, `aws.sessionToken`)
//! 3. The shared AWS files `~/.aws/credentials` and `~/.aws/config`,
//!    honoring `AWS_PROFILE`, `AWS_SHARED_CREDENTIALS_FILE` and
//!    `AWS_CONFIG_FILE`
//!
//! The first source that yields a credential is pinned and answers alone
//! from then on.
//!
//! ## Utilities
//!
//! - [`hash`]: SHA256/HMAC helpers and the [`Payload`] content model
//! - [`time`]: signing-time formatting
//! - [`utils`]: data redaction for logs

// Make sure all our public APIs have docs.
#![warn(missing_docs)]

pub mod hash;
pub mod time;
pub mod utils;

mod constants;

mod credential;
pub use credential::Credential;

mod env;
pub use env::{expand_home_dir, Env, OsEnv, Properties, StaticEnv};

mod error;
pub use error::{Error, ErrorKind, Result};

mod region;
pub use region::{RegionLoader, DEFAULT_REGION};

mod scheduler;
pub use scheduler::{RefreshScheduler, RefreshTask, ScheduleHandle, ScheduleRefresh};

mod v4;

mod sign_request;
pub use sign_request::RequestSigner;

mod presign;
pub use presign::{PresignOptions, UrlPresigner};

mod provide_credential;
pub use provide_credential::*;

mod signer;
pub use signer::Signer;

pub use hash::{hash_payload, Payload};
