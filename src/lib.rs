//! Hemmer provider for Micro Focus UCMDB.
//!
//! Manages UCMDB configuration items from Hemmer and looks them up by type
//! and name. The provider runs as a gRPC plugin: Hemmer spawns the binary,
//! reads the handshake line from stdout and drives it over the
//! `hemmer.provider.v1` protocol.
//!
//! # Overview
//!
//! - **`data_model_ci` resource**: create, read, update, delete and import a
//!   single CI ([`resources::data_model_ci`])
//! - **`ucmdb_list` data source**: find CIs by type and name
//!   ([`data_sources::ucmdb_list`])
//! - **Credentials**: resolved from `UCMDB_<TARGET>_*` environment variables
//!   for the configured `target_env` ([`config`])
//! - **UCMDB access**: the [`UcmdbApi`] trait and its REST implementation
//!   ([`client`])
//!
//! # Configuration
//!
//! ```hcl
//! provider "ucmdb" {
//!   target_env = "CMS"   # or OPSB, APM; case-insensitive
//! }
//! ```
//!
//! with `UCMDB_CMS_ADDRESS`, `UCMDB_CMS_API_USER` and
//! `UCMDB_CMS_API_PASSWORD` set in the provider's environment.
//!
//! # Handshake Protocol
//!
//! When started via [`serve`], the provider prints:
//!
//! ```text
//! HEMMER_PROVIDER|1|127.0.0.1:50051
//! ```
//!
//! Format: `HEMMER_PROVIDER|<protocol_version>|<address>`

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod data_sources;
pub mod error;
pub mod logging;
pub mod provider;
pub mod resources;
pub mod schema;
pub mod server;
pub mod testing;
pub mod types;
pub mod validation;

#[allow(missing_docs)]
#[allow(clippy::all)]
pub mod generated;

pub use client::{ClientError, RestClient, UcmdbApi};
pub use config::{Credentials, TargetEnv};
pub use error::ProviderError;
pub use logging::{init_logging, try_init_logging};
pub use provider::UcmdbProvider;
pub use schema::ProviderSchema;
pub use server::{serve, serve_on, serve_with_options, ProviderService, ServeOptions};
pub use types::{
    AttributeChange, ImportedResource, PlanResult, ProviderMetadata, HANDSHAKE_PREFIX,
    PROTOCOL_VERSION,
};
