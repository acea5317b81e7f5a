//! Async Rust client for Azure AD Graph app role assignments.
//!
//! Provides OAuth2 client-credentials authentication, an authenticated HTTP
//! client that decodes OData error envelopes, and typed operations for
//! reading, granting and revoking app role assignments on groups and
//! service principals.
//!
//! # Modules
//!
//! - [`auth`] — OAuth2 client credentials token provider with expiry tracking.
//! - [`client`] — Request builder, dispatcher and error decoder.
//! - [`config`] — Endpoint URLs, scope and API version.
//! - [`context`] — Caller cancellation and deadlines.
//! - [`error`] — Typed error hierarchy (`GraphError`).
//! - [`groups`] — Group app role assignments (get, list, add, remove).
//! - [`models`] — Entity types and the open-ended property bag.
//! - [`service_principals`] — Assignments granted on a service principal.
//!
//! # Quick Start
//!
//! ```ignore
//! use aad_approles::client::GraphClient;
//! use aad_approles::context::CallContext;
//! use aad_approles::groups::get_app_role_assignments_for_group;
//!
//! let client = GraphClient::new("tenant", "client_id", secret)?;
//! let ctx = CallContext::background().with_timeout(Duration::from_secs(30));
//! let group = get_app_role_assignments_for_group(&client, &ctx, "group-id").await?;
//! for assignment in &group.value {
//!     println!("{:?}", assignment.resource_display_name);
//! }
//! ```

#![warn(missing_docs)]

pub mod auth;
pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod groups;
pub mod models;
pub mod service_principals;
