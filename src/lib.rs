//! # Custodia (Account Authentication Service)
//!
//! `custodia` is an account authentication and access service. It verifies
//! credentials against bcrypt hashes, issues stateless bearer tokens, and
//! re-checks live account status on every authenticated request.
//!
//! ## Accounts & Roles
//!
//! Accounts carry a role (`admin` or `user`) and a status (`active` or
//! `inactive`). Roles and statuses are lowercase everywhere: request and
//! response bodies, token claims, and database rows share one canonical
//! representation.
//!
//! - **Enumeration resistance:** unknown emails and wrong passwords produce
//!   the same `INVALID_CREDENTIALS` response.
//! - **Live status checks:** bearer tokens are valid until expiry, but every
//!   authenticated request re-reads the account; disabling an account locks
//!   it out immediately.
//! - **Audit trail:** logins, registrations, logouts, and admin mutations are
//!   appended to an activity log that is never consulted for authorization.
//!
//! ## Client
//!
//! The [`client`] module embeds a session store for applications talking to
//! this service: it persists `{account, token}` across restarts, attaches the
//! bearer token per request, and silently reconciles stale sessions on
//! startup.

pub mod api;
pub mod cli;
pub mod client;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
