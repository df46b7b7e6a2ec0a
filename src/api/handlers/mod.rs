//! API handlers for custodia.
//!
//! `auth` holds the authentication core (credentials, tokens, authorization);
//! `users` and `admin` are the role-gated management surface built on top of
//! it.

pub mod admin;
pub mod auth;
pub mod health;
pub mod root;
pub mod users;
