// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Relational Domain Auth - Per-Domain Bearer Token Authentication
//!
//! This crate validates bearer tokens issued by external identity providers
//! and authorizes requests per tenant domain, each domain with its own
//! provider and group, role and claim requirements.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Token validation, discovery caching and domain policies
//! - `config` - Environment variables and auth settings loading
//! - `error` - API error responses
//! - `state` - Shared application state

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod state;
