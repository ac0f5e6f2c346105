// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! ERP API - Multi-tenant Business Backend
//!
//! Authentication and tenant authorization core of the ERP service: one
//! provider (self-issued session tokens or an external OpenID Connect
//! provider) selected at start-up, role gates on the routes, and first-call
//! provisioning of local user records for externally authenticated users.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Token verification, role gates, password hashing
//! - `config` - Environment configuration
//! - `provisioning` - Local record for externally authenticated users
//! - `storage` - User records (redb)

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod provisioning;
pub mod state;
pub mod storage;
