//! rsrbac-api: HTTP API layer
//!
//! This crate provides the HTTP surface of the RBAC admin service:
//! - REST endpoints via Axum (login, role/menu administration, health)
//! - The gatekeeping middleware pipeline (rate limiting, authentication,
//!   audit recording)
//! - Configuration loading and structured logging setup
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                 rsrbac-api                   │
//! ├─────────────────────────────────────────────┤
//! │  http/          - REST endpoints, envelope  │
//! │  middleware/    - rate limit, auth, audit   │
//! │  config         - layered configuration     │
//! │  observability/ - structured logging        │
//! └─────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod http;
pub mod middleware;
pub mod observability;
