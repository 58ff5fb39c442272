/*
 * Copyright 2025 Security Union LLC
 *
 * Licensed under either of
 *
 * * Apache License, Version 2.0
 *   (http://www.apache.org/licenses/LICENSE-2.0)
 * * MIT license
 *   (http://opensource.org/licenses/MIT)
 *
 * at your option.
 */

//! Shared API types for the social login backend.
//!
//! This crate defines the API contract between the login backend and its
//! consumers (frontend, integration tests).
//! It is intentionally framework-agnostic: no axum, no database types.

pub mod error;
pub mod requests;
pub mod responses;

pub use error::APIError;
pub use requests::{LoginRequest, Provider};
pub use responses::APIResponse;
