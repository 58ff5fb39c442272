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

//! Social login backend library.
//!
//! Exchanges OAuth2 authorization codes with a managed identity service,
//! extracts the user's identity from the returned ID token and hands it to
//! an optional user directory. The binary entry point (`main.rs`) is a thin
//! wrapper that calls into this library.

pub mod config;
pub mod db;
pub mod error;
pub mod login;
pub mod mask;
pub mod oauth;
pub mod routes;
pub mod state;
pub mod transport;

#[cfg(test)]
mod test_logs;
