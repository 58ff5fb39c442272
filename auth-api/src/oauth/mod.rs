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

//! OAuth2 helpers: authorization code exchange, ID token claims extraction,
//! and the tagged error both of them report.

pub mod claims;
pub mod error;
pub mod exchange;

// Re-export public API so callers can continue using `crate::oauth::*`.
pub use claims::{extract_claims, ClaimsError, IdentityClaims};
pub use error::{AuthError, AuthErrorKind};
pub use exchange::{AuthTokens, TokenExchangeClient};
