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

//! Persistence collaborators. Schema management lives outside this crate.

pub mod users;

pub use users::{PgUserDirectory, UserDirectory, UserRecord};
