// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Username/password accounts with stateless bearer credentials.
//!
//! ## Auth Flow
//!
//! 1. Client registers or logs in (`/api/auth/*`) and receives a token
//! 2. Client sends `Authorization: Bearer <token>` on case endpoints
//! 3. The [`Auth`] extractor verifies signature and expiry and yields an
//!    [`AuthenticatedUser`]
//!
//! ## Security
//!
//! - Passwords are stored as Argon2id PHC strings, never in plain text
//! - Tokens are HS256 JWTs valid for 7 days
//! - Clock skew tolerance is 60 seconds
//! - Every rejection carries the same message, whatever the cause

pub mod claims;
pub mod credentials;
pub mod error;
pub mod extractor;
pub mod password;

pub use claims::{AuthenticatedUser, CredentialClaims};
pub use credentials::{CredentialError, CredentialService};
pub use error::AuthError;
pub use extractor::Auth;
