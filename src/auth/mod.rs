// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 FUO Network

//! # Authentication Module
//!
//! Session authentication for the wallet API.
//!
//! ## Auth Flow
//!
//! 1. The client logs in with email/username + password
//! 2. The server issues an HS256 JWT (1 hour expiry) carrying:
//!    - `sub` → canonical `user_id`
//!    - `role` → `client` or `admin`
//! 3. Subsequent requests send `Authorization: Bearer <JWT>`
//! 4. The `Auth` extractor verifies signature and expiry and exposes the
//!    authenticated user; `AdminOnly` additionally requires the admin role
//!
//! Password-reset tokens use the same signing secret with a distinct
//! `purpose` claim so a reset token can never be replayed as a session.

pub mod claims;
pub mod error;
pub mod extractor;
pub mod roles;

pub use claims::{AuthenticatedUser, Claims};
pub use error::AuthError;
pub use extractor::{AdminOnly, Auth};
pub use roles::Role;
