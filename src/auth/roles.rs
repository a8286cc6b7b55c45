// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 FUO Network

//! User roles and privilege ordering.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Role granted to an authenticated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular wallet user.
    Client,
    /// Operator with access to issuance and reconciliation tooling.
    Admin,
}

impl Default for Role {
    fn default() -> Self {
        Self::Client
    }
}

impl Role {
    /// Parse a role from its serialized name.
    pub fn from_str(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "client" => Some(Role::Client),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    /// Serialized name of this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Client => "client",
            Role::Admin => "admin",
        }
    }

    /// Whether this role includes the privileges of `required`.
    pub fn has_privilege(&self, required: Role) -> bool {
        match required {
            Role::Client => true,
            Role::Admin => *self == Role::Admin,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(Role::from_str("admin"), Some(Role::Admin));
        assert_eq!(Role::from_str("  Client "), Some(Role::Client));
        assert_eq!(Role::from_str("root"), None);
    }

    #[test]
    fn admin_has_all_privileges() {
        assert!(Role::Admin.has_privilege(Role::Client));
        assert!(Role::Admin.has_privilege(Role::Admin));
        assert!(Role::Client.has_privilege(Role::Client));
        assert!(!Role::Client.has_privilege(Role::Admin));
    }

    #[test]
    fn round_trips_through_name() {
        for role in [Role::Client, Role::Admin] {
            assert_eq!(Role::from_str(role.as_str()), Some(role));
        }
    }
}
