//! Identity resolved from a session token
//!
//! The storefront core never issues or validates sessions itself; the
//! session gate collaborator resolves an opaque token into this shape.

use serde::{Deserialize, Serialize};

/// Actor role
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    #[default]
    Customer,
    Admin,
}

/// Account status as reported by the identity provider
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    #[default]
    Active,
    Suspended,
    Banned,
}

/// Resolved identity of the caller
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    pub id: String,
    pub role: Role,
    pub status: AccountStatus,
}

impl Identity {
    pub fn customer(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: Role::Customer,
            status: AccountStatus::Active,
        }
    }

    pub fn admin(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: Role::Admin,
            status: AccountStatus::Active,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }
}
