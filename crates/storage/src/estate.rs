//! The narrow slice of an estate that access checks need.

use crate::UserId;
use serde::{Deserialize, Serialize};

/// A non-owner identity listed on an estate.
///
/// `role` is the raw stored value. Interpreting it is left to the caller, so
/// a corrupted value stays visible as such instead of failing the read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collaborator {
    pub user_id: UserId,
    pub role: String,
}

impl Collaborator {
    pub fn new(user_id: impl Into<UserId>, role: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            role: role.into(),
        }
    }
}

/// Owner and collaborators of an estate, in stored order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstateAccess {
    pub owner_id: UserId,
    pub collaborators: Vec<Collaborator>,
}

impl EstateAccess {
    pub fn owned_by(owner_id: impl Into<UserId>) -> Self {
        Self {
            owner_id: owner_id.into(),
            collaborators: Vec::new(),
        }
    }

    pub fn with_collaborator(
        mut self,
        user_id: impl Into<UserId>,
        role: impl Into<String>,
    ) -> Self {
        self.collaborators.push(Collaborator::new(user_id, role));
        self
    }
}
