//! Explicit session context.
//!
//! The engine and the HTTP store receive a [`SessionContext`] instead of
//! reading a process-wide "current user". Logging out is modelled by
//! replacing the context with [`SessionContext::anonymous`].

use serde::{Deserialize, Serialize};

use crate::types::DbId;

/// The authenticated user of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: DbId,
    pub username: String,
    #[serde(default)]
    pub is_admin: bool,
}

/// Identity and credentials for the active session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    pub user: Option<SessionUser>,
    /// Bearer token sent with store requests.
    pub token: Option<String>,
}

impl SessionContext {
    pub fn authenticated(user: SessionUser, token: impl Into<String>) -> Self {
        Self {
            user: Some(user),
            token: Some(token.into()),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn user_id(&self) -> Option<DbId> {
        self.user.as_ref().map(|u| u.id)
    }
}
