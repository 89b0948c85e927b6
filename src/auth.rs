//! Login, roles, and per-session context.
//!
//! Identity is a work email that must carry the company domain suffix. The
//! role is decided once at login and every elevated action goes through
//! [`authorize`]. Sessions never expire; they end on logout or restart.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::error::AuthError;
use crate::tasks::views::DueFilter;

/// Resolved role of a logged-in identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Member,
}

/// Actions beyond working on one's own tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// See every task, not only those assigned to you.
    ViewAllTasks,
    /// Write the reviewer remark on any task.
    WriteReviewerRemark,
}

impl Capability {
    fn action(&self) -> &'static str {
        match self {
            Self::ViewAllTasks => "view all tasks",
            Self::WriteReviewerRemark => "write reviewer remarks",
        }
    }
}

impl Role {
    pub fn allows(&self, capability: Capability) -> bool {
        match self {
            Self::Admin => true,
            Self::Member => match capability {
                Capability::ViewAllTasks | Capability::WriteReviewerRemark => false,
            },
        }
    }
}

/// Request context for one logged-in user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    pub token: Uuid,
    pub identity: String,
    pub role: Role,
    /// Current diary focus.
    pub filter: DueFilter,
}

impl Session {
    /// `praveen@rbsgo.com` → `Praveen`.
    pub fn display_name(&self) -> String {
        let local = self.identity.split('@').next().unwrap_or_default();
        let mut chars = local.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }

    pub fn can(&self, capability: Capability) -> bool {
        self.role.allows(capability)
    }
}

/// The single authorization check.
pub fn authorize(session: &Session, capability: Capability) -> Result<(), AuthError> {
    if session.can(capability) {
        Ok(())
    } else {
        Err(AuthError::Forbidden {
            identity: session.identity.clone(),
            action: capability.action().to_string(),
        })
    }
}

/// Validates login identities and resolves their role.
#[derive(Debug, Clone)]
pub struct Authenticator {
    company_domain: String,
    admin_email: String,
}

impl Authenticator {
    pub fn new(company_domain: impl Into<String>, admin_email: impl Into<String>) -> Self {
        Self {
            company_domain: company_domain.into().to_lowercase(),
            admin_email: admin_email.into().to_lowercase(),
        }
    }

    pub fn company_domain(&self) -> &str {
        &self.company_domain
    }

    /// Normalise `email` and resolve its role. Rejects anything outside the
    /// company domain.
    pub fn authenticate(&self, email: &str) -> Result<(String, Role), AuthError> {
        let identity = email.trim().to_lowercase();
        let local_len = identity.len().saturating_sub(self.company_domain.len());
        if !identity.ends_with(&self.company_domain) || local_len == 0 {
            return Err(AuthError::DomainRejected {
                domain: self.company_domain.clone(),
            });
        }
        let role = if identity == self.admin_email {
            Role::Admin
        } else {
            Role::Member
        };
        Ok((identity, role))
    }
}

/// Live sessions keyed by token.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uuid, Session>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Authenticate `email` and open a session for it.
    pub async fn login(&self, auth: &Authenticator, email: &str) -> Result<Session, AuthError> {
        let (identity, role) = auth.authenticate(email)?;
        let session = Session {
            token: Uuid::new_v4(),
            identity,
            role,
            filter: DueFilter::default(),
        };
        self.sessions
            .write()
            .await
            .insert(session.token, session.clone());
        info!(identity = %session.identity, role = ?session.role, "User logged in");
        Ok(session)
    }

    pub async fn get(&self, token: Uuid) -> Result<Session, AuthError> {
        self.sessions
            .read()
            .await
            .get(&token)
            .cloned()
            .ok_or(AuthError::UnknownSession)
    }

    /// Change the diary focus for a session.
    pub async fn set_filter(&self, token: Uuid, filter: DueFilter) -> Result<Session, AuthError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(&token).ok_or(AuthError::UnknownSession)?;
        session.filter = filter;
        Ok(session.clone())
    }

    /// End a session. Returns whether it existed.
    pub async fn logout(&self, token: Uuid) -> bool {
        match self.sessions.write().await.remove(&token) {
            Some(session) => {
                info!(identity = %session.identity, "User logged out");
                true
            }
            None => false,
        }
    }
}
