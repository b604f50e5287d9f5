//! Caller identity
//!
//! Authentication happens outside this crate. The sync core only needs the
//! resulting user id and whether that user may author curriculum content.

use serde::{Deserialize, Serialize};

use crate::shared::error::{Result, SyncError};

/// Fallback user id when none is configured
const DEFAULT_USER_ID: &str = "admin";

/// Authenticated user as seen by the sync core
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub user_id: String,
    pub is_privileged: bool,
}

impl Identity {
    pub fn new(user_id: impl Into<String>, is_privileged: bool) -> Self {
        Self {
            user_id: user_id.into(),
            is_privileged,
        }
    }

    /// Read `CURRICULUM_USER_ID` and `CURRICULUM_ADMIN` (`1` grants privileges)
    pub fn from_env() -> Self {
        let user_id = std::env::var("CURRICULUM_USER_ID")
            .ok()
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| DEFAULT_USER_ID.to_string());
        let is_privileged = std::env::var("CURRICULUM_ADMIN").unwrap_or_default() == "1";
        Self { user_id, is_privileged }
    }

    /// Fail with [`SyncError::Forbidden`] unless the identity is privileged
    pub fn require_privileged(&self) -> Result<()> {
        if self.is_privileged {
            Ok(())
        } else {
            Err(SyncError::Forbidden {
                user_id: self.user_id.clone(),
            })
        }
    }
}
