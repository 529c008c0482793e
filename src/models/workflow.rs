//! Review workflow vocabulary

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ArticleStatus;

/// Action that moves an article between editorial states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewAction {
    /// Send a draft to the review desk
    Submit,
    /// Pull an article back out of review
    Withdraw,
    Approve,
    RequestChanges,
    Reject,
    Publish,
    /// Take a published article off the site
    Unpublish,
    /// Give a rejected article another chance
    Reopen,
}

impl ReviewAction {
    pub const ALL: [ReviewAction; 8] = [
        ReviewAction::Submit,
        ReviewAction::Withdraw,
        ReviewAction::Approve,
        ReviewAction::RequestChanges,
        ReviewAction::Reject,
        ReviewAction::Publish,
        ReviewAction::Unpublish,
        ReviewAction::Reopen,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewAction::Submit => "submit",
            ReviewAction::Withdraw => "withdraw",
            ReviewAction::Approve => "approve",
            ReviewAction::RequestChanges => "request_changes",
            ReviewAction::Reject => "reject",
            ReviewAction::Publish => "publish",
            ReviewAction::Unpublish => "unpublish",
            ReviewAction::Reopen => "reopen",
        }
    }

    /// Audit log action name, e.g. `article.request_changes`
    pub fn audit_action(&self) -> String {
        format!("article.{}", self.as_str())
    }

    /// Decisions taken on someone's submission
    pub fn is_review_decision(&self) -> bool {
        matches!(
            self,
            ReviewAction::Approve | ReviewAction::RequestChanges | ReviewAction::Reject
        )
    }

    /// Only editors may take these actions
    pub fn requires_editor(&self) -> bool {
        self.is_review_decision()
            || matches!(self, ReviewAction::Publish | ReviewAction::Unpublish)
    }

    /// The author must be told why
    pub fn requires_notes(&self) -> bool {
        matches!(self, ReviewAction::RequestChanges | ReviewAction::Reject)
    }
}

impl fmt::Display for ReviewAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReviewAction {
    type Err = anyhow::Error;

    /// Accepts both `request_changes` and the URL form `request-changes`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        ReviewAction::ALL
            .into_iter()
            .find(|action| action.as_str() == normalized)
            .ok_or_else(|| anyhow::anyhow!("Invalid review action: {}", s))
    }
}

/// Number of articles in one editorial state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCount {
    pub status: ArticleStatus,
    pub count: i64,
}
