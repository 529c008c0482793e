//! Editorial comment model
//!
//! Internal newsroom discussion attached to an article, optionally anchored to
//! one of its versions. Threads are one level deep.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Editorial comment with its author's username
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditorialComment {
    pub id: i64,
    pub article_id: i64,
    /// Root comment this one replies to
    pub parent_id: Option<i64>,
    pub author_id: i64,
    pub author_username: String,
    /// Version the comment was written against
    pub version_number: Option<i64>,
    pub kind: CommentKind,
    pub body: String,
    pub is_resolved: bool,
    pub resolved_by: Option<i64>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Who produced the comment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CommentKind {
    /// Written by a person
    #[default]
    General,
    /// Review notes recorded by a workflow transition
    Review,
}

impl CommentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommentKind::General => "general",
            CommentKind::Review => "review",
        }
    }
}

impl fmt::Display for CommentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommentKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "general" => Ok(CommentKind::General),
            "review" => Ok(CommentKind::Review),
            _ => Err(anyhow::anyhow!("Invalid comment kind: {}", s)),
        }
    }
}

/// Root comment with its replies, oldest first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentThread {
    #[serde(flatten)]
    pub comment: EditorialComment,
    pub replies: Vec<EditorialComment>,
}

/// Request body for a new comment
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateEditorialCommentInput {
    pub body: String,
    #[serde(default)]
    pub parent_id: Option<i64>,
    #[serde(default)]
    pub version_number: Option<i64>,
}

/// Fully resolved comment ready for insertion
#[derive(Debug, Clone)]
pub struct NewEditorialComment {
    pub article_id: i64,
    pub parent_id: Option<i64>,
    pub author_id: i64,
    pub version_number: Option<i64>,
    pub kind: CommentKind,
    pub body: String,
}

/// Group a flat, oldest-first list into threads.
///
/// Replies whose root is missing from the list (e.g. filtered out as
/// resolved) are dropped with it.
pub fn build_threads(comments: Vec<EditorialComment>) -> Vec<CommentThread> {
    let (roots, replies): (Vec<_>, Vec<_>) =
        comments.into_iter().partition(|c| c.parent_id.is_none());

    let mut threads: Vec<CommentThread> = roots
        .into_iter()
        .map(|comment| CommentThread {
            comment,
            replies: Vec::new(),
        })
        .collect();

    for reply in replies {
        if let Some(thread) = threads
            .iter_mut()
            .find(|t| Some(t.comment.id) == reply.parent_id)
        {
            thread.replies.push(reply);
        }
    }

    threads
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comment(id: i64, parent_id: Option<i64>) -> EditorialComment {
        let now = Utc::now();
        EditorialComment {
            id,
            article_id: 1,
            parent_id,
            author_id: 1,
            author_username: "editora".to_string(),
            version_number: None,
            kind: CommentKind::General,
            body: format!("comentario {}", id),
            is_resolved: false,
            resolved_by: None,
            resolved_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_build_threads_groups_replies() {
        let threads = build_threads(vec![
            comment(1, None),
            comment(2, Some(1)),
            comment(3, None),
            comment(4, Some(1)),
        ]);

        assert_eq!(threads.len(), 2);
        assert_eq!(threads[0].comment.id, 1);
        let reply_ids: Vec<i64> = threads[0].replies.iter().map(|r| r.id).collect();
        assert_eq!(reply_ids, vec![2, 4]);
        assert!(threads[1].replies.is_empty());
    }

    #[test]
    fn test_build_threads_drops_orphans() {
        let threads = build_threads(vec![comment(5, Some(99))]);
        assert!(threads.is_empty());
    }

    #[test]
    fn test_thread_serializes_flat() {
        let thread = CommentThread {
            comment: comment(1, None),
            replies: vec![],
        };
        let json = serde_json::to_value(&thread).unwrap();
        assert_eq!(json["id"], 1);
        assert_eq!(json["kind"], "general");
        assert!(json["replies"].as_array().unwrap().is_empty());
    }
}
