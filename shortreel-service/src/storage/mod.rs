//! Persistence backend contract.
//!
//! Two interchangeable implementations: [`relational::PgBackend`]
//! (Postgres, transactional cascades) and [`document::DocumentBackend`]
//! (per-entity-family containers, no cross-container transaction). The
//! services are written against [`Backend`] only and never learn which
//! one is active.

pub mod document;
pub mod relational;

use async_trait::async_trait;
use outcome::{Error, Outcome};

use crate::domain::models::{Account, Follow, Like, Post, PostRef};

/// Queryable fields. Predicates are structured so backends can compile
/// them to parameterized queries; caller-supplied values never reach a
/// query as interpolated text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    AccountId,
    PostOwnerId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    ContainsIgnoreCase,
}

/// Structured filter: field, operator, value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    pub field: Field,
    pub op: Op,
    pub value: String,
}

impl Predicate {
    pub fn eq(field: Field, value: impl Into<String>) -> Self {
        Self {
            field,
            op: Op::Eq,
            value: value.into(),
        }
    }

    pub fn contains_ignore_case(field: Field, value: impl Into<String>) -> Self {
        Self {
            field,
            op: Op::ContainsIgnoreCase,
            value: value.into(),
        }
    }

    pub(crate) fn unsupported(&self) -> Error {
        Error::bad_request(format!(
            "unsupported predicate: {:?} {:?}",
            self.field, self.op
        ))
    }
}

/// CRUD + predicate query over accounts and posts, with the two
/// subordinate relations (likes, follows) and the multi-entity cascade
/// entry points.
///
/// Error translation happens inside each implementation; callers only
/// ever see [`outcome::Error`] kinds.
#[async_trait]
pub trait Backend: Send + Sync {
    // Accounts
    async fn get_account(&self, account_id: &str) -> Outcome<Account>;
    async fn insert_account(&self, account: Account) -> Outcome<Account>;
    /// Replace-or-create (upsert) semantics.
    async fn upsert_account(&self, account: Account) -> Outcome<Account>;
    async fn delete_account(&self, account_id: &str) -> Outcome<()>;
    async fn query_accounts(&self, predicate: &Predicate) -> Outcome<Vec<Account>>;

    // Posts
    async fn get_post(&self, post_id: &str) -> Outcome<Post>;
    async fn insert_post(&self, post: Post) -> Outcome<Post>;
    async fn query_post_ids(&self, predicate: &Predicate) -> Outcome<Vec<String>>;
    /// Posts of any of the given owners, newest first. Feed source.
    async fn posts_by_owners(&self, owners: &[String]) -> Outcome<Vec<PostRef>>;

    // Likes (idempotent in both directions)
    async fn put_like(&self, like: Like) -> Outcome<()>;
    async fn remove_like(&self, like: &Like) -> Outcome<()>;
    async fn count_likes(&self, post_id: &str) -> Outcome<i64>;
    async fn likers_of(&self, post_id: &str) -> Outcome<Vec<String>>;

    // Follows (idempotent in both directions)
    async fn put_follow(&self, follow: Follow) -> Outcome<()>;
    async fn remove_follow(&self, follow: &Follow) -> Outcome<()>;
    async fn followers_of(&self, account_id: &str) -> Outcome<Vec<String>>;
    async fn followees_of(&self, account_id: &str) -> Outcome<Vec<String>>;

    // Cascades. One transaction on the relational backend; a sequence of
    // independent per-container steps on the document backend.
    async fn delete_post_and_likes(&self, post: &Post) -> Outcome<()>;
    /// Remove every post of the owner, every follow edge touching the
    /// owner and every like the owner made or received. Returns the ids
    /// of the purged posts so the caller can clean up their blobs.
    async fn purge_owner(&self, owner_id: &str) -> Outcome<Vec<String>>;
}
