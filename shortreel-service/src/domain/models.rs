//! Domain entities: accounts, posts and the two directed relations
//! (likes, follows) between them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stored account record. The credential is always an Argon2id hash;
/// a plaintext password never reaches storage or the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Account {
    pub account_id: String,
    pub password_hash: String,
    pub display_name: String,
    pub email: String,
}

impl Account {
    /// Merge non-empty patch fields onto this record. The identifier is
    /// immutable; a patched password arrives here already hashed.
    pub fn merge(&mut self, patch: AccountPatch, new_password_hash: Option<String>) {
        if let Some(hash) = new_password_hash {
            self.password_hash = hash;
        }
        if let Some(name) = patch.display_name {
            self.display_name = name;
        }
        if let Some(email) = patch.email {
            self.email = email;
        }
    }
}

/// Account creation payload, carrying the only plaintext password the
/// system ever sees.
#[derive(Debug, Clone, Deserialize)]
pub struct NewAccount {
    pub account_id: String,
    pub password: String,
    pub display_name: String,
    pub email: String,
}

/// Partial account update; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountPatch {
    pub account_id: Option<String>,
    pub password: Option<String>,
    pub display_name: Option<String>,
    pub email: Option<String>,
}

/// Credential-free account view returned by search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub account_id: String,
    pub display_name: String,
    pub email: String,
}

impl From<Account> for Profile {
    fn from(account: Account) -> Self {
        Self {
            account_id: account.account_id,
            display_name: account.display_name,
            email: account.email,
        }
    }
}

/// Stored post record. Identifiers have the shape `{owner_id}+{suffix}`
/// and are immutable after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub post_id: String,
    pub owner_id: String,
    pub blob_url: String,
    pub created_at: DateTime<Utc>,
}

/// Post as returned to callers: the stored row plus the derived like
/// count and a short-lived blob access token. Neither derived field is
/// ever persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostView {
    #[serde(flatten)]
    pub post: Post,
    pub likes: i64,
    pub access_token: String,
}

/// Identifier and creation time of a post, the unit of feed assembly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PostRef {
    pub post_id: String,
    pub created_at: DateTime<Utc>,
}

/// Directed "liked" edge. Existence is the fact; uniqueness-keyed by
/// (user_id, post_id).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Like {
    pub user_id: String,
    pub post_id: String,
    /// Owner of the liked post, kept so an account cascade can remove
    /// likes on that account's posts without a join.
    pub post_owner_id: String,
}

impl Like {
    pub fn composite_key(&self) -> String {
        format!("{}|{}", self.user_id, self.post_id)
    }
}

/// Directed follow edge, uniqueness-keyed by (follower, followee).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Follow {
    pub follower: String,
    pub followee: String,
}

impl Follow {
    pub fn composite_key(&self) -> String {
        format!("{}|{}", self.follower, self.followee)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account() -> Account {
        Account {
            account_id: "alice".into(),
            password_hash: "$argon2id$old".into(),
            display_name: "Alice".into(),
            email: "alice@example.org".into(),
        }
    }

    #[test]
    fn merge_applies_only_present_fields() {
        let mut record = account();
        record.merge(
            AccountPatch {
                display_name: Some("Alice B".into()),
                ..Default::default()
            },
            None,
        );
        assert_eq!(record.display_name, "Alice B");
        assert_eq!(record.email, "alice@example.org");
        assert_eq!(record.password_hash, "$argon2id$old");
    }

    #[test]
    fn merge_replaces_credential_with_new_hash() {
        let mut record = account();
        record.merge(AccountPatch::default(), Some("$argon2id$new".into()));
        assert_eq!(record.password_hash, "$argon2id$new");
    }

    #[test]
    fn profile_strips_credential() {
        let profile: Profile = account().into();
        let encoded = serde_json::to_string(&profile).unwrap();
        assert!(!encoded.contains("argon2"));
        assert!(encoded.contains("alice@example.org"));
    }

    #[test]
    fn relation_keys_are_composite() {
        let like = Like {
            user_id: "bob".into(),
            post_id: "alice+1".into(),
            post_owner_id: "alice".into(),
        };
        assert_eq!(like.composite_key(), "bob|alice+1");

        let follow = Follow {
            follower: "bob".into(),
            followee: "alice".into(),
        };
        assert_eq!(follow.composite_key(), "bob|alice");
    }
}
