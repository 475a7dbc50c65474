//! Cache key schema.
//!
//! One namespace per concern; every service goes through these builders so
//! a key is never assembled ad hoc at a call site.

/// Cache key builder.
pub struct CacheKey;

impl CacheKey {
    /// Full account record (credential hash included, never a plaintext
    /// password). Format: `account:{id}`
    pub fn account(account_id: &str) -> String {
        format!("account:{account_id}")
    }

    /// Composed post view with its derived like count.
    /// Format: `post:{id}`
    pub fn post(post_id: &str) -> String {
        format!("post:{post_id}")
    }

    /// Post-id list owned by an account.
    /// Format: `account_posts:{accountId}`
    pub fn account_posts(account_id: &str) -> String {
        format!("account_posts:{account_id}")
    }

    /// Follower-id list of an account.
    /// Format: `followers:{accountId}`
    pub fn followers(account_id: &str) -> String {
        format!("followers:{account_id}")
    }

    /// Liker-id list of a post.
    /// Format: `likes:{postId}`
    pub fn likes(post_id: &str) -> String {
        format!("likes:{post_id}")
    }

    /// Aggregated feed (post-id list) of an account.
    /// Format: `feed:{accountId}`
    pub fn feed(account_id: &str) -> String {
        format!("feed:{account_id}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_namespaced_per_concern() {
        assert_eq!(CacheKey::account("alice"), "account:alice");
        assert_eq!(CacheKey::post("alice+42"), "post:alice+42");
        assert_eq!(CacheKey::account_posts("alice"), "account_posts:alice");
        assert_eq!(CacheKey::followers("alice"), "followers:alice");
        assert_eq!(CacheKey::likes("alice+42"), "likes:alice+42");
        assert_eq!(CacheKey::feed("alice"), "feed:alice");
    }
}
