//! Post lifecycle, like/follow toggling, feed assembly and the
//! multi-entity cascades.
//!
//! Every mutating operation is one linear pass: exists? → authorized? →
//! mutate backend → invalidate the cache keys it touched.

use std::sync::Arc;

use chrono::Utc;
use outcome::{Error, ErrorKind, Outcome};
use shortreel_cache::{CacheKey, CacheStore};
use tracing::info;
use uuid::Uuid;

use crate::auth::token::TokenMinter;
use crate::blobs::BlobStorage;
use crate::domain::models::{Follow, Like, Post, PostView};
use crate::services::{AccountService, CacheSide};
use crate::storage::{Backend, Field, Predicate};

pub struct PostService {
    backend: Arc<dyn Backend>,
    cache: CacheSide,
    accounts: Arc<AccountService>,
    blobs: Arc<dyn BlobStorage>,
    tokens: TokenMinter,
    /// Base URL under which post payloads are addressable.
    public_base_url: String,
}

impl PostService {
    pub fn new(
        backend: Arc<dyn Backend>,
        cache: Option<Arc<dyn CacheStore>>,
        accounts: Arc<AccountService>,
        blobs: Arc<dyn BlobStorage>,
        tokens: TokenMinter,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            cache: CacheSide::new(cache),
            accounts,
            blobs,
            tokens,
            public_base_url: public_base_url.into(),
        }
    }

    /// Create a post for the owner. The identifier shape is
    /// `{owner_id}+{unique suffix}`.
    pub async fn create(&self, owner_id: &str, password: &str) -> Outcome<PostView> {
        info!(owner_id = %owner_id, "create post");

        let owner = self.accounts.get(owner_id, password).await?;

        let post_id = format!("{}+{}", owner.account_id, Uuid::new_v4());
        let blob_url = format!("{}/blobs/{}", self.public_base_url, post_id);
        let post = Post {
            post_id: post_id.clone(),
            owner_id: owner.account_id.clone(),
            blob_url,
            created_at: Utc::now(),
        };

        let stored = self.backend.insert_post(post).await?;
        self.cache.del(&CacheKey::account_posts(owner_id)).await;
        self.cache.del(&CacheKey::feed(owner_id)).await;

        Ok(PostView {
            access_token: self.tokens.mint(&stored.post_id),
            post: stored,
            likes: 0,
        })
    }

    /// Read a post with its derived like count. The composed view is
    /// cached; the access token travels only with the response.
    pub async fn get(&self, post_id: &str) -> Outcome<PostView> {
        info!(post_id = %post_id, "get post");

        if post_id.is_empty() {
            return Err(Error::bad_request("missing post id"));
        }

        let key = CacheKey::post(post_id);
        if let Some(view) = self.cache.get_json::<PostView>(&key).await {
            return Ok(view);
        }

        let likes = self.backend.count_likes(post_id).await?;
        let post = self.backend.get_post(post_id).await?;
        let view = PostView {
            access_token: self.tokens.mint(post_id),
            post,
            likes,
        };
        self.cache.put_json(&key, &view).await;
        Ok(view)
    }

    /// Delete a post, its likes and its payload. One transaction on the
    /// relational backend; independent steps on the document backend.
    pub async fn delete(&self, post_id: &str, password: &str) -> Outcome<()> {
        info!(post_id = %post_id, "delete post");

        let view = self.get(post_id).await?;
        self.accounts.get(&view.post.owner_id, password).await?;

        self.backend.delete_post_and_likes(&view.post).await?;
        match self.blobs.delete(&view.post.post_id).await {
            // nothing was ever uploaded for this post
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            other => other?,
        }

        self.cache.del(&CacheKey::post(post_id)).await;
        self.cache.del(&CacheKey::likes(post_id)).await;
        Ok(())
    }

    /// All post ids of an owner. Gated on owner existence only.
    pub async fn list_by_owner(&self, owner_id: &str) -> Outcome<Vec<String>> {
        info!(owner_id = %owner_id, "list posts by owner");

        self.accounts.exists(owner_id).await?;

        let key = CacheKey::account_posts(owner_id);
        if let Some(ids) = self.cache.get_json::<Vec<String>>(&key).await {
            return Ok(ids);
        }

        let predicate = Predicate::eq(Field::PostOwnerId, owner_id);
        let ids = self.backend.query_post_ids(&predicate).await?;
        self.cache.put_json(&key, &ids).await;
        Ok(ids)
    }

    /// Toggle a follow edge. Duplicate toggles in either direction are
    /// absorbed (idempotent-accept).
    pub async fn follow(
        &self,
        follower: &str,
        followee: &str,
        want_follow: bool,
        password: &str,
    ) -> Outcome<()> {
        info!(follower = %follower, followee = %followee, want_follow, "toggle follow");

        self.accounts.get(follower, password).await?;
        self.accounts.exists(followee).await?;

        let edge = Follow {
            follower: follower.to_string(),
            followee: followee.to_string(),
        };
        if want_follow {
            self.backend.put_follow(edge).await?;
        } else {
            self.backend.remove_follow(&edge).await?;
        }

        self.cache.del(&CacheKey::followers(followee)).await;
        self.cache.del(&CacheKey::feed(follower)).await;
        Ok(())
    }

    /// Follower ids of the queried account, authorized by that account's
    /// own password.
    pub async fn followers_of(&self, account_id: &str, password: &str) -> Outcome<Vec<String>> {
        info!(account_id = %account_id, "list followers");

        self.accounts.get(account_id, password).await?;

        let key = CacheKey::followers(account_id);
        if let Some(followers) = self.cache.get_json::<Vec<String>>(&key).await {
            return Ok(followers);
        }

        let followers = self.backend.followers_of(account_id).await?;
        self.cache.put_json(&key, &followers).await;
        Ok(followers)
    }

    /// Toggle a like edge. Duplicate toggles in either direction are
    /// absorbed (idempotent-accept).
    pub async fn like(
        &self,
        post_id: &str,
        user_id: &str,
        want_like: bool,
        password: &str,
    ) -> Outcome<()> {
        info!(post_id = %post_id, user_id = %user_id, want_like, "toggle like");

        let view = self.get(post_id).await?;
        self.accounts.get(user_id, password).await?;

        let like = Like {
            user_id: user_id.to_string(),
            post_id: post_id.to_string(),
            post_owner_id: view.post.owner_id,
        };
        if want_like {
            self.backend.put_like(like).await?;
        } else {
            self.backend.remove_like(&like).await?;
        }

        self.cache.del(&CacheKey::likes(post_id)).await;
        Ok(())
    }

    /// Liker ids of a post, authorized against the post owner's password
    /// rather than the caller's. Kept for caller compatibility.
    pub async fn likes_of(&self, post_id: &str, password: &str) -> Outcome<Vec<String>> {
        info!(post_id = %post_id, "list likes");

        let view = self.get(post_id).await?;
        self.accounts.get(&view.post.owner_id, password).await?;

        let key = CacheKey::likes(post_id);
        if let Some(likers) = self.cache.get_json::<Vec<String>>(&key).await {
            return Ok(likers);
        }

        let likers = self.backend.likers_of(post_id).await?;
        self.cache.put_json(&key, &likers).await;
        Ok(likers)
    }

    /// Aggregated feed: the user's own posts plus everyone they follow,
    /// newest first.
    pub async fn feed(&self, user_id: &str, password: &str) -> Outcome<Vec<String>> {
        info!(user_id = %user_id, "assemble feed");

        self.accounts.get(user_id, password).await?;

        let key = CacheKey::feed(user_id);
        if let Some(feed) = self.cache.get_json::<Vec<String>>(&key).await {
            return Ok(feed);
        }

        let mut owners = self.backend.followees_of(user_id).await?;
        owners.push(user_id.to_string());
        let refs = self.backend.posts_by_owners(&owners).await?;
        let feed: Vec<String> = refs.into_iter().map(|r| r.post_id).collect();

        self.cache.put_json(&key, &feed).await;
        Ok(feed)
    }

    /// System-initiated cascade removing everything an account owns:
    /// posts, follow edges on either side, likes given or received.
    /// Authorized by an internal token bound to the owner, never by a
    /// password. Returns the purged post ids so the caller can clean up
    /// their blobs.
    pub async fn delete_all_by_owner(
        &self,
        owner_id: &str,
        _password: &str,
        token: &str,
    ) -> Outcome<Vec<String>> {
        info!(owner_id = %owner_id, "cascade delete all posts");

        if !self.tokens.is_valid(token, owner_id) {
            return Err(Error::forbidden("invalid cascade token"));
        }

        let predicate = Predicate::eq(Field::PostOwnerId, owner_id);
        let post_ids = self.backend.query_post_ids(&predicate).await?;
        for post_id in &post_ids {
            self.cache.del(&CacheKey::post(post_id)).await;
            self.cache.del(&CacheKey::likes(post_id)).await;
        }

        let purged = self.backend.purge_owner(owner_id).await?;

        self.cache.del(&CacheKey::account_posts(owner_id)).await;
        self.cache.del(&CacheKey::feed(owner_id)).await;
        self.cache.del(&CacheKey::followers(owner_id)).await;
        Ok(purged)
    }
}
