//! Document backend: one container per entity family, JSON documents
//! keyed by id (relations by their composite key).
//!
//! There is no primitive spanning containers: every operation takes a
//! single container at a time, so the cascade operations are a sequence
//! of independent steps and a mid-sequence failure leaves the earlier
//! steps committed. Reads observe a session's own writes.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use outcome::{Error, ErrorKind, Outcome};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::domain::models::{Account, Follow, Like, Post, PostRef};
use crate::storage::{Backend, Field, Op, Predicate};

type Container = RwLock<HashMap<String, Value>>;

#[derive(Default)]
pub struct DocumentBackend {
    accounts: Container,
    posts: Container,
    likes: Container,
    follows: Container,
}

impl DocumentBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Document stores report failures as status codes; translate through the
/// same fixed table every backend uses.
fn status_error(status: u16, message: String) -> Error {
    match ErrorKind::from_status(status) {
        Some(kind) => Error::new(kind, message),
        None => Error::internal(message),
    }
}

fn encode<T: Serialize>(item: &T) -> Outcome<Value> {
    serde_json::to_value(item).map_err(|e| Error::internal(format!("encode failed: {e}")))
}

fn decode<T: DeserializeOwned>(doc: &Value) -> Outcome<T> {
    serde_json::from_value(doc.clone())
        .map_err(|e| Error::internal(format!("decode failed: {e}")))
}

fn account_matches(account: &Account, predicate: &Predicate) -> Outcome<bool> {
    if predicate.field != Field::AccountId {
        return Err(predicate.unsupported());
    }
    Ok(match predicate.op {
        Op::Eq => account.account_id == predicate.value,
        Op::ContainsIgnoreCase => account
            .account_id
            .to_lowercase()
            .contains(&predicate.value.to_lowercase()),
    })
}

#[async_trait]
impl Backend for DocumentBackend {
    async fn get_account(&self, account_id: &str) -> Outcome<Account> {
        let container = self.accounts.read().await;
        match container.get(account_id) {
            Some(doc) => decode(doc),
            None => Err(status_error(404, format!("account {account_id}"))),
        }
    }

    async fn insert_account(&self, account: Account) -> Outcome<Account> {
        let mut container = self.accounts.write().await;
        if container.contains_key(&account.account_id) {
            return Err(status_error(
                409,
                format!("account {} already exists", account.account_id),
            ));
        }
        container.insert(account.account_id.clone(), encode(&account)?);
        Ok(account)
    }

    async fn upsert_account(&self, account: Account) -> Outcome<Account> {
        let mut container = self.accounts.write().await;
        container.insert(account.account_id.clone(), encode(&account)?);
        Ok(account)
    }

    async fn delete_account(&self, account_id: &str) -> Outcome<()> {
        let mut container = self.accounts.write().await;
        container
            .remove(account_id)
            .map(|_| ())
            .ok_or_else(|| status_error(404, format!("account {account_id}")))
    }

    async fn query_accounts(&self, predicate: &Predicate) -> Outcome<Vec<Account>> {
        let container = self.accounts.read().await;
        let mut hits = Vec::new();
        for doc in container.values() {
            let account: Account = decode(doc)?;
            if account_matches(&account, predicate)? {
                hits.push(account);
            }
        }
        hits.sort_by(|a, b| a.account_id.cmp(&b.account_id));
        Ok(hits)
    }

    async fn get_post(&self, post_id: &str) -> Outcome<Post> {
        let container = self.posts.read().await;
        match container.get(post_id) {
            Some(doc) => decode(doc),
            None => Err(status_error(404, format!("post {post_id}"))),
        }
    }

    async fn insert_post(&self, post: Post) -> Outcome<Post> {
        let mut container = self.posts.write().await;
        if container.contains_key(&post.post_id) {
            return Err(status_error(409, format!("post {} already exists", post.post_id)));
        }
        container.insert(post.post_id.clone(), encode(&post)?);
        Ok(post)
    }

    async fn query_post_ids(&self, predicate: &Predicate) -> Outcome<Vec<String>> {
        if predicate.field != Field::PostOwnerId || predicate.op != Op::Eq {
            return Err(predicate.unsupported());
        }
        let container = self.posts.read().await;
        let mut hits: Vec<Post> = Vec::new();
        for doc in container.values() {
            let post: Post = decode(doc)?;
            if post.owner_id == predicate.value {
                hits.push(post);
            }
        }
        hits.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(hits.into_iter().map(|p| p.post_id).collect())
    }

    async fn posts_by_owners(&self, owners: &[String]) -> Outcome<Vec<PostRef>> {
        let wanted: HashSet<&str> = owners.iter().map(String::as_str).collect();
        let container = self.posts.read().await;
        let mut refs = Vec::new();
        for doc in container.values() {
            let post: Post = decode(doc)?;
            if wanted.contains(post.owner_id.as_str()) {
                refs.push(PostRef {
                    post_id: post.post_id,
                    created_at: post.created_at,
                });
            }
        }
        refs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(refs)
    }

    async fn put_like(&self, like: Like) -> Outcome<()> {
        let mut container = self.likes.write().await;
        let key = like.composite_key();
        container.insert(key, encode(&like)?);
        Ok(())
    }

    async fn remove_like(&self, like: &Like) -> Outcome<()> {
        let mut container = self.likes.write().await;
        container.remove(&like.composite_key());
        Ok(())
    }

    async fn count_likes(&self, post_id: &str) -> Outcome<i64> {
        let container = self.likes.read().await;
        let mut count = 0i64;
        for doc in container.values() {
            let like: Like = decode(doc)?;
            if like.post_id == post_id {
                count += 1;
            }
        }
        Ok(count)
    }

    async fn likers_of(&self, post_id: &str) -> Outcome<Vec<String>> {
        let container = self.likes.read().await;
        let mut likers = Vec::new();
        for doc in container.values() {
            let like: Like = decode(doc)?;
            if like.post_id == post_id {
                likers.push(like.user_id);
            }
        }
        likers.sort();
        Ok(likers)
    }

    async fn put_follow(&self, follow: Follow) -> Outcome<()> {
        let mut container = self.follows.write().await;
        let key = follow.composite_key();
        container.insert(key, encode(&follow)?);
        Ok(())
    }

    async fn remove_follow(&self, follow: &Follow) -> Outcome<()> {
        let mut container = self.follows.write().await;
        container.remove(&follow.composite_key());
        Ok(())
    }

    async fn followers_of(&self, account_id: &str) -> Outcome<Vec<String>> {
        let container = self.follows.read().await;
        let mut followers = Vec::new();
        for doc in container.values() {
            let follow: Follow = decode(doc)?;
            if follow.followee == account_id {
                followers.push(follow.follower);
            }
        }
        followers.sort();
        Ok(followers)
    }

    async fn followees_of(&self, account_id: &str) -> Outcome<Vec<String>> {
        let container = self.follows.read().await;
        let mut followees = Vec::new();
        for doc in container.values() {
            let follow: Follow = decode(doc)?;
            if follow.follower == account_id {
                followees.push(follow.followee);
            }
        }
        followees.sort();
        Ok(followees)
    }

    async fn delete_post_and_likes(&self, post: &Post) -> Outcome<()> {
        // Step 1: likes container.
        {
            let mut likes = self.likes.write().await;
            let mut doomed = Vec::new();
            for (key, doc) in likes.iter() {
                let like: Like = decode(doc)?;
                if like.post_id == post.post_id {
                    doomed.push(key.clone());
                }
            }
            for key in doomed {
                likes.remove(&key);
            }
        }
        // Step 2: posts container. A failure here leaves step 1 committed.
        let mut posts = self.posts.write().await;
        posts
            .remove(&post.post_id)
            .map(|_| ())
            .ok_or_else(|| status_error(404, format!("post {}", post.post_id)))
    }

    async fn purge_owner(&self, owner_id: &str) -> Outcome<Vec<String>> {
        // Step 1: posts container.
        let post_ids = {
            let mut posts = self.posts.write().await;
            let mut doomed = Vec::new();
            for doc in posts.values() {
                let post: Post = decode(doc)?;
                if post.owner_id == owner_id {
                    doomed.push(post.post_id);
                }
            }
            for id in &doomed {
                posts.remove(id);
            }
            doomed
        };

        // Step 2: follows container.
        {
            let mut follows = self.follows.write().await;
            let mut doomed = Vec::new();
            for (key, doc) in follows.iter() {
                let follow: Follow = decode(doc)?;
                if follow.follower == owner_id || follow.followee == owner_id {
                    doomed.push(key.clone());
                }
            }
            for key in doomed {
                follows.remove(&key);
            }
        }

        // Step 3: likes container.
        {
            let mut likes = self.likes.write().await;
            let mut doomed = Vec::new();
            for (key, doc) in likes.iter() {
                let like: Like = decode(doc)?;
                if like.user_id == owner_id || like.post_owner_id == owner_id {
                    doomed.push(key.clone());
                }
            }
            for key in doomed {
                likes.remove(&key);
            }
        }

        Ok(post_ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn account(id: &str) -> Account {
        Account {
            account_id: id.to_string(),
            password_hash: "$argon2id$x".into(),
            display_name: id.to_uppercase(),
            email: format!("{id}@example.org"),
        }
    }

    fn post(id: &str, owner: &str) -> Post {
        Post {
            post_id: id.to_string(),
            owner_id: owner.to_string(),
            blob_url: format!("http://localhost/blobs/{id}"),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn duplicate_insert_is_a_conflict() {
        let backend = DocumentBackend::new();
        backend.insert_account(account("alice")).await.unwrap();
        let err = backend.insert_account(account("alice")).await.unwrap_err();
        assert_eq!(err.kind(), outcome::ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn get_absent_account_is_not_found() {
        let backend = DocumentBackend::new();
        let err = backend.get_account("ghost").await.unwrap_err();
        assert_eq!(err.kind(), outcome::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn substring_query_ignores_case() {
        let backend = DocumentBackend::new();
        backend.insert_account(account("Alice")).await.unwrap();
        backend.insert_account(account("bob")).await.unwrap();

        let predicate = Predicate::contains_ignore_case(Field::AccountId, "ALI");
        let hits = backend.query_accounts(&predicate).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].account_id, "Alice");
    }

    #[tokio::test]
    async fn like_toggle_is_idempotent() {
        let backend = DocumentBackend::new();
        let like = Like {
            user_id: "bob".into(),
            post_id: "alice+1".into(),
            post_owner_id: "alice".into(),
        };
        backend.put_like(like.clone()).await.unwrap();
        backend.put_like(like.clone()).await.unwrap();
        assert_eq!(backend.count_likes("alice+1").await.unwrap(), 1);

        backend.remove_like(&like).await.unwrap();
        backend.remove_like(&like).await.unwrap();
        assert_eq!(backend.count_likes("alice+1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn follow_toggle_is_idempotent() {
        let backend = DocumentBackend::new();
        let edge = Follow {
            follower: "bob".into(),
            followee: "alice".into(),
        };
        backend.put_follow(edge.clone()).await.unwrap();
        backend.put_follow(edge.clone()).await.unwrap();
        assert_eq!(
            backend.followers_of("alice").await.unwrap(),
            vec!["bob".to_string()]
        );

        backend.remove_follow(&edge).await.unwrap();
        backend.remove_follow(&edge).await.unwrap();
        assert!(backend.followers_of("alice").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn purge_owner_removes_posts_and_relations_on_both_sides() {
        let backend = DocumentBackend::new();
        backend.insert_post(post("alice+1", "alice")).await.unwrap();
        backend.insert_post(post("bob+1", "bob")).await.unwrap();
        backend
            .put_follow(Follow {
                follower: "bob".into(),
                followee: "alice".into(),
            })
            .await
            .unwrap();
        backend
            .put_follow(Follow {
                follower: "alice".into(),
                followee: "carol".into(),
            })
            .await
            .unwrap();
        // alice liked bob's post, bob liked alice's post
        backend
            .put_like(Like {
                user_id: "alice".into(),
                post_id: "bob+1".into(),
                post_owner_id: "bob".into(),
            })
            .await
            .unwrap();
        backend
            .put_like(Like {
                user_id: "bob".into(),
                post_id: "alice+1".into(),
                post_owner_id: "alice".into(),
            })
            .await
            .unwrap();

        let purged = backend.purge_owner("alice").await.unwrap();
        assert_eq!(purged, vec!["alice+1".to_string()]);

        assert!(backend.get_post("alice+1").await.is_err());
        assert!(backend.get_post("bob+1").await.is_ok());
        assert!(backend.followers_of("alice").await.unwrap().is_empty());
        assert!(backend.followees_of("alice").await.unwrap().is_empty());
        assert_eq!(backend.count_likes("bob+1").await.unwrap(), 0);
        assert_eq!(backend.count_likes("alice+1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn feed_source_orders_newest_first() {
        let backend = DocumentBackend::new();
        let mut early = post("alice+1", "alice");
        early.created_at = Utc::now() - chrono::Duration::seconds(10);
        backend.insert_post(early).await.unwrap();
        backend.insert_post(post("bob+1", "bob")).await.unwrap();

        let owners = vec!["alice".to_string(), "bob".to_string()];
        let refs = backend.posts_by_owners(&owners).await.unwrap();
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].post_id, "bob+1");
        assert_eq!(refs[1].post_id, "alice+1");
    }
}
