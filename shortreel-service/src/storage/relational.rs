//! Relational backend on Postgres.
//!
//! Every predicate value is bound as a query parameter. The two cascade
//! operations each run inside a single transaction, so a mid-sequence
//! failure rolls the whole cascade back.

use async_trait::async_trait;
use outcome::{Error, Outcome};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::domain::models::{Account, Follow, Like, Post, PostRef};
use crate::storage::{Backend, Field, Op, Predicate};

pub struct PgBackend {
    pool: PgPool,
}

impl PgBackend {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(url: &str, max_connections: u32, min_connections: u32) -> Outcome<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .connect(url)
            .await
            .map_err(Error::from)?;
        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> Outcome<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::internal(format!("migration failed: {e}")))
    }
}

#[async_trait]
impl Backend for PgBackend {
    async fn get_account(&self, account_id: &str) -> Outcome<Account> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            SELECT account_id, password_hash, display_name, email
            FROM accounts
            WHERE account_id = $1
            "#,
        )
        .bind(account_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(account)
    }

    async fn insert_account(&self, account: Account) -> Outcome<Account> {
        let inserted = sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts (account_id, password_hash, display_name, email)
            VALUES ($1, $2, $3, $4)
            RETURNING account_id, password_hash, display_name, email
            "#,
        )
        .bind(&account.account_id)
        .bind(&account.password_hash)
        .bind(&account.display_name)
        .bind(&account.email)
        .fetch_one(&self.pool)
        .await?;
        Ok(inserted)
    }

    async fn upsert_account(&self, account: Account) -> Outcome<Account> {
        let stored = sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts (account_id, password_hash, display_name, email)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (account_id) DO UPDATE
            SET password_hash = EXCLUDED.password_hash,
                display_name = EXCLUDED.display_name,
                email = EXCLUDED.email
            RETURNING account_id, password_hash, display_name, email
            "#,
        )
        .bind(&account.account_id)
        .bind(&account.password_hash)
        .bind(&account.display_name)
        .bind(&account.email)
        .fetch_one(&self.pool)
        .await?;
        Ok(stored)
    }

    async fn delete_account(&self, account_id: &str) -> Outcome<()> {
        let affected = sqlx::query("DELETE FROM accounts WHERE account_id = $1")
            .bind(account_id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        if affected == 0 {
            return Err(Error::not_found(format!("account {account_id}")));
        }
        Ok(())
    }

    async fn query_accounts(&self, predicate: &Predicate) -> Outcome<Vec<Account>> {
        let sql = match (predicate.field, predicate.op) {
            (Field::AccountId, Op::Eq) => {
                r#"
                SELECT account_id, password_hash, display_name, email
                FROM accounts
                WHERE account_id = $1
                "#
            }
            (Field::AccountId, Op::ContainsIgnoreCase) => {
                r#"
                SELECT account_id, password_hash, display_name, email
                FROM accounts
                WHERE account_id ILIKE '%' || $1 || '%'
                "#
            }
            _ => return Err(predicate.unsupported()),
        };
        let accounts = sqlx::query_as::<_, Account>(sql)
            .bind(&predicate.value)
            .fetch_all(&self.pool)
            .await?;
        Ok(accounts)
    }

    async fn get_post(&self, post_id: &str) -> Outcome<Post> {
        let post = sqlx::query_as::<_, Post>(
            r#"
            SELECT post_id, owner_id, blob_url, created_at
            FROM posts
            WHERE post_id = $1
            "#,
        )
        .bind(post_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(post)
    }

    async fn insert_post(&self, post: Post) -> Outcome<Post> {
        let inserted = sqlx::query_as::<_, Post>(
            r#"
            INSERT INTO posts (post_id, owner_id, blob_url, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING post_id, owner_id, blob_url, created_at
            "#,
        )
        .bind(&post.post_id)
        .bind(&post.owner_id)
        .bind(&post.blob_url)
        .bind(post.created_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(inserted)
    }

    async fn query_post_ids(&self, predicate: &Predicate) -> Outcome<Vec<String>> {
        let sql = match (predicate.field, predicate.op) {
            (Field::PostOwnerId, Op::Eq) => {
                "SELECT post_id FROM posts WHERE owner_id = $1 ORDER BY created_at DESC"
            }
            _ => return Err(predicate.unsupported()),
        };
        let ids = sqlx::query_scalar::<_, String>(sql)
            .bind(&predicate.value)
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    async fn posts_by_owners(&self, owners: &[String]) -> Outcome<Vec<PostRef>> {
        let refs = sqlx::query_as::<_, PostRef>(
            r#"
            SELECT post_id, created_at
            FROM posts
            WHERE owner_id = ANY($1)
            ORDER BY created_at DESC
            "#,
        )
        .bind(owners)
        .fetch_all(&self.pool)
        .await?;
        Ok(refs)
    }

    async fn put_like(&self, like: Like) -> Outcome<()> {
        sqlx::query(
            r#"
            INSERT INTO likes (user_id, post_id, post_owner_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, post_id) DO NOTHING
            "#,
        )
        .bind(&like.user_id)
        .bind(&like.post_id)
        .bind(&like.post_owner_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove_like(&self, like: &Like) -> Outcome<()> {
        sqlx::query("DELETE FROM likes WHERE user_id = $1 AND post_id = $2")
            .bind(&like.user_id)
            .bind(&like.post_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn count_likes(&self, post_id: &str) -> Outcome<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM likes WHERE post_id = $1")
            .bind(post_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn likers_of(&self, post_id: &str) -> Outcome<Vec<String>> {
        let likers = sqlx::query_scalar::<_, String>(
            "SELECT user_id FROM likes WHERE post_id = $1 ORDER BY user_id",
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(likers)
    }

    async fn put_follow(&self, follow: Follow) -> Outcome<()> {
        sqlx::query(
            r#"
            INSERT INTO follows (follower, followee)
            VALUES ($1, $2)
            ON CONFLICT (follower, followee) DO NOTHING
            "#,
        )
        .bind(&follow.follower)
        .bind(&follow.followee)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove_follow(&self, follow: &Follow) -> Outcome<()> {
        sqlx::query("DELETE FROM follows WHERE follower = $1 AND followee = $2")
            .bind(&follow.follower)
            .bind(&follow.followee)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn followers_of(&self, account_id: &str) -> Outcome<Vec<String>> {
        let followers = sqlx::query_scalar::<_, String>(
            "SELECT follower FROM follows WHERE followee = $1 ORDER BY follower",
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(followers)
    }

    async fn followees_of(&self, account_id: &str) -> Outcome<Vec<String>> {
        let followees = sqlx::query_scalar::<_, String>(
            "SELECT followee FROM follows WHERE follower = $1 ORDER BY followee",
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(followees)
    }

    async fn delete_post_and_likes(&self, post: &Post) -> Outcome<()> {
        let mut tx = self.pool.begin().await.map_err(Error::from)?;
        sqlx::query("DELETE FROM likes WHERE post_id = $1")
            .bind(&post.post_id)
            .execute(&mut *tx)
            .await?;
        let affected = sqlx::query("DELETE FROM posts WHERE post_id = $1")
            .bind(&post.post_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if affected == 0 {
            return Err(Error::not_found(format!("post {}", post.post_id)));
        }
        tx.commit().await.map_err(Error::from)?;
        Ok(())
    }

    async fn purge_owner(&self, owner_id: &str) -> Outcome<Vec<String>> {
        let mut tx = self.pool.begin().await.map_err(Error::from)?;

        let post_ids = sqlx::query_scalar::<_, String>("SELECT post_id FROM posts WHERE owner_id = $1")
            .bind(owner_id)
            .fetch_all(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM posts WHERE owner_id = $1")
            .bind(owner_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM follows WHERE follower = $1 OR followee = $1")
            .bind(owner_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM likes WHERE user_id = $1 OR post_owner_id = $1")
            .bind(owner_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await.map_err(Error::from)?;
        Ok(post_ids)
    }
}
