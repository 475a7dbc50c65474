//! Account lifecycle: creation, password-gated access, update, search
//! and deletion with its asynchronous dependent-data cascade.

use std::sync::Arc;

use outcome::{Error, ErrorKind, Outcome};
use shortreel_cache::{CacheKey, CacheStore};
use tracing::info;

use crate::auth::password::{hash_password, verify_password};
use crate::auth::token::TokenMinter;
use crate::domain::models::{Account, AccountPatch, NewAccount, Profile};
use crate::services::CacheSide;
use crate::storage::{Backend, Field, Predicate};
use crate::workers::cascade::{CascadeHandle, CascadeJob};

pub struct AccountService {
    backend: Arc<dyn Backend>,
    cache: CacheSide,
    tokens: TokenMinter,
    cascades: CascadeHandle,
}

impl AccountService {
    pub fn new(
        backend: Arc<dyn Backend>,
        cache: Option<Arc<dyn CacheStore>>,
        tokens: TokenMinter,
        cascades: CascadeHandle,
    ) -> Self {
        Self {
            backend,
            cache: CacheSide::new(cache),
            tokens,
            cascades,
        }
    }

    /// Create an account and return its identifier.
    pub async fn create(&self, new: NewAccount) -> Outcome<String> {
        info!(account_id = %new.account_id, "create account");

        if new.account_id.is_empty()
            || new.password.is_empty()
            || new.display_name.is_empty()
            || new.email.is_empty()
        {
            return Err(Error::bad_request("missing account field"));
        }

        let account = Account {
            account_id: new.account_id,
            password_hash: hash_password(&new.password)?,
            display_name: new.display_name,
            email: new.email,
        };
        let stored = self.backend.insert_account(account).await?;
        Ok(stored.account_id)
    }

    /// Password-gated read. Only a successful verification populates the
    /// cache, so a mismatch is never cached.
    pub async fn get(&self, account_id: &str, password: &str) -> Outcome<Account> {
        info!(account_id = %account_id, "get account");

        if account_id.is_empty() {
            return Err(Error::bad_request("missing account id"));
        }

        let key = CacheKey::account(account_id);
        if let Some(cached) = self.cache.get_json::<Account>(&key).await {
            return if verify_password(password, &cached.password_hash) {
                Ok(cached)
            } else {
                Err(Error::forbidden("password mismatch"))
            };
        }

        let account = self.backend.get_account(account_id).await?;
        if verify_password(password, &account.password_hash) {
            self.cache.put_json(&key, &account).await;
            Ok(account)
        } else {
            Err(Error::forbidden("password mismatch"))
        }
    }

    /// Merge non-empty patch fields onto the authoritative record. The
    /// identifier is immutable; a conflicting patch id is rejected.
    pub async fn update(
        &self,
        account_id: &str,
        password: &str,
        patch: AccountPatch,
    ) -> Outcome<Account> {
        info!(account_id = %account_id, "update account");

        if account_id.is_empty() || password.is_empty() {
            return Err(Error::bad_request("missing account id or password"));
        }
        if patch
            .account_id
            .as_deref()
            .is_some_and(|patched| patched != account_id)
        {
            return Err(Error::bad_request("account id is immutable"));
        }

        let mut record = self.backend.get_account(account_id).await?;
        if !verify_password(password, &record.password_hash) {
            return Err(Error::forbidden("password mismatch"));
        }

        let new_hash = match patch.password.as_deref() {
            Some(p) if !p.is_empty() => Some(hash_password(p)?),
            _ => None,
        };
        record.merge(patch, new_hash);

        let stored = self.backend.upsert_account(record).await?;
        self.cache.del(&CacheKey::account(account_id)).await;
        Ok(stored)
    }

    /// Delete the account record and dispatch the dependent-data cascade.
    ///
    /// The cascade (posts, likes, follows, blobs) runs on the cascade
    /// worker, authorized by an internally minted token; the caller only
    /// observes the synchronous account-record removal.
    pub async fn delete(&self, account_id: &str, password: &str) -> Outcome<Account> {
        info!(account_id = %account_id, "delete account");

        if account_id.is_empty() || password.is_empty() {
            return Err(Error::bad_request("missing account id or password"));
        }

        let account = self.backend.get_account(account_id).await?;
        if !verify_password(password, &account.password_hash) {
            return Err(Error::forbidden("password mismatch"));
        }

        self.cascades
            .enqueue(CascadeJob {
                owner_id: account_id.to_string(),
                token: self.tokens.mint(account_id),
            })
            .await;

        self.backend.delete_account(account_id).await?;
        self.cache.del(&CacheKey::account(account_id)).await;
        Ok(account)
    }

    /// Case-insensitive substring search on the identifier. Never cached;
    /// every hit is returned without its credential.
    pub async fn search(&self, pattern: &str) -> Outcome<Vec<Profile>> {
        info!(pattern = %pattern, "search accounts");

        let predicate = Predicate::contains_ignore_case(Field::AccountId, pattern);
        let hits = self.backend.query_accounts(&predicate).await?;
        Ok(hits.into_iter().map(Profile::from).collect())
    }

    /// Existence-only gate: a Forbidden answer still proves the account
    /// exists, so it passes; only NotFound (or worse) fails.
    pub async fn exists(&self, account_id: &str) -> Outcome<()> {
        match self.get(account_id, "").await {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == ErrorKind::Forbidden => Ok(()),
            Err(e) => Err(e),
        }
    }
}
