//! Domain service layer of the shortreel short-video platform.
//!
//! Accounts, posts, likes, follows and feeds over a pluggable persistence
//! backend, with a read-through / write-invalidate cache and a supervised
//! cascade worker for account deletion.

pub mod auth;
pub mod blobs;
pub mod config;
pub mod domain;
pub mod services;
pub mod storage;
pub mod workers;
