// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! User profiles and the social graph: likes, subscriptions and the
//! community puzzles a user authored.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::error::{CoreError, FieldErrors, Result};
use crate::model::{Cursor, UserLevel};
use crate::persistence::{
    CommunityPuzzleRecord, LikeRecord, NewCommunityPuzzle, Store, SubscriptionRecord, UserRecord,
};
use crate::puzzle::RawPuzzle;

/// Longest accepted email address.
pub const EMAIL_MAX_LEN: usize = 254;

/// Longest accepted nickname.
pub const NICKNAME_MAX_LEN: usize = 30;

/// Body of a create-user request.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserRequest {
    /// Login email.
    pub email: String,
    /// Display name.
    pub nickname: String,
}

impl CreateUserRequest {
    fn validate(&self) -> Result<(String, String)> {
        let mut errors = FieldErrors::new();

        let email = self.email.trim();
        let well_formed = email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
        errors.check(!well_formed, "email", "must be a valid email address");
        errors.check(
            email.len() > EMAIL_MAX_LEN,
            "email",
            "must be at most 254 characters",
        );

        let nickname = self.nickname.trim();
        errors.check(nickname.is_empty(), "nickname", "must not be blank");
        errors.check(
            nickname.chars().count() > NICKNAME_MAX_LEN,
            "nickname",
            "must be at most 30 characters",
        );

        errors.finish((email.to_ascii_lowercase(), nickname.to_string()))
    }
}

/// Body of a create-community-puzzle request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommunityPuzzleRequest {
    /// Title.
    pub title: String,
    /// Move sequence in renju notation.
    pub board_status: String,
    /// Number of moves to the win.
    pub depth: i32,
    /// Hint text.
    #[serde(default)]
    pub description: String,
    /// `LOW`, `MIDDLE` or `HIGH`, any case.
    pub difficulty: String,
    /// `BLACK` or `WHITE`, any case.
    pub win_color: String,
}

/// User and social-graph operations.
#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn Store>,
}

impl UserService {
    /// Create a service over the given store.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    async fn require_user(&self, user_id: i64) -> Result<UserRecord> {
        self.store
            .get_user(user_id)
            .await?
            .ok_or(CoreError::UserNotFound { user_id })
    }

    /// Get a user's profile.
    pub async fn get_user(&self, user_id: i64) -> Result<UserRecord> {
        self.require_user(user_id).await
    }

    /// Register a user. Duplicate email or nickname is a conflict.
    #[instrument(skip(self, request), fields(nickname = %request.nickname))]
    pub async fn create_user(&self, request: &CreateUserRequest) -> Result<UserRecord> {
        let (email, nickname) = request.validate()?;
        let user = self.store.create_user(&email, &nickname).await?;
        info!(user_id = user.id, "User created");
        Ok(user)
    }

    /// Delete a user and everything hanging off them. Returns the deleted id.
    #[instrument(skip(self))]
    pub async fn delete_user(&self, user_id: i64) -> Result<i64> {
        if !self.store.delete_user(user_id).await? {
            return Err(CoreError::UserNotFound { user_id });
        }
        info!("User deleted");
        Ok(user_id)
    }

    /// Change a user's level; `level` is parsed case-insensitively.
    #[instrument(skip(self))]
    pub async fn update_user_level(&self, user_id: i64, level: &str) -> Result<UserRecord> {
        let level = level
            .parse::<UserLevel>()
            .map_err(|e| e.for_field("level"))?;

        self.store
            .update_user_level(user_id, level)
            .await?
            .ok_or(CoreError::UserNotFound { user_id })
    }

    /// Like or unlike a community puzzle. Returns whether it is now liked.
    #[instrument(skip(self))]
    pub async fn toggle_like(&self, puzzle_id: i64, user_id: i64) -> Result<bool> {
        let liked = self.store.toggle_like(user_id, puzzle_id).await?;
        info!(liked, "Like status changed");
        Ok(liked)
    }

    /// Follow or unfollow `target_id`. Returns whether the subscription now
    /// exists.
    #[instrument(skip(self))]
    pub async fn change_subscription(&self, subscriber_id: i64, target_id: i64) -> Result<bool> {
        if subscriber_id == target_id {
            warn!("Rejected self-subscription");
            return Err(CoreError::validation("userId", "cannot subscribe to yourself"));
        }
        self.require_user(target_id).await?;

        let subscribed = self
            .store
            .toggle_subscription(subscriber_id, target_id)
            .await?;
        info!(subscribed, "Subscription status changed");
        Ok(subscribed)
    }

    /// Puzzles the user liked, newest like first.
    pub async fn get_user_likes(&self, user_id: i64, cursor: Cursor) -> Result<Vec<LikeRecord>> {
        self.store.list_likes(user_id, cursor).await
    }

    /// Users the user follows, newest first.
    pub async fn get_user_subscriptions(
        &self,
        user_id: i64,
        cursor: Cursor,
    ) -> Result<Vec<SubscriptionRecord>> {
        self.store.list_subscriptions(user_id, cursor).await
    }

    /// Community puzzles authored by `user_id`, newest first.
    pub async fn get_user_community_puzzles(
        &self,
        user_id: i64,
        cursor: Cursor,
    ) -> Result<Vec<CommunityPuzzleRecord>> {
        self.require_user(user_id).await?;
        self.store.list_user_community_puzzles(user_id, cursor).await
    }

    /// Publish a community puzzle authored by `user_id`.
    #[instrument(skip(self, request))]
    pub async fn create_community_puzzle(
        &self,
        user_id: i64,
        request: &CreateCommunityPuzzleRequest,
    ) -> Result<CommunityPuzzleRecord> {
        let mut errors = FieldErrors::new();
        let body = RawPuzzle {
            title: &request.title,
            board_status: &request.board_status,
            depth: request.depth,
            description: &request.description,
            difficulty: &request.difficulty,
            win_color: &request.win_color,
        }
        .check(&mut errors)
        .ok_or_else(|| errors.into_error())?;

        let puzzle = self
            .store
            .insert_community_puzzle(&NewCommunityPuzzle {
                user_id,
                title: body.title,
                board_status: body.board_status,
                board_key: body.board_key,
                depth: body.depth,
                description: body.description,
                difficulty: body.difficulty,
                win_color: body.win_color,
            })
            .await?;

        info!(puzzle_id = puzzle.id, "Community puzzle created");
        Ok(puzzle)
    }

    /// Delete a community puzzle. Only its author may do so.
    #[instrument(skip(self))]
    pub async fn delete_user_puzzle(&self, puzzle_id: i64, user_id: i64) -> Result<()> {
        let puzzle = self
            .store
            .get_community_puzzle(puzzle_id)
            .await?
            .ok_or(CoreError::PuzzleNotFound { puzzle_id })?;

        if puzzle.user_id != user_id {
            return Err(CoreError::PermissionDenied {
                user_id,
                resource: format!("community puzzle {}", puzzle_id),
            });
        }

        if !self.store.delete_community_puzzle(puzzle_id).await? {
            return Err(CoreError::PuzzleNotFound { puzzle_id });
        }
        info!("Community puzzle deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::SqliteStore;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn service() -> UserService {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory SQLite pool");
        crate::migrations::run_sqlite(&pool)
            .await
            .expect("Failed to run migrations");

        UserService::new(Arc::new(SqliteStore::new(pool)))
    }

    async fn user(service: &UserService, name: &str) -> UserRecord {
        service
            .create_user(&CreateUserRequest {
                email: format!("{}@example.com", name),
                nickname: name.to_string(),
            })
            .await
            .expect("Failed to create user")
    }

    fn puzzle_request(title: &str) -> CreateCommunityPuzzleRequest {
        CreateCommunityPuzzleRequest {
            title: title.to_string(),
            board_status: "h8i9".to_string(),
            depth: 5,
            description: String::new(),
            difficulty: "high".to_string(),
            win_color: "white".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_user_validation() {
        let service = service().await;
        let err = service
            .create_user(&CreateUserRequest {
                email: "not-an-email".to_string(),
                nickname: "  ".to_string(),
            })
            .await
            .unwrap_err();
        match err {
            CoreError::ValidationFailed { errors } => assert_eq!(errors.len(), 2),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_user_normalises_email() {
        let service = service().await;
        let created = service
            .create_user(&CreateUserRequest {
                email: " Alice@Example.com ".to_string(),
                nickname: "alice".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(created.email, "alice@example.com");
        assert_eq!(created.level, UserLevel::Beginner);
    }

    #[tokio::test]
    async fn test_update_level() {
        let service = service().await;
        let alice = user(&service, "alice").await;

        let updated = service.update_user_level(alice.id, "advanced").await.unwrap();
        assert_eq!(updated.level, UserLevel::Advanced);

        let err = service.update_user_level(alice.id, "grandmaster").await.unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
        assert!(err.to_string().contains("'level' unknown user level 'grandmaster'"));

        let err = service.update_user_level(999, "beginner").await.unwrap_err();
        assert!(matches!(err, CoreError::UserNotFound { user_id: 999 }));
    }

    #[tokio::test]
    async fn test_subscription_toggle_is_its_own_inverse() {
        let service = service().await;
        let alice = user(&service, "alice").await;
        let bob = user(&service, "bob").await;

        assert!(service.change_subscription(alice.id, bob.id).await.unwrap());
        let subs = service
            .get_user_subscriptions(alice.id, Cursor::new(None, None).unwrap())
            .await
            .unwrap();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].nickname, "bob");

        assert!(!service.change_subscription(alice.id, bob.id).await.unwrap());
        let subs = service
            .get_user_subscriptions(alice.id, Cursor::new(None, None).unwrap())
            .await
            .unwrap();
        assert!(subs.is_empty());
    }

    #[tokio::test]
    async fn test_self_and_unknown_subscription() {
        let service = service().await;
        let alice = user(&service, "alice").await;

        let err = service.change_subscription(alice.id, alice.id).await.unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");

        let err = service.change_subscription(alice.id, 404).await.unwrap_err();
        assert!(matches!(err, CoreError::UserNotFound { user_id: 404 }));
    }

    #[tokio::test]
    async fn test_likes_are_paged_newest_first() {
        let service = service().await;
        let author = user(&service, "author").await;
        let fan = user(&service, "fan").await;

        let mut puzzle_ids = Vec::new();
        for i in 0..5 {
            let p = service
                .create_community_puzzle(author.id, &puzzle_request(&format!("p{}", i)))
                .await
                .unwrap();
            assert!(service.toggle_like(p.id, fan.id).await.unwrap());
            puzzle_ids.push(p.id);
        }

        let first = service
            .get_user_likes(fan.id, Cursor::new(None, Some(2)).unwrap())
            .await
            .unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].puzzle_id, puzzle_ids[4]);
        assert_eq!(first[1].puzzle_id, puzzle_ids[3]);
        assert_eq!(first[0].like_count, 1);

        let next = service
            .get_user_likes(fan.id, Cursor::new(Some(first[1].id), Some(10)).unwrap())
            .await
            .unwrap();
        let ids: Vec<_> = next.iter().map(|l| l.puzzle_id).collect();
        assert_eq!(ids, vec![puzzle_ids[2], puzzle_ids[1], puzzle_ids[0]]);
        assert!(next.iter().all(|l| l.id < first[1].id));
    }

    #[tokio::test]
    async fn test_like_unknown_puzzle() {
        let service = service().await;
        let fan = user(&service, "fan").await;
        let err = service.toggle_like(12, fan.id).await.unwrap_err();
        assert!(matches!(err, CoreError::PuzzleNotFound { puzzle_id: 12 }));
    }

    #[tokio::test]
    async fn test_community_puzzle_listing_and_ownership() {
        let service = service().await;
        let author = user(&service, "author").await;
        let other = user(&service, "other").await;

        let a = service
            .create_community_puzzle(author.id, &puzzle_request("a"))
            .await
            .unwrap();
        let b = service
            .create_community_puzzle(author.id, &puzzle_request("b"))
            .await
            .unwrap();

        let listed = service
            .get_user_community_puzzles(author.id, Cursor::new(None, None).unwrap())
            .await
            .unwrap();
        let ids: Vec<_> = listed.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![b.id, a.id]);

        let err = service.delete_user_puzzle(a.id, other.id).await.unwrap_err();
        assert!(matches!(err, CoreError::PermissionDenied { .. }));

        service.delete_user_puzzle(a.id, author.id).await.unwrap();
        let err = service.delete_user_puzzle(a.id, author.id).await.unwrap_err();
        assert!(matches!(err, CoreError::PuzzleNotFound { .. }));
    }

    #[tokio::test]
    async fn test_invalid_community_puzzle() {
        let service = service().await;
        let author = user(&service, "author").await;
        let mut request = puzzle_request("bad");
        request.board_status = "h8h8".to_string();

        let err = service
            .create_community_puzzle(author.id, &request)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("boardStatus"));
    }

    #[tokio::test]
    async fn test_delete_user() {
        let service = service().await;
        let alice = user(&service, "alice").await;

        assert_eq!(service.delete_user(alice.id).await.unwrap(), alice.id);
        assert!(service.get_user(alice.id).await.unwrap_err().is_not_found());
        assert!(service.delete_user(alice.id).await.is_err());
    }
}
