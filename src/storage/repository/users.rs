// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 FUO Network

//! User repository.
//!
//! Each user owns exactly one ledger keypair, created at signup and never
//! rotated. The secret seed is held custodially so the service can co-sign
//! trust-line transactions on the user's behalf; it is NEVER returned via
//! the API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::Role;

use super::super::{Storage, StorageError, StorageResult};

/// Persisted user record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredUser {
    /// Unique user identifier (UUID).
    pub user_id: String,
    /// Unique username.
    pub username: String,
    /// Unique email address (stored lowercase).
    pub email: String,
    /// First name.
    pub first_name: String,
    /// Last name.
    pub last_name: String,
    /// Argon2 password hash.
    pub password_hash: String,
    /// Role granted at login.
    pub role: Role,
    /// Public key of the user's ledger account.
    pub ledger_public_key: String,
    /// Custodially held secret seed for the user's ledger account.
    pub ledger_secret_seed: String,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
}

/// Repository for user records.
pub struct UserRepository<'a> {
    storage: &'a Storage,
}

impl<'a> UserRepository<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Check if a user exists.
    pub fn exists(&self, user_id: &str) -> bool {
        self.storage.exists(self.storage.paths().user(user_id))
    }

    /// Get a user by ID.
    pub fn get(&self, user_id: &str) -> StorageResult<StoredUser> {
        let path = self.storage.paths().user(user_id);
        if !self.storage.exists(&path) {
            return Err(StorageError::NotFound(format!("User {user_id}")));
        }
        self.storage.read_json(path)
    }

    /// Create a new user.
    ///
    /// Fails with `AlreadyExists` when the ID, email or username is taken.
    pub fn create(&self, user: &StoredUser) -> StorageResult<()> {
        if self.exists(&user.user_id) {
            return Err(StorageError::AlreadyExists(format!(
                "User {}",
                user.user_id
            )));
        }
        if self
            .find_by_identifier(&user.email)
            .or_else(|_| self.find_by_identifier(&user.username))
            .is_ok()
        {
            return Err(StorageError::AlreadyExists(format!(
                "User with email {} or username {}",
                user.email, user.username
            )));
        }

        self.storage
            .write_json(self.storage.paths().user(&user.user_id), user)
    }

    /// Update an existing user.
    pub fn update(&self, user: &StoredUser) -> StorageResult<()> {
        if !self.exists(&user.user_id) {
            return Err(StorageError::NotFound(format!("User {}", user.user_id)));
        }
        self.storage
            .write_json(self.storage.paths().user(&user.user_id), user)
    }

    /// Find a user by email or username.
    pub fn find_by_identifier(&self, identifier: &str) -> StorageResult<StoredUser> {
        let needle_email = identifier.to_ascii_lowercase();
        let ids = self
            .storage
            .list_files(self.storage.paths().users_dir(), "json")?;

        for id in ids {
            if let Ok(user) = self.get(&id) {
                if user.email == needle_email || user.username == identifier {
                    return Ok(user);
                }
            }
        }

        Err(StorageError::NotFound(format!("User {identifier}")))
    }
}

#[cfg(test)]
impl StoredUser {
    /// A user record with a decodable custodial keypair, for tests.
    pub fn sample_for_tests() -> Self {
        Self {
            user_id: "user-42".to_string(),
            username: "ada".to_string(),
            email: "ada@example.org".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            password_hash: "$argon2id$stub".to_string(),
            role: Role::Client,
            ledger_public_key: "GCPKVX7BGMOPV4AHGX62Z3QONXJ5F4L7YQ7DKK75CQB4EGRBIDOLLDN3"
                .to_string(),
            ledger_secret_seed: "SBEENEIVCERKROOKCYEENYIAHMIF67TDSS7NLHWTFJCDZJF7LK5B23MD"
                .to_string(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StoragePaths;

    fn test_storage() -> (Storage, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut storage = Storage::new(StoragePaths::new(dir.path()));
        storage.initialize().expect("initialize storage");
        (storage, dir)
    }

    #[test]
    fn create_and_get_user() {
        let (storage, _dir) = test_storage();
        let repo = UserRepository::new(&storage);

        let user = StoredUser::sample_for_tests();
        repo.create(&user).unwrap();

        let loaded = repo.get(&user.user_id).unwrap();
        assert_eq!(loaded.username, "ada");
        assert_eq!(loaded.ledger_public_key, user.ledger_public_key);
    }

    #[test]
    fn duplicate_email_fails() {
        let (storage, _dir) = test_storage();
        let repo = UserRepository::new(&storage);

        let user = StoredUser::sample_for_tests();
        repo.create(&user).unwrap();

        let mut duplicate = StoredUser::sample_for_tests();
        duplicate.user_id = "user-43".to_string();
        duplicate.username = "someone-else".to_string();
        let result = repo.create(&duplicate);
        assert!(matches!(result, Err(StorageError::AlreadyExists(_))));
    }

    #[test]
    fn duplicate_username_fails() {
        let (storage, _dir) = test_storage();
        let repo = UserRepository::new(&storage);

        let user = StoredUser::sample_for_tests();
        repo.create(&user).unwrap();

        let mut duplicate = StoredUser::sample_for_tests();
        duplicate.user_id = "user-43".to_string();
        duplicate.email = "other@example.org".to_string();
        let result = repo.create(&duplicate);
        assert!(matches!(result, Err(StorageError::AlreadyExists(_))));
    }

    #[test]
    fn find_by_email_or_username() {
        let (storage, _dir) = test_storage();
        let repo = UserRepository::new(&storage);

        let user = StoredUser::sample_for_tests();
        repo.create(&user).unwrap();

        assert_eq!(
            repo.find_by_identifier("ada").unwrap().user_id,
            user.user_id
        );
        assert_eq!(
            repo.find_by_identifier("ADA@example.org").unwrap().user_id,
            user.user_id
        );
        assert!(matches!(
            repo.find_by_identifier("nobody"),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn update_requires_existing_user() {
        let (storage, _dir) = test_storage();
        let repo = UserRepository::new(&storage);

        let user = StoredUser::sample_for_tests();
        assert!(matches!(
            repo.update(&user),
            Err(StorageError::NotFound(_))
        ));

        repo.create(&user).unwrap();
        let mut updated = user.clone();
        updated.password_hash = "$argon2id$new".to_string();
        repo.update(&updated).unwrap();

        assert_eq!(
            repo.get(&user.user_id).unwrap().password_hash,
            "$argon2id$new"
        );
    }
}
