use argon2::{Argon2, password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString}};
use async_trait::async_trait;
use rand::RngCore;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{ChatError, ChatResult};

use super::{Credential, Identity};

const SALT_LENGTH: usize = 16;

/// Accounts kept in the app's own database, for running without Firebase.
#[derive(Clone)]
pub struct LocalIdentity {
    db_pool: SqlitePool,
}

impl LocalIdentity {
    pub fn new(db_pool: SqlitePool) -> Self {
        LocalIdentity { db_pool }
    }
}

fn hash_password(password: &str) -> ChatResult<String> {
    let mut salt_bytes = [0u8; SALT_LENGTH];
    rand::rng().fill_bytes(&mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|err| anyhow::anyhow!("salt: {err}"))?;

    Ok(
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|err| anyhow::anyhow!("hash: {err}"))?
            .to_string()
    )
}

fn verify_password(hash: &str, password: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok(),
        Err(err) => {
            log::warn!("unreadable password hash: {err}");
            false
        }
    }
}

#[async_trait]
impl Identity for LocalIdentity {
    async fn create_account(&self, login: &str, password: &str) -> ChatResult<Credential> {
        let uid = Uuid::now_v7().simple().to_string();
        let password_hash = hash_password(password)?;

        let result = sqlx::query("INSERT INTO accounts (uid,login,password_hash) VALUES (?,?,?)")
            .bind(&uid)
            .bind(login)
            .bind(password_hash)
            .execute(&self.db_pool)
            .await;

        match result {
            Ok(_) => Ok(Credential { uid }),
            Err(sqlx::Error::Database(err)) if err.is_unique_violation() => Err(ChatError::DuplicateUsername),
            Err(err) => Err(err.into()),
        }
    }

    async fn authenticate(&self, login: &str, password: &str) -> ChatResult<Credential> {
        let account: Option<(String, String)> =
            sqlx::query_as("SELECT uid,password_hash FROM accounts WHERE login=?")
                .bind(login)
                .fetch_optional(&self.db_pool)
                .await?;

        match account {
            Some((uid, hash)) if verify_password(&hash, password) => Ok(Credential { uid }),
            _ => Err(ChatError::AuthenticationFailure),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[tokio::test]
    async fn create_then_authenticate() {
        let identity = LocalIdentity::new(db::memory().await);

        let created = identity.create_account("carol@vj-chat.local", "hunter22").await.unwrap();
        let signed_in = identity.authenticate("carol@vj-chat.local", "hunter22").await.unwrap();
        assert_eq!(created, signed_in);
        assert_eq!(created.uid.len(), 32);
    }

    #[tokio::test]
    async fn login_is_unique() {
        let identity = LocalIdentity::new(db::memory().await);
        identity.create_account("carol@vj-chat.local", "hunter22").await.unwrap();

        let err = identity.create_account("carol@vj-chat.local", "other-pass").await.unwrap_err();
        assert!(matches!(err, ChatError::DuplicateUsername));
    }

    #[tokio::test]
    async fn failures_look_the_same() {
        let identity = LocalIdentity::new(db::memory().await);
        identity.create_account("carol@vj-chat.local", "hunter22").await.unwrap();

        let wrong_password = identity.authenticate("carol@vj-chat.local", "hunter23").await.unwrap_err();
        let no_account = identity.authenticate("dave@vj-chat.local", "hunter22").await.unwrap_err();
        assert_eq!(wrong_password.to_string(), no_account.to_string());
        assert!(matches!(no_account, ChatError::AuthenticationFailure));
    }

    #[test]
    fn hashes_are_salted() {
        let a = hash_password("hunter22").unwrap();
        let b = hash_password("hunter22").unwrap();
        assert_ne!(a, b);
        assert!(verify_password(&a, "hunter22"));
        assert!(!verify_password(&a, "hunter23"));
        assert!(!verify_password("not a hash", "hunter22"));
    }
}
