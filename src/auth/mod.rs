//! Registration and sign-in with a plain username and password.
//!
//! The identity backends want an email address, so a handle is mapped to a
//! synthetic one with [`pseudo_email`]. Nobody ever receives mail there.

use axum::{routing::get, Router};
use sqlx::SqlitePool;

use crate::{users::{self, Participant}, AppState, ChatError, ChatResult};

mod firebase;
mod identity;
mod local;
mod login;
mod logout;
mod register;

pub use firebase::FirebaseIdentity;
pub use identity::{Credential, Identity};
pub use local::LocalIdentity;

pub const PSEUDO_EMAIL_DOMAIN: &str = "vj-chat.local";
pub const MAX_USERNAME_LEN: usize = 32;
pub const MIN_PASSWORD_LEN: usize = 6;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login::login_page).post(login::login))
        .route("/register", get(register::register_page).post(register::register))
        .route("/logout", get(logout::logout))
}

pub fn pseudo_email(username: &str) -> String {
    format!("{}@{PSEUDO_EMAIL_DOMAIN}", username.to_lowercase())
}

/// Lowercase a candidate handle and check it can be used as one.
pub fn normalize_username(candidate: &str) -> ChatResult<String> {
    let username = candidate.to_lowercase();
    if username.is_empty() {
        return Err(ChatError::validation("Provide username and password"));
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(ChatError::validation(format!("Usernames are at most {MAX_USERNAME_LEN} characters")));
    }
    let allowed = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '-');
    if !username.chars().all(allowed) {
        return Err(ChatError::validation("Usernames may only use letters, digits, '.', '_' and '-'"));
    }

    Ok(username)
}

/// Create an account and its participant record.
///
/// The lookup up front only gives a quick answer. Uniqueness is settled by the
/// identity backend (one account per pseudo-email) and by the `UNIQUE`
/// constraint on `users.username`.
pub async fn register(
    identity: &dyn Identity,
    db_pool: &SqlitePool,
    username: &str,
    password: &str,
) -> ChatResult<Participant> {
    if username.is_empty() || password.is_empty() {
        return Err(ChatError::validation("Provide username and password"));
    }
    let username = normalize_username(username)?;
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ChatError::validation(format!("Password should be at least {MIN_PASSWORD_LEN} characters")));
    }

    if users::username_taken(db_pool, &username).await? {
        return Err(ChatError::DuplicateUsername);
    }

    let credential = identity.create_account(&pseudo_email(&username), password).await?;
    users::create(db_pool, &credential.uid, &username).await
}

/// Check a username and password. Every failure reads "Invalid login".
pub async fn login(
    identity: &dyn Identity,
    db_pool: &SqlitePool,
    username: &str,
    password: &str,
) -> ChatResult<Participant> {
    if username.is_empty() || password.is_empty() {
        return Err(ChatError::validation("Provide username and password"));
    }

    let credential = match identity.authenticate(&pseudo_email(username), password).await {
        Ok(credential) => credential,
        Err(ChatError::Transient(err)) => {
            log::error!("sign-in for {username} failed: {err:#}");
            return Err(ChatError::AuthenticationFailure);
        }
        Err(_) => return Err(ChatError::AuthenticationFailure),
    };

    // an account whose profile write never landed still gets in
    let participant = users::by_uid(db_pool, &credential.uid).await?;
    Ok(participant.unwrap_or_else(|| Participant {
        uid: credential.uid,
        username: username.to_lowercase(),
        created_at: 0,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    async fn setup() -> (LocalIdentity, SqlitePool) {
        let db_pool = db::memory().await;
        (LocalIdentity::new(db_pool.clone()), db_pool)
    }

    #[test]
    fn pseudo_email_is_lowercase_and_stable() {
        assert_eq!(pseudo_email("Carol"), "carol@vj-chat.local");
        assert_eq!(pseudo_email("carol"), pseudo_email("CAROL"));
    }

    #[test]
    fn normalizes_handles() {
        assert_eq!(normalize_username("Carol_99").unwrap(), "carol_99");
        assert!(matches!(normalize_username(""), Err(ChatError::Validation(_))));
        assert!(matches!(normalize_username("car ol"), Err(ChatError::Validation(_))));
        assert!(matches!(normalize_username("carol@home"), Err(ChatError::Validation(_))));
        assert!(matches!(normalize_username(&"c".repeat(33)), Err(ChatError::Validation(_))));
    }

    #[tokio::test]
    async fn second_carol_is_rejected() {
        let (identity, db_pool) = setup().await;

        let carol = register(&identity, &db_pool, "Carol", "hunter22").await.unwrap();
        assert_eq!(carol.username, "carol");

        let err = register(&identity, &db_pool, "carol", "different").await.unwrap_err();
        assert!(matches!(err, ChatError::DuplicateUsername));
    }

    #[tokio::test]
    async fn identity_layer_catches_a_lost_race() {
        let (identity, db_pool) = setup().await;
        // another registration already claimed the account but has not written its profile yet
        identity.create_account(&pseudo_email("carol"), "hunter22").await.unwrap();

        let err = register(&identity, &db_pool, "carol", "hunter22").await.unwrap_err();
        assert!(matches!(err, ChatError::DuplicateUsername));
    }

    #[tokio::test]
    async fn register_validates_input() {
        let (identity, db_pool) = setup().await;

        for (username, password) in [("", "hunter22"), ("carol", ""), ("carol", "short"), ("bad name", "hunter22")] {
            let err = register(&identity, &db_pool, username, password).await.unwrap_err();
            assert!(matches!(err, ChatError::Validation(_)), "{username:?} {password:?}");
        }
        assert!(users::find_by_username(&db_pool, "carol").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn login_with_any_case() {
        let (identity, db_pool) = setup().await;
        let carol = register(&identity, &db_pool, "carol", "hunter22").await.unwrap();

        assert_eq!(login(&identity, &db_pool, "CAROL", "hunter22").await.unwrap(), carol);
    }

    #[tokio::test]
    async fn login_failures_are_generic() {
        let (identity, db_pool) = setup().await;
        register(&identity, &db_pool, "carol", "hunter22").await.unwrap();

        let wrong = login(&identity, &db_pool, "carol", "hunter23").await.unwrap_err();
        let unknown = login(&identity, &db_pool, "dave", "hunter22").await.unwrap_err();
        assert!(matches!(wrong, ChatError::AuthenticationFailure));
        assert!(matches!(unknown, ChatError::AuthenticationFailure));
        assert_eq!(wrong.to_string(), "Invalid login");

        let empty = login(&identity, &db_pool, "", "").await.unwrap_err();
        assert!(matches!(empty, ChatError::Validation(_)));
    }

    #[tokio::test]
    async fn login_without_a_profile_uses_the_handle() {
        let (identity, db_pool) = setup().await;
        let credential = identity.create_account(&pseudo_email("erin"), "hunter22").await.unwrap();

        let erin = login(&identity, &db_pool, "Erin", "hunter22").await.unwrap();
        assert_eq!(erin.uid, credential.uid);
        assert_eq!(erin.username, "erin");
    }
}
