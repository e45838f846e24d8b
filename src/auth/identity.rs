use async_trait::async_trait;

use crate::ChatResult;

/// Proof that an account exists and the password matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub uid: String,
}

/// Where accounts and passwords live.
///
/// `login` is always an email-shaped string; see [`super::pseudo_email`].
/// `create_account` must reject an existing login with `DuplicateUsername`
/// atomically, and `authenticate` must report every failure as
/// `AuthenticationFailure` or `Transient`.
#[async_trait]
pub trait Identity: Send + Sync {
    async fn create_account(&self, login: &str, password: &str) -> ChatResult<Credential>;

    async fn authenticate(&self, login: &str, password: &str) -> ChatResult<Credential>;
}
