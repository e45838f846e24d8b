use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::{ChatError, ChatResult, GetField};

use super::{Credential, Identity};

pub const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com";

/// Email/password accounts in Firebase Authentication, through the
/// Identity Toolkit REST API.
#[derive(Clone)]
pub struct FirebaseIdentity {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

impl FirebaseIdentity {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(IDENTITY_TOOLKIT_URL, api_key)
    }

    pub fn with_base_url(base_url: &str, api_key: impl Into<String>) -> Self {
        FirebaseIdentity {
            http_client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_owned(),
            api_key: api_key.into(),
        }
    }

    /// Call an `accounts:*` endpoint. Returns the uid, or the Firebase error
    /// code (e.g. `EMAIL_EXISTS`).
    async fn accounts(&self, method: &str, login: &str, password: &str) -> ChatResult<Result<String, String>> {
        let response = self.http_client
            .post(format!("{}/v1/accounts:{method}", self.base_url))
            .query(&[("key", &self.api_key)])
            .json(&PasswordRequest {
                email: login,
                password,
                return_secure_token: true,
            })
            .send()
            .await?;

        let ok = response.status().is_success();
        let body: Value = response.json().await?;
        if ok {
            return Ok(Ok(body.get_str_field("localId")?));
        }

        Ok(Err(error_code(&body)?))
    }
}

/// `{"error": {"message": "WEAK_PASSWORD : Password should be ..."}}` -> `WEAK_PASSWORD`
fn error_code(body: &Value) -> anyhow::Result<String> {
    let message = body.get_obj_field("error")?.get_str_field("message")?;
    Ok(
        message
            .split(" : ")
            .next()
            .unwrap_or_default()
            .trim()
            .to_owned()
    )
}

fn sign_up_error(code: &str) -> ChatError {
    match code {
        "EMAIL_EXISTS" => ChatError::DuplicateUsername,
        "WEAK_PASSWORD" => ChatError::validation("Password should be at least 6 characters"),
        "INVALID_EMAIL" => ChatError::validation("Invalid username"),
        _ => ChatError::Transient(anyhow::anyhow!("firebase signUp: {code}")),
    }
}

fn sign_in_error(code: &str) -> ChatError {
    match code {
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" | "USER_DISABLED"
        | "INVALID_EMAIL" | "MISSING_PASSWORD" => ChatError::AuthenticationFailure,
        _ => ChatError::Transient(anyhow::anyhow!("firebase signInWithPassword: {code}")),
    }
}

#[async_trait]
impl Identity for FirebaseIdentity {
    async fn create_account(&self, login: &str, password: &str) -> ChatResult<Credential> {
        match self.accounts("signUp", login, password).await? {
            Ok(uid) => Ok(Credential { uid }),
            Err(code) => Err(sign_up_error(&code)),
        }
    }

    async fn authenticate(&self, login: &str, password: &str) -> ChatResult<Credential> {
        match self.accounts("signInWithPassword", login, password).await? {
            Ok(uid) => Ok(Credential { uid }),
            Err(code) => Err(sign_in_error(&code)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, sync::{Arc, Mutex}};

    use axum::{extract::{Path, Query, State}, http::StatusCode, routing::post, Json, Router};
    use serde_json::json;

    use super::*;

    type Accounts = Arc<Mutex<HashMap<String, (String, String)>>>;

    fn failure(message: &str) -> (StatusCode, Json<Value>) {
        (StatusCode::BAD_REQUEST, Json(json!({ "error": { "code": 400, "message": message } })))
    }

    // just enough of the Identity Toolkit to exercise the client
    async fn fake_accounts(
        Path(method): Path<String>,
        Query(query): Query<HashMap<String, String>>,
        State(accounts): State<Accounts>,
        Json(body): Json<Value>,
    ) -> (StatusCode, Json<Value>) {
        if query.get("key").map(String::as_str) != Some("test-key") {
            return failure("API key not valid. Please pass a valid API key.");
        }
        let email = body["email"].as_str().unwrap_or_default().to_owned();
        let password = body["password"].as_str().unwrap_or_default().to_owned();
        let mut accounts = accounts.lock().unwrap();

        match method.as_str() {
            "accounts:signUp" => {
                if password.len() < 6 {
                    return failure("WEAK_PASSWORD : Password should be at least 6 characters");
                }
                if accounts.contains_key(&email) {
                    return failure("EMAIL_EXISTS");
                }
                let uid = format!("fb{}", accounts.len() + 1);
                accounts.insert(email, (uid.clone(), password));
                (StatusCode::OK, Json(json!({ "localId": uid, "idToken": "t" })))
            }
            "accounts:signInWithPassword" => match accounts.get(&email) {
                Some((uid, stored)) if *stored == password => {
                    (StatusCode::OK, Json(json!({ "localId": uid, "idToken": "t" })))
                }
                _ => failure("INVALID_LOGIN_CREDENTIALS"),
            },
            _ => failure("NOT_FOUND"),
        }
    }

    fn client(base_url: &str, api_key: &str) -> FirebaseIdentity {
        FirebaseIdentity {
            http_client: reqwest::Client::builder().no_proxy().build().unwrap(),
            base_url: base_url.to_owned(),
            api_key: api_key.to_owned(),
        }
    }

    async fn serve_fake() -> String {
        let app = Router::new()
            .route("/v1/{method}", post(fake_accounts))
            .with_state(Accounts::default());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{addr}")
    }

    #[test]
    fn error_codes_drop_the_description() {
        let body = json!({ "error": { "message": "WEAK_PASSWORD : Password should be at least 6 characters" } });
        assert_eq!(error_code(&body).unwrap(), "WEAK_PASSWORD");
        assert!(error_code(&json!({})).is_err());
    }

    #[test]
    fn maps_firebase_codes() {
        assert!(matches!(sign_up_error("EMAIL_EXISTS"), ChatError::DuplicateUsername));
        assert!(matches!(sign_up_error("WEAK_PASSWORD"), ChatError::Validation(_)));
        assert!(matches!(sign_up_error("OPERATION_NOT_ALLOWED"), ChatError::Transient(_)));
        assert!(matches!(sign_in_error("INVALID_PASSWORD"), ChatError::AuthenticationFailure));
        assert!(matches!(sign_in_error("TOO_MANY_ATTEMPTS_TRY_LATER"), ChatError::Transient(_)));
    }

    #[tokio::test]
    async fn sign_up_and_sign_in() {
        let identity = client(&serve_fake().await, "test-key");

        let created = identity.create_account("carol@vj-chat.local", "hunter22").await.unwrap();
        let again = identity.create_account("carol@vj-chat.local", "hunter22").await.unwrap_err();
        assert!(matches!(again, ChatError::DuplicateUsername));

        let signed_in = identity.authenticate("carol@vj-chat.local", "hunter22").await.unwrap();
        assert_eq!(signed_in, created);

        let wrong = identity.authenticate("carol@vj-chat.local", "hunter23").await.unwrap_err();
        assert!(matches!(wrong, ChatError::AuthenticationFailure));
    }

    #[tokio::test]
    async fn bad_api_key_is_transient() {
        let identity = client(&serve_fake().await, "wrong-key");
        let err = identity.create_account("dave@vj-chat.local", "hunter22").await.unwrap_err();
        assert!(matches!(err, ChatError::Transient(_)));
    }
}
