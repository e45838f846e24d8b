use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::{users::Participant, AppResult};

pub const USER_ID: &str = "user_id";
pub const USERNAME: &str = "username";

/// The participant behind the current browser session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedIn {
    pub uid: String,
    pub username: String,
}

pub async fn signed_in(session: &Session) -> AppResult<Option<SignedIn>> {
    let Some(uid) = session.get::<String>(USER_ID).await? else {
        return Ok(None);
    };
    let username = session.get::<String>(USERNAME).await?.unwrap_or_default();

    Ok(Some(SignedIn { uid, username }))
}

pub async fn sign_in(session: &Session, participant: &Participant) -> AppResult<()> {
    session.cycle_id().await?;
    session.insert(USER_ID, &participant.uid).await?;
    session.insert(USERNAME, &participant.username).await?;
    Ok(())
}

pub async fn sign_out(session: &Session) -> AppResult<()> {
    session.flush().await?;
    Ok(())
}
