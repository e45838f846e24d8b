use axum::{debug_handler, response::Redirect};
use tower_sessions::Session;

use crate::{session, AppResult};

#[debug_handler]
pub(crate) async fn logout(session: Session) -> AppResult<Redirect> {
    if let Some(user) = session::signed_in(&session).await? {
        log::info!("goodbye u/{}", user.uid);
    }
    session::sign_out(&session).await?;
    Ok(Redirect::to("/login"))
}
