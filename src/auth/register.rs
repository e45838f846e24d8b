use axum::{debug_handler, extract::State, response::{IntoResponse, Redirect, Response}, Form};
use tower_sessions::Session;

use crate::{include_res, res, session, AppResult, AppState};

use super::login::LoginForm;

fn register_form(username: &str, error: Option<&str>) -> String {
    include_res!(str, "/pages/register.html")
        .replace("{error}", &res::error_line(error))
        .replace("{username}", &res::escape(username))
}

#[debug_handler]
pub(crate) async fn register_page(session: Session) -> AppResult<Response> {
    if session::signed_in(&session).await?.is_some() {
        return Ok(Redirect::to("/").into_response());
    }

    Ok(res::page("Register", None, &register_form("", None)).into_response())
}

#[debug_handler(state = AppState)]
pub(crate) async fn register(
    State(state): State<AppState>,
    session: Session,

    Form(LoginForm { username, password }): Form<LoginForm>,
) -> AppResult<Response> {
    match super::register(state.identity.as_ref(), &state.db_pool, &username, &password).await {
        Ok(participant) => {
            session::sign_in(&session, &participant).await?;
            Ok(Redirect::to("/").into_response())
        }
        Err(err) => {
            let message = if err.is_user_facing() {
                err.to_string()
            } else {
                log::error!("registration of {username} failed: {err:#}");
                "Registration failed, try again".to_owned()
            };
            let form = register_form(&username, Some(&message));
            Ok((err.status(), res::page("Register", None, &form)).into_response())
        }
    }
}
