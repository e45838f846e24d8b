use axum::{debug_handler, extract::State, response::{IntoResponse, Redirect, Response}, Form};
use serde::Deserialize;
use tower_sessions::Session;

use crate::{include_res, res, session, AppResult, AppState};

#[derive(Deserialize)]
pub(crate) struct LoginForm {
    #[serde(default)]
    pub(crate) username: String,
    #[serde(default)]
    pub(crate) password: String,
}

fn login_form(username: &str, error: Option<&str>) -> String {
    include_res!(str, "/pages/login.html")
        .replace("{error}", &res::error_line(error))
        .replace("{username}", &res::escape(username))
}

#[debug_handler]
pub(crate) async fn login_page(session: Session) -> AppResult<Response> {
    if session::signed_in(&session).await?.is_some() {
        return Ok(Redirect::to("/").into_response());
    }

    Ok(res::page("Login", None, &login_form("", None)).into_response())
}

#[debug_handler(state = AppState)]
pub(crate) async fn login(
    State(state): State<AppState>,
    session: Session,

    Form(LoginForm { username, password }): Form<LoginForm>,
) -> AppResult<Response> {
    match super::login(state.identity.as_ref(), &state.db_pool, &username, &password).await {
        Ok(participant) => {
            session::sign_in(&session, &participant).await?;
            log::info!("welcome @{}#{}", participant.username, participant.uid);
            Ok(Redirect::to("/").into_response())
        }
        Err(err) => {
            let form = login_form(&username, Some(&err.to_string()));
            Ok((err.status(), res::page("Login", None, &form)).into_response())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_username_stays_in_its_field() {
        let form = login_form("{error}", Some("Invalid login"));

        assert!(!form.contains(r#"value="<div"#));
        assert!(form.contains("&#123;error&#125;"));
        assert_eq!(form.matches(r#"<div class="err">Invalid login</div>"#).count(), 1);
    }
}
