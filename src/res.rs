use axum::{http::StatusCode, response::{Html, IntoResponse, Response}};

use crate::{session::SignedIn, AppResult};

#[macro_export]
macro_rules! include_res {
    (bytes, $p:expr) => {
        include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/res", $p))
    };
    (str, $p:expr) => {
        include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/res", $p))
    };
}

/// HTML-escape text for element bodies and quoted attributes. Braces are
/// escaped too, so escaped text is safe to `.replace` into a template.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            // keeps user text from reading as a template placeholder
            '{' => out.push_str("&#123;"),
            '}' => out.push_str("&#125;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn error_line(error: Option<&str>) -> String {
    match error {
        Some(error) => format!(r#"<div class="err">{}</div>"#, escape(error)),
        None => String::new(),
    }
}

/// Wrap a page body in the shared layout.
pub fn page(title: &str, user: Option<&SignedIn>, body: &str) -> Html<String> {
    let user_bar = match user {
        Some(user) => include_res!(str, "/pages/user_bar.html")
            .replace("{username}", &escape(&user.username)),
        None => String::new(),
    };

    Html(
        include_res!(str, "/pages/layout.html")
            .replace("{title}", &escape(title))
            .replace("{user_bar}", &user_bar)
            .replace("{body}", body)
    )
}

pub fn sorry(what: &str) -> AppResult<Response> {
    let body = include_res!(str, "/pages/sorry.html").replace("{what}", &escape(what));
    Ok((StatusCode::NOT_FOUND, page("Not found", None, &body)).into_response())
}
