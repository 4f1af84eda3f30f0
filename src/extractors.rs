use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;

use crate::auth::session::resolve_session;
use crate::auth::Identity;
use crate::error::AppError;
use crate::state::AppState;

/// The authenticated caller. Rejects with 401 when no valid session is found.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Identity);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let MaybeUser(identity) = MaybeUser::from_request_parts(parts, state).await?;
        identity
            .map(CurrentUser)
            .ok_or(AppError::AuthenticationRequired)
    }
}

/// Optional caller. Anonymous requests are a normal input, not an error.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<Identity>);

impl MaybeUser {
    pub fn identity(&self) -> Option<&Identity> {
        self.0.as_ref()
    }
}

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = extract_session_token(parts, &state.config.auth.cookie_name) else {
            return Ok(MaybeUser(None));
        };
        let identity = resolve_session(&state.db, token)?;
        Ok(MaybeUser(identity))
    }
}

/// Session token from the session cookie, falling back to `Authorization: Bearer`.
pub(crate) fn extract_session_token<'a>(parts: &'a Parts, cookie_name: &str) -> Option<&'a str> {
    let from_cookie = parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|s| s.split(';'))
        .map(|s| s.trim())
        .find_map(|cookie| {
            let mut split = cookie.splitn(2, '=');
            let key = split.next()?.trim();
            let val = split.next()?.trim();
            if key == cookie_name && !val.is_empty() {
                Some(val)
            } else {
                None
            }
        });

    from_cookie.or_else(|| {
        parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with(headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder().uri("/");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn token_comes_from_named_cookie() {
        let parts = parts_with(&[("cookie", "theme=dark; videohub_session=abc123")]);
        assert_eq!(
            extract_session_token(&parts, "videohub_session"),
            Some("abc123")
        );
        assert_eq!(extract_session_token(&parts, "other"), None);
    }

    #[test]
    fn bearer_header_is_a_fallback() {
        let parts = parts_with(&[("authorization", "Bearer tok")]);
        assert_eq!(extract_session_token(&parts, "videohub_session"), Some("tok"));

        let parts = parts_with(&[("authorization", "Basic xyz")]);
        assert_eq!(extract_session_token(&parts, "videohub_session"), None);
    }
}
