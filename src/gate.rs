//! Role-based access decisions for endpoints.
//!
//! [`authorize`] is the decision itself; [`with_roles`] runs it inside a warp
//! filter chain, reading the bearer token from the `Authorization` header.

use std::convert::Infallible;

use warp::{
    http::{header::AUTHORIZATION, HeaderMap},
    Filter, Rejection,
};

use crate::{
    auth::Auth,
    case_insensitive_string_ext::CaseInsensitiveStringExt,
    error::ApiError,
    types::{AuthenticatedUser, Role},
};

/// What an endpoint demands of its caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// No token is looked at.
    Anonymous,
    /// Any valid token.
    AnyAuthenticated,
    /// A valid token whose role is in the set.
    OneOf(&'static [Role]),
}

pub const ADM: &[Role] = &[Role::Adm];
pub const ADM_OR_EDITOR: &[Role] = &[Role::Adm, Role::Editor];

/// Decide whether a request may proceed.
///
/// `authorization` is the raw `Authorization` header, if present. Returns the
/// caller's identity, or `None` for anonymous endpoints.
pub fn authorize(
    auth: &Auth,
    authorization: Option<&str>,
    access: Access,
) -> Result<Option<AuthenticatedUser>, ApiError> {
    if access == Access::Anonymous {
        return Ok(None);
    }

    let token = authorization
        .ok_or(ApiError::MissingToken)?
        .strip_prefix_ignore_ascii_case("bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(ApiError::MissingToken)?;

    let user = auth.validate_token(token).map_err(|err| {
        tracing::debug!(error = %err, "rejected bearer token");
        err
    })?;

    if let Access::OneOf(roles) = access {
        if !roles.contains(&user.role) {
            tracing::info!(subject = %user.subject.0, role = %user.role, "insufficient role");
            return Err(ApiError::Forbidden(user.role));
        }
    }

    Ok(Some(user))
}

/// Filter that admits callers holding one of `roles` and extracts their identity.
pub fn with_roles(
    auth: &Auth,
    roles: &'static [Role],
) -> impl Filter<Extract = (AuthenticatedUser,), Error = Rejection> + Clone {
    guard(auth, Access::OneOf(roles))
}

/// Filter that admits any caller with a valid token.
pub fn with_auth(auth: &Auth) -> impl Filter<Extract = (AuthenticatedUser,), Error = Rejection> + Clone {
    guard(auth, Access::AnyAuthenticated)
}

fn guard(
    auth: &Auth,
    access: Access,
) -> impl Filter<Extract = (AuthenticatedUser,), Error = Rejection> + Clone {
    // raw headers, so a value that is not visible ASCII ends up as a 401
    // instead of warp's invalid-header rejection
    warp::header::headers_cloned()
        .and(with_auth_state(auth.clone()))
        .and_then(move |headers: HeaderMap, auth: Auth| async move {
            match authorize_headers(&auth, &headers, access) {
                Ok(Some(user)) => Ok(user),
                Ok(None) => Err(warp::reject::custom(ApiError::MissingToken)),
                Err(err) => Err(warp::reject::custom(err)),
            }
        })
}

fn authorize_headers(
    auth: &Auth,
    headers: &HeaderMap,
    access: Access,
) -> Result<Option<AuthenticatedUser>, ApiError> {
    let authorization = match headers.get(AUTHORIZATION).map(|value| value.to_str()) {
        Some(Ok(value)) => Some(value),
        Some(Err(_)) if access != Access::Anonymous => {
            tracing::debug!("rejected non-ascii authorization header");
            return Err(ApiError::TokenError { source: None });
        }
        Some(Err(_)) | None => None,
    };

    authorize(auth, authorization, access)
}

// functor that adds a handle to the auth service into the filter chain
pub(crate) fn with_auth_state(
    auth: Auth,
) -> impl Filter<Extract = (Auth,), Error = Infallible> + Clone {
    warp::any().map(move || auth.clone())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::sync::Mutex;

    use super::*;
    use crate::{
        auth::{AuthConfig, DEFAULT_TOKEN_LIFETIME},
        clock::ManualClock,
        memory::InMemoryCredentialStore,
        types::Identifier,
    };

    fn auth() -> Auth {
        Auth::new(AuthConfig {
            signing_key: "gate test key".into(),
            token_lifetime: DEFAULT_TOKEN_LIFETIME,
            clock: Arc::new(ManualClock::starting_now()),
            credential_store: Arc::new(Mutex::new(InMemoryCredentialStore::default())),
        })
        .unwrap()
    }

    fn bearer(auth: &Auth, role: Role) -> String {
        let token = auth
            .issue_token(&Identifier(format!("{role}@test.com")), role)
            .unwrap();
        format!("Bearer {token}")
    }

    #[test]
    fn anonymous_skips_validation() {
        let auth = auth();
        assert_eq!(authorize(&auth, None, Access::Anonymous).unwrap(), None);
        assert_eq!(
            authorize(&auth, Some("Bearer garbage"), Access::Anonymous).unwrap(),
            None
        );
    }

    #[test]
    fn missing_or_unusable_header_is_unauthenticated() {
        let auth = auth();

        for header in [None, Some(""), Some("Bearer "), Some("Basic dXNlcjpwYXNz")] {
            let err = authorize(&auth, header, Access::AnyAuthenticated).unwrap_err();
            assert!(matches!(err, ApiError::MissingToken), "{header:?}");
        }
    }

    #[test]
    fn bad_token_is_unauthenticated_not_forbidden() {
        let auth = auth();
        let err = authorize(&auth, Some("Bearer a.b.c"), Access::OneOf(ADM)).unwrap_err();
        assert!(err.is_unauthenticated());
        assert!(!matches!(err, ApiError::Forbidden(_)));
    }

    #[test]
    fn role_membership_decides() {
        let auth = auth();
        let adm = bearer(&auth, Role::Adm);
        let editor = bearer(&auth, Role::Editor);

        let user = authorize(&auth, Some(adm.as_str()), Access::OneOf(ADM)).unwrap().unwrap();
        assert_eq!(user.role, Role::Adm);

        assert!(authorize(&auth, Some(editor.as_str()), Access::OneOf(ADM_OR_EDITOR)).unwrap().is_some());
        assert!(matches!(
            authorize(&auth, Some(editor.as_str()), Access::OneOf(ADM)),
            Err(ApiError::Forbidden(Role::Editor))
        ));
        assert!(authorize(&auth, Some(editor.as_str()), Access::AnyAuthenticated)
            .unwrap()
            .is_some());
    }

    #[test]
    fn non_ascii_header_is_unauthenticated() {
        let auth = auth();
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            warp::http::HeaderValue::from_bytes(b"Bearer \xe9abc").unwrap(),
        );

        let err = authorize_headers(&auth, &headers, Access::OneOf(ADM)).unwrap_err();
        assert!(matches!(err, ApiError::TokenError { source: None }));
        assert!(err.is_unauthenticated());

        assert_eq!(authorize_headers(&auth, &headers, Access::Anonymous).unwrap(), None);
    }

    #[test]
    fn bearer_scheme_is_case_insensitive() {
        let auth = auth();
        let header = bearer(&auth, Role::Adm).replacen("Bearer", "bEaReR", 1);
        assert!(authorize(&auth, Some(header.as_str()), Access::OneOf(ADM)).is_ok());
    }
}
