//! Caller identity taken from request headers.

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;
use common::{BusinessUnitId, Identity, Role, UserId};
use marketplace::{MarketplaceError, StaticIdentityProvider};

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";
pub const USER_NAME_HEADER: &str = "x-user-name";
pub const BUSINESS_UNIT_HEADER: &str = "x-business-unit-id";

/// The signed-in caller, if the request carries one.
///
/// A request without `x-user-id` is anonymous; the marketplace core rejects it
/// as unauthenticated. The bearer token comes from `Authorization`.
#[derive(Debug, Clone)]
pub struct Caller(pub Option<Identity>);

impl Caller {
    /// Returns the identity or an unauthenticated error.
    pub fn require(&self) -> Result<&Identity, ApiError> {
        self.0.as_ref().ok_or_else(|| {
            MarketplaceError::Unauthenticated("no signed-in user".to_string()).into()
        })
    }

    /// Requires a caller allowed to review exchanges.
    pub fn require_manager(&self) -> Result<&Identity, ApiError> {
        let identity = self.require()?;
        if !identity.role.can_manage() {
            return Err(ApiError::Forbidden(format!(
                "role {} cannot review exchanges",
                identity.role
            )));
        }
        Ok(identity)
    }

    pub fn provider(&self) -> StaticIdentityProvider {
        match &self.0 {
            Some(identity) => StaticIdentityProvider::signed_in(identity.clone()),
            None => StaticIdentityProvider::signed_out(),
        }
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        identity_from_headers(&parts.headers).map(Caller)
    }
}

fn identity_from_headers(headers: &HeaderMap) -> Result<Option<Identity>, ApiError> {
    let Some(user_id) = header(headers, USER_ID_HEADER)? else {
        return Ok(None);
    };
    let user_id: UserId = user_id
        .parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid {USER_ID_HEADER}: {e}")))?;

    let business_unit_id: BusinessUnitId = header(headers, BUSINESS_UNIT_HEADER)?
        .ok_or_else(|| ApiError::BadRequest(format!("Missing {BUSINESS_UNIT_HEADER}")))?
        .parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid {BUSINESS_UNIT_HEADER}: {e}")))?;

    let role = match header(headers, USER_ROLE_HEADER)? {
        Some(role) => role.parse::<Role>().map_err(ApiError::BadRequest)?,
        None => Role::Employee,
    };

    let token = header(headers, "authorization")?
        .and_then(|value| value.strip_prefix("Bearer ").map(str::to_string))
        .unwrap_or_default();

    Ok(Some(Identity {
        user_id,
        role,
        business_unit_id,
        display_name: header(headers, USER_NAME_HEADER)?
            .unwrap_or_default()
            .to_string(),
        token,
    }))
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Result<Option<&'a str>, ApiError> {
    headers
        .get(name)
        .map(|value| {
            value
                .to_str()
                .map(str::trim)
                .map_err(|_| ApiError::BadRequest(format!("Header {name} is not valid text")))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, String)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn test_no_user_header_is_anonymous() {
        assert!(identity_from_headers(&HeaderMap::new()).unwrap().is_none());
    }

    #[test]
    fn test_full_identity() {
        let user_id = UserId::new();
        let bu = BusinessUnitId::new();
        let map = headers(&[
            (USER_ID_HEADER, user_id.to_string()),
            (BUSINESS_UNIT_HEADER, bu.to_string()),
            (USER_ROLE_HEADER, "manager".to_string()),
            (USER_NAME_HEADER, "Mia".to_string()),
            ("authorization", "Bearer abc".to_string()),
        ]);

        let identity = identity_from_headers(&map).unwrap().unwrap();

        assert_eq!(identity.user_id, user_id);
        assert_eq!(identity.business_unit_id, bu);
        assert_eq!(identity.role, Role::Manager);
        assert_eq!(identity.display_name, "Mia");
        assert_eq!(identity.token, "abc");
    }

    #[test]
    fn test_missing_business_unit_is_bad_request() {
        let map = headers(&[(USER_ID_HEADER, UserId::new().to_string())]);
        assert!(matches!(
            identity_from_headers(&map),
            Err(ApiError::BadRequest(_))
        ));
    }

    #[test]
    fn test_employee_cannot_review() {
        let caller = Caller(Some(Identity {
            user_id: UserId::new(),
            role: Role::Employee,
            business_unit_id: BusinessUnitId::new(),
            display_name: String::new(),
            token: "t".to_string(),
        }));
        assert!(matches!(
            caller.require_manager(),
            Err(ApiError::Forbidden(_))
        ));
    }
}
