use super::Claims;
use uuid::Uuid;

/// Authenticated user context extracted from JWT
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// User ID (from JWT sub claim); scopes every estimate, template and settings query
    pub user_id: Uuid,

    /// User email if available
    pub email: Option<String>,

    /// User role if specified
    pub role: Option<String>,
}

impl AuthContext {
    pub fn from_claims(claims: &Claims) -> Result<Self, &'static str> {
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| "Invalid user ID in token")?;

        Ok(Self {
            user_id,
            email: claims.email.clone(),
            role: claims.role.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(sub: &str) -> Claims {
        Claims {
            sub: sub.to_string(),
            aud: "authenticated".to_string(),
            iss: None,
            iat: None,
            exp: 0,
            email: Some("sparky@example.com".to_string()),
            role: None,
        }
    }

    #[test]
    fn subject_must_be_a_uuid() {
        let id = Uuid::new_v4();
        let ctx = AuthContext::from_claims(&claims(&id.to_string())).unwrap();
        assert_eq!(ctx.user_id, id);
        assert_eq!(ctx.email.as_deref(), Some("sparky@example.com"));

        assert!(AuthContext::from_claims(&claims("temp-user-id")).is_err());
    }
}
