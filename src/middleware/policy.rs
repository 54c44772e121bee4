/// Path rules for the authentication gate
///
/// The allow-list decides which requests bypass authentication entirely.
/// Access rules are evaluated only after a request is authenticated; the
/// first rule whose pattern matches wins.

use crate::auth::AuthContext;
use crate::credentials::Role;
use crate::error::{AppError, AuthError};

/// `/a/b` matches exactly, `/a/*` matches `/a` and everything below it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathPattern {
    Exact(String),
    Prefix(String),
}

impl PathPattern {
    pub fn parse(pattern: &str) -> Self {
        match pattern.strip_suffix("/**").or_else(|| pattern.strip_suffix("/*")) {
            Some(base) => PathPattern::Prefix(base.to_string()),
            None => PathPattern::Exact(pattern.to_string()),
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        match self {
            PathPattern::Exact(exact) => path == exact,
            PathPattern::Prefix(base) => {
                path == base
                    || path
                        .strip_prefix(base.as_str())
                        .map_or(false, |rest| rest.starts_with('/'))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    Authenticated,
    AnyRole(Vec<Role>),
}

#[derive(Debug, Clone)]
pub struct AccessRule {
    pub pattern: PathPattern,
    pub requirement: Requirement,
}

impl AccessRule {
    pub fn new(pattern: &str, requirement: Requirement) -> Self {
        Self {
            pattern: PathPattern::parse(pattern),
            requirement,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GatePolicy {
    public: Vec<PathPattern>,
    rules: Vec<AccessRule>,
}

impl GatePolicy {
    pub fn new(public: &[&str], rules: Vec<AccessRule>) -> Self {
        Self {
            public: public.iter().map(|p| PathPattern::parse(p)).collect(),
            rules,
        }
    }

    pub fn is_public(&self, path: &str) -> bool {
        self.public.iter().any(|pattern| pattern.matches(path))
    }

    /// Role check for an authenticated caller
    ///
    /// # Errors
    /// `Forbidden` when the matching rule requires a role the caller lacks
    pub fn authorize(&self, path: &str, context: &AuthContext) -> Result<(), AppError> {
        let requirement = self
            .rules
            .iter()
            .find(|rule| rule.pattern.matches(path))
            .map(|rule| &rule.requirement);

        match requirement {
            Some(Requirement::AnyRole(roles)) if !context.has_any_role(roles) => {
                tracing::warn!(
                    user = %context.identifier(),
                    role = %context.role(),
                    path = %path,
                    "Access denied"
                );
                Err(AuthError::Forbidden.into())
            }
            _ => Ok(()),
        }
    }
}

impl Default for GatePolicy {
    fn default() -> Self {
        GatePolicy::new(
            &[
                "/auth/register",
                "/auth/login",
                "/auth/email-check",
                "/auth/reissue",
                "/public/*",
                "/health_check",
            ],
            vec![
                AccessRule::new("/auth/logout", Requirement::Authenticated),
                AccessRule::new("/auth/email/*", Requirement::Authenticated),
                AccessRule::new("/auth/*", Requirement::AnyRole(vec![Role::User, Role::Admin])),
                AccessRule::new("/admin/*", Requirement::AnyRole(vec![Role::Admin])),
            ],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::Principal;

    fn context(role: Role) -> AuthContext {
        AuthContext::new(Principal {
            id: 1,
            email: "user@x.com".into(),
            password_hash: "hash".into(),
            role,
            enabled: true,
        })
    }

    #[test]
    fn test_pattern_matching() {
        let prefix = PathPattern::parse("/public/*");
        assert!(prefix.matches("/public"));
        assert!(prefix.matches("/public/sets"));
        assert!(prefix.matches("/public/sets/3"));
        assert!(!prefix.matches("/publicity"));

        let exact = PathPattern::parse("/auth/login");
        assert!(exact.matches("/auth/login"));
        assert!(!exact.matches("/auth/login/extra"));
    }

    #[test]
    fn test_default_allow_list() {
        let policy = GatePolicy::default();

        for path in ["/auth/register", "/auth/login", "/auth/email-check", "/auth/reissue", "/public/sets"] {
            assert!(policy.is_public(path), "{} should be public", path);
        }
        for path in ["/auth/logout", "/auth/me", "/sentence-sets/1/viewed", "/admin/users"] {
            assert!(!policy.is_public(path), "{} should be protected", path);
        }
    }

    #[test]
    fn test_logout_needs_only_authentication() {
        let policy = GatePolicy::default();
        assert!(policy.authorize("/auth/logout", &context(Role::Nobody)).is_ok());
        assert!(policy.authorize("/auth/email/send", &context(Role::Nobody)).is_ok());
    }

    #[test]
    fn test_auth_paths_need_user_role() {
        let policy = GatePolicy::default();

        let err = policy.authorize("/auth/me", &context(Role::Nobody)).unwrap_err();
        assert!(matches!(err, AppError::Auth(AuthError::Forbidden)));
        assert!(policy.authorize("/auth/me", &context(Role::User)).is_ok());
        assert!(policy.authorize("/auth/me", &context(Role::Admin)).is_ok());
    }

    #[test]
    fn test_admin_paths() {
        let policy = GatePolicy::default();
        assert!(policy.authorize("/admin/users", &context(Role::User)).is_err());
        assert!(policy.authorize("/admin/users", &context(Role::Admin)).is_ok());
    }

    #[test]
    fn test_unlisted_paths_need_only_authentication() {
        let policy = GatePolicy::default();
        assert!(policy.authorize("/sentence-sets/1/viewed", &context(Role::Nobody)).is_ok());
    }
}
