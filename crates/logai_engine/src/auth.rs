/// The caller has no usable sign-in session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("not signed in")]
    NotSignedIn,
}

/// Supplies the bearer token for requests. Sign-in and sign-out are owned by
/// whoever implements this.
pub trait AccessTokenProvider: Send + Sync {
    fn access_token(&self) -> Result<String, AuthError>;
}

/// Token fixed at construction, e.g. from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenProvider {
    token: Option<String>,
}

impl StaticTokenProvider {
    /// Blank tokens count as signed out.
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: token
                .map(|token| token.trim().to_string())
                .filter(|token| !token.is_empty()),
        }
    }

    pub fn signed_out() -> Self {
        Self { token: None }
    }
}

impl AccessTokenProvider for StaticTokenProvider {
    fn access_token(&self) -> Result<String, AuthError> {
        self.token.clone().ok_or(AuthError::NotSignedIn)
    }
}

#[cfg(test)]
mod tests {
    use super::{AccessTokenProvider, AuthError, StaticTokenProvider};

    #[test]
    fn blank_token_is_signed_out() {
        let provider = StaticTokenProvider::new(Some("   ".to_string()));
        assert_eq!(provider.access_token(), Err(AuthError::NotSignedIn));
        assert_eq!(
            StaticTokenProvider::signed_out().access_token(),
            Err(AuthError::NotSignedIn)
        );
    }

    #[test]
    fn token_is_trimmed() {
        let provider = StaticTokenProvider::new(Some(" abc.def \n".to_string()));
        assert_eq!(provider.access_token().as_deref(), Ok("abc.def"));
    }
}
