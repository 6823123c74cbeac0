//! Environment variable and fixed token sources

use async_trait::async_trait;
use std::env;

use crate::{AccessToken, TokenError, TokenSource};

/// Reads a pre-issued token from an environment variable on every call.
///
/// The audience is not checked; whoever issued the token is responsible for
/// scoping it to the right database resource.
pub struct EnvTokenSource {
    var: String,
}

impl EnvTokenSource {
    pub fn new(var: &str) -> Self {
        Self { var: var.to_string() }
    }
}

impl Default for EnvTokenSource {
    fn default() -> Self {
        Self::new("SQLSSO_ACCESS_TOKEN")
    }
}

#[async_trait]
impl TokenSource for EnvTokenSource {
    async fn acquire(&self, _audience: &str) -> Result<AccessToken, TokenError> {
        let value = env::var(&self.var)
            .map_err(|_| TokenError::NoCredentials(format!("{} is not set", self.var)))?;
        AccessToken::new(value)
    }

    fn name(&self) -> &str {
        "env"
    }
}

/// Always returns the same token. Intended for tests and local tooling.
pub struct StaticTokenSource(AccessToken);

impl StaticTokenSource {
    pub fn new(token: AccessToken) -> Self {
        Self(token)
    }
}

#[async_trait]
impl TokenSource for StaticTokenSource {
    async fn acquire(&self, _audience: &str) -> Result<AccessToken, TokenError> {
        Ok(self.0.clone())
    }

    fn name(&self) -> &str {
        "static"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_env_token_source_reads_variable() {
        let var = "SQLSSO_TEST_TOKEN_READS_VARIABLE";
        env::set_var(var, "token-from-env");

        let source = EnvTokenSource::new(var);
        let token = source.acquire("https://database.windows.net/").await.unwrap();
        assert_eq!(token.secret(), "token-from-env");

        env::remove_var(var);
    }

    #[tokio::test]
    async fn test_env_token_source_missing_variable() {
        let source = EnvTokenSource::new("SQLSSO_TEST_TOKEN_DEFINITELY_UNSET");
        let result = source.acquire("https://database.windows.net/").await;
        assert!(matches!(result, Err(TokenError::NoCredentials(_))));
    }

    #[tokio::test]
    async fn test_static_token_source() {
        let source = StaticTokenSource::new(AccessToken::new("fixed").unwrap());
        assert_eq!(source.acquire("any").await.unwrap().secret(), "fixed");
        assert_eq!(source.name(), "static");
    }
}
