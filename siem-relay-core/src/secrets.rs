use std::fmt;

use crate::Error;
use crate::Result;
use crate::config::SecretIds;

/// Secrets Manager backed [`SecretStore`].
mod secrets_manager;

/// Resolves a secret value by its identifier.
#[trait_variant::make(SecretStore: Send)]
pub trait LocalSecretStore {
    async fn secret(&self, id: &str) -> Result<String>;
}

/// Vendor API credentials, resolved once per run.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiCredentials {
    pub api_key: String,
    /// Base64 token that follows `Basic` in the `Authorization` header.
    pub basic_auth: String,
}

impl fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("api_key", &"<redacted>")
            .field("basic_auth", &"<redacted>")
            .finish()
    }
}

/// Fetches both credentials. Surrounding whitespace is stripped and blank values are errors.
pub async fn resolve_credentials<S: SecretStore>(
    store: &S,
    ids: &SecretIds,
) -> Result<ApiCredentials> {
    let api_key = resolve_one(store, &ids.api_key).await?;
    let basic_auth = resolve_one(store, &ids.basic_auth).await?;
    tracing::info!(api_key = %ids.api_key, basic_auth = %ids.basic_auth, "Resolved vendor credentials");
    Ok(ApiCredentials {
        api_key,
        basic_auth,
    })
}

async fn resolve_one<S: SecretStore>(store: &S, id: &str) -> Result<String> {
    let value = store.secret(id).await?;
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::Secret(format!("secret {id} is empty")));
    }
    Ok(value.to_string())
}
