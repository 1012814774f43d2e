use aws_config::SdkConfig;
use aws_sdk_secretsmanager::Client;

use crate::{Error, Result, describe};

/// Resolves `SecretString` values by secret id or ARN.
#[derive(Clone, Debug)]
pub struct SecretsManager {
    client: Client,
}

impl SecretsManager {
    pub fn new(sdk_config: &SdkConfig) -> Self {
        Self::with_client(Client::new(sdk_config))
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Binary secrets are not supported; a secret without a `SecretString` is an error.
    pub async fn secret_string(&self, secret_id: &str) -> Result<String> {
        let output = self
            .client
            .get_secret_value()
            .secret_id(secret_id)
            .send()
            .await
            .map_err(|e| Error::SecretsManager(format!("{secret_id}: {}", describe(&e))))?;

        output
            .secret_string()
            .map(str::to_string)
            .ok_or_else(|| Error::SecretsManager(format!("{secret_id} has no SecretString")))
    }
}
