use siem_relay_aws::secrets::SecretsManager;

use crate::Error;
use crate::secrets::SecretStore;

impl SecretStore for SecretsManager {
    async fn secret(&self, id: &str) -> crate::Result<String> {
        self.secret_string(id)
            .await
            .map_err(|e| Error::Secret(e.to_string()))
    }
}
