use aws_config::SdkConfig;
use aws_sdk_ssm::Client;
use aws_sdk_ssm::types::ParameterType;

use crate::{Error, Result, describe};

/// Reads and overwrites plain `String` parameters.
#[derive(Clone, Debug)]
pub struct ParameterStore {
    client: Client,
}

impl ParameterStore {
    pub fn new(sdk_config: &SdkConfig) -> Self {
        Self::with_client(Client::new(sdk_config))
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Returns the parameter value, or `None` when the parameter does not exist. Every other
    /// failure is an error.
    pub async fn get(&self, name: &str) -> Result<Option<String>> {
        let output = match self.client.get_parameter().name(name).send().await {
            Ok(output) => output,
            Err(err) => {
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_parameter_not_found())
                {
                    tracing::info!(parameter = name, "Parameter not found");
                    return Ok(None);
                }
                return Err(Error::Ssm(describe(&err)));
            }
        };

        output
            .parameter()
            .and_then(|p| p.value())
            .map(|v| Some(v.to_string()))
            .ok_or_else(|| Error::Ssm(format!("parameter {name} has no value")))
    }

    /// Creates or overwrites the parameter.
    pub async fn put(&self, name: &str, value: &str) -> Result<()> {
        self.client
            .put_parameter()
            .name(name)
            .value(value)
            .r#type(ParameterType::String)
            .overwrite(true)
            .send()
            .await
            .map_err(|e| Error::Ssm(describe(&e)))?;
        tracing::debug!(parameter = name, "Parameter written");
        Ok(())
    }
}
