use siem_relay_aws::parameter::ParameterStore;

use crate::Error;
use crate::watermark::WatermarkStore;

impl WatermarkStore for ParameterStore {
    async fn get(&self, name: &str) -> crate::Result<Option<String>> {
        ParameterStore::get(self, name)
            .await
            .map_err(|e| Error::Watermark(e.to_string()))
    }

    async fn put(&mut self, name: &str, value: &str) -> crate::Result<()> {
        ParameterStore::put(self, name, value)
            .await
            .map_err(|e| Error::Watermark(e.to_string()))
    }
}
