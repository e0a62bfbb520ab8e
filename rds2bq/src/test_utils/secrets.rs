use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::bail;
use crate::clients::SecretsProvider;
use crate::error::{ErrorKind, TransferResult};

/// In-memory secrets provider.
#[derive(Debug, Clone, Default)]
pub struct MemorySecretsProvider {
    secrets: Arc<Mutex<HashMap<String, String>>>,
}

impl MemorySecretsProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put_secret(&self, name: &str, value: impl Into<String>) {
        let mut secrets = self.secrets.lock().await;
        secrets.insert(name.to_owned(), value.into());
    }
}

impl SecretsProvider for MemorySecretsProvider {
    async fn get_secret_string(&self, name: &str) -> TransferResult<String> {
        let secrets = self.secrets.lock().await;

        match secrets.get(name) {
            Some(value) => Ok(value.clone()),
            None => bail!(
                ErrorKind::SecretsProviderFailed,
                "Secret not found",
                name
            ),
        }
    }
}
