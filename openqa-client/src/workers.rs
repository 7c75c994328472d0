//! Worker operations.

use crate::client::Instance;
use crate::envelope;
use crate::error::Result;
use crate::types::Worker;

impl Instance {
    /// List all registered workers.
    pub async fn get_workers(&self) -> Result<Vec<Worker>> {
        let body = self.get(&self.url("workers")).await?;
        envelope::WORKERS.decode_many(&body)
    }
}
