pub mod file_store;
pub mod google;
pub mod twilio;

use async_trait::async_trait;
use terminly_core::error::Result;

/// Abstraction for storing and retrieving OAuth token material.
/// The server wires this to a single JSON file on disk.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> Result<()>;
}
