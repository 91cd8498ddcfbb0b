// Port for the per-user "last viewed" checkpoint
use async_trait::async_trait;
use chrono::NaiveDateTime;

#[async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn get_last_viewed(&self, username: &str) -> anyhow::Result<Option<NaiveDateTime>>;

    async fn set_last_viewed(&self, username: &str, timestamp: NaiveDateTime) -> anyhow::Result<()>;
}
