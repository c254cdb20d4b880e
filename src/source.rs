use async_trait::async_trait;
use uuid::Uuid;

use crate::models::Dataset;

/// Where consultation data comes from. The Postgres store implements it for
/// real use; tests supply fixed datasets.
#[async_trait]
pub trait ConsultationSource: Send + Sync {
    async fn load_dataset(&self) -> anyhow::Result<Dataset>;

    async fn unit_ids_for_user(&self, user_id: Uuid) -> anyhow::Result<Vec<i32>>;
}
