use async_trait::async_trait;
use shared::{domain::RsvpResponse, error::RsvpError};
use tracing::{info, warn};

/// Destination for completed responses. Implementations append; they never
/// update or delete earlier records.
#[async_trait]
pub trait ResponseStore: Send + Sync {
    async fn append(&self, response: &RsvpResponse) -> anyhow::Result<()>;
}

#[async_trait]
impl ResponseStore for storage::Storage {
    async fn append(&self, response: &RsvpResponse) -> anyhow::Result<()> {
        let response_id = self.insert_response(response).await?;
        info!(response_id = response_id.0, guest_id = %response.guest_id, "response stored");
        Ok(())
    }
}

/// Persists one response with a single attempt. There is no retry and no
/// idempotency key, so resubmitting after a transient fault may store a
/// duplicate.
pub async fn submit_response<S>(store: &S, response: &RsvpResponse) -> Result<(), RsvpError>
where
    S: ResponseStore + ?Sized,
{
    response.validate()?;
    store.append(response).await.map_err(|error| {
        warn!(guest_id = %response.guest_id, %error, "response store rejected submission");
        RsvpError::submission_failed()
    })
}
