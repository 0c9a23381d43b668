use async_trait::async_trait;
use txsettle_types::SessionLease;

/// Collaborator that turns a caller payload into the bytes actually submitted,
/// once the fee and lease are known
#[async_trait]
pub trait PayloadFinalizer: Send + Sync {
    async fn finalize(
        &self,
        payload: &[u8],
        fee: u64,
        lease: &SessionLease,
    ) -> anyhow::Result<Vec<u8>>;
}

/// Submits the payload unchanged
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughFinalizer;

#[async_trait]
impl PayloadFinalizer for PassthroughFinalizer {
    async fn finalize(
        &self,
        payload: &[u8],
        _fee: u64,
        _lease: &SessionLease,
    ) -> anyhow::Result<Vec<u8>> {
        Ok(payload.to_vec())
    }
}
