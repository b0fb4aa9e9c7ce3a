//! Group creation after a successful batch.

use fileshare_protocol::CreateGroupRequest;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::UploadError;
use crate::policy::TransferPolicy;
use crate::store::RemoteStore;
use crate::types::{GroupResult, TransferResult};

/// Binds a batch's uploaded files to one group code.
pub struct GroupFinalizer<'a> {
    store: &'a dyn RemoteStore,
    policy: &'a TransferPolicy,
    cancel: &'a CancellationToken,
}

impl<'a> GroupFinalizer<'a> {
    pub fn new(
        store: &'a dyn RemoteStore,
        policy: &'a TransferPolicy,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            store,
            policy,
            cancel,
        }
    }

    /// Creates the group, retrying with linear backoff after a settle delay.
    ///
    /// Needs at least two results. Exhausted retries yield
    /// [`UploadError::GroupCreation`]; the results themselves are untouched.
    pub async fn finalize(
        &self,
        results: &[TransferResult],
        group_name: Option<String>,
    ) -> Result<GroupResult, UploadError> {
        if results.len() < 2 {
            return Err(UploadError::Validation(
                "a group needs at least two uploaded files".into(),
            ));
        }

        let request = CreateGroupRequest {
            file_ids: results.iter().map(|r| r.code.clone()).collect(),
            group_name: group_name.filter(|n| !n.trim().is_empty()),
        };

        self.pause(self.policy.group_settle_delay).await?;

        let mut attempt: u32 = 0;
        loop {
            debug!(files = request.file_ids.len(), attempt, "creating group");
            let call = self.store.create_group(request.clone());
            let err = match tokio::time::timeout(self.policy.call_timeout, call).await {
                Ok(Ok(resp)) => return Ok(GroupResult::from_response(resp, results)),
                Ok(Err(e)) => e,
                Err(_) => UploadError::Transport("group creation timed out".into()),
            };

            if attempt >= self.policy.group_budget(err.is_client_error()) {
                return Err(UploadError::GroupCreation(err.to_string()));
            }
            attempt += 1;
            let delay = self.policy.backoff(attempt);
            warn!(attempt, error = %err, "group creation failed, retrying");
            self.pause(delay).await?;
        }
    }

    async fn pause(&self, delay: std::time::Duration) -> Result<(), UploadError> {
        tokio::select! {
            _ = self.cancel.cancelled() => Err(UploadError::Cancelled),
            _ = tokio::time::sleep(delay) => Ok(()),
        }
    }
}
