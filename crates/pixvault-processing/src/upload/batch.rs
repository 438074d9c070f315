use futures::future::join_all;
use pixvault_core::{BatchItemResult, UploadCandidate, UploadPolicy};

use super::error::BatchError;
use super::pipeline::UploadService;

impl UploadService {
    /// Upload every candidate concurrently and report one result per candidate.
    ///
    /// Results are positional: `result[i]` describes `candidates[i]`. Per-item failures
    /// are reported inside the results; only an oversized batch fails the call, and it
    /// does so before any candidate is looked at.
    pub async fn upload_batch(
        &self,
        candidates: &[UploadCandidate],
        owner_id: &str,
        policy: &UploadPolicy,
    ) -> Result<Vec<BatchItemResult>, BatchError> {
        if candidates.len() > self.max_files_per_batch {
            return Err(BatchError::TooManyFiles {
                count: candidates.len(),
                max: self.max_files_per_batch,
            });
        }

        let outcomes = join_all(
            candidates
                .iter()
                .map(|candidate| self.upload(candidate, owner_id, policy)),
        )
        .await;

        let results: Vec<BatchItemResult> = candidates
            .iter()
            .zip(outcomes)
            .map(|(candidate, outcome)| match outcome {
                Ok(info) => BatchItemResult::succeeded(info),
                Err(e) => BatchItemResult::failed(candidate, e.code(), e.client_message()),
            })
            .collect();

        let succeeded = results.iter().filter(|r| r.success).count();
        tracing::info!(
            owner_id = %owner_id,
            total = results.len(),
            succeeded = succeeded,
            failed = results.len() - succeeded,
            "Batch upload completed"
        );

        Ok(results)
    }
}
