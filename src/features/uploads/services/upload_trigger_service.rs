use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, warn};

use crate::features::uploads::dtos::{DispatchSummaryDto, FileVersionRefDto};
use crate::features::uploads::workers::{UploadDispatcher, UploadJob};
use crate::modules::crm::CrmApi;

/// Concurrent link lookups per notification
const LINK_LOOKUP_CONCURRENCY: usize = 8;

/// Turns file-version notifications into upload jobs
///
/// A file version yields one job per linked record that is not a user; files
/// linked only to users are skipped.
pub struct UploadTriggerService {
    crm: Arc<dyn CrmApi>,
    dispatcher: Arc<dyn UploadDispatcher>,
    user_key_prefix: String,
}

impl UploadTriggerService {
    pub fn new(
        crm: Arc<dyn CrmApi>,
        dispatcher: Arc<dyn UploadDispatcher>,
        user_key_prefix: impl Into<String>,
    ) -> Self {
        Self {
            crm,
            dispatcher,
            user_key_prefix: user_key_prefix.into(),
        }
    }

    /// Dispatch uploads for a batch of new file versions without waiting on them
    pub async fn handle(&self, file_versions: &[FileVersionRefDto]) -> DispatchSummaryDto {
        let lookups: Vec<_> = stream::iter(file_versions.iter().cloned())
            .map(|fv| async move {
                let owners = self.owning_records(&fv).await;
                (fv, owners)
            })
            .buffered(LINK_LOOKUP_CONCURRENCY)
            .collect()
            .await;

        let mut summary = DispatchSummaryDto::default();
        for (file_version, owners) in lookups {
            match owners {
                Some(owners) if !owners.is_empty() => {
                    for record_id in owners {
                        self.dispatcher.dispatch(UploadJob {
                            file_version_id: file_version.id.clone(),
                            record_id,
                        });
                        summary.dispatched += 1;
                    }
                }
                Some(_) => {
                    debug!(
                        "File version {} has no owning record, skipping",
                        file_version.id
                    );
                    summary.skipped += 1;
                }
                None => summary.skipped += 1,
            }
        }

        summary
    }

    /// Linked records that are not users, or `None` if the lookup failed
    async fn owning_records(&self, file_version: &FileVersionRefDto) -> Option<Vec<String>> {
        match self
            .crm
            .linked_entity_ids(&file_version.content_document_id)
            .await
        {
            Ok(ids) => Some(
                ids.into_iter()
                    .filter(|id| !id.starts_with(&self.user_key_prefix))
                    .collect(),
            ),
            Err(e) => {
                warn!(
                    "Failed to look up links for file version {}: {}",
                    file_version.id, e
                );
                None
            }
        }
    }
}
