use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::debug;

use super::DriveApi;
use crate::core::error::{AppError, Result};

type FolderKey = (String, String);
type ReservationTable = Mutex<HashMap<FolderKey, Arc<tokio::sync::Mutex<()>>>>;

/// Resolve-or-create for Drive folders
///
/// Lookup and creation for one `(parent, name)` pair run under a reservation
/// held for the whole sequence, so concurrent callers in this process see
/// the folder created by whichever of them got there first. Other service
/// instances are not covered and may still produce a duplicate folder.
pub struct FolderResolver {
    drive: Arc<dyn DriveApi>,
    reservations: ReservationTable,
}

/// Claim on one `(parent, name)` key, released when dropped
///
/// Dropping also covers a caller whose future is cancelled mid-lookup.
struct Reservation<'a> {
    table: &'a ReservationTable,
    key: FolderKey,
    slot: Arc<tokio::sync::Mutex<()>>,
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if let Ok(mut reservations) = self.table.lock() {
            // Only the table and this claim hold it: nobody is waiting on the key
            if Arc::strong_count(&self.slot) == 2 {
                reservations.remove(&self.key);
            }
        }
    }
}

impl FolderResolver {
    pub fn new(drive: Arc<dyn DriveApi>) -> Self {
        Self {
            drive,
            reservations: Mutex::new(HashMap::new()),
        }
    }

    /// Return the id of the folder `name` under `parent_id`, creating it if absent
    pub async fn resolve_or_create(&self, name: &str, parent_id: &str) -> Result<String> {
        let reservation = self.reserve((parent_id.to_string(), name.to_string()))?;
        let _guard = reservation.slot.lock().await;

        self.find_or_create(name, parent_id).await
    }

    async fn find_or_create(&self, name: &str, parent_id: &str) -> Result<String> {
        match self.drive.find_folder(name, parent_id).await? {
            Some(id) => {
                debug!("Reusing Drive folder '{}' under '{}': {}", name, parent_id, id);
                Ok(id)
            }
            None => self.drive.create_folder(name, parent_id).await,
        }
    }

    fn reserve(&self, key: FolderKey) -> Result<Reservation<'_>> {
        let mut reservations = self
            .reservations
            .lock()
            .map_err(|_| AppError::Internal("Folder reservation table poisoned".to_string()))?;

        let slot = Arc::clone(reservations.entry(key.clone()).or_default());
        Ok(Reservation {
            table: &self.reservations,
            key,
            slot,
        })
    }

    #[cfg(test)]
    fn pending_reservations(&self) -> usize {
        self.reservations.lock().map(|r| r.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_helpers::FakeDrive;
    use std::time::Duration;

    #[tokio::test]
    async fn test_sequential_resolution_is_idempotent() {
        let drive = Arc::new(FakeDrive::default());
        let resolver = FolderResolver::new(drive.clone());

        let first = resolver.resolve_or_create("Account", "root").await.unwrap();
        let second = resolver.resolve_or_create("Account", "root").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(drive.folders_created(), 1);
        assert_eq!(resolver.pending_reservations(), 0);
    }

    #[tokio::test]
    async fn test_same_name_under_different_parents() {
        let drive = Arc::new(FakeDrive::default());
        let resolver = FolderResolver::new(drive.clone());

        let a = resolver.resolve_or_create("ACC-001", "p1").await.unwrap();
        let b = resolver.resolve_or_create("ACC-001", "p2").await.unwrap();

        assert_ne!(a, b);
        assert_eq!(drive.folders_created(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_resolution_creates_one_folder() {
        let drive = Arc::new(FakeDrive::default().with_latency(Duration::from_millis(20)));
        let resolver = Arc::new(FolderResolver::new(drive.clone()));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let resolver = Arc::clone(&resolver);
                tokio::spawn(async move { resolver.resolve_or_create("Account", "root").await })
            })
            .collect();

        let ids: Vec<String> = futures::future::join_all(tasks)
            .await
            .into_iter()
            .map(|r| r.unwrap().unwrap())
            .collect();

        assert!(ids.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(drive.folders_created(), 1);
        assert_eq!(resolver.pending_reservations(), 0);
    }

    #[tokio::test]
    async fn test_lookup_failure_releases_reservation() {
        let drive = Arc::new(FakeDrive::default());
        drive.fail_next_lookup();
        let resolver = FolderResolver::new(drive.clone());

        assert!(resolver.resolve_or_create("Account", "root").await.is_err());
        assert_eq!(resolver.pending_reservations(), 0);
        assert!(resolver.resolve_or_create("Account", "root").await.is_ok());
    }

    #[tokio::test]
    async fn test_cancelled_lookup_releases_reservation() {
        let drive = Arc::new(FakeDrive::default().with_latency(Duration::from_millis(200)));
        let resolver = FolderResolver::new(drive.clone());

        let cancelled = tokio::time::timeout(
            Duration::from_millis(20),
            resolver.resolve_or_create("Account", "root"),
        )
        .await;

        assert!(cancelled.is_err());
        assert_eq!(resolver.pending_reservations(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_waiter_does_not_leak_reservation() {
        let drive = Arc::new(FakeDrive::default().with_latency(Duration::from_millis(100)));
        let resolver = FolderResolver::new(drive.clone());

        let (first, waiter) = tokio::join!(
            resolver.resolve_or_create("Account", "root"),
            tokio::time::timeout(
                Duration::from_millis(20),
                resolver.resolve_or_create("Account", "root"),
            ),
        );

        assert!(first.is_ok());
        assert!(waiter.is_err());
        assert_eq!(drive.folders_created(), 1);
        assert_eq!(resolver.pending_reservations(), 0);
    }
}
