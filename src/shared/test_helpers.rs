//! In-memory stand-ins for the CRM, Drive, the metadata table and the
//! dispatcher, plus a local HTTP server for exercising the REST clients.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::drive_files::models::{CreateDriveFile, DriveFile};
use crate::features::drive_files::repositories::DriveFileRepository;
use crate::features::uploads::workers::{UploadDispatcher, UploadJob};
use crate::modules::crm::{CrmApi, FileVersion};
use crate::modules::drive::{DriveApi, FileUpload, UploadedFile};

/// Serve `app` on an ephemeral local port and return its base URL
pub async fn spawn_test_server(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// `invoice.pdf`, belonging to content document `069A`
pub fn invoice_version(id: &str) -> FileVersion {
    FileVersion {
        id: id.to_string(),
        title: "invoice".to_string(),
        file_extension: Some("pdf".to_string()),
        path_on_client: Some("invoice.pdf".to_string()),
        content_document_id: "069A".to_string(),
    }
}

#[derive(Default)]
pub struct FakeCrm {
    files: HashMap<String, (FileVersion, Vec<u8>)>,
    object_types: HashMap<String, String>,
    links: HashMap<String, Vec<String>>,
    failing_links: HashSet<String>,
    content_failures: AtomicUsize,
    content_fetches: AtomicUsize,
}

impl FakeCrm {
    pub fn with_file(mut self, version: FileVersion, content: Vec<u8>) -> Self {
        self.files.insert(version.id.clone(), (version, content));
        self
    }

    pub fn with_object_type(mut self, record_id: &str, object_type: &str) -> Self {
        self.object_types
            .insert(record_id.to_string(), object_type.to_string());
        self
    }

    pub fn with_links(mut self, content_document_id: &str, entity_ids: &[&str]) -> Self {
        self.links.insert(
            content_document_id.to_string(),
            entity_ids.iter().map(|id| id.to_string()).collect(),
        );
        self
    }

    pub fn with_failing_links(mut self, content_document_id: &str) -> Self {
        self.failing_links.insert(content_document_id.to_string());
        self
    }

    /// Make the next `n` content fetches fail
    pub fn fail_content_fetches(&self, n: usize) {
        self.content_failures.store(n, Ordering::SeqCst);
    }

    pub fn content_fetches(&self) -> usize {
        self.content_fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CrmApi for FakeCrm {
    async fn linked_entity_ids(&self, content_document_id: &str) -> Result<Vec<String>> {
        if self.failing_links.contains(content_document_id) {
            return Err(AppError::ExternalServiceError("CRM unavailable".to_string()));
        }
        Ok(self
            .links
            .get(content_document_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_file_version(&self, file_version_id: &str) -> Result<FileVersion> {
        self.files
            .get(file_version_id)
            .map(|(version, _)| version.clone())
            .ok_or_else(|| AppError::NotFound(format!("file version {}", file_version_id)))
    }

    async fn get_file_content(&self, file_version_id: &str) -> Result<Vec<u8>> {
        self.content_fetches.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .content_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(AppError::ExternalServiceError("CRM timed out".to_string()));
        }

        self.files
            .get(file_version_id)
            .map(|(_, content)| content.clone())
            .ok_or_else(|| AppError::NotFound(format!("file version {}", file_version_id)))
    }

    async fn object_type_of(&self, record_id: &str) -> Result<String> {
        self.object_types
            .get(record_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("record {}", record_id)))
    }
}

struct FakeFolder {
    id: String,
    name: String,
    parent_id: String,
}

/// Drive double: creating a folder always adds a new one, duplicates included
#[derive(Default)]
pub struct FakeDrive {
    latency: Duration,
    folders: Mutex<Vec<FakeFolder>>,
    uploads: Mutex<Vec<FileUpload>>,
    next_id: AtomicUsize,
    fail_next_lookup: AtomicBool,
    fail_uploads: AtomicBool,
}

impl FakeDrive {
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn fail_next_lookup(&self) {
        self.fail_next_lookup.store(true, Ordering::SeqCst);
    }

    pub fn fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    pub fn folders_created(&self) -> usize {
        self.folders.lock().unwrap().len()
    }

    pub fn folder_id(&self, name: &str, parent_id: &str) -> Option<String> {
        self.folders
            .lock()
            .unwrap()
            .iter()
            .find(|f| f.name == name && f.parent_id == parent_id)
            .map(|f| f.id.clone())
    }

    pub fn uploads(&self) -> Vec<FileUpload> {
        self.uploads.lock().unwrap().clone()
    }

    fn next_id(&self, kind: &str) -> String {
        format!("{}-{}", kind, self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    async fn wait(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

#[async_trait]
impl DriveApi for FakeDrive {
    async fn find_folder(&self, name: &str, parent_id: &str) -> Result<Option<String>> {
        self.wait().await;
        if self.fail_next_lookup.swap(false, Ordering::SeqCst) {
            return Err(AppError::ExternalServiceError("Drive lookup failed".to_string()));
        }
        Ok(self.folder_id(name, parent_id))
    }

    async fn create_folder(&self, name: &str, parent_id: &str) -> Result<String> {
        self.wait().await;
        let id = self.next_id("folder");
        self.folders.lock().unwrap().push(FakeFolder {
            id: id.clone(),
            name: name.to_string(),
            parent_id: parent_id.to_string(),
        });
        Ok(id)
    }

    async fn upload_file(&self, upload: FileUpload) -> Result<UploadedFile> {
        self.wait().await;
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(AppError::ExternalServiceError("Drive upload failed".to_string()));
        }
        let id = self.next_id("file");
        self.uploads.lock().unwrap().push(upload);
        Ok(UploadedFile {
            web_view_link: format!("https://drive.google.com/file/d/{}/view", id),
            id,
        })
    }
}

#[derive(Default)]
pub struct InMemoryDriveFileRepository {
    rows: Mutex<Vec<DriveFile>>,
    sequence: AtomicUsize,
    queries: AtomicUsize,
    fail_queries: AtomicBool,
}

impl InMemoryDriveFileRepository {
    /// Insert a row with a fixed upload time
    pub fn seed(&self, file: CreateDriveFile, uploaded_at: DateTime<Utc>) -> DriveFile {
        let row = DriveFile {
            id: Uuid::new_v4(),
            name: format!("DF-{:06}", self.sequence.fetch_add(1, Ordering::SeqCst) + 1),
            file_name: file.file_name,
            drive_file_id: file.drive_file_id,
            drive_link: file.drive_link,
            related_record_id: file.related_record_id,
            uploaded_at,
        };
        self.rows.lock().unwrap().push(row.clone());
        row
    }

    pub fn rows(&self) -> Vec<DriveFile> {
        self.rows.lock().unwrap().clone()
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn fail_queries(&self, fail: bool) {
        self.fail_queries.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl DriveFileRepository for InMemoryDriveFileRepository {
    async fn insert(&self, file: CreateDriveFile) -> Result<DriveFile> {
        Ok(self.seed(file, Utc::now()))
    }

    async fn find_by_record(&self, related_record_id: &str) -> Result<Vec<DriveFile>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(AppError::Database(sqlx::Error::PoolTimedOut));
        }

        let mut rows: Vec<DriveFile> = self
            .rows()
            .into_iter()
            .filter(|row| row.related_record_id == related_record_id)
            .collect();
        rows.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(rows)
    }
}

#[derive(Default)]
pub struct RecordingDispatcher {
    jobs: Mutex<Vec<UploadJob>>,
}

impl RecordingDispatcher {
    pub fn jobs(&self) -> Vec<UploadJob> {
        self.jobs.lock().unwrap().clone()
    }
}

impl UploadDispatcher for RecordingDispatcher {
    fn dispatch(&self, job: UploadJob) {
        self.jobs.lock().unwrap().push(job);
    }
}
