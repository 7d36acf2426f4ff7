mod upload_service;
mod upload_trigger_service;

pub use upload_service::UploadService;
pub use upload_trigger_service::UploadTriggerService;
