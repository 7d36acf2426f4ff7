mod upload_dto;

pub use upload_dto::{DispatchSummaryDto, FileVersionNotificationDto, FileVersionRefDto};
