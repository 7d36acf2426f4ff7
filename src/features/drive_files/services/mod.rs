mod drive_file_service;

pub use drive_file_service::DriveFileService;
