mod drive_file_repository;

pub use drive_file_repository::{DriveFileRepository, PgDriveFileRepository};
