mod drive_file;

pub use drive_file::{CreateDriveFile, DriveFile};
