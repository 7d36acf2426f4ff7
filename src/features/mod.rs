pub mod drive_files;
pub mod uploads;
