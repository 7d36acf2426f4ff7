mod drive_file_handler;

pub use drive_file_handler::*;
