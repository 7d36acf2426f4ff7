mod drive_file_table;

pub use drive_file_table::{DriveFileTable, TableState};
