mod drive_file_dto;

pub use drive_file_dto::DriveFileResponseDto;
