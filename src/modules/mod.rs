pub mod crm;
pub mod drive;
pub mod oauth;
