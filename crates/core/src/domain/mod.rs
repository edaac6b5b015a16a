pub mod context;
pub mod profile;
pub mod quotation;
pub mod reply;
