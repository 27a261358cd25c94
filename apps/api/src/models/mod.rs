pub mod request;
pub mod result;
