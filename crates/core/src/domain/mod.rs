pub mod business;
pub mod message;
pub mod reply;
