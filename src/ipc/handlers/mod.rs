pub mod accounts;
pub mod admin;
pub mod core;
pub mod predictions;
pub mod submissions;
