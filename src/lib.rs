pub mod clipboard;
pub mod common;
pub mod history;
pub mod services;
pub mod ui;
pub mod upload;
