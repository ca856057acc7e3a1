pub mod app;
pub mod archive;
pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod fs_util;
pub mod hub;
pub mod output;
pub mod processor;
pub mod store;
pub mod tui;
