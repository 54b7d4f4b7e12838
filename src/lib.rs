pub mod api;
pub mod app;
pub mod browser;
pub mod config;
pub mod editor_core;
pub mod logging;
pub mod page_link;
pub mod shortcuts;
pub mod tags;
