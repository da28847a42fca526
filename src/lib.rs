//! Claude usage monitor: polls claude.ai for session and weekly utilization
//! and surfaces it in an overlay, tray labels and desktop notifications.

pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod cookies;
pub mod hotkeys;
pub mod logging;
pub mod paths;
pub mod platform;
pub mod poller;
pub mod presentation;
