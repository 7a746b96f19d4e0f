//! Desktop client that turns a PDF into an audiobook by driving a remote
//! processing backend, then plays the result.

pub mod api;
pub mod app;
pub mod config;
pub mod pipeline;
pub mod playback;
pub mod status;
pub mod usage;
