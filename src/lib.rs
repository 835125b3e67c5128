//! Photo-based meal recognition: a user uploads a photo of a meal and gets
//! back a dish name, per-ingredient macro estimates and totals.

pub mod app;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod images;
pub mod nutrition;
pub mod quota;
pub mod scan;
pub mod state;
pub mod storage;
pub mod vision;
