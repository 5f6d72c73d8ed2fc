// src/lib.rs

//! Scoopi: documentation site to Markdown scooper library

pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
