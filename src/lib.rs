// src/lib.rs

pub mod storage;
pub mod integrity;
pub mod harness;
pub mod service;
pub mod app_state;
pub mod config;
pub mod logging;
