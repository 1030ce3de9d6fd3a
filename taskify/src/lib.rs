//! `Taskify`: collaborative task board client engine.

pub mod app;
pub mod board;
pub mod cli;
pub mod config;
pub mod feed;
pub mod store;
