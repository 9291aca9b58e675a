pub mod app;
pub mod config;
pub mod git;
pub mod graph;
pub mod ui;
pub mod watch;
