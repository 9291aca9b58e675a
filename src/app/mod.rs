pub mod errors;
pub mod file_tree;
pub mod filter;
pub mod index;
pub mod panel;
pub mod persist;
pub mod refresh;
pub mod repos;
pub mod review;
mod state;
pub mod store;

pub use state::{App, ConfirmAction, Focus, InputMode};
