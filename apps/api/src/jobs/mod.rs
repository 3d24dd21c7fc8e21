pub mod engine;
pub mod handlers;
pub mod store;
