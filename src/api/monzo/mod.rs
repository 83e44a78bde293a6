pub mod client;
pub mod models;

pub use client::MonzoClient;
pub use models::{Account, ApiError};
