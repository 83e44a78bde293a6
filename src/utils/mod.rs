pub mod errors;
pub mod state_token;

pub use errors::ExportError;
pub use state_token::StateToken;
