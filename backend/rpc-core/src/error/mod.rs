pub mod config;
pub mod handler;
pub mod identity;
pub mod server;
pub mod session;

pub use config::ConfigError;
pub use handler::HandlerError;
pub use identity::IdentityError;
pub use server::ServerError;
pub use session::SessionError;
