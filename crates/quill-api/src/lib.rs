pub mod admin;
pub mod assets;
pub mod auth;
pub mod error;
pub mod logs;
pub mod middleware;
pub mod pipeline;
pub mod posts;
pub mod profile;
pub mod router;
pub mod session;
pub mod state;
pub mod token;

pub use router::router;
pub use state::{AppState, AppStateInner};
