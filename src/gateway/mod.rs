//! Gateway server implementation

mod router;
mod server;

pub use router::{AppState, build_router};
pub use server::Gateway;
