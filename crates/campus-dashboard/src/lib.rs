//! # campus-dashboard
//!
//! HTTP surface for the Campus admin actions.
//!
//! - `GET /healthz`
//! - `POST /api/{resource}` creates, `PUT` updates, `DELETE` (form body
//!   `id=...`) deletes
//!
//! Every action answers with the normalized result body
//! (`{"status":"ok"}` or `{"status":"error","kind":...,"message":...}`) and a
//! status code derived from the error kind.

pub mod error;
pub mod handlers;
pub mod principal;
pub mod routes;
pub mod server;
pub mod state;

pub use error::DashboardError;
pub use principal::Actor;
pub use routes::create_router;
pub use server::DashboardServer;
pub use state::AppState;
