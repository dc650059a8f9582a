//! HTTP surface for the docqa retrieval-augmented question answering
//! service: JSON endpoints for querying and document management, an SSE
//! streaming endpoint, and an embedded chat UI.

pub mod error;
pub mod routes;
pub mod state;
pub mod ui;

pub use routes::app;
pub use state::AppState;
