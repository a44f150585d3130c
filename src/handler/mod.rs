//! Request handler module
//!
//! Routes requests to the catalogue endpoints or the fallback router.

pub mod pokemon;
pub mod router;

// Re-export main entry point
pub use router::handle_request;
