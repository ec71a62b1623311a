//! API endpoint modules.

pub mod applications;
pub mod health;

pub use applications::configure_routes as configure_application_routes;
pub use health::configure_health_routes;
