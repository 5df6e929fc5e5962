//! HTTP API handlers

pub mod health;
pub mod scan;
pub mod ui;

pub use health::health_routes;
pub use scan::scan_routes;
pub use ui::ui_routes;
