//! Headless real-time notification client for the Inkbridge marketplace.

pub mod bootstrap;
pub mod config;
pub mod console;
pub mod coordinator;
pub mod navigation;
pub mod shutdown;

pub use bootstrap::{Services, build_services, init_foundation, start_coordinator};
pub use coordinator::{Coordinator, NotificationCenter, NotificationProvider, NotificationSnapshot};
