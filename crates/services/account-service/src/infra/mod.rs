//! Infrastructure layer - database, event transport and billing.

mod billing;
mod db;
pub mod events;
pub mod migrations;

pub use billing::{BillingGateway, LoggingBillingGateway};
#[cfg(any(test, feature = "test-utils"))]
pub use billing::MockBillingGateway;
pub use db::Database;
#[cfg(any(test, feature = "test-utils"))]
pub use events::MockEventSink;
pub use events::{BroadcastEventSink, EventSink, RedisEventSink, TracingEventSink};
pub use migrations::Migrator;
