// Library surface for headless/integration tests and reuse.
// Keep this lean to avoid coupling to bin-only types in main.rs.
pub mod app_dirs;
pub mod catalog;
pub mod clock;
pub mod engine;
pub mod error;
pub mod grouping;
pub mod items;
pub mod ledger;
pub mod progression;
pub mod rest_timer;
pub mod runtime;
pub mod session;
pub mod storage;
