// Library surface for the CLI, headless drivers and integration tests.
// Presentation lives in main.rs; everything here is UI-agnostic.
pub mod app_dirs;
pub mod celebration;
pub mod config;
pub mod error;
pub mod export;
pub mod model;
pub mod record;
pub mod runtime;
pub mod store;
pub mod timing;
pub mod tracker;
pub mod util;
pub mod validation;

pub use error::{CommuteError, Result};
pub use tracker::Tracker;
