// Library surface for the experiment engine, headless/integration tests and reuse.
// The terminal front end in main.rs only talks to `driver`, `export` and `survey`.
pub mod app_dirs;
pub mod clock;
pub mod config;
pub mod driver;
pub mod error;
pub mod export;
pub mod logging;
pub mod runtime;
pub mod scheduler;
pub mod scoring;
pub mod sequence;
pub mod session;
pub mod survey;
pub mod trial;
pub mod util;

pub use error::{Error, Result};
