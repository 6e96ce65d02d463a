//! # CLI Module
//!
//! Command implementations behind the `sfunits` binary.
//!
//! - [`serve`] - Loads the configuration and runs the web server until it stops.
//! - [`check`] - Validates the configuration and prints it, secret redacted,
//!   together with the Salesforce authorize URL it produces.
//!
//! Both report progress with the crate's console macros and terminate the
//! process through [`crate::error!`] on fatal start-up failures.
//!
//! ## Usage Patterns
//!
//! ```bash
//! sfunits check                  # Verify .env / environment
//! sfunits serve                  # Listen on SERVER_ADDRESS (default 0.0.0.0:5000)
//! sfunits serve --addr 127.0.0.1:8080 --open
//! ```

mod check;
mod serve;

pub use check::check;
pub use serve::serve;
