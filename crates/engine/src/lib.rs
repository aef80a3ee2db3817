//! Trailwise Engine library.
//!
//! Server-side code for the backcountry survival coach.
//!
//! ## Structure
//!
//! - `use_cases/` - Scenario generation, choice evaluation, analysis, coach chat and the game coordinator
//! - `infrastructure/` - External dependency implementations (ports + adapters)
//! - `api/` - HTTP entry points
//! - `app` - Application composition

pub mod api;
pub mod app;
pub mod infrastructure;
pub mod use_cases;

/// Shared test doubles.
#[cfg(test)]
pub mod test_fixtures;

pub use app::App;
