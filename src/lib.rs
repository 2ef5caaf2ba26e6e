//! Multi-unit member sync and leaderboard
//!
//! - [`sync`] pulls every unit's members API into one cached snapshot per unit
//! - [`aggregation`] ranks members across units from the cache or live API
//! - [`config`] loads runtime settings from the environment

pub mod aggregation;
pub mod config;
pub mod sync;

#[cfg(test)]
mod test_support;
