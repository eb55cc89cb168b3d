//! Proximal policy optimization (PPO) agent.
mod base;
mod config;
pub use base::{clipped_surrogate, Ppo};
pub use config::PpoConfig;
