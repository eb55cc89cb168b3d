//! PPO agent for task-graph scheduling implemented with
//! [candle](https://crates.io/crates/candle-core).
//!
//! The agent [`Ppo`](ppo::Ppo) implements [`dagppo_core::Agent`] and is
//! trained by [`dagppo_core::Trainer`]. The network architecture is given by a
//! type implementing [`ActorCritic`](model::ActorCritic);
//! [`NodeScoringNet`](node_scoring_net::NodeScoringNet) is a small reference
//! implementation.
pub mod dist;
pub mod lr_scheduler;
pub mod mlp;
pub mod model;
pub mod node_scoring_net;
pub mod opt;
pub mod ppo;
pub mod util;
use anyhow::Result;
use candle_core::DeviceLocation;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Copy, Deserialize, Serialize, PartialEq)]
/// Device for using candle.
///
/// This enum is added because [`candle_core::Device`] does not support serialization.
pub enum Device {
    /// The main CPU device.
    Cpu,

    /// The GPU device of the given ordinal.
    Cuda(usize),

    /// The Metal device of the given ordinal.
    Metal(usize),
}

impl From<&candle_core::Device> for Device {
    fn from(device: &candle_core::Device) -> Self {
        match device.location() {
            DeviceLocation::Cpu => Self::Cpu,
            DeviceLocation::Cuda { gpu_id } => Self::Cuda(gpu_id),
            DeviceLocation::Metal { gpu_id } => Self::Metal(gpu_id),
        }
    }
}

impl Device {
    /// Opens the device.
    pub fn open(self) -> Result<candle_core::Device> {
        Ok(match self {
            Self::Cpu => candle_core::Device::Cpu,
            Self::Cuda(n) => candle_core::Device::new_cuda(n)?,
            Self::Metal(n) => candle_core::Device::new_metal(n)?,
        })
    }
}
