//! Configuration of PPO agent.
use crate::{opt::OptimizerConfig, Device};
use anyhow::Result;
use dagppo_core::TrainerConfig;
use log::info;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`Ppo`](super::Ppo) agent.
///
/// `C` is the configuration of the actor-critic network.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct PpoConfig<C> {
    /// Configuration of the actor-critic network.
    pub model_config: C,

    /// Optimizer of the actor and critic heads.
    pub opt_config: OptimizerConfig,

    /// Learning rate of the state encoder relative to the heads.
    pub encoder_lr_scale: f64,

    /// Numbers of updates after which the learning rates decay.
    pub lr_milestones: Vec<usize>,

    /// Decay factor of the learning rates at each milestone.
    pub lr_decay: f64,

    /// Discount factor.
    pub gamma: f64,

    /// Clip range of the probability ratio.
    pub eps_clip: f64,

    /// Number of optimization epochs per update.
    pub k_epochs: usize,

    /// Weight of the entropy bonus.
    pub entropy_coef: f64,

    /// Seed of the action sampler and of the device.
    pub seed: Option<u64>,

    /// Device of the networks, CPU if not given.
    pub device: Option<Device>,
}

impl<C: Default> Default for PpoConfig<C> {
    fn default() -> Self {
        Self {
            model_config: C::default(),
            opt_config: OptimizerConfig::default(),
            encoder_lr_scale: 0.1,
            lr_milestones: vec![],
            lr_decay: 0.1,
            gamma: 0.99,
            eps_clip: 0.2,
            k_epochs: 4,
            entropy_coef: 0.01,
            seed: None,
            device: None,
        }
    }
}

impl<C> PpoConfig<C>
where
    C: Serialize + serde::de::DeserializeOwned,
{
    /// Derives the agent configuration from the options of a training run.
    ///
    /// Milestones given in timesteps are converted into numbers of updates.
    pub fn from_trainer_config(model_config: C, config: &TrainerConfig) -> Self {
        Self {
            model_config,
            opt_config: OptimizerConfig::adam_with_betas(config.learning_rate, config.betas),
            encoder_lr_scale: 0.1,
            lr_milestones: config.lr_milestones(),
            lr_decay: 0.1,
            gamma: config.gamma,
            eps_clip: config.eps_clip,
            k_epochs: config.k_epochs,
            entropy_coef: 0.01,
            seed: config.random_seed,
            device: None,
        }
    }

    /// Sets the number of optimization epochs per update.
    pub fn k_epochs(mut self, v: usize) -> Self {
        self.k_epochs = v;
        self
    }

    /// Sets the learning rate milestones in numbers of updates.
    pub fn lr_milestones(mut self, v: Vec<usize>) -> Self {
        self.lr_milestones = v;
        self
    }

    /// Sets the random seed.
    pub fn seed(mut self, v: u64) -> Self {
        self.seed = Some(v);
        self
    }

    /// Sets device.
    pub fn device(mut self, device: &candle_core::Device) -> Self {
        self.device = Some(device.into());
        self
    }

    /// Loads [`PpoConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path_ = path.as_ref().to_owned();
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        info!("Load config of PPO agent from {}", path_.display());
        Ok(b)
    }

    /// Saves [`PpoConfig`] to YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path_ = path.as_ref().to_owned();
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        info!("Save config of PPO agent into {}", path_.display());
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::node_scoring_net::NodeScoringNetConfig;
    use tempdir::TempDir;

    #[test]
    fn test_serde_ppo_config() -> Result<()> {
        let config = PpoConfig::<NodeScoringNetConfig>::default()
            .k_epochs(2)
            .lr_milestones(vec![3, 5])
            .seed(42);

        let dir = TempDir::new("ppo_config")?;
        let path = dir.path().join("ppo_config.yaml");
        config.save(&path)?;
        let config_ = PpoConfig::<NodeScoringNetConfig>::load(&path)?;
        assert_eq!(config, config_);
        Ok(())
    }

    #[test]
    fn test_from_trainer_config() {
        let trainer_config = TrainerConfig {
            learning_rate: 0.01,
            lr_steps: vec![4000, 8000],
            update_timestep: 2000,
            random_seed: Some(7),
            ..Default::default()
        };
        let config =
            PpoConfig::from_trainer_config(NodeScoringNetConfig::default(), &trainer_config);

        assert_eq!(config.lr_milestones, vec![2, 4]);
        assert_eq!(config.opt_config.get_learning_rate(), 0.01);
        assert_eq!(config.k_epochs, 4);
        assert_eq!(config.seed, Some(7));
    }
}
