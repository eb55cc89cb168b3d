//! Configuration of [`Trainer`](super::Trainer).
use crate::error::DagPpoError;
use anyhow::Result;
use log::info;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// Configuration of a training run.
///
/// All options live in one flat namespace. Options of the environment and
/// of the policy network are carried here too, so that a whole run is
/// described by a single YAML file. Unknown keys are rejected.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct TrainerConfig {
    /// Scheduler variant of the environment.
    pub scheduler_type: String,

    /// Resource limit of the machine pool.
    pub resource_limit: f32,

    /// If graph-level features are appended to node features.
    pub add_graph_features: bool,

    /// Number of task graphs merged into one scheduling instance.
    pub num_init_dags: usize,

    /// Discount factor.
    pub gamma: f64,

    /// Number of training samples.
    pub train_sample: usize,

    /// Number of evaluation samples.
    pub test_sample: usize,

    /// Search width of the evaluation decoder.
    pub search_size: usize,

    /// Learning rate of the actor and critic heads.
    pub learning_rate: f64,

    /// Timesteps at which the learning rate decays by a factor of 10.
    pub lr_steps: Vec<usize>,

    /// Moment coefficients of the Adam optimizer.
    pub betas: (f64, f64),

    /// Number of task graphs scheduled in parallel.
    pub batch_size: usize,

    /// Number of training episodes.
    pub max_episodes: usize,

    /// Maximum number of timesteps in an episode.
    pub max_timesteps: usize,

    /// Interval of policy updates in timesteps.
    pub update_timestep: usize,

    /// Number of optimization epochs per update.
    pub k_epochs: usize,

    /// Clip range of the probability ratio.
    pub eps_clip: f64,

    /// Size of the one-hot degree encoding of nodes, `0` to disable.
    pub one_hot_degree: usize,

    /// If the policy network uses batch normalization.
    pub batch_norm: bool,

    /// Width of node embeddings.
    pub node_output_size: usize,

    /// Number of layers of the state encoder.
    pub gnn_layers: usize,

    /// Random seed.
    pub random_seed: Option<u64>,

    /// Interval of evaluation in episodes.
    pub test_interval: usize,

    /// Interval of logging in episodes.
    pub log_interval: usize,

    /// Parameters loaded into the agent before training.
    pub test_model_weight: Option<String>,

    /// Directory checkpoints are saved into.
    pub model_dir: String,

    /// Number of environment workers, the available parallelism if not given.
    pub num_workers: Option<usize>,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            scheduler_type: "sft".to_string(),
            resource_limit: 600.0,
            add_graph_features: false,
            num_init_dags: 5,
            gamma: 0.99,
            train_sample: 50,
            test_sample: 50,
            search_size: 5,
            learning_rate: 0.002,
            lr_steps: vec![],
            betas: (0.9, 0.999),
            batch_size: 1,
            max_episodes: 50000,
            max_timesteps: 300,
            update_timestep: 2000,
            k_epochs: 4,
            eps_clip: 0.2,
            one_hot_degree: 0,
            batch_norm: false,
            node_output_size: 16,
            gnn_layers: 10,
            random_seed: None,
            test_interval: 500,
            log_interval: 100,
            test_model_weight: None,
            model_dir: ".".to_string(),
            num_workers: None,
        }
    }
}

impl TrainerConfig {
    /// Sets the number of parallel task graphs.
    pub fn batch_size(mut self, v: usize) -> Self {
        self.batch_size = v;
        self
    }

    /// Sets the number of training episodes.
    pub fn max_episodes(mut self, v: usize) -> Self {
        self.max_episodes = v;
        self
    }

    /// Sets the maximum number of timesteps in an episode.
    pub fn max_timesteps(mut self, v: usize) -> Self {
        self.max_timesteps = v;
        self
    }

    /// Sets the interval of policy updates in timesteps.
    pub fn update_timestep(mut self, v: usize) -> Self {
        self.update_timestep = v;
        self
    }

    /// Sets the discount factor.
    pub fn gamma(mut self, v: f64) -> Self {
        self.gamma = v;
        self
    }

    /// Sets the intervals of logging and evaluation in episodes.
    pub fn intervals(mut self, log_interval: usize, test_interval: usize) -> Self {
        self.log_interval = log_interval;
        self.test_interval = test_interval;
        self
    }

    /// Sets the directory of checkpoints.
    pub fn model_dir(mut self, v: impl Into<String>) -> Self {
        self.model_dir = v.into();
        self
    }

    /// Parses a YAML document.
    pub fn from_yaml(s: &str) -> Result<Self, DagPpoError> {
        serde_yaml::from_str(s).map_err(|e| DagPpoError::Config(e.to_string()))
    }

    /// Constructs [`TrainerConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let s = fs::read_to_string(path)
            .map_err(|e| DagPpoError::Config(format!("{}: {}", path.display(), e)))?;
        let config = Self::from_yaml(&s)?;
        info!("Load trainer config from {}", path.display());
        Ok(config)
    }

    /// Saves [`TrainerConfig`] as YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(&path, serde_yaml::to_string(&self)?)?;
        info!("Save trainer config into {}", path.as_ref().display());
        Ok(())
    }

    /// Learning rate milestones in number of updates.
    pub fn lr_milestones(&self) -> Vec<usize> {
        self.lr_steps
            .iter()
            .map(|s| s / self.update_timestep.max(1))
            .collect()
    }

    /// File name of a checkpoint reaching the given evaluation ratio.
    pub fn checkpoint_file_name(&self, ratio: f32) -> String {
        format!(
            "PPO_E2E_{}_dag_num{}_beam{}_ratio{:.4}.safetensors",
            self.scheduler_type, self.num_init_dags, self.search_size, ratio
        )
    }
}
