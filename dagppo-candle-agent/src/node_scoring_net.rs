//! A small actor-critic network scoring candidate nodes of a task graph.
use crate::{
    mlp::{Mlp, MlpConfig},
    model::ActorCritic,
};
use anyhow::{bail, Result};
use candle_core::{DType, Device, Tensor, D};
use candle_nn::VarBuilder;
use dagppo_core::{TaskId, TrainerConfig};
use serde::{Deserialize, Serialize};

/// States exposing raw features of the nodes of a task graph.
pub trait NodeFeatures {
    /// Number of nodes.
    fn n_nodes(&self) -> usize;

    /// Node features, row-major of shape `[n_nodes, feature_dim]`.
    fn node_features(&self) -> Vec<f32>;
}

/// Configuration of [`NodeScoringNet`].
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct NodeScoringNetConfig {
    /// Dimension of raw node features.
    pub feature_dim: usize,

    /// Dimension of node embeddings.
    pub emb_dim: usize,

    /// Hidden units of the encoder, the actor and the critic.
    pub units: Vec<usize>,
}

impl Default for NodeScoringNetConfig {
    fn default() -> Self {
        Self {
            feature_dim: 4,
            emb_dim: 16,
            units: vec![32],
        }
    }
}

impl NodeScoringNetConfig {
    /// Takes the width of embeddings from the trainer configuration.
    pub fn from_trainer_config(feature_dim: usize, config: &TrainerConfig) -> Self {
        Self {
            feature_dim,
            emb_dim: config.node_output_size,
            units: vec![2 * config.node_output_size],
        }
    }
}

/// Actor-critic network scoring the candidate nodes of a task graph.
///
/// * The encoder maps each node's features to an embedding.
/// * The graph embedding is the mean of the node embeddings.
/// * The actor scores each candidate from its embedding concatenated with
///   the graph embedding.
/// * The critic maps the graph embedding to a state value.
pub struct NodeScoringNet {
    config: NodeScoringNetConfig,
    device: Device,
    encoder: Mlp,
    actor: Mlp,
    critic: Mlp,
}

impl NodeScoringNet {
    fn forward_one<S: NodeFeatures>(
        &self,
        state: &S,
        candidates: &[TaskId],
    ) -> Result<(Tensor, Tensor)> {
        let n = state.n_nodes();
        if let Some(c) = candidates.iter().find(|c| **c >= n) {
            bail!("Candidate {} is not a node of a graph of {} nodes", c, n);
        }

        let xs = Tensor::from_vec(
            state.node_features(),
            (n, self.config.feature_dim),
            &self.device,
        )?;
        let node_emb = self.encoder.forward(&xs)?;
        let graph_emb = node_emb.mean_keepdim(0)?;

        let ids: Vec<u32> = candidates.iter().map(|c| *c as u32).collect();
        let ids = Tensor::from_vec(ids, candidates.len(), &self.device)?;
        let cand_emb = node_emb.index_select(&ids, 0)?;
        let graph_emb_ = graph_emb.broadcast_as(cand_emb.shape())?;
        let logits = self
            .actor
            .forward(&Tensor::cat(&[&cand_emb, &graph_emb_], D::Minus1)?)?
            .squeeze(D::Minus1)?;
        let log_probs = candle_nn::ops::log_softmax(&logits, D::Minus1)?;
        let value = self.critic.forward(&graph_emb)?.reshape(())?;

        Ok((log_probs, value))
    }
}

impl<S: NodeFeatures> ActorCritic<S> for NodeScoringNet {
    type Config = NodeScoringNetConfig;

    fn build(vb: VarBuilder, config: &Self::Config) -> Result<Self> {
        let d = config.emb_dim;
        let units = config.units.clone();
        let encoder = Mlp::build(
            vb.pp("encoder"),
            MlpConfig::new(config.feature_dim, units.clone(), d, true),
        )?;
        let actor = Mlp::build(vb.pp("actor"), MlpConfig::new(2 * d, units.clone(), 1, false))?;
        let critic = Mlp::build(vb.pp("critic"), MlpConfig::new(d, units, 1, false))?;

        Ok(Self {
            config: config.clone(),
            device: vb.device().clone(),
            encoder,
            actor,
            critic,
        })
    }

    fn forward(&self, states: &[S], candidates: &[Vec<TaskId>]) -> Result<(Vec<Tensor>, Tensor)> {
        let mut log_probs = Vec::with_capacity(states.len());
        let mut values = Vec::with_capacity(states.len());

        for (state, cands) in states.iter().zip(candidates.iter()) {
            let (lp, v) = self.forward_one(state, cands)?;
            log_probs.push(lp);
            values.push(v);
        }

        let values = match values.is_empty() {
            true => Tensor::zeros(0, DType::F32, &self.device)?,
            false => Tensor::stack(&values, 0)?,
        };

        Ok((log_probs, values))
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use crate::model::PolicySnapshot;
    use rand::{rngs::SmallRng, SeedableRng};

    /// A graph with `n` nodes whose features are `[i, 1, 0, 0]` for node `i`.
    #[derive(Clone, Debug)]
    pub struct ChainGraph(pub usize);

    impl NodeFeatures for ChainGraph {
        fn n_nodes(&self) -> usize {
            self.0
        }

        fn node_features(&self) -> Vec<f32> {
            (0..self.0).flat_map(|i| [i as f32, 1.0, 0.0, 0.0]).collect()
        }
    }

    #[test]
    fn test_forward_shapes() -> Result<()> {
        let policy = PolicySnapshot::<NodeScoringNet>::build::<ChainGraph>(
            &NodeScoringNetConfig::default(),
            &Device::Cpu,
        )?;
        let states = vec![ChainGraph(5), ChainGraph(3)];
        let candidates = vec![vec![0, 2, 4], vec![1]];
        let eval = policy.evaluate(&states, &candidates, &[4, 1])?;

        assert_eq!(eval.logprobs.dims(), &[2]);
        assert_eq!(eval.values.dims(), &[2]);
        // The only candidate is chosen with probability one.
        let lp: Vec<f32> = eval.logprobs.to_vec1()?;
        assert!(lp[1].abs() < 1e-6);
        let h: Vec<f32> = eval.entropy.to_vec1()?;
        assert!(h[0] > 0.0 && h[0] <= 3f32.ln() + 1e-5);
        Ok(())
    }

    #[test]
    fn test_act_picks_candidates() -> Result<()> {
        let policy = PolicySnapshot::<NodeScoringNet>::build::<ChainGraph>(
            &NodeScoringNetConfig::default(),
            &Device::Cpu,
        )?;
        let mut rng = SmallRng::seed_from_u64(0);
        let states = vec![ChainGraph(6); 3];
        let candidates = vec![vec![1, 3], vec![5], vec![0, 2, 4]];
        let sampled = policy.act(&states, &candidates, &mut rng)?;

        for (a, c) in sampled.actions.iter().zip(candidates.iter()) {
            assert!(c.contains(a));
        }
        assert!(sampled.logprobs.iter().all(|lp| *lp <= 0.0));
        Ok(())
    }

    #[test]
    fn test_invalid_candidate() -> Result<()> {
        let policy = PolicySnapshot::<NodeScoringNet>::build::<ChainGraph>(
            &NodeScoringNetConfig::default(),
            &Device::Cpu,
        )?;
        assert!(policy.values(&[ChainGraph(2)], &[vec![2]]).is_err());
        assert!(policy
            .evaluate(&[ChainGraph(4)], &[vec![0, 1]], &[3])
            .is_err());
        Ok(())
    }

    #[test]
    fn test_encoder_param_group() -> Result<()> {
        let policy = PolicySnapshot::<NodeScoringNet>::build::<ChainGraph>(
            &NodeScoringNetConfig::default(),
            &Device::Cpu,
        )?;
        let (encoder, heads) = policy.param_groups()?;

        // Two linear layers in the encoder, two in each head
        assert_eq!(encoder.len(), 4);
        assert_eq!(heads.len(), 8);
        Ok(())
    }
}
