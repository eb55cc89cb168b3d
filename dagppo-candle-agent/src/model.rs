//! Interface of actor-critic networks and parameter snapshots.
use crate::{dist::Categorical, util::lock_vars};
use anyhow::{anyhow, Result};
use candle_core::{DType, Device, Tensor, Var};
use candle_nn::{VarBuilder, VarMap};
use dagppo_core::{Sampled, TaskId};
use log::info;
use rand::Rng;
use serde::{de::DeserializeOwned, Serialize};
use std::{fmt::Debug, path::Path};

/// Prefix of the names of the variables in the state encoder.
///
/// The encoder is trained with its own learning rate.
pub const ENCODER_PREFIX: &str = "encoder.";

/// Actor-critic network over task-graph states.
///
/// The network does not own its [`VarMap`]. Variables of the state encoder
/// must be created under `vb.pp("encoder")`.
pub trait ActorCritic<S>: Sized {
    /// Configuration from which the network is constructed.
    type Config: Clone + Debug + PartialEq + Serialize + DeserializeOwned;

    /// Builds the network with [`VarBuilder`].
    fn build(vb: VarBuilder, config: &Self::Config) -> Result<Self>;

    /// Scores the candidates of each state.
    ///
    /// Returns, per state, a 1-dimensional tensor of log-probabilities over
    /// the candidates in the given order, and a tensor of shape `[n]` of
    /// state values.
    fn forward(&self, states: &[S], candidates: &[Vec<TaskId>]) -> Result<(Vec<Tensor>, Tensor)>;
}

/// Output of [`PolicySnapshot::evaluate`], each of shape `[n]`.
pub struct Evaluation {
    /// Log-probabilities of the given actions.
    pub logprobs: Tensor,

    /// State values.
    pub values: Tensor,

    /// Entropies of the action distributions.
    pub entropy: Tensor,
}

/// A set of network parameters together with the network reading them.
pub struct PolicySnapshot<M> {
    varmap: VarMap,
    model: M,
    device: Device,
}

fn position(candidates: &[TaskId], act: TaskId) -> Result<usize> {
    candidates
        .iter()
        .position(|c| *c == act)
        .ok_or_else(|| anyhow!("Task {} is not a candidate of {:?}", act, candidates))
}

impl<M> PolicySnapshot<M> {
    /// Builds a snapshot with freshly initialized parameters.
    pub fn build<S>(config: &M::Config, device: &Device) -> Result<Self>
    where
        M: ActorCritic<S>,
    {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);
        let model = M::build(vb, config)?;

        Ok(Self {
            varmap,
            model,
            device: device.clone(),
        })
    }

    /// The variables of the snapshot.
    pub fn varmap(&self) -> &VarMap {
        &self.varmap
    }

    /// The device of the parameters.
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Variables of the state encoder and of the other parts, in this order.
    pub fn param_groups(&self) -> Result<(Vec<Var>, Vec<Var>)> {
        let data = lock_vars(&self.varmap)?;
        let (encoder, heads): (Vec<_>, Vec<_>) = data
            .iter()
            .partition(|(name, _)| name.starts_with(ENCODER_PREFIX));
        let strip = |vs: Vec<(&String, &Var)>| -> Vec<Var> {
            vs.into_iter().map(|(_, v)| v.clone()).collect()
        };

        Ok((strip(encoder), strip(heads)))
    }

    /// Samples an action for each state.
    pub fn act<S, R: Rng>(
        &self,
        states: &[S],
        candidates: &[Vec<TaskId>],
        rng: &mut R,
    ) -> Result<Sampled>
    where
        M: ActorCritic<S>,
    {
        let (log_probs, _) = self.model.forward(states, candidates)?;
        let mut sampled = Sampled {
            actions: Vec::with_capacity(states.len()),
            logprobs: Vec::with_capacity(states.len()),
        };

        for (lp, cands) in log_probs.into_iter().zip(candidates.iter()) {
            let dist = Categorical::from_log_probs(lp);
            let ix = dist.sample(rng)?;
            sampled.actions.push(cands[ix]);
            sampled.logprobs.push(dist.log_prob(ix)?.to_scalar::<f32>()?);
        }

        Ok(sampled)
    }

    /// Scores the given actions, tracking gradients.
    pub fn evaluate<S>(
        &self,
        states: &[S],
        candidates: &[Vec<TaskId>],
        actions: &[TaskId],
    ) -> Result<Evaluation>
    where
        M: ActorCritic<S>,
    {
        let (log_probs, values) = self.model.forward(states, candidates)?;
        let mut logprobs = Vec::with_capacity(actions.len());
        let mut entropy = Vec::with_capacity(actions.len());

        for ((lp, cands), act) in log_probs.into_iter().zip(candidates.iter()).zip(actions) {
            let dist = Categorical::from_log_probs(lp);
            logprobs.push(dist.log_prob(position(cands, *act)?)?);
            entropy.push(dist.entropy()?);
        }

        Ok(Evaluation {
            logprobs: Tensor::stack(&logprobs, 0)?,
            values,
            entropy: Tensor::stack(&entropy, 0)?,
        })
    }

    /// State values without gradient.
    pub fn values<S>(&self, states: &[S], candidates: &[Vec<TaskId>]) -> Result<Vec<f32>>
    where
        M: ActorCritic<S>,
    {
        let (_, values) = self.model.forward(states, candidates)?;
        Ok(values.detach().to_vec1()?)
    }

    /// Saves the parameters in safetensors format.
    pub fn save(&self, path: &Path) -> Result<()> {
        self.varmap.save(path)?;
        info!("Save policy parameters to {:?}", path);
        Ok(())
    }

    /// Loads the parameters saved by [`PolicySnapshot::save`].
    pub fn load(&mut self, path: &Path) -> Result<()> {
        self.varmap.load(path)?;
        info!("Load policy parameters from {:?}", path);
        Ok(())
    }
}
