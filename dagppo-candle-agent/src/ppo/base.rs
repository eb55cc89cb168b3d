//! PPO agent implemented with candle.
use super::PpoConfig;
use crate::{
    lr_scheduler::MultiStepLr,
    model::{ActorCritic, PolicySnapshot},
    opt::Optimizer,
    util::copy_params,
    Device,
};
use anyhow::Result;
use candle_core::Tensor;
use candle_nn::loss::mse;
use dagppo_core::{
    error::DagPpoError,
    normalize_returns,
    record::{Record, RecordValue},
    Agent, Policy, Sampled, TaskId, TrajectoryBuffer,
};
use log::{debug, trace};
use rand::{rngs::SmallRng, SeedableRng};
use std::{marker::PhantomData, path::Path};

/// Clipped surrogate objective of PPO, elementwise.
///
/// `min(ratio * adv, clamp(ratio, 1 - eps_clip, 1 + eps_clip) * adv)`.
pub fn clipped_surrogate(ratios: &Tensor, advantages: &Tensor, eps_clip: f64) -> Result<Tensor> {
    let surr1 = (ratios * advantages)?;
    let surr2 = (ratios.clamp(1.0 - eps_clip, 1.0 + eps_clip)? * advantages)?;
    Ok(surr1.minimum(&surr2)?)
}

/// PPO agent implemented with candle.
///
/// The agent holds two snapshots of the actor-critic network `M`. Rollouts
/// are sampled from the old one, while updates are applied to the current
/// one. At the end of every update the old snapshot is overwritten with the
/// current one; it is never written otherwise.
///
/// The state encoder and the heads are optimized with separate optimizers
/// sharing a single backward pass, the encoder with a scaled learning rate.
pub struct Ppo<M, S>
where
    M: ActorCritic<S>,
{
    policy: PolicySnapshot<M>,
    policy_old: PolicySnapshot<M>,
    opt: Optimizer,
    opt_encoder: Optimizer,
    lr_scheduler: MultiStepLr,
    encoder_lr_scale: f64,
    n_updates: usize,
    gamma: f64,
    eps_clip: f64,
    k_epochs: usize,
    entropy_coef: f64,
    rng: SmallRng,
    phantom: PhantomData<S>,
}

impl<M, S> Ppo<M, S>
where
    M: ActorCritic<S>,
    S: Clone,
{
    /// Constructs PPO agent.
    pub fn build(config: PpoConfig<M::Config>) -> Result<Self> {
        let device = config.device.unwrap_or(Device::Cpu).open()?;
        let rng = match config.seed {
            Some(seed) => {
                // The CPU backend has no seedable generator
                if !device.is_cpu() {
                    device.set_seed(seed)?;
                }
                SmallRng::seed_from_u64(seed)
            }
            None => SmallRng::from_entropy(),
        };

        let policy = PolicySnapshot::<M>::build::<S>(&config.model_config, &device)?;
        let policy_old = PolicySnapshot::<M>::build::<S>(&config.model_config, &device)?;
        copy_params(policy_old.varmap(), policy.varmap())?;

        let lr = config.opt_config.get_learning_rate();
        let (encoder_vars, head_vars) = policy.param_groups()?;
        let opt = config.opt_config.build(head_vars)?;
        let opt_encoder = config
            .opt_config
            .clone()
            .learning_rate(lr * config.encoder_lr_scale)
            .build(encoder_vars)?;

        let mut ppo = Self {
            policy,
            policy_old,
            opt,
            opt_encoder,
            lr_scheduler: MultiStepLr::new(lr, config.lr_milestones, config.lr_decay),
            encoder_lr_scale: config.encoder_lr_scale,
            n_updates: 0,
            gamma: config.gamma,
            eps_clip: config.eps_clip,
            k_epochs: config.k_epochs,
            entropy_coef: config.entropy_coef,
            rng,
            phantom: PhantomData,
        };
        ppo.apply_lr_schedule();

        Ok(ppo)
    }

    /// The snapshot under optimization.
    pub fn policy(&self) -> &PolicySnapshot<M> {
        &self.policy
    }

    /// The snapshot rollouts are sampled from.
    pub fn policy_old(&self) -> &PolicySnapshot<M> {
        &self.policy_old
    }

    /// Number of updates so far.
    pub fn n_updates(&self) -> usize {
        self.n_updates
    }

    fn apply_lr_schedule(&mut self) {
        let lr = self.lr_scheduler.get_lr(self.n_updates);
        self.opt.set_learning_rate(lr);
        self.opt_encoder.set_learning_rate(lr * self.encoder_lr_scale);
    }

    fn update_(&mut self, buffer: &TrajectoryBuffer<S>) -> Result<Record> {
        let device = self.policy.device().clone();
        let last = buffer.last().ok_or(DagPpoError::EmptyTrajectory)?;

        // Bootstrap returns with the value of the last recorded states
        let bootstrap = self.policy.values(&last.states, &last.candidates)?;
        let returns = buffer.discounted_returns(self.gamma as f32, &bootstrap)?;
        let returns = normalize_returns(&returns.concat());
        let n = returns.len();
        trace!("Update with {} samples", n);

        let flat = buffer.flatten();
        let returns = Tensor::from_vec(returns, n, &device)?;
        let old_logprobs = Tensor::from_vec(flat.logprobs, n, &device)?;
        let mut critic_loss_sum = 0f32;

        for epoch in 0..self.k_epochs {
            let eval = self
                .policy
                .evaluate(&flat.states, &flat.candidates, &flat.actions)?;
            let ratios = (&eval.logprobs - &old_logprobs)?.exp()?;

            // The advantage is not standardized
            let advantages = (&returns - eval.values.detach())?;
            let actor_loss = clipped_surrogate(&ratios, &advantages, self.eps_clip)?.neg()?;
            let critic_loss = mse(&eval.values, &returns)?;
            let entropy_reg = (eval.entropy * -self.entropy_coef)?;
            let loss = (actor_loss.broadcast_add(&critic_loss)? + entropy_reg)?.mean_all()?;

            let grads = loss.backward()?;
            self.opt.step(&grads)?;
            self.opt_encoder.step(&grads)?;

            let critic_loss = critic_loss.to_scalar::<f32>()?;
            debug!(
                "Epoch {}, loss {}, critic mse {}",
                epoch,
                loss.to_scalar::<f32>()?,
                critic_loss
            );
            critic_loss_sum += critic_loss;
        }

        self.n_updates += 1;
        self.apply_lr_schedule();
        copy_params(self.policy_old.varmap(), self.policy.varmap())?;

        Ok(Record::from_slice(&[(
            "critic_mse",
            RecordValue::Scalar(critic_loss_sum / self.k_epochs.max(1) as f32),
        )]))
    }
}

impl<M, S> Policy<S> for Ppo<M, S>
where
    M: ActorCritic<S>,
    S: Clone,
{
    /// Samples actions from the old snapshot.
    fn act(&mut self, states: &[S], candidates: &[Vec<TaskId>]) -> Result<Sampled> {
        self.policy_old.act(states, candidates, &mut self.rng)
    }
}

impl<M, S> Agent<S> for Ppo<M, S>
where
    M: ActorCritic<S>,
    S: Clone,
{
    fn update(&mut self, buffer: &TrajectoryBuffer<S>) -> Result<Record> {
        self.update_(buffer)
    }

    /// Learning rates of the heads and of the encoder.
    ///
    /// The actor and critic heads share one optimizer, so they report a
    /// single learning rate at index 0. The encoder follows at index 1.
    fn learning_rates(&self) -> Vec<f64> {
        vec![self.opt.learning_rate(), self.opt_encoder.learning_rate()]
    }

    /// Saves the parameters of the current snapshot.
    fn save_params(&self, path: &Path) -> Result<()> {
        self.policy.save(path)
    }

    /// Loads parameters into both snapshots.
    fn load_params(&mut self, path: &Path) -> Result<()> {
        self.policy.load(path)?;
        copy_params(self.policy_old.varmap(), self.policy.varmap())
    }
}
