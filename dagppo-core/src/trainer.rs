//! Train [`Agent`].
mod config;
use crate::{
    error::DagPpoError,
    record::{
        NullRecorder, Record,
        RecordValue::{Scalar, Step},
        Recorder, STEP_KEY,
    },
    Agent, BatchState, DagEnv, Evaluator, Sampled, Slot, TaskId, TrajectoryBuffer,
    TrajectoryStep, WorkerPool, RATIO_KEY,
};
use anyhow::Result;
pub use config::TrainerConfig;
use log::{debug, info, warn};
use std::{fs, path::Path, time::Instant};

/// Summary of a finished training run.
#[derive(Clone, Debug, PartialEq)]
pub struct TrainStats {
    /// Total number of environment timesteps.
    pub timesteps: usize,

    /// Number of policy updates.
    pub n_updates: usize,

    /// Best evaluation ratio, if any evaluation ran.
    pub best_ratio: Option<f32>,
}

#[cfg_attr(doc, aquamarine::aquamarine)]
/// Manages the training loop.
///
/// # Training loop
///
/// 0. Given an environment implementing [`DagEnv`], training samples and an
///    agent implementing [`Agent`].
/// 1. Reset counters: `timesteps = 0`, `n_updates = 0`, and an empty
///    [`TrajectoryBuffer`].
/// 2. For each episode `i = 1..=max_episodes`:
///     1. Fill a [`BatchState`] of `batch_size` slots. Slot `b` starts from
///        sample `((i - 1) * batch_size + b) % samples.len()`.
///     2. Repeat up to `max_timesteps` times:
///         1. `timesteps += 1`.
///         2. The agent acts on all slots (the frozen policy of a PPO agent).
///         3. The [`WorkerPool`] steps every slot in parallel; the loop waits
///            for all of them and writes the results into the batch.
///         4. The states, actions, log-probabilities, rewards and terminal
///            flags of the timestep are appended to the buffer.
///         5. If `timesteps % update_timestep == 0`, the agent is updated
///            with the buffer, which is cleared afterwards.
///         6. If any slot is done, the episode ends.
///     3. Every `log_interval` episodes, running statistics are logged.
///     4. Every `test_interval` episodes, the agent is evaluated. If the
///        makespan ratio exceeds the best one so far, the agent parameters
///        are saved in `model_dir`.
///
/// Slots finishing before the others keep being stepped until the episode
/// ends, so environments must accept steps on terminal states.
///
/// # Interaction of objects
///
/// ```mermaid
/// graph LR
///     A[Agent]-->|actions|W[WorkerPool]
///     W -->|EnvStep|B[BatchState]
///     B -->|states, candidates|A
///     B -->|rewards, dones|T[TrajectoryBuffer]
///     T -->|update|A
/// ```
pub struct Trainer {
    config: TrainerConfig,
    pool: WorkerPool,
}

impl Trainer {
    /// Constructs a trainer.
    pub fn build(config: TrainerConfig) -> Result<Self> {
        Self::validate(&config)?;
        let pool = WorkerPool::new(config.num_workers)?;
        Ok(Self { config, pool })
    }

    /// Constructs a trainer with the configuration in the YAML file.
    pub fn build_from_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::build(TrainerConfig::load(path)?)
    }

    /// The configuration of the trainer.
    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    fn validate(config: &TrainerConfig) -> Result<(), DagPpoError> {
        for (key, v) in [
            ("batch_size", config.batch_size),
            ("update_timestep", config.update_timestep),
            ("log_interval", config.log_interval),
            ("test_interval", config.test_interval),
        ] {
            if v == 0 {
                return Err(DagPpoError::Config(format!("{} must be positive", key)));
            }
        }
        Ok(())
    }

    fn reset_batch<E: DagEnv>(
        &self,
        env: &E,
        samples: &[E::Sample],
        i_episode: usize,
    ) -> Result<BatchState<E::State>> {
        let batch_size = self.config.batch_size;
        let mut batch = BatchState::with_capacity(batch_size);

        for b in 0..batch_size {
            let ix = ((i_episode - 1) * batch_size + b) % samples.len();
            let (state, candidates) = env.reset(&samples[ix])?;
            batch.push(Slot::initial(state, candidates));
        }

        Ok(batch)
    }

    /// Steps every slot with its action and writes the results back.
    fn step_batch<E: DagEnv>(
        &self,
        env: &E,
        batch: &mut BatchState<E::State>,
        states: &[E::State],
        actions: &[TaskId],
    ) -> Result<()> {
        let items: Vec<_> = states
            .iter()
            .zip(actions.iter().copied())
            .zip(batch.makespans())
            .map(|((state, act), makespan)| (state, act, makespan))
            .collect();
        let steps = self
            .pool
            .map(&items, |(state, act, makespan)| env.step(state, *act, *makespan))?;

        for (ix, step) in steps.into_iter().enumerate() {
            batch.update(ix, step.into())?;
        }

        Ok(())
    }

    fn write(recorder: &mut dyn Recorder, mut record: Record, timesteps: usize) {
        record.insert(STEP_KEY, Step(timesteps));
        recorder.write(record);
    }

    /// Train the agent.
    ///
    /// Without a recorder, metrics only go to the log. Without an evaluator,
    /// no checkpoint is saved.
    pub fn train<E, A>(
        &mut self,
        env: &E,
        samples: &[E::Sample],
        agent: &mut A,
        recorder: Option<&mut dyn Recorder>,
        evaluator: Option<&mut dyn Evaluator<A>>,
    ) -> Result<TrainStats>
    where
        E: DagEnv,
        A: Agent<E::State>,
    {
        if samples.is_empty() {
            return Err(DagPpoError::Config("no training sample".to_string()).into());
        }

        let mut null_recorder = NullRecorder::new();
        let recorder = match recorder {
            Some(recorder) => recorder,
            None => {
                warn!("No metrics sink is given, metrics are written to the log only");
                &mut null_recorder as &mut dyn Recorder
            }
        };
        let mut evaluator = evaluator;

        if let Some(path) = self.config.test_model_weight.as_ref() {
            agent.load_params(Path::new(path))?;
            info!("Loaded model parameters from {}", path);
        }

        let config = self.config.clone();
        let batch_size = config.batch_size;
        let mut buffer = TrajectoryBuffer::new();
        let mut timesteps = 0;
        let mut n_updates = 0;
        let mut best_ratio: Option<f32> = None;

        // Running statistics, reset at each log line
        let mut running_reward = 0f32;
        let mut total_length = 0;
        let mut critic_losses: Vec<f32> = vec![];
        let mut prev_time = Instant::now();

        for i_episode in 1..=config.max_episodes {
            let mut batch = self.reset_batch(env, samples, i_episode)?;

            for _ in 0..config.max_timesteps {
                timesteps += 1;
                total_length += 1;

                let states = batch.states();
                let candidates = batch.candidates();
                let Sampled { actions, logprobs } = agent.act(&states, &candidates)?;
                if actions.len() != batch_size {
                    return Err(DagPpoError::BatchSizeMismatch {
                        expected: batch_size,
                        actual: actions.len(),
                    }
                    .into());
                }

                self.step_batch(env, &mut batch, &states, &actions)?;

                let rewards = batch.rewards();
                buffer.push(TrajectoryStep {
                    states,
                    candidates,
                    actions,
                    logprobs,
                    rewards: rewards.clone(),
                    dones: batch.dones(),
                })?;

                if timesteps % config.update_timestep == 0 {
                    let record = agent.update(&buffer)?;
                    buffer.clear();
                    n_updates += 1;

                    let critic_loss = record.get_scalar("critic_mse")?;
                    debug!(
                        "Update {} at timestep {}, critic mse {:.4}",
                        n_updates, timesteps, critic_loss
                    );
                    critic_losses.push(critic_loss);
                    Self::write(
                        recorder,
                        Record::from_scalar("critic_mse/train", critic_loss),
                        timesteps,
                    );
                }

                running_reward += rewards.iter().sum::<f32>() / batch_size as f32;
                if batch.any_done() {
                    break;
                }
            }

            if i_episode % config.log_interval == 0 {
                let n = config.log_interval as f32;
                let avg_length = total_length as f32 / n;
                let avg_reward = running_reward / n;
                let critic_loss = match critic_losses.len() {
                    0 => -1.0,
                    k => critic_losses.iter().sum::<f32>() / k as f32,
                };
                let avg_time = prev_time.elapsed().as_secs_f32() / n;
                prev_time = Instant::now();

                let mut record = Record::from_slice(&[
                    ("reward/train", Scalar(avg_reward)),
                    ("time/train", Scalar(avg_time)),
                ]);
                for (i, lr) in agent.learning_rates().iter().enumerate() {
                    record.insert(format!("lr/{}", i), Scalar(*lr as f32));
                }
                Self::write(recorder, record, timesteps);

                info!(
                    "Episode {} \t avg length: {:.2} \t critic mse: {:.4} \t reward: {:.4} \t time per episode: {:.2}",
                    i_episode, avg_length, critic_loss, avg_reward, avg_time
                );

                running_reward = 0.0;
                total_length = 0;
                critic_losses.clear();
            }

            if i_episode % config.test_interval == 0 {
                if let Some(evaluator) = evaluator.as_mut() {
                    info!("Starts evaluation of the trained model");
                    let test_time = Instant::now();
                    let record = evaluator.evaluate(agent)?;
                    let ratio = record
                        .get_scalars(RATIO_KEY)?
                        .get("mean")
                        .copied()
                        .ok_or_else(|| {
                            DagPpoError::RecordKeyError(format!("{}/mean", RATIO_KEY))
                        })?;
                    Self::write(recorder, record.with_key_suffix("test"), timesteps);
                    info!("Evaluation complete, ratio {:.4}", ratio);

                    if best_ratio.map_or(ratio > 0.0, |best| ratio > best) {
                        best_ratio = Some(ratio);
                        let model_dir = Path::new(&config.model_dir);
                        fs::create_dir_all(model_dir)?;
                        let path = model_dir.join(config.checkpoint_file_name(ratio));
                        agent.save_params(&path)?;
                        info!("Saved the model in {:?}", &path);
                    }

                    // Evaluation time is not counted in the time per episode
                    prev_time += test_time.elapsed();
                }
            }
        }

        recorder.flush();

        Ok(TrainStats {
            timesteps,
            n_updates,
            best_ratio,
        })
    }
}
