//! Running state of the batch slots of an episode.
use crate::{error::DagPpoError, EnvStep, TaskId};

/// Running state of one scheduling instance in a batch.
#[derive(Clone, Debug, PartialEq)]
pub struct Slot<S> {
    /// Reward of the last step.
    pub reward: f32,

    /// Graph state.
    pub state: S,

    /// Running completion time.
    pub makespan: f32,

    /// Tasks legal to be scheduled next.
    pub candidates: Vec<TaskId>,

    /// Terminal flag. Once set, it is never reset within an episode.
    pub is_done: bool,
}

impl<S> Slot<S> {
    /// Slot at the beginning of an episode.
    pub fn initial(state: S, candidates: Vec<TaskId>) -> Self {
        Self {
            reward: 0.0,
            state,
            makespan: 0.0,
            candidates,
            is_done: false,
        }
    }
}

/// Replacement of some of the fields of a [`Slot`].
///
/// Fields left `None` keep their current value.
#[derive(Clone, Debug)]
pub struct SlotUpdate<S> {
    /// New reward.
    pub reward: Option<f32>,

    /// New graph state.
    pub state: Option<S>,

    /// New makespan.
    pub makespan: Option<f32>,

    /// New eligible tasks.
    pub candidates: Option<Vec<TaskId>>,

    /// New terminal flag.
    pub is_done: Option<bool>,
}

impl<S> Default for SlotUpdate<S> {
    fn default() -> Self {
        Self {
            reward: None,
            state: None,
            makespan: None,
            candidates: None,
            is_done: None,
        }
    }
}

impl<S> From<EnvStep<S>> for SlotUpdate<S> {
    fn from(step: EnvStep<S>) -> Self {
        Self {
            reward: Some(step.reward),
            state: Some(step.state),
            makespan: Some(step.makespan),
            candidates: Some(step.candidates),
            is_done: Some(step.is_done),
        }
    }
}

/// Batch slots of an episode, indexed `0..len()`.
///
/// Accessors of whole columns (`rewards()`, `states()`, ...) return owned
/// copies; modifying them never touches the container. The only way to
/// change a slot is [`BatchState::update`].
#[derive(Clone, Debug)]
pub struct BatchState<S> {
    slots: Vec<Slot<S>>,
}

impl<S> Default for BatchState<S> {
    fn default() -> Self {
        Self { slots: Vec::new() }
    }
}

impl<S: Clone> BatchState<S> {
    /// Constructs an empty container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Constructs an empty container for `n` slots.
    pub fn with_capacity(n: usize) -> Self {
        Self {
            slots: Vec::with_capacity(n),
        }
    }

    /// Adds a slot.
    pub fn push(&mut self, slot: Slot<S>) {
        self.slots.push(slot);
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if there is no slot.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Immutable view of a slot.
    pub fn slot(&self, ix: usize) -> Option<&Slot<S>> {
        self.slots.get(ix)
    }

    /// Replaces the given fields of slot `ix`.
    pub fn update(&mut self, ix: usize, update: SlotUpdate<S>) -> Result<(), DagPpoError> {
        let len = self.slots.len();
        let slot = self
            .slots
            .get_mut(ix)
            .ok_or(DagPpoError::SlotOutOfRange { index: ix, len })?;

        if let Some(reward) = update.reward {
            slot.reward = reward;
        }
        if let Some(state) = update.state {
            slot.state = state;
        }
        if let Some(makespan) = update.makespan {
            slot.makespan = makespan;
        }
        if let Some(candidates) = update.candidates {
            slot.candidates = candidates;
        }
        if let Some(is_done) = update.is_done {
            slot.is_done = is_done;
        }

        Ok(())
    }

    /// Rewards of the last step.
    pub fn rewards(&self) -> Vec<f32> {
        self.slots.iter().map(|s| s.reward).collect()
    }

    /// Graph states.
    pub fn states(&self) -> Vec<S> {
        self.slots.iter().map(|s| s.state.clone()).collect()
    }

    /// Running makespans.
    pub fn makespans(&self) -> Vec<f32> {
        self.slots.iter().map(|s| s.makespan).collect()
    }

    /// Eligible tasks.
    pub fn candidates(&self) -> Vec<Vec<TaskId>> {
        self.slots.iter().map(|s| s.candidates.clone()).collect()
    }

    /// Terminal flags.
    pub fn dones(&self) -> Vec<bool> {
        self.slots.iter().map(|s| s.is_done).collect()
    }

    /// Returns `true` if any slot is terminal.
    pub fn any_done(&self) -> bool {
        self.slots.iter().any(|s| s.is_done)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn batch() -> BatchState<Vec<u8>> {
        let mut batch = BatchState::new();
        batch.push(Slot::initial(vec![0, 1], vec![0, 1]));
        batch.push(Slot::initial(vec![2], vec![2]));
        batch
    }

    #[test]
    fn test_snapshots_are_independent() {
        let batch = batch();

        let mut states = batch.states();
        states[0].push(9);
        let mut candidates = batch.candidates();
        candidates[1].clear();
        let mut rewards = batch.rewards();
        rewards[0] = 3.0;

        assert_eq!(batch.states(), vec![vec![0, 1], vec![2]]);
        assert_eq!(batch.candidates(), vec![vec![0, 1], vec![2]]);
        assert_eq!(batch.rewards(), vec![0.0, 0.0]);
    }

    #[test]
    fn test_partial_update() -> Result<(), DagPpoError> {
        let mut batch = batch();
        batch.update(
            1,
            SlotUpdate {
                reward: Some(2.0),
                is_done: Some(true),
                ..Default::default()
            },
        )?;

        let slot = batch.slot(1).unwrap();
        assert_eq!(slot.reward, 2.0);
        assert!(slot.is_done);
        assert_eq!(slot.state, vec![2]);
        assert_eq!(slot.candidates, vec![2]);
        assert_eq!(slot.makespan, 0.0);
        assert_eq!(batch.slot(0).unwrap(), &Slot::initial(vec![0, 1], vec![0, 1]));
        assert_eq!(batch.dones(), vec![false, true]);
        assert!(batch.any_done());
        Ok(())
    }

    #[test]
    fn test_update_out_of_range() {
        let mut batch = batch();
        let err = batch.update(2, SlotUpdate::default()).unwrap_err();
        assert!(matches!(err, DagPpoError::SlotOutOfRange { index: 2, len: 2 }));
    }

    #[test]
    fn test_update_from_env_step() -> Result<(), DagPpoError> {
        let mut batch = batch();
        let step = EnvStep {
            reward: -1.5,
            state: vec![7],
            makespan: 4.0,
            candidates: vec![],
            is_done: true,
        };
        batch.update(0, step.into())?;

        assert_eq!(batch.rewards(), vec![-1.5, 0.0]);
        assert_eq!(batch.makespans(), vec![4.0, 0.0]);
        assert_eq!(batch.states(), vec![vec![7], vec![2]]);
        Ok(())
    }
}
