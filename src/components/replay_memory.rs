use {
    crate::error::{
        ExperienceError,
        Result,
    },
    candle_core::Tensor,
    rand::{
        seq::index,
        thread_rng,
        Rng,
    },
    tracing::debug,
    unzip_n::unzip_n,
};

unzip_n!(4);

/// One recorded step of interaction.
///
/// The fields are stored as given, no shape checking is done here.
#[derive(Clone, Debug)]
pub struct Transition {
    state: Tensor,
    action: Tensor,
    next_state: Tensor,
    reward: Tensor,
}
impl Transition {
    pub fn new(
        state: &Tensor,
        action: &Tensor,
        next_state: &Tensor,
        reward: &Tensor,
    ) -> Self {
        Self {
            state: state.clone(),
            action: action.clone(),
            next_state: next_state.clone(),
            reward: reward.clone(),
        }
    }

    pub fn state(&self) -> &Tensor {
        &self.state
    }
    pub fn action(&self) -> &Tensor {
        &self.action
    }
    pub fn next_state(&self) -> &Tensor {
        &self.next_state
    }
    pub fn reward(&self) -> &Tensor {
        &self.reward
    }
}

/// A set of transitions stacked field by field along a new leading dimension.
#[derive(Debug)]
pub struct Batch {
    pub states: Tensor,
    pub actions: Tensor,
    pub next_states: Tensor,
    pub rewards: Tensor,
}
impl Batch {
    /// Stack the given transitions into one tensor per field.
    ///
    /// Every transition must have the same per-field shapes.
    pub fn from_transitions(transitions: &[Transition]) -> Result<Self> {
        if transitions.is_empty() {
            return Err(ExperienceError::EmptyBatch);
        }

        let (states, actions, next_states, rewards) = transitions
            .iter()
            .map(|t| {
                (
                    t.state.clone(),
                    t.action.clone(),
                    t.next_state.clone(),
                    t.reward.clone(),
                )
            })
            .unzip_n_vec();

        Ok(Self {
            states: Tensor::stack(&states, 0)?,
            actions: Tensor::stack(&actions, 0)?,
            next_states: Tensor::stack(&next_states, 0)?,
            rewards: Tensor::stack(&rewards, 0)?,
        })
    }

    pub fn len(&self) -> usize {
        self.rewards.dims().first().copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Fixed-capacity experience storage.
///
/// The memory is a ring: storage for `capacity` transitions is allocated up
/// front and writes go to `position`, which wraps around once the memory is
/// full. After wrapping, the slot at `position` is overwritten, so the memory
/// always holds the `capacity` most recently pushed transitions.
///
/// # Fields
///
/// * `memory` - The stored transitions, in slot order.
/// * `capacity` - The maximum number of stored transitions.
/// * `position` - The slot the next push writes to.
#[derive(Clone, Debug)]
pub struct ReplayMemory {
    memory: Vec<Transition>,
    capacity: usize,
    position: usize,
}
impl ReplayMemory {
    /// Create an empty replay memory holding at most `capacity` transitions.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(ExperienceError::ZeroCapacity);
        }
        Ok(Self {
            memory: Vec::with_capacity(capacity),
            capacity,
            position: 0,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.memory.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memory.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.memory.len() == self.capacity
    }

    /// Iterate over the stored transitions in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &Transition> {
        self.memory.iter()
    }

    /// Store a transition.
    ///
    /// While the memory is not yet full this appends, afterwards it overwrites
    /// the slot at the current write position.
    pub fn push(
        &mut self,
        state: &Tensor,
        action: &Tensor,
        next_state: &Tensor,
        reward: &Tensor,
    ) {
        let transition = Transition::new(state, action, next_state, reward);
        if self.memory.len() < self.capacity {
            self.memory.push(transition);
        } else {
            self.memory[self.position] = transition;
        }
        self.position = (self.position + 1) % self.capacity;
    }

    /// Sample `batch_size` distinct transitions uniformly at random.
    ///
    /// Fails with [`ExperienceError::InsufficientSamples`] when fewer than
    /// `batch_size` transitions are stored.
    pub fn sample(
        &self,
        batch_size: usize,
    ) -> Result<Vec<Transition>> {
        self.sample_with_rng(&mut thread_rng(), batch_size)
    }

    /// Like [`ReplayMemory::sample`], drawing indices from the given `rng`.
    pub fn sample_with_rng<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        batch_size: usize,
    ) -> Result<Vec<Transition>> {
        if batch_size > self.memory.len() {
            return Err(ExperienceError::InsufficientSamples {
                requested: batch_size,
                available: self.memory.len(),
            });
        }

        debug!("sampling {batch_size} of {} transitions", self.memory.len());
        Ok(index::sample(rng, self.memory.len(), batch_size)
            .into_iter()
            .map(|i| self.memory[i].clone())
            .collect())
    }

    /// Sample a random batch and stack it into tensors for a training step.
    pub fn random_batch(
        &self,
        batch_size: usize,
    ) -> Result<Batch> {
        Batch::from_transitions(&self.sample(batch_size)?)
    }

    /// Take every stored transition out of the memory, in slot order.
    ///
    /// The memory is left empty with the write position reset, so a second
    /// call right after returns nothing.
    pub fn pull(&mut self) -> Vec<Transition> {
        self.position = 0;
        let memory = std::mem::replace(&mut self.memory, Vec::with_capacity(self.capacity));
        debug!("pulled {} transitions", memory.len());
        memory
    }
}
