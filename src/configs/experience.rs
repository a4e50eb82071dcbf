use {
    crate::{
        components::{
            Normalizer,
            ReplayMemory,
        },
        error::Result as ExperienceResult,
    },
    anyhow::Result,
    serde::{
        Deserialize,
        Serialize,
    },
    std::{
        fs::{
            read_to_string,
            File,
        },
        io::Write,
        path::Path,
    },
};


#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExperienceConfig {
    // The number of transitions the replay memory holds before overwriting.
    pub replay_memory_capacity: usize,
    // The training batch size for each training iteration.
    pub training_batch_size: usize,
    // Train once every this many environment steps.
    pub train_every: usize,
    // The length of an episode; the memory is pulled at the end of each.
    pub episode_length: usize,
    // Bounds for raw and for normalized observations.
    pub pre_norm_clip: f64,
    pub post_norm_clip: f64,
}
impl Default for ExperienceConfig {
    fn default() -> Self {
        Self {
            replay_memory_capacity: 1_000,
            training_batch_size: 64,
            train_every: 10,
            episode_length: 200,
            pre_norm_clip: 200.0,
            post_norm_clip: 5.0,
        }
    }
}
impl ExperienceConfig {
    pub fn replay_memory(&self) -> ExperienceResult<ReplayMemory> {
        ReplayMemory::new(self.replay_memory_capacity)
    }

    pub fn normalizer(&self) -> Normalizer {
        Normalizer::new(self.pre_norm_clip, self.post_norm_clip)
    }

    pub fn load(path: &dyn AsRef<Path>) -> Result<Self> {
        Ok(ron::from_str(&read_to_string(path)?)?)
    }

    pub fn save(
        &self,
        path: &dyn AsRef<Path>,
    ) -> Result<()> {
        File::create(path)?.write_all(
            ron::ser::to_string_pretty(
                self,
                ron::ser::PrettyConfig::default(),
            )?.as_bytes()
        )?;
        Ok(())
    }
}
