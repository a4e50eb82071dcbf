use {
    crate::{
        components::Batch,
        configs::ExperienceConfig,
    },
    anyhow::Result,
    candle_core::{
        Device,
        Tensor,
    },
    rand::{
        rngs::StdRng,
        Rng,
        SeedableRng,
    },
    rand_distr::Normal,
    tracing::{
        info,
        warn,
    },
};


/// What happened during a synthetic run.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub steps: usize,
    pub episodes: usize,
    pub training_batches: usize,
    pub pulled_transitions: usize,
    pub mean_batch_reward: Vec<f64>,
    pub final_mean: Vec<f64>,
    pub final_std: Vec<f64>,
}

/// Drive the replay memory and normalizer the way a training loop would.
///
/// Observations are drawn from a fixed Gaussian with an offset per dimension,
/// normalized with statistics updated on the fly, and stored as transitions
/// with a random action and a reward of minus the squared action. Every
/// `train_every` steps a batch is sampled once the memory holds enough
/// transitions; at the end of each episode the memory is pulled.
///
/// # Arguments
///
/// * `config` - Memory, batch and clipping settings.
/// * `steps` - The total number of environment steps to simulate.
/// * `obs_dim` - The width of the observation vector.
/// * `seed` - Seed for every random draw of the run.
/// * `device` - The device the tensors live on.
pub fn run_synthetic(
    config: &ExperienceConfig,
    steps: usize,
    obs_dim: usize,
    seed: u64,
    device: &Device,
) -> Result<RunSummary> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut memory = config.replay_memory()?;
    let mut normalizer = config.normalizer();
    let noise = Normal::new(0.0, 3.0)?;
    let episode_length = config.episode_length.max(1);
    let train_every = config.train_every.max(1);

    let observe = |rng: &mut StdRng| -> Result<Tensor> {
        let values: Vec<f64> = (0..obs_dim)
            .map(|i| 10.0 * i as f64 + rng.sample(noise))
            .collect();
        Ok(Tensor::new(values, device)?)
    };

    let mut summary = RunSummary::default();
    let mut raw = observe(&mut rng)?;

    for step in 1..=steps {
        let state = normalizer.preprocess_with_update(&raw)?;
        let action_value = rng.gen_range(-1.0..=1.0);
        let next_raw = observe(&mut rng)?;
        let next_state = normalizer.preprocess(&next_raw)?;

        memory.push(
            &state,
            &Tensor::new(&[action_value], device)?,
            &next_state,
            &Tensor::new(-action_value * action_value, device)?,
        );
        raw = next_raw;
        summary.steps = step;

        if step % train_every == 0 && memory.len() >= config.training_batch_size {
            let batch = Batch::from_transitions(
                &memory.sample_with_rng(&mut rng, config.training_batch_size)?,
            )?;
            let reward = batch.rewards.mean_all()?.to_scalar::<f64>()?;
            info!("step {step}: trained on {} transitions, mean reward {reward:.4}", batch.len());
            summary.training_batches += 1;
            summary.mean_batch_reward.push(reward);
        }

        if step % episode_length == 0 {
            let pulled = memory.pull();
            summary.episodes += 1;
            summary.pulled_transitions += pulled.len();
            warn!("episode {} finished, pulled {} transitions", summary.episodes, pulled.len());
            raw = observe(&mut rng)?;
        }
    }

    let (mean, std) = normalizer.get_stats()?;
    // neutral stats are scalars until the second observation
    summary.final_mean = mean.broadcast_as(obs_dim)?.to_vec1::<f64>()?;
    summary.final_std = std.broadcast_as(obs_dim)?.to_vec1::<f64>()?;
    Ok(summary)
}
