use {
    anyhow::Result,
    clap::Parser,
    rl_experience::cli::{
        run,
        Args,
    },
};


fn main() -> Result<()> {
    let summary = run(Args::parse())?;

    println!(
        "{} steps, {} episodes, {} training batches, {} transitions pulled",
        summary.steps,
        summary.episodes,
        summary.training_batches,
        summary.pulled_transitions,
    );
    println!("observation mean: {:?}", summary.final_mean);
    println!("observation std:  {:?}", summary.final_std);
    Ok(())
}
