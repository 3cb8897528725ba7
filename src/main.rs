use parking_bandits::experiment::ExperimentConfig;
use parking_bandits::simulation;

use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ExperimentConfig::from_env()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    info!(
        horizon = config.horizon,
        n_trials = config.n_trials,
        "starting experiment"
    );

    for trial in 0..config.n_trials {
        let mut env = config.build_environment(trial)?;
        let mut policy = config.build_policy(env.reward_range(), trial)?;
        let records = simulation::run(&mut env, &mut policy, config.horizon)?;

        info!(
            trial,
            cumulative_regret = records.last().map(|r| r.cumulative_regret).unwrap_or_default(),
            "trial finished"
        );
        for record in &records {
            println!("{}", serde_json::to_string(record)?);
        }
    }

    Ok(())
}
