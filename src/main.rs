use clap::Parser;
use facility_recommender::{run_pipeline, Cli, ComputeSession};

// Training job entry point
// 1. Start the compute session
// 2. Load and split the reservations
// 3. Cross-validate ALS over the parameter grid
// 4. Score the best model on the held-out split
// 5. Print the model and its score

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "facility_recommender=info".into()),
        )
        .init();

    let config = Cli::parse().into_config()?;

    // dropped on every return path, including errors below
    let session = ComputeSession::start(config.session.clone())?;

    let report = run_pipeline(&session, &config)?;

    println!("{}", report.best_model);
    println!("{}", report.test_metric);

    session.stop();

    Ok(())
}
