//! Rotation simulator binary.
//!
//! Composition root: reads the environment, loads the archetype content,
//! runs the built-in rotation for it and prints a report.
//!
//! ```bash
//! SIM_ARCHETYPE=caster SIM_ITERATIONS=20 cargo run -p rotation-sim
//! ```

mod config;
mod logging;

use anyhow::{Context, Result};
use runtime::{RunSummary, Simulation};
use sim_content::ContentFactory;

use config::{OutputFormat, RunConfig};

fn main() -> Result<()> {
    // Load .env file if it exists (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let config = RunConfig::from_env();
    let _guard =
        logging::setup_logging(config.session_id.as_deref(), config.log_dir.as_deref())?;

    let factory = config
        .data_dir
        .as_ref()
        .map_or_else(ContentFactory::embedded, ContentFactory::new);
    let mut content = factory
        .load(config.archetype)
        .with_context(|| format!("loading {} content", config.archetype))?;
    if let Some(duration_ms) = config.duration_ms {
        content.config.duration_ms = duration_ms;
    }
    let base_seed = config.seed.unwrap_or(content.config.seed);

    tracing::info!(
        archetype = %config.archetype,
        seed = base_seed,
        iterations = config.iterations,
        "starting"
    );

    let mut summaries = Vec::with_capacity(config.iterations as usize);
    for iteration in 0..u64::from(config.iterations) {
        let mut run_content = content.clone();
        let seed = base_seed.wrapping_add(iteration);
        run_content.config.seed = seed;
        let mut simulation = Simulation::from_content(config.archetype, run_content)?;
        let summary = simulation
            .run()
            .with_context(|| format!("run {iteration} (seed {seed})"))?;
        summaries.push(summary);
    }

    report(&config, &summaries)
}

fn report(config: &RunConfig, summaries: &[RunSummary]) -> Result<()> {
    match config.output {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(summaries)?);
        }
        OutputFormat::Text => {
            for summary in summaries {
                println!("{summary}");
            }
            if summaries.len() > 1 {
                let total: f64 = summaries.iter().map(RunSummary::dps).sum();
                let mean = total / summaries.len() as f64;
                println!("mean dps over {} runs: {mean:.1}", summaries.len());
            }
        }
    }
    Ok(())
}
