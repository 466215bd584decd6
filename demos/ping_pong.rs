//! A client machine pings a server actor five times and counts the pongs. A safety monitor checks
//! that no pong arrives for a ping that was never sent.
//!
//! ```text
//! ./ping_pong test [ITERATIONS] [--seed SEED] [--verbose]
//! ./ping_pong run [--verbose]
//! ```

use stepwise::report::WriteReporter;
use stepwise::testing::BugFindingEngine;
use stepwise::*;

#[path = "../src/test_util/ping_pong.rs"]
mod ping_pong;

use ping_pong::{launch, Summary};

fn main() -> Result<(), pico_args::Error> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info")); // `RUST_LOG=${LEVEL}` env variable to override

    let mut args = pico_args::Arguments::from_env();
    let verbose = args.contains("--verbose");
    let seed: Option<u64> = args.opt_value_from_str("--seed")?;
    match args.subcommand()?.as_deref() {
        Some("test") => {
            let iterations = args.opt_free_from_str()?.unwrap_or(100);
            println!("Testing ping-pong for {} iterations.", iterations);
            let mut configuration = Configuration::default()
                .scheduling_iterations(iterations)
                .verbosity(verbose)
                .tool_verbosity(true);
            if let Some(seed) = seed {
                configuration = configuration.random_seed(seed);
            }
            let test = |runtime: &dyn Runtime| launch(runtime, &Summary::default());
            BugFindingEngine::new(configuration, test)
                .run_and_report(&mut WriteReporter::new(&mut std::io::stdout()));
        }
        Some("run") => {
            println!("Running ping-pong.");
            let runtime = ActorRuntime::new(Configuration::default().verbosity(verbose));
            let summary = Summary::default();
            let outcome = launch(&*runtime, &summary).and_then(|()| runtime.wait());
            println!(
                "Finished. outcome={:?}, pings_answered={}, pongs_received={}",
                outcome,
                summary.pings_answered(),
                summary.pongs_received()
            );
        }
        _ => {
            println!("USAGE:");
            println!("  ./ping_pong test [ITERATIONS] [--seed SEED] [--verbose]");
            println!("  ./ping_pong run [--verbose]");
        }
    }

    Ok(())
}
