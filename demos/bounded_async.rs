//! A ring of processes advances in rounds under the control of a scheduler machine. After every
//! round each process tells both neighbors its round number, and a neighbor must never be more
//! than one round behind or ahead. Each process halts after ten rounds.
//!
//! ```text
//! ./bounded_async test [PROCESSES] [--iterations N] [--seed SEED] [--verbose]
//! ./bounded_async run [PROCESSES] [--verbose]
//! ```

use stepwise::report::WriteReporter;
use stepwise::testing::BugFindingEngine;
use stepwise::*;

#[path = "../src/test_util/bounded_async.rs"]
mod bounded_async;

use bounded_async::launch;

fn main() -> Result<(), pico_args::Error> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info")); // `RUST_LOG=${LEVEL}` env variable to override

    let mut args = pico_args::Arguments::from_env();
    let verbose = args.contains("--verbose");
    let iterations: usize = args.opt_value_from_str("--iterations")?.unwrap_or(100);
    let seed: Option<u64> = args.opt_value_from_str("--seed")?;
    match args.subcommand()?.as_deref() {
        Some("test") => {
            let processes = args.opt_free_from_str()?.unwrap_or(3);
            println!(
                "Testing a bounded async ring of {} processes for {} iterations.",
                processes, iterations
            );
            let mut configuration = Configuration::default()
                .scheduling_iterations(iterations)
                .verbosity(verbose)
                .tool_verbosity(true);
            if let Some(seed) = seed {
                configuration = configuration.random_seed(seed);
            }
            BugFindingEngine::new(configuration, |runtime: &dyn Runtime| launch(runtime, processes))
                .run_and_report(&mut WriteReporter::new(&mut std::io::stdout()));
        }
        Some("run") => {
            let processes = args.opt_free_from_str()?.unwrap_or(3);
            println!("Running a bounded async ring of {} processes.", processes);
            let runtime = ActorRuntime::new(Configuration::default().verbosity(verbose));
            let outcome = launch(&*runtime, processes).and_then(|()| runtime.wait());
            println!("Finished. outcome={:?}", outcome);
        }
        _ => {
            println!("USAGE:");
            println!("  ./bounded_async test [PROCESSES] [--iterations N] [--seed SEED] [--verbose]");
            println!("  ./bounded_async run [PROCESSES] [--verbose]");
        }
    }

    Ok(())
}
