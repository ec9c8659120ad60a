use anyhow::{bail, Context};
use clap::{value_parser, Arg, ArgAction, Command};
use roadmap_dataset::{samples, Dataset, GoalId};
use roadmap_engine::invariants;
use roadmap_engine::persistence::{spawn_persistence, JsonFileSink};
use roadmap_engine::test_harness::{run_simulator, SimulatorConfig, TestHarness};
use roadmap_engine::{EngineConfig, Intent, RoadmapEngine};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn dataset_arg() -> Arg {
    Arg::new("dataset")
        .long("dataset")
        .value_parser(value_parser!(PathBuf))
        .help("Dataset JSON file (defaults to the bundled career tracks)")
}

fn load_dataset(path: Option<&PathBuf>) -> anyhow::Result<Dataset> {
    match path {
        Some(path) => Dataset::from_path(path).with_context(|| format!("loading dataset {}", path.display())),
        None => Ok(samples::career_tracks()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Command::new("roadmap-engine")
        .version(roadmap_engine::VERSION)
        .about("Career roadmap graph engine")
        .subcommand_required(true)
        .subcommand(
            Command::new("simulate")
                .about("Drive the engine with random intents and audit every step")
                .arg(
                    Arg::new("operations")
                        .long("ops")
                        .default_value("1000")
                        .value_parser(value_parser!(u64))
                        .help("Number of intents to simulate"),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .default_value("42")
                        .value_parser(value_parser!(u64))
                        .help("Random seed for reproducibility"),
                )
                .arg(
                    Arg::new("seeds")
                        .long("seeds")
                        .value_parser(value_parser!(u64))
                        .help("Run seeds 0..N instead of a single seed"),
                )
                .arg(
                    Arg::new("stop-on-violation")
                        .long("stop-on-violation")
                        .action(ArgAction::SetTrue)
                        .help("Stop simulation on first violation"),
                )
                .arg(dataset_arg()),
        )
        .subcommand(
            Command::new("check-dataset")
                .about("Summarize a dataset and audit an auto-built roadmap per goal")
                .arg(dataset_arg()),
        )
        .subcommand(
            Command::new("replay")
                .about("Apply a JSON script of intents and persist the result")
                .arg(
                    Arg::new("script")
                        .long("script")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("JSON array of intents"),
                )
                .arg(
                    Arg::new("goal")
                        .long("goal")
                        .help("Starting goal (defaults to the first goal of the dataset)"),
                )
                .arg(
                    Arg::new("config")
                        .long("config")
                        .value_parser(value_parser!(PathBuf))
                        .help("Engine configuration TOML"),
                )
                .arg(
                    Arg::new("out")
                        .long("out")
                        .value_parser(value_parser!(PathBuf))
                        .help("Snapshot file; restored from when it already exists"),
                )
                .arg(dataset_arg()),
        );

    let matches = cli.get_matches();

    match matches.subcommand() {
        Some(("simulate", args)) => {
            let operations = args.get_one::<u64>("operations").copied().unwrap_or(1000);
            let seed = args.get_one::<u64>("seed").copied().unwrap_or(42);
            let dataset = Arc::new(load_dataset(args.get_one::<PathBuf>("dataset"))?);

            if let Some(seeds) = args.get_one::<u64>("seeds").copied() {
                println!("Running certification over {seeds} seeds...");
                let report = TestHarness::certify(&dataset, seeds, operations);
                println!("Seeds: {}", report.seeds_tested);
                println!("Violations: {}", report.total_violations);
                println!("Failed seeds: {:?}", report.failed_seeds);
                std::process::exit(if report.passed { 0 } else { 1 });
            }

            println!("Running roadmap simulator...");
            println!("Operations: {operations}");
            println!("Seed: {seed}");
            println!();

            let config = SimulatorConfig {
                seed,
                total_operations: operations,
                stop_on_first_violation: args.get_flag("stop-on-violation"),
                ..Default::default()
            };
            let report = run_simulator(config, dataset);
            println!("{}", report.generate_text());
            std::process::exit(if report.passed() { 0 } else { 1 });
        }
        Some(("check-dataset", args)) => {
            let dataset = Arc::new(load_dataset(args.get_one::<PathBuf>("dataset"))?);
            print!("{}", dataset.summary());

            let mut failures = 0;
            for goal in dataset.goals() {
                let mut engine = RoadmapEngine::new(Arc::clone(&dataset), EngineConfig::default(), goal.id.clone())?;
                engine.apply(Intent::AutoBuild)?;
                let violations = invariants::audit(engine.roadmap(), goal);
                println!(
                    "{}: {} skills, {} connectors, {}",
                    goal.id,
                    engine.roadmap().skill_count(),
                    engine.roadmap().connector_count(),
                    if violations.is_empty() { "PASS" } else { "FAIL" }
                );
                for violation in &violations {
                    println!("  {violation}");
                }
                failures += violations.len();
            }
            std::process::exit(i32::from(failures > 0));
        }
        Some(("replay", args)) => replay(args).await,
        _ => Ok(()),
    }
}

async fn replay(args: &clap::ArgMatches) -> anyhow::Result<()> {
    let dataset = Arc::new(load_dataset(args.get_one::<PathBuf>("dataset"))?);
    let config = match args.get_one::<PathBuf>("config") {
        Some(path) => EngineConfig::from_path(path).with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    let Some(script_path) = args.get_one::<PathBuf>("script") else {
        bail!("--script is required");
    };
    let raw = tokio::fs::read_to_string(script_path)
        .await
        .with_context(|| format!("reading script {}", script_path.display()))?;
    let intents: Vec<Intent> = serde_json::from_str(&raw).context("parsing intent script")?;

    let sink = args.get_one::<PathBuf>("out").map(JsonFileSink::new);
    let restored = match &sink {
        Some(sink) if sink.path().exists() => Some(sink.load().await?),
        _ => None,
    };

    let engine = match restored {
        Some(persisted) => RoadmapEngine::restore(Arc::clone(&dataset), config, &persisted)?,
        None => {
            let goal = match args.get_one::<String>("goal") {
                Some(goal) => GoalId::from(goal.as_str()),
                None => match dataset.goals().next() {
                    Some(goal) => goal.id.clone(),
                    None => bail!("dataset has no goals"),
                },
            };
            RoadmapEngine::new(Arc::clone(&dataset), config, goal)?
        }
    };

    let (mut engine, worker) = match sink {
        Some(sink) => {
            let (publisher, handle) = spawn_persistence(sink);
            (engine.with_publisher(publisher), Some(handle))
        }
        None => (engine, None),
    };

    for (i, intent) in intents.into_iter().enumerate() {
        let kind = intent.kind();
        match engine.apply(intent) {
            Ok(outcome) => println!(
                "{:>3} {kind}: {} (+{} -{})",
                i + 1,
                if outcome.changed { "changed" } else { "unchanged" },
                outcome.created.len(),
                outcome.removed.len()
            ),
            Err(rejection) => println!("{:>3} {kind}: rejected ({rejection})", i + 1),
        }
    }

    println!(
        "goal {}: {} skills, {} tools, {} connectors",
        engine.active_goal(),
        engine.roadmap().skill_count(),
        engine.roadmap().tool_count(),
        engine.roadmap().connector_count()
    );

    drop(engine.detach_publisher());
    if let Some(handle) = worker {
        let stats = handle.await.context("persistence task panicked")?;
        println!("snapshots saved: {}, failed: {}", stats.saved, stats.failed);
    }
    Ok(())
}
