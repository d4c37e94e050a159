#![deny(warnings)]

//! Headless CLI: load a catalog, snapshot and optional cooldown plan, run
//! the session simulator and print the best stopping point.

use anyhow::{bail, Context, Result};
use sim_core::{load_catalog, read_document, CooldownPlan, SimConfig, Snapshot};
use sim_runtime::{best_variant, Engine, SimulateResult};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default)]
struct Args {
    catalog: Option<PathBuf>,
    snapshot: Option<PathBuf>,
    plan: Option<PathBuf>,
    config: Option<PathBuf>,
    json: bool,
    trace: bool,
    compare: bool,
    version: bool,
}

fn parse_args() -> Result<Args> {
    let mut args = Args::default();
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        let mut path = |flag: &str| -> Result<PathBuf> {
            it.next()
                .map(PathBuf::from)
                .with_context(|| format!("{flag} needs a path"))
        };
        match arg.as_str() {
            "--catalog" => args.catalog = Some(path("--catalog")?),
            "--snapshot" => args.snapshot = Some(path("--snapshot")?),
            "--plan" => args.plan = Some(path("--plan")?),
            "--config" => args.config = Some(path("--config")?),
            "--json" => args.json = true,
            "--trace" => args.trace = true,
            "--compare" => args.compare = true,
            "--version" => args.version = true,
            other => bail!("unknown argument {other}"),
        }
    }
    Ok(args)
}

fn print_result(label: &str, r: &SimulateResult) {
    println!(
        "{label} | depth: {} (start {}, last {}) | time: {:.0}s | reward: {} | ratio: {:.4e}/s",
        r.depth, r.start_depth, r.last_depth, r.elapsed_secs, r.reward, r.ratio
    );
    println!(
        "{label} | stop: {:?} | confidence: {:?} | planner engaged: {}",
        r.stop_reason, r.confidence, r.optimizer_engaged
    );
    for w in &r.trace {
        println!(
            "  depth {:>6} | {:>10.2}s | dps {} | gold {} | ratio {:.4e}",
            w.depth, w.secs, w.damage, w.currency, w.ratio
        );
    }
}

fn main() -> Result<()> {
    // Logging setup
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = parse_args()?;
    if args.version {
        println!(
            "{} {} ({} built {})",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION"),
            env!("GIT_SHA"),
            env!("BUILD_DATE")
        );
        return Ok(());
    }
    info!(?args, "starting CLI");

    let catalog_path = args
        .catalog
        .unwrap_or_else(|| PathBuf::from("assets/catalog.yaml"));
    let catalog = load_catalog(&catalog_path)
        .with_context(|| format!("loading catalog {}", catalog_path.display()))?;
    let snapshot: Snapshot = match &args.snapshot {
        Some(p) => read_document(p).with_context(|| format!("loading snapshot {}", p.display()))?,
        None => Snapshot::default(),
    };
    let plan: Option<CooldownPlan> = match &args.plan {
        Some(p) => Some(read_document(p).with_context(|| format!("loading plan {}", p.display()))?),
        None => None,
    };
    let mut config: SimConfig = match &args.config {
        Some(p) => read_document(p).with_context(|| format!("loading config {}", p.display()))?,
        None => SimConfig::default(),
    };
    config.record_trace |= args.trace;

    info!(
        version = catalog.version(),
        characters = catalog.characters().len(),
        unlocks = catalog.unlocks().len(),
        "catalog loaded"
    );
    let engine = Engine::new(catalog, config)?;

    if args.compare {
        let variants = vec![None, plan];
        let results = engine.simulate_variants(&snapshot, &variants);
        let labels = ["idle", "active"];
        if args.json {
            let out: Vec<_> = results
                .iter()
                .zip(labels)
                .filter_map(|(r, l)| r.as_ref().ok().map(|r| serde_json::json!({ "variant": l, "result": r })))
                .collect();
            println!("{}", serde_json::to_string_pretty(&out)?);
        } else {
            for (r, l) in results.iter().zip(labels) {
                match r {
                    Ok(r) => print_result(l, r),
                    Err(e) => println!("{l} | error: {e}"),
                }
            }
        }
        match best_variant(&results) {
            Some((i, _)) => info!(best = labels[i], "comparison finished"),
            None => bail!("every variant failed"),
        }
        return Ok(());
    }

    let result = engine.simulate(&snapshot, plan.as_ref())?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(if plan.is_some() { "active" } else { "idle" }, &result);
    }
    Ok(())
}
