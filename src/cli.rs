//! The command line interface for the engine.
use crate::clock::{Clock, SystemClock};
use crate::graph::{MaterialID, OrphanPolicy, RegionID, filter_flow_graph};
use crate::id::IDCollection;
use crate::input::{ReferenceData, ReferenceSource};
use crate::log;
use crate::model::parameters::{
    MiningParameters, ReactorParameters, apply_overrides, parse_override,
};
use crate::model::project::{ProjectOptions, estimate_project};
use crate::model::{DerivedResult, ModelEvaluator, ParameterSet};
use crate::output::{
    DataWriter, RunMetadata, create_output_directory, export_records, write_metadata,
};
use crate::rng::create_rng;
use crate::session::{SessionEvent, SimulatorSession};
use crate::settings::Settings;
use ::log::info;
use anyhow::{Context, Result};
use chrono::TimeDelta;
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use petgraph::visit::EdgeRef;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::thread;

pub mod settings;
use settings::SettingsSubcommands;

/// How often the `watch` command redraws while values are moving
const FRAME_INTERVAL: TimeDelta = TimeDelta::milliseconds(50);

/// The longest the `watch` command sleeps between checks of its timers
const MAX_WAIT: TimeDelta = TimeDelta::seconds(1);

/// The command line interface for the engine.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// The available commands.
    #[command(subcommand)]
    command: Option<Commands>,
    /// Flag to provide the CLI docs as markdown
    #[arg(long, hide = true)]
    markdown_help: bool,
}

/// Options shared by commands which evaluate a model
#[derive(Args, Default)]
pub struct EvaluateOpts {
    /// Seed for the random source (overrides the settings file)
    #[arg(long)]
    pub seed: Option<u64>,
    /// Set a model parameter, given as key=value
    #[arg(short, long = "param", value_parser = parse_override)]
    pub params: Vec<(String, String)>,
    /// Directory for output files
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
    /// Directory containing reference data to use instead of the bundled files
    #[arg(long)]
    pub reference: Option<PathBuf>,
}

/// The parametric models
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ModelKind {
    /// Raw material mining
    #[default]
    Mining,
    /// Reactor electricity costs
    Reactor,
}

impl ModelKind {
    /// The default parameters for this model with `overrides` applied
    pub fn parameters(self, overrides: &[(String, String)]) -> Result<ParameterSet> {
        let params = match self {
            Self::Mining => {
                ParameterSet::Mining(apply_overrides(&MiningParameters::default(), overrides)?)
            }
            Self::Reactor => {
                ParameterSet::Reactor(apply_overrides(&ReactorParameters::default(), overrides)?)
            }
        };

        Ok(params)
    }
}

/// Options for the project command
#[derive(Args)]
pub struct ProjectOpts {
    /// Number of reactors to build
    #[arg(long, default_value_t = 1)]
    pub count: u32,
    /// Include fuel costs
    #[arg(long)]
    pub fuel: bool,
    /// Include a decommissioning provision
    #[arg(long)]
    pub decommissioning: bool,
    /// Multiplier for regional construction costs (0.5 to 2.0)
    #[arg(long, default_value_t = 1.0)]
    pub country_factor: f64,
    /// Directory containing reference data to use instead of the bundled files
    #[arg(long)]
    pub reference: Option<PathBuf>,
}

/// Options for the flow command
#[derive(Args, Default)]
pub struct FlowOpts {
    /// Hide a region (may be repeated)
    #[arg(long)]
    pub disable_region: Vec<String>,
    /// Hide a material (may be repeated)
    #[arg(long)]
    pub disable_material: Vec<String>,
    /// Remove hidden nodes rather than leaving them disconnected
    #[arg(long)]
    pub drop_orphans: bool,
    /// Directory containing reference data to use instead of the bundled files
    #[arg(long)]
    pub reference: Option<PathBuf>,
}

/// The available commands.
#[derive(Subcommand)]
enum Commands {
    /// Evaluate the mining model.
    Mine {
        /// Evaluation options
        #[command(flatten)]
        opts: EvaluateOpts,
    },
    /// Evaluate the reactor cost model.
    Reactor {
        /// Evaluation options
        #[command(flatten)]
        opts: EvaluateOpts,
    },
    /// Estimate the cost of a reactor construction project.
    Project {
        /// The ID of the reactor design (e.g. smr)
        reactor: String,
        /// Project options
        #[command(flatten)]
        opts: ProjectOpts,
    },
    /// Filter the supply chain flow graph.
    Flow {
        /// Filter options
        #[command(flatten)]
        opts: FlowOpts,
    },
    /// Run a live session which refreshes results in real time.
    Watch {
        /// The model to evaluate
        #[arg(long, value_enum, default_value_t)]
        model: ModelKind,
        /// Stop after this many refreshes
        #[arg(long)]
        ticks: Option<u32>,
        /// Evaluation options
        #[command(flatten)]
        opts: EvaluateOpts,
    },
    /// Manage settings file.
    Settings {
        /// The subcommands for managing the settings file
        #[command(subcommand)]
        subcommand: SettingsSubcommands,
    },
}

impl Commands {
    /// Execute the supplied CLI command
    fn execute(self) -> Result<()> {
        match self {
            Self::Mine { opts } => handle_evaluate_command(ModelKind::Mining, &opts, None),
            Self::Reactor { opts } => handle_evaluate_command(ModelKind::Reactor, &opts, None),
            Self::Project { reactor, opts } => handle_project_command(&reactor, &opts, None),
            Self::Flow { opts } => handle_flow_command(&opts, None),
            Self::Watch { model, ticks, opts } => handle_watch_command(model, ticks, &opts, None),
            Self::Settings { subcommand } => subcommand.execute(),
        }
    }
}

/// Parse CLI arguments and run the requested command
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    // Invoked as: `$ fuelcycle --markdown-help`
    if cli.markdown_help {
        clap_markdown::print_help_markdown::<Cli>();
        return Ok(());
    }

    let Some(command) = cli.command else {
        let help_str = Cli::command().render_long_help().to_string();
        println!("{help_str}");
        return Ok(());
    };

    command.execute()
}

/// Load program settings, if not provided
fn load_settings(settings: Option<Settings>) -> Result<Settings> {
    match settings {
        Some(settings) => Ok(settings),
        None => Settings::load().context("Failed to load settings."),
    }
}

/// Initialise the program logger, creating the output directory for log files if given
fn init_logging(settings: &Settings, output_dir: Option<&Path>) -> Result<()> {
    if let Some(output_dir) = output_dir {
        create_output_directory(output_dir)?;
    }

    log::init(Some(settings.log_level.as_str()), output_dir)
        .context("Failed to initialise logging.")
}

fn load_reference(dir: Option<&Path>) -> Result<ReferenceData> {
    let reference = ReferenceData::load(&ReferenceSource::from_dir(dir))
        .context("Failed to load reference data.")?;
    if let Some(dir) = dir {
        info!("Loaded reference data from {}", dir.display());
    }

    Ok(reference)
}

fn print_result(result: &DerivedResult) {
    for record in export_records(result) {
        println!("{:<22}{:>16.2} {}", record.label, record.value, record.unit);
    }
}

/// Handle the `mine` and `reactor` commands.
pub fn handle_evaluate_command(
    model: ModelKind,
    opts: &EvaluateOpts,
    settings: Option<Settings>,
) -> Result<()> {
    let settings = load_settings(settings)?;
    init_logging(&settings, opts.output_dir.as_deref())?;

    let params = model.parameters(&opts.params)?;
    let reference = load_reference(opts.reference.as_deref())?;
    let seed = opts.seed.or(settings.seed);
    let evaluator = ModelEvaluator::new(Rc::new(reference), settings.series_band);
    let result = evaluator
        .evaluate(&params, &mut create_rng(seed), SystemClock.now())
        .with_context(|| format!("Failed to evaluate {} model.", params.model_name()))?;
    print_result(&result);

    if let Some(output_dir) = &opts.output_dir {
        let mut writer = DataWriter::create(output_dir)?;
        writer.write_result(&result)?;
        writer.flush()?;
        write_metadata(
            output_dir,
            &RunMetadata::new(params.model_name(), seed, result.timestamp),
        )?;
        info!("Results written to {}", output_dir.display());
    }

    Ok(())
}

/// Handle the `project` command.
pub fn handle_project_command(
    reactor_id: &str,
    opts: &ProjectOpts,
    settings: Option<Settings>,
) -> Result<()> {
    let settings = load_settings(settings)?;
    init_logging(&settings, None)?;

    let reference = load_reference(opts.reference.as_deref())?;
    let reactor = reference
        .reactor_catalogue
        .get(reactor_id)
        .with_context(|| format!("Unknown reactor type: {reactor_id}"))?;
    let options = ProjectOptions {
        count: opts.count,
        include_fuel: opts.fuel,
        include_decommissioning: opts.decommissioning,
        country_factor: opts.country_factor,
    };
    let estimate = estimate_project(reactor, &options)?;

    println!("{} x {}", options.count, reactor.name);
    println!(
        "Total cost:  ${:.0}M - ${:.0}M",
        estimate.total_cost.min, estimate.total_cost.max
    );
    println!(
        "Cost per MW: ${:.2}M - ${:.2}M",
        estimate.cost_per_mw.min, estimate.cost_per_mw.max
    );
    println!(
        "Timeline:    {:.1} - {:.1} years",
        estimate.timeline.min, estimate.timeline.max
    );

    Ok(())
}

/// Handle the `flow` command.
pub fn handle_flow_command(opts: &FlowOpts, settings: Option<Settings>) -> Result<()> {
    let settings = load_settings(settings)?;
    init_logging(&settings, None)?;

    let supply_chain = load_reference(opts.reference.as_deref())?.supply_chain;
    let disabled_regions = opts
        .disable_region
        .iter()
        .map(|region| supply_chain.regions.get_id_by_str(region))
        .collect::<Result<HashSet<RegionID>>>()?;
    let disabled_materials = opts
        .disable_material
        .iter()
        .map(|material| supply_chain.materials.get_id_by_str(material))
        .collect::<Result<HashSet<MaterialID>>>()?;

    let enabled_regions: HashSet<RegionID> = supply_chain
        .regions
        .iter()
        .filter(|region| !disabled_regions.contains(*region))
        .cloned()
        .collect();
    let enabled_materials: HashSet<MaterialID> = supply_chain
        .materials
        .iter()
        .filter(|material| !disabled_materials.contains(*material))
        .cloned()
        .collect();
    let policy = if opts.drop_orphans {
        OrphanPolicy::Drop
    } else {
        OrphanPolicy::Keep
    };

    let graph = filter_flow_graph(
        &supply_chain.graph,
        &enabled_regions,
        &enabled_materials,
        policy,
    );
    info!(
        "{} of {} links shown",
        graph.edge_count(),
        supply_chain.graph.edge_count()
    );
    for edge in graph.edge_references() {
        println!(
            "{} -> {}: {}",
            graph[edge.source()],
            graph[edge.target()],
            edge.weight().value
        );
    }

    Ok(())
}

/// Handle the `watch` command.
///
/// Runs until `ticks` refreshes have happened, or forever if `ticks` is `None`.
pub fn handle_watch_command(
    model: ModelKind,
    ticks: Option<u32>,
    opts: &EvaluateOpts,
    settings: Option<Settings>,
) -> Result<()> {
    let settings = load_settings(settings)?;
    init_logging(&settings, opts.output_dir.as_deref())?;

    let params = model.parameters(&opts.params)?;
    let reference = Rc::new(load_reference(opts.reference.as_deref())?);
    let seed = opts.seed.or(settings.seed);
    let mut writer = opts
        .output_dir
        .as_deref()
        .map(DataWriter::create)
        .transpose()?;

    let clock = SystemClock;
    let mut session =
        SimulatorSession::mount(params, reference, &settings, create_rng(seed), clock.now())?;
    let mut refreshes = 0;
    while ticks.is_none_or(|ticks| refreshes < ticks) {
        let now = clock.now();
        session.advance(now);

        for event in session.drain_events() {
            match event {
                SessionEvent::Evaluated(result) => {
                    info!("Evaluation complete");
                    print_result(&result);
                    if let Some(writer) = &mut writer {
                        writer.write_result(&result)?;
                    }
                }
                SessionEvent::EvaluationFailed(err) => {
                    session.teardown();
                    return Err(err).context("Failed to evaluate model.");
                }
                SessionEvent::Ticked(result) => {
                    refreshes += 1;
                    info!(
                        "Refreshed at {}: headline cost {:.2}",
                        result.timestamp.format("%H:%M:%S"),
                        result.metrics.headline_cost()
                    );
                    if let Some(writer) = &mut writer {
                        writer.write_result(&result)?;
                    }
                }
                SessionEvent::TickFailed(_) | SessionEvent::TickSuperseded => refreshes += 1,
            }
        }
        if let Some(writer) = &mut writer {
            writer.flush()?;
        }

        let wait = if session.is_animating() {
            FRAME_INTERVAL
        } else {
            session
                .next_due()
                .map_or(MAX_WAIT, |due| (due - now).clamp(TimeDelta::zero(), MAX_WAIT))
        };
        thread::sleep(wait.to_std().unwrap_or_default());
    }

    session.teardown();
    if let Some(output_dir) = &opts.output_dir {
        let timestamp = session
            .result()
            .map_or_else(|| clock.now(), |result| result.timestamp);
        write_metadata(
            output_dir,
            &RunMetadata::new(session.parameters().model_name(), seed, timestamp),
        )?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use float_cmp::assert_approx_eq;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_watch_command() {
        let cli = Cli::try_parse_from([
            "fuelcycle", "watch", "--model", "reactor", "--ticks", "3", "-p", "capacity=600",
        ])
        .unwrap();
        let Some(Commands::Watch { model, ticks, opts }) = cli.command else {
            panic!("Expected watch command");
        };
        assert_eq!(model, ModelKind::Reactor);
        assert_eq!(ticks, Some(3));
        assert_eq!(opts.params, [("capacity".to_string(), "600".to_string())]);
    }

    #[test]
    fn test_model_parameters_with_overrides() {
        let overrides = [("concentration".to_string(), "0.2".to_string())];
        let ParameterSet::Mining(params) = ModelKind::Mining.parameters(&overrides).unwrap() else {
            panic!("Expected mining parameters");
        };
        assert_approx_eq!(f64, params.concentration, 0.2);
    }

    #[test]
    fn test_model_parameters_unknown_key() {
        let overrides = [("colour".to_string(), "blue".to_string())];
        assert_error!(
            ModelKind::Reactor.parameters(&overrides),
            "Invalid parameter override"
        );
    }
}
