//! Binspace CLI
//!
//! Operator front end for the bin address space engine. Zone state lives in
//! a directory of JSON files so that successive invocations see each other's
//! changes.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          binspace CLI                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐    ┌──────────────┐    ┌──────────────┐       │
//! │  │   Command    │───▶│ ZoneService  │───▶│ FileZone     │       │
//! │  │   (clap)     │    │              │    │ Repository   │       │
//! │  └──────────────┘    └──────┬───────┘    └──────────────┘       │
//! │                             ▼                                    │
//! │                     LoggingEventPublisher                        │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{debug, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use uuid::Uuid;

use binspace::adapters::{FileZoneRepository, LoggingEventPublisher};
use binspace::layout::{AnnotationKind, AnnotationSpec, Committed, Footprint, MoveTarget, Pivot};
use binspace::metrics;
use binspace::occupancy::ItemId;
use binspace::reconcile::OccupiedBinsAction;
use binspace::service::{ApplyRequest, ServiceConfig, ZoneService};
use binspace::structure::{StructureInput, ZoneStructure, DEFAULT_MAX_BINS};
use binspace::{ZoneCodes, ZoneId};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Binspace - warehouse bin address space management
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory holding zone and layout state
    #[arg(long, env = "BINSPACE_STATE_DIR", default_value = "./binspace-state")]
    state_dir: PathBuf,

    /// Zone to operate on
    #[arg(long, env = "BINSPACE_ZONE", global = true)]
    zone: Option<String>,

    /// Maximum bins a zone structure may define
    #[arg(long, env = "BINSPACE_MAX_BINS", default_value_t = DEFAULT_MAX_BINS)]
    max_bins: u64,

    /// Pivot used for drawn aisle outlines
    #[arg(long, env = "BINSPACE_PIVOT", value_enum, default_value = "center")]
    pivot: PivotArg,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "warn")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PivotArg {
    Center,
    Origin,
}

impl From<PivotArg> for Pivot {
    fn from(arg: PivotArg) -> Self {
        match arg {
            PivotArg::Center => Pivot::Center,
            PivotArg::Origin => Pivot::Origin,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ActionArg {
    Block,
    Force,
}

impl From<ActionArg> for OccupiedBinsAction {
    fn from(arg: ActionArg) -> Self {
        match arg {
            ActionArg::Block => OccupiedBinsAction::Block,
            ActionArg::Force => OccupiedBinsAction::Force,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum KindArg {
    Area,
    Marker,
    Label,
}

impl From<KindArg> for AnnotationKind {
    fn from(arg: KindArg) -> Self {
        match arg {
            KindArg::Area => AnnotationKind::Area,
            KindArg::Marker => AnnotationKind::Marker,
            KindArg::Label => AnnotationKind::Label,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register a zone with its warehouse and zone codes
    Register {
        #[arg(long)]
        warehouse: String,
        #[arg(long = "code")]
        zone_code: String,
    },

    /// Show registration and configuration status
    Show,

    /// Compute the effect of a structure change without applying it
    Preview {
        /// Structure file (.json, .yaml or .yml)
        structure: PathBuf,
    },

    /// Replace the zone structure
    Apply {
        /// Structure file (.json, .yaml or .yml)
        structure: PathBuf,

        /// What to do with removed bins that still hold items
        #[arg(long, value_enum)]
        action: Option<ActionArg>,

        /// Fail if the zone changed since this revision
        #[arg(long)]
        expected_revision: Option<u64>,
    },

    /// List every bin with its state and items
    Occupancy,

    /// Show one bin by address
    Lookup { address: String },

    /// Move an item between bins; omit --from to receive, --to to issue
    Transfer {
        #[arg(long)]
        item: String,
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        to: Option<String>,
    },

    /// Items detached by forced removals
    Detached,

    /// Aisle positions and annotations
    #[command(subcommand)]
    Layout(LayoutCommand),

    /// Print engine counters in the Prometheus text format
    Metrics,
}

#[derive(Subcommand, Debug)]
enum LayoutCommand {
    /// Stored aisle positions flagged against the current structure
    Status,

    /// Place an aisle
    Set {
        aisle: u32,
        #[arg(allow_negative_numbers = true)]
        x: f64,
        #[arg(allow_negative_numbers = true)]
        y: f64,
        #[arg(long, default_value_t = 0.0)]
        rotation: f64,
    },

    /// Rotate a placed aisle
    Rotate {
        aisle: u32,
        #[arg(allow_negative_numbers = true)]
        rotation: f64,
    },

    /// Drawn corners of an aisle for the given footprint
    Outline {
        aisle: u32,
        #[arg(long)]
        width: f64,
        #[arg(long)]
        height: f64,
    },

    /// Drag an aisle or annotation by an offset and commit it
    Move {
        /// Aisle number or annotation id
        target: String,
        #[arg(allow_negative_numbers = true)]
        dx: f64,
        #[arg(allow_negative_numbers = true)]
        dy: f64,
    },

    /// List annotations
    Annotations,

    /// Add an annotation
    Annotate {
        #[arg(long, value_enum)]
        kind: KindArg,
        #[arg(long)]
        x: f64,
        #[arg(long)]
        y: f64,
        #[arg(long)]
        width: f64,
        #[arg(long)]
        height: f64,
        #[arg(long, default_value_t = 0.0)]
        rotation: f64,
        #[arg(long, default_value = "")]
        label: String,
        #[arg(long)]
        color: Option<String>,
    },

    /// Remove an annotation
    RemoveAnnotation { id: Uuid },
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args);

    debug!(state_dir = %args.state_dir.display(), "Starting binspace");

    if let Command::Metrics = args.command {
        print!("{}", metrics::gather_text()?);
        return Ok(());
    }

    let config = ServiceConfig {
        max_bins: args.max_bins,
        pivot: args.pivot.into(),
        ..Default::default()
    };
    let service = ZoneService::new(
        config,
        Arc::new(FileZoneRepository::new(args.state_dir.clone())),
        Arc::new(LoggingEventPublisher::info_level()),
    );

    let zone = ZoneId::new(
        args.zone
            .clone()
            .context("no zone given; pass --zone or set BINSPACE_ZONE")?,
    );

    if let Command::Register {
        warehouse,
        zone_code,
    } = &args.command
    {
        let summary = service
            .configure_zone(&zone, ZoneCodes::new(warehouse.as_str(), zone_code.as_str()))
            .await?;
        info!(zone = %zone, "Zone registered");
        return print_json(&summary);
    }

    service
        .open_zone(&zone)
        .await
        .with_context(|| format!("zone '{}' is not registered", zone))?;

    run(&service, &zone, args.command).await
}

async fn run(service: &ZoneService, zone: &ZoneId, command: Command) -> Result<()> {
    match command {
        Command::Register { .. } | Command::Metrics => Ok(()),
        Command::Show => print_json(&service.summary(zone).await?),
        Command::Preview { structure } => {
            let structure = read_structure(&structure)?;
            print_json(&service.preview(zone, &structure).await?)
        }
        Command::Apply {
            structure,
            action,
            expected_revision,
        } => {
            let mut request = ApplyRequest::new(read_structure(&structure)?);
            if let Some(action) = action {
                request = request.with_action(action.into());
            }
            if let Some(revision) = expected_revision {
                request = request.expecting_revision(revision);
            }
            let outcome = service.apply(zone, request).await?;
            info!(
                zone = %zone,
                revision = outcome.revision,
                created = outcome.bins_created,
                deleted = outcome.bins_deleted,
                "Structure applied"
            );
            print_json(&outcome)
        }
        Command::Occupancy => print_json(&service.occupancy(zone).await?),
        Command::Lookup { address } => print_json(&service.lookup(zone, &address).await?),
        Command::Transfer { item, from, to } => {
            if from.is_none() && to.is_none() {
                bail!("transfer needs --from, --to or both");
            }
            let receipt = service
                .transfer(zone, &ItemId::new(item), from.as_deref(), to.as_deref())
                .await?;
            print_json(&receipt)
        }
        Command::Detached => print_json(&service.detached_items(zone).await?),
        Command::Layout(layout) => run_layout(service, zone, layout).await,
    }
}

async fn run_layout(service: &ZoneService, zone: &ZoneId, command: LayoutCommand) -> Result<()> {
    match command {
        LayoutCommand::Status => print_json(&service.layout_status(zone).await?),
        LayoutCommand::Set {
            aisle,
            x,
            y,
            rotation,
        } => print_json(&service.set_aisle_position(zone, aisle, x, y, rotation).await?),
        LayoutCommand::Rotate { aisle, rotation } => {
            print_json(&service.rotate_aisle(zone, aisle, rotation).await?)
        }
        LayoutCommand::Outline {
            aisle,
            width,
            height,
        } => print_json(&service.aisle_outline(zone, aisle, Footprint::new(width, height))?),
        LayoutCommand::Move { target, dx, dy } => {
            let target = parse_target(&target)?;
            service.begin_move(zone, target)?;
            service.apply_delta(zone, target, dx, dy)?;
            match service.commit_move(zone, target).await? {
                Committed::Aisle(position) => print_json(&position),
                Committed::Annotation(annotation) => print_json(&annotation),
            }
        }
        LayoutCommand::Annotations => print_json(&service.annotations(zone)?),
        LayoutCommand::Annotate {
            kind,
            x,
            y,
            width,
            height,
            rotation,
            label,
            color,
        } => {
            let mut spec = AnnotationSpec::new(kind.into(), x, y, width, height)
                .with_rotation(rotation)
                .with_label(label);
            if let Some(color) = color {
                spec = spec.with_color(color);
            }
            print_json(&service.add_annotation(zone, spec).await?)
        }
        LayoutCommand::RemoveAnnotation { id } => {
            print_json(&service.remove_annotation(zone, &id).await?)
        }
    }
}

// =============================================================================
// Input / Output
// =============================================================================

/// Aisle numbers are plain integers, anything else must be an annotation id.
fn parse_target(raw: &str) -> Result<MoveTarget> {
    if let Ok(aisle) = raw.parse::<u32>() {
        return Ok(MoveTarget::Aisle(aisle));
    }
    let id = Uuid::parse_str(raw)
        .with_context(|| format!("'{}' is neither an aisle number nor an annotation id", raw))?;
    Ok(MoveTarget::Annotation(id))
}

fn read_structure(path: &Path) -> Result<ZoneStructure> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    let input: StructureInput = match path.extension().and_then(|e| e.to_str()) {
        Some("yaml") | Some("yml") => serde_yaml::from_str(&raw)
            .with_context(|| format!("invalid YAML in {}", path.display()))?,
        _ => serde_json::from_str(&raw)
            .with_context(|| format!("invalid JSON in {}", path.display()))?,
    };

    Ok(ZoneStructure::try_from(input)?)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));

    // Logs go to stderr so command output stays parseable
    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}
