//! OpenMunicipio CLI
//!
//! Command-line interface for loading municipal data into the record store:
//! - `setup`: create the council, city government and mayor institutions
//! - `import-acts`: import OM-XML deliberations, interrogations or motions
//! - `import-people`: import a location's charges from openpolis
//! - `stats`: row counts of the store

mod config;

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;
use config::OmConfig;
use openmunicipio_ingest_acts::{import_acts, ActType, ImportRequest, NullIndex, RecordKind};
use openmunicipio_ingest_people::{import_location, LocationSource};
use openmunicipio_storage::{setup_municipality, MunicipalStore};
use std::path::PathBuf;
use tracing::Level;

#[derive(Parser)]
#[command(name = "om")]
#[command(author, version, about = "OpenMunicipio data import tools")]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the municipality's institutions (idempotent)
    Setup {
        /// Municipality name, e.g. `Udine`
        #[arg(long)]
        name: String,
    },

    /// Import acts from OM-XML files
    ImportActs {
        /// Act XML files
        files: Vec<PathBuf>,

        /// Rebuild supports and attachments of acts already in the store
        #[arg(long)]
        overwrite: bool,

        /// XML file with the people referenced by the acts
        #[arg(long)]
        people_file: Option<PathBuf>,

        /// CouncilDeliberation, Interrogation or Motion
        #[arg(long, default_value = "CouncilDeliberation")]
        act_type: String,
    },

    /// Import a location's institution charges from openpolis
    ImportPeople {
        /// Openpolis location id
        location_id: String,

        /// Read the location JSON from a file instead of the API
        #[arg(long)]
        from_file: Option<PathBuf>,

        /// Clear persons, charges, groups and their act supports first
        #[arg(long)]
        overwrite: bool,
    },

    /// Print row counts
    Stats {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let config = OmConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Setup { name } => cmd_setup(&config, &name),
        Commands::ImportActs {
            files,
            overwrite,
            people_file,
            act_type,
        } => cmd_import_acts(&config, files, overwrite, people_file, &act_type),
        Commands::ImportPeople {
            location_id,
            from_file,
            overwrite,
        } => cmd_import_people(&config, &location_id, from_file, overwrite),
        Commands::Stats { json } => cmd_stats(&config, json),
    }
}

/// `-v` wins over `OM_LOG`; the default is warnings only.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => std::env::var("OM_LOG")
            .ok()
            .and_then(|v| v.parse::<Level>().ok())
            .unwrap_or(Level::WARN),
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn open_store(config: &OmConfig) -> Result<MunicipalStore> {
    MunicipalStore::open(config.storage())
        .with_context(|| format!("opening store in {}", config.data_dir.display()))
}

fn cmd_setup(config: &OmConfig, name: &str) -> Result<()> {
    let store = open_store(config)?;
    let municipality = setup_municipality(&store, name);
    store.flush()?;
    eprintln!(
        "{} {} (council {}, city government {}, mayor {})",
        "Set up".green().bold(),
        name.bold(),
        municipality.council,
        municipality.city_government,
        municipality.mayor
    );
    Ok(())
}

fn cmd_import_acts(
    config: &OmConfig,
    files: Vec<PathBuf>,
    overwrite: bool,
    people_file: Option<PathBuf>,
    act_type: &str,
) -> Result<()> {
    let act_type: ActType = act_type.parse()?;
    let people_file = people_file
        .or_else(|| config.people_file.clone())
        .ok_or_else(|| {
            anyhow!("no people file: pass --people-file or set `people_file` in the config")
        })?;

    let store = open_store(config)?;
    let extractor = config
        .extractor
        .build(config.timeout())
        .context("configuring text extraction")?;

    eprintln!(
        "{} {} file(s) as {}",
        "Importing".green().bold(),
        files.len(),
        act_type.to_string().bold()
    );
    let request = ImportRequest {
        files,
        people_file,
        act_type,
        overwrite,
    };
    let report = import_acts(&store, &request, extractor.as_deref(), &NullIndex)?;

    eprintln!(
        "{} {} created, {} found, {} supports, {} attachments, {} texts",
        "Imported".green().bold(),
        report.acts_created,
        report.acts_found,
        report.supports_created + report.supports_updated,
        report.attachments_created + report.attachments_updated,
        report.texts_extracted
    );
    if !report.skips.is_empty() {
        eprintln!(
            "{} {} act(s), {} subscriber set(s), {} support(s), {} attachment(s)",
            "Skipped".yellow().bold(),
            report.skipped(RecordKind::Act),
            report.skipped(RecordKind::SubscriberSet),
            report.skipped(RecordKind::Support),
            report.skipped(RecordKind::Attachment)
        );
        for skip in &report.skips {
            eprintln!("  {skip}");
        }
    }
    if report.extraction_failures > 0 {
        eprintln!(
            "{} {} text extraction(s) failed",
            "Warning".yellow().bold(),
            report.extraction_failures
        );
    }
    println!("done");
    Ok(())
}

fn cmd_import_people(
    config: &OmConfig,
    location_id: &str,
    from_file: Option<PathBuf>,
    overwrite: bool,
) -> Result<()> {
    let source = match from_file {
        Some(path) => LocationSource::File(path),
        None => LocationSource::Api {
            config: config.api(),
            location_id: location_id.to_string(),
        },
    };
    let data = source
        .load()
        .with_context(|| format!("loading openpolis location {location_id}"))?;

    let store = open_store(config)?;
    let report = import_location(&store, &data, overwrite)?;

    let mut current = None;
    for (organ, line) in &report.members {
        if current != Some(*organ) {
            let title = organ.as_str();
            println!("{}\n{}", title, "=".repeat(title.len()));
            current = Some(*organ);
        }
        println!("{line}");
    }
    for line in &report.skipped {
        eprintln!("{} {line}", "Skipped".yellow().bold());
    }
    eprintln!(
        "{} {} persons, {} charges, {} responsabilities, {} group charges",
        "Created".green().bold(),
        report.persons_created,
        report.charges_created,
        report.responsabilities_created,
        report.group_charges_created
    );
    Ok(())
}

fn cmd_stats(config: &OmConfig, json: bool) -> Result<()> {
    let store = open_store(config)?;
    let stats = store.stats();
    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    let rows = [
        ("institutions", stats.institutions),
        ("persons", stats.persons),
        ("charges", stats.charges),
        ("responsabilities", stats.responsabilities),
        ("groups", stats.groups),
        ("group charges", stats.group_charges),
        ("acts", stats.acts),
        ("  deliberations", stats.deliberations),
        ("  interrogations", stats.interrogations),
        ("  motions", stats.motions),
        ("supports", stats.supports),
        ("attachments", stats.attachments),
    ];
    for (label, count) in rows {
        println!("{:<18} {}", label, count.to_string().bold());
    }
    Ok(())
}
