//! ipban: CLI tool for validating, importing and checking IP bans.

use clap::{Parser, Subcommand};
use ipban::{
    AddressSpec, BanId, BanOrder, BanQuery, BanRegistry, Category, CreatorId, JsonFileStore,
    LogAuditSink, PolicyEngine, RegistryConfig, Validation,
};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "ipban")]
#[command(version)]
#[command(about = "Validate, import and check CIDR IP bans", long_about = None)]
struct Cli {
    /// Registry configuration (YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check addresses against a text ban list
    Check {
        /// Ban list file
        #[arg(short, long)]
        bans: PathBuf,

        /// Ban category to check
        #[arg(short = 't', long, default_value = "full")]
        category: Category,

        /// Addresses to check
        #[arg(required = true)]
        addresses: Vec<String>,
    },

    /// Run the ban policy against a candidate address or subnet
    Validate {
        /// Candidate address or subnet
        address: String,

        /// Ban category
        #[arg(short = 't', long, default_value = "full")]
        category: Category,
    },

    /// Import a text ban list into a JSON store
    Import {
        /// Ban list file
        #[arg(short, long)]
        bans: PathBuf,

        /// JSON store file
        #[arg(short, long)]
        store: PathBuf,

        /// Creator id recorded on imported bans
        #[arg(long, default_value_t = 0)]
        creator: u64,
    },

    /// List bans from a JSON store
    List {
        /// JSON store file
        #[arg(short, long)]
        store: PathBuf,

        /// Only this category
        #[arg(short = 't', long)]
        category: Option<Category>,

        /// Only deleted (true) or active (false) bans
        #[arg(long)]
        deleted: Option<bool>,

        /// Order, e.g. created_at, last_hit_at_asc
        #[arg(short, long)]
        order: Option<String>,
    },

    /// Soft-delete or restore a ban in a JSON store
    Delete {
        /// JSON store file
        #[arg(short, long)]
        store: PathBuf,

        /// Ban id
        id: u64,

        /// Acting user id
        #[arg(long, default_value_t = 0)]
        actor: u64,

        /// Restore instead of delete
        #[arg(long)]
        undo: bool,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let result = load_config(cli.config.as_deref()).and_then(|config| match cli.command {
        Commands::Check {
            bans,
            category,
            addresses,
        } => check(&bans, category, &addresses, config),
        Commands::Validate { address, category } => validate(&address, category),
        Commands::Import {
            bans,
            store,
            creator,
        } => import(&bans, &store, CreatorId(creator), config),
        Commands::List {
            store,
            category,
            deleted,
            order,
        } => list(&store, category, deleted, order.as_deref(), config),
        Commands::Delete {
            store,
            id,
            actor,
            undo,
        } => delete(&store, BanId(id), CreatorId(actor), !undo, config),
    });

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

type CliResult = Result<(), Box<dyn std::error::Error>>;

fn load_config(path: Option<&Path>) -> Result<RegistryConfig, Box<dyn std::error::Error>> {
    match path {
        Some(path) => Ok(RegistryConfig::load(path)?),
        None => Ok(RegistryConfig::default()),
    }
}

fn open_store(path: &Path, config: RegistryConfig) -> Result<BanRegistry, Box<dyn std::error::Error>> {
    let store = Arc::new(JsonFileStore::open(path)?);
    Ok(BanRegistry::open(store, Arc::new(LogAuditSink), config)?)
}

fn check(bans: &Path, category: Category, addresses: &[String], config: RegistryConfig) -> CliResult {
    let registry = BanRegistry::new(config);
    let report = registry.import_from_reader(File::open(bans)?, CreatorId(0))?;
    for failure in &report.rejected {
        log::warn!("{}:{}: {} ({})", bans.display(), failure.line, failure.text, failure.error);
    }

    for text in addresses {
        let address = AddressSpec::parse(text)?;
        match registry.check(&address, category) {
            Some(ban) => println!(
                "{}\tBANNED\t{} {} ({})",
                address, ban.id, ban.subnet, ban.reason
            ),
            None => println!("{}\tok", address),
        }
    }
    Ok(())
}

fn validate(address: &str, category: Category) -> CliResult {
    let spec = match AddressSpec::parse(address) {
        Ok(spec) => Some(spec),
        Err(ipban::ParseError::Empty) => None,
        Err(e) => return Err(e.into()),
    };
    match PolicyEngine::validate(spec.as_ref(), category, false, false) {
        Validation::Ok => {
            println!("{} may be banned ({})", address.trim(), category);
            Ok(())
        }
        Validation::Rejected(reason) => Err(format!("{}: {}", address.trim(), reason).into()),
    }
}

fn import(bans: &Path, store: &Path, creator: CreatorId, config: RegistryConfig) -> CliResult {
    let registry = open_store(store, config)?;
    let report = registry.import_from_reader(File::open(bans)?, creator)?;

    for failure in &report.rejected {
        println!("line {}: {} ({})", failure.line, failure.text, failure.error);
    }
    println!(
        "Imported {} bans into {:?} ({} rejected)",
        report.created.len(),
        store,
        report.rejected.len()
    );
    Ok(())
}

fn list(
    store: &Path,
    category: Option<Category>,
    deleted: Option<bool>,
    order: Option<&str>,
    config: RegistryConfig,
) -> CliResult {
    let registry = open_store(store, config)?;

    let mut query = BanQuery::new();
    query.category = category;
    query.is_deleted = deleted;
    if let Some(order) = order {
        query.order = BanOrder::parse(order).ok_or_else(|| format!("unknown order: {}", order))?;
    }

    let records = registry.list(&query);
    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}

fn delete(store: &Path, id: BanId, actor: CreatorId, deleted: bool, config: RegistryConfig) -> CliResult {
    let registry = open_store(store, config)?;
    let record = registry.set_deleted(id, deleted, actor)?;
    println!(
        "Ban {} on {} is now {}",
        record.id,
        record.subnet,
        if record.is_deleted { "deleted" } else { "active" }
    );
    Ok(())
}
