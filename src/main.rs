use anyhow::{bail, Result};
use ledger_reconcile::{
    load_portfolio, read_checksum, write_checksum, write_partitioned, AccountRegistry,
    PortfolioConfig, Reconciler, CHECKSUM_FILE,
};
use std::env;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: ledger-reconcile <portfolio-dir> [--force] [--dry-run]";

struct Args {
    dir: PathBuf,
    /// Accept edited settled history and re-anchor the checksum
    force: bool,
    /// Reconcile and report, write nothing
    dry_run: bool,
}

fn parse_args() -> Result<Args> {
    let mut dir = None;
    let mut force = false;
    let mut dry_run = false;

    for arg in env::args().skip(1) {
        match arg.as_str() {
            "--force" => force = true,
            "--dry-run" => dry_run = true,
            "-h" | "--help" => {
                println!("{}", USAGE);
                std::process::exit(0);
            }
            flag if flag.starts_with('-') => bail!("unknown option '{}'\n{}", flag, USAGE),
            path if dir.is_none() => dir = Some(PathBuf::from(path)),
            extra => bail!("unexpected argument '{}'\n{}", extra, USAGE),
        }
    }

    match dir {
        Some(dir) => Ok(Args { dir, force, dry_run }),
        None => bail!("{}", USAGE),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = parse_args()?;
    run(&args)
}

fn run(args: &Args) -> Result<()> {
    let mut portfolio = PortfolioConfig::load(&args.dir)?;
    if args.force {
        portfolio.reconcile.forced_hash = true;
    }
    let registry = AccountRegistry::from_accounts(&portfolio.accounts);

    println!("📂 Loading entry files from {}", args.dir.display());
    let rows = load_portfolio(&args.dir)?;
    if rows.is_empty() {
        bail!("no entry files found in {}", args.dir.display());
    }
    println!("✓ Loaded {} entries", rows.len());

    let checksum_path = args.dir.join(CHECKSUM_FILE);
    let trusted = read_checksum(&checksum_path)?;

    let ledger = Reconciler::new(portfolio.reconcile.clone())
        .with_registry(registry.clone())
        .run(&rows, trusted.as_ref())?;

    if !registry.is_empty() {
        let unregistered = registry.unregistered(&ledger.entries);
        if !unregistered.is_empty() {
            for origin in &unregistered {
                eprintln!("   unregistered account name/mask at {}", origin);
            }
            bail!("{} entries have unregistered account name and mask pairs", unregistered.len());
        }
    }

    println!("\n⚖️  Accounts");
    for account in &ledger.accounts {
        println!("   {}", account.summary());
    }

    if args.dry_run {
        println!("\n✓ Dry run: {} (nothing written)", ledger.summary());
        return Ok(());
    }

    let files = write_partitioned(&ledger)?;
    write_checksum(&checksum_path, &ledger.checksum)?;
    println!("\n✅ {} ({} files written)", ledger.summary(), files);

    Ok(())
}
