use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use waiter_runner::{CommandSink, Config, Waiter};

/// A waiter goes to the kitchen to get an order, delivers it, and then loops again.
#[derive(Parser)]
#[command(name = "waiter", version)]
struct Cli {
    /// Directory holding the order database shared by all waiters
    #[arg(short, long)]
    kitchen: Option<String>,

    /// Name of the database inside the kitchen (default: simplewaiter)
    #[arg(long)]
    db: Option<String>,

    /// Name recorded on delivered orders (default: hostname/pid)
    #[arg(short, long)]
    name: Option<String>,

    /// TOML config file; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Display the number of orders per status
    Status {
        #[arg(long)]
        json: bool,
    },

    /// Extract all orders and their status as CSV
    Extract {
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Get orders and deliver them until none are READY
    Deliver {
        /// Command and params prepended to each order's arguments
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        deliver: Vec<String>,
    },

    /// Load orders from a CSV file (`-` for stdin), one order per row
    Load { orders: PathBuf },

    /// Delete all orders
    Clean,

    /// Reset RUNNING and ERROR orders to READY
    Reset,
}

impl Cli {
    fn config(&self) -> Result<Config> {
        let mut cfg = match &self.config {
            Some(path) => Config::load_from(path)?,
            None => Config::default(),
        };
        if let Some(kitchen) = &self.kitchen {
            cfg.store.kitchen = kitchen.clone();
        }
        if let Some(db) = &self.db {
            cfg.store.database = db.clone();
        }
        if let Some(name) = &self.name {
            cfg.waiter.name = Some(name.clone());
        }
        Ok(cfg)
    }
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).init();

    let cli = Cli::parse();
    let cfg = cli.config()?;
    let waiter = Waiter::open(&cfg)?;
    info!(waiter = %waiter.name(), store = %cfg.database_path().display(), "opened kitchen");

    match cli.cmd {
        Command::Status { json } => {
            let summary = waiter.status_summary()?;
            if json {
                let rows: Vec<_> = summary
                    .iter()
                    .map(|(status, count)| serde_json::json!({ "status": status, "count": count }))
                    .collect();
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                for (status, count) in summary {
                    println!("{}\t{}", status, count);
                }
            }
        }
        Command::Load { orders } => {
            let n = if orders.as_os_str() == "-" {
                waiter.load_csv(io::stdin().lock())?
            } else {
                let f = File::open(&orders).with_context(|| format!("open {}", orders.display()))?;
                waiter.load_csv(BufReader::new(f))?
            };
            println!("Loaded {} orders", n);
        }
        Command::Deliver { deliver } => {
            let sink = CommandSink::new(deliver).shell(cfg.deliver.shell);
            let mut n = 0;
            while waiter.claim_and_deliver_once(&sink)?.processed() {
                println!(".");
                n += 1;
            }
            println!("Done. Delivered {} orders.", n);
        }
        Command::Reset => {
            let n = waiter.reset_stuck()?;
            println!("Reset {} orders", n);
        }
        Command::Clean => {
            waiter.clean_all()?;
            println!("Cleaned database.");
        }
        Command::Extract { output } => match output {
            Some(path) => {
                let f = File::create(&path).with_context(|| format!("create {}", path.display()))?;
                waiter.extract_csv(BufWriter::new(f))?;
            }
            None => {
                let stdout = io::stdout();
                let mut out = stdout.lock();
                waiter.extract_csv(&mut out)?;
                out.flush()?;
            }
        },
    }

    Ok(())
}
