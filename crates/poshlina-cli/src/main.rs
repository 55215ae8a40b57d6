mod display;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use poshlina_core::{CalculationRequest, CourtType, ExemptionManager};
use poshlina_store::FileStore;
use poshlina_sync::{
    DataServiceConfig, FeeDataService, HttpScheduleSource, OfflineSource, ScheduleSource,
};

#[derive(Parser)]
#[command(name = "poshlina", version, about = "Russian court fee calculator")]
struct Cli {
    /// Directory holding the offline fee-data cache.
    #[arg(long, env = "POSHLINA_CACHE_DIR", default_value = ".poshlina-cache")]
    cache_dir: PathBuf,

    /// Base URL of the fee-data publishing server; refreshes are skipped without it.
    #[arg(long, env = "POSHLINA_SOURCE_URL")]
    source_url: Option<String>,

    /// Upper bound on a single remote fetch, in seconds.
    #[arg(long, env = "POSHLINA_REFRESH_TIMEOUT_SECS", default_value_t = 10)]
    refresh_timeout_secs: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Calculate the state fee for a claim.
    Calc {
        #[arg(long)]
        amount: f64,
        #[arg(long, default_value = "general")]
        court: CourtType,
        /// Exemption id (see `exemptions`).
        #[arg(long)]
        exemption: Option<String>,
        /// Print the result as JSON.
        #[arg(long)]
        json: bool,
    },
    /// List exemptions available for a court type.
    Exemptions {
        #[arg(long, default_value = "general")]
        court: CourtType,
        /// Show savings against the fee for this claim amount.
        #[arg(long)]
        amount: Option<f64>,
    },
    /// Find the exemption with the largest saving for a claim.
    Best {
        #[arg(long)]
        amount: f64,
        #[arg(long, default_value = "general")]
        court: CourtType,
    },
    /// Refresh schedules and exemptions from the remote source.
    Update {
        /// Refresh only this court type's schedule.
        #[arg(long)]
        court: Option<CourtType>,
    },
    /// Report how old the fee data is.
    Freshness,
    /// Check the cached data for corruption and checksum mismatches.
    Verify,
    /// Show cache statistics.
    Stats,
    /// Seed the cache with the bundled tables for offline use.
    Init,
    /// Remove all cached fee data.
    Clear,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    tracing::info!("poshlina v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();
    let service = build_service(&cli)?;

    match cli.command {
        Command::Calc {
            amount,
            court,
            exemption,
            json,
        } => {
            let exemption = match exemption {
                Some(id) => {
                    let manager = service.exemption_manager();
                    let found = manager
                        .find(&id)
                        .cloned()
                        .with_context(|| format!("unknown exemption '{id}'"))?;
                    ExemptionManager::ensure_applicable(&found, court)?;
                    Some(found)
                }
                None => None,
            };

            let result = service
                .calculate(&CalculationRequest {
                    claim_amount: amount,
                    court_type: court,
                    exemption,
                })
                .context("calculating fee")?;

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print!("{}", display::result_card(&result));
                if let Some(warning) = service.check_data_freshness().warning {
                    eprintln!("\n{warning}");
                }
            }
        }
        Command::Exemptions { court, amount } => {
            let manager = service.exemption_manager();
            let base_fee = match amount {
                Some(amount) => Some(service.engine().calculate_fee(court, amount)?.amount),
                None => None,
            };
            print!(
                "{}",
                display::exemption_list(&manager.get_available_exemptions(court), base_fee)
            );
        }
        Command::Best { amount, court } => {
            let base = service.engine().calculate_fee(court, amount)?;
            let manager = service.exemption_manager();
            let candidates: Vec<_> = manager
                .get_available_exemptions(court)
                .into_iter()
                .cloned()
                .collect();
            match ExemptionManager::get_best_exemption(base.amount, &candidates) {
                Some(best) => println!(
                    "{}",
                    ExemptionManager::get_exemption_description(base.amount, best)?
                ),
                None => println!("No exemptions apply to {court} courts."),
            }
        }
        Command::Update { court } => match court {
            Some(court) => {
                let schedule = service.update_schedule(court).await;
                println!("{court}: schedule {} ({} brackets)", schedule.version, schedule.rules.len());
            }
            None => {
                let report = service.update_all().await;
                print!("{}", display::update_report(&report));
            }
        },
        Command::Freshness => {
            let status = service.check_data_freshness();
            let versions = CourtType::ALL
                .into_iter()
                .map(|court| service.get_version_info(court))
                .collect::<Result<Vec<_>, _>>()?;
            print!("{}", display::freshness_card(&status, &versions));
        }
        Command::Verify => {
            let problems = service.integrity_problems();
            if problems.is_empty() {
                println!("Cached fee data is intact.");
            } else {
                for problem in &problems {
                    println!("  {problem}");
                }
                bail!("{} integrity problem(s) found", problems.len());
            }
        }
        Command::Stats => {
            print!("{}", display::stats_card(&service.get_cache_statistics()));
        }
        Command::Init => {
            service
                .initialize_offline_cache()
                .context("seeding offline cache")?;
            print!("{}", display::stats_card(&service.get_cache_statistics()));
        }
        Command::Clear => {
            service.clear_cache().context("clearing cache")?;
            println!("Cache cleared.");
        }
    }

    Ok(())
}

fn build_service(cli: &Cli) -> anyhow::Result<FeeDataService> {
    let store = FileStore::open(&cli.cache_dir)
        .with_context(|| format!("opening cache at {}", cli.cache_dir.display()))?;
    let source: Arc<dyn ScheduleSource> = match &cli.source_url {
        Some(url) => Arc::new(HttpScheduleSource::new(url.clone())),
        None => Arc::new(OfflineSource),
    };
    let config = DataServiceConfig {
        refresh_timeout: Duration::from_secs(cli.refresh_timeout_secs),
        ..DataServiceConfig::default()
    };
    Ok(FeeDataService::new(Arc::new(store), source, config))
}
