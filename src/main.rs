/// floodwatch: refresh daemon for the flood-risk service.
///
/// Usage: floodwatch [--once] [--verify] [CONFIG]
///
/// Without flags, refreshes every `refresh.interval_secs` and prints the
/// text report after each refresh. `--once` refreshes a single time and
/// exits. `--verify` checks the configured endpoint and exits.

use chrono::Utc;
use floodwatch_service::acquire::Acquirer;
use floodwatch_service::config::{ServiceConfig, DEFAULT_CONFIG_PATH};
use floodwatch_service::ingest::flood_api::HttpFloodSource;
use floodwatch_service::ingest::per_site::HttpSiteFetcher;
use floodwatch_service::logging::{self, DataSource};
use floodwatch_service::report;
use floodwatch_service::simulate::RandomJitter;
use floodwatch_service::store::{StoreView, TelemetryStore};
use floodwatch_service::verify;
use std::error::Error;
use std::path::PathBuf;
use std::thread;

const USAGE: &str = "usage: floodwatch [--once] [--verify] [CONFIG]";

#[derive(Debug, PartialEq)]
struct Args {
    once: bool,
    verify: bool,
    config_path: PathBuf,
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<Args, String> {
    let mut parsed = Args {
        once: false,
        verify: false,
        config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
    };
    let mut path_seen = false;
    for arg in args {
        match arg.as_str() {
            "--once" => parsed.once = true,
            "--verify" => parsed.verify = true,
            flag if flag.starts_with('-') => return Err(format!("unknown option '{}'\n{}", flag, USAGE)),
            path if !path_seen => {
                parsed.config_path = PathBuf::from(path);
                path_seen = true;
            }
            extra => return Err(format!("unexpected argument '{}'\n{}", extra, USAGE)),
        }
    }
    Ok(parsed)
}

fn main() {
    if let Err(e) = run() {
        eprintln!("floodwatch: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let args = parse_args(std::env::args().skip(1))?;
    let config = ServiceConfig::from_env(&args.config_path)?;
    logging::init_logger(
        config.log_level()?,
        config.logging.file.as_deref(),
        config.logging.timestamps,
    );

    let client = reqwest::blocking::Client::builder()
        .timeout(config.timeout())
        .build()?;

    if args.verify {
        let result = verify::verify_endpoint(&client, &config.upstream.endpoint);
        verify::print_summary(&result);
        return Ok(());
    }

    let jitter = match config.simulation.seed {
        Some(seed) => RandomJitter::seeded(seed),
        None => RandomJitter::from_entropy(),
    };
    let source = HttpFloodSource::new(client.clone(), config.upstream.endpoint.clone());
    let mut acquirer =
        Acquirer::new(source, jitter).with_max_age_minutes(config.refresh.max_age_minutes);
    let per_site = config
        .upstream
        .per_site_base_url
        .as_ref()
        .map(|base| HttpSiteFetcher::new(client.clone(), base.as_str()));

    logging::info(
        DataSource::System,
        None,
        &format!(
            "floodwatch started: endpoint {}, refresh every {}s",
            acquirer.source().url(),
            config.refresh.interval_secs
        ),
    );

    let store = TelemetryStore::new();
    loop {
        let outcome = store.refresh_with(|| match &per_site {
            Some(fetcher) => acquirer.acquire_per_site_at(fetcher, Utc::now()),
            None => acquirer.acquire(),
        });
        logging::debug(DataSource::System, None, &format!("refresh outcome: {:?}", outcome));

        match store.view() {
            StoreView::Ready { snapshot, last_error } => {
                if let Some(err) = last_error {
                    println!("⚠ Latest refresh failed ({}); showing last good data.", err);
                }
                println!("{}", report::render_text(&snapshot));
            }
            StoreView::Unavailable(err) => println!("Data unavailable: {}", err),
            StoreView::Loading => println!("Loading..."),
        }

        if args.once {
            return Ok(());
        }
        thread::sleep(config.refresh_interval());
    }
}
