//! AIS feed decoder CLI
//!
//! Reads AIVDM/AIVDO sentences from files, stdin or TCP feeds, prints one
//! JSON record per decoded message, and optionally aggregates per-vessel
//! state.

mod reader;
mod tracker;

use std::{
    path::PathBuf,
    sync::Arc,
    time::Duration,
};

use ais_aivdm::{
    Decoder,
    DecoderConfig,
    VesselRecord,
    reassembly::SharedReassembler,
};
use chrono::Utc;
use clap::{
    Parser,
    Subcommand,
};
use color_eyre::eyre::Error;
use futures_util::TryStreamExt;
use parking_lot::Mutex;
use tokio::{
    fs::File,
    io::{
        AsyncRead,
        BufReader,
    },
    net::TcpStream,
    task::JoinSet,
};
use tracing::{
    info,
    warn,
};

use crate::{
    reader::Reader,
    tracker::VesselTracker,
};

#[derive(Debug, Parser)]
#[command(about = "AIS AIVDM/AIVDO feed decoder")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Decode sentences from a file, or stdin when no file is given
    Decode {
        file: Option<PathBuf>,

        /// Aggregate per-vessel state and log a summary at the end
        #[arg(long)]
        track: bool,
    },
    /// Connect to line-oriented TCP feeds and decode them live
    Client {
        /// host:port of each feed; fragment groups reassemble across
        /// feeds of the same receiver
        #[arg(required = true)]
        addresses: Vec<String>,

        /// Aggregate per-vessel state and log periodic summaries
        #[arg(long)]
        track: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let _ = dotenvy::dotenv();
    color_eyre::install()?;
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    match args.command {
        Command::Decode { file, track } => decode(file, track).await?,
        Command::Client { addresses, track } => client(addresses, track).await?,
    }

    Ok(())
}

async fn decode(file: Option<PathBuf>, track: bool) -> Result<(), Error> {
    let input: Box<dyn AsyncRead + Unpin> = match &file {
        Some(path) => Box::new(BufReader::new(File::open(path).await?)),
        None => Box::new(BufReader::new(tokio::io::stdin())),
    };
    let mut lines = Reader::new(input);

    let mut decoder = Decoder::new(DecoderConfig::default());
    let mut tracker = track.then(VesselTracker::new);

    while let Some(line) = lines.try_next().await? {
        if let Ok(Some(record)) = decoder.push_line(&line) {
            if let Some(tracker) = &mut tracker {
                let update = tracker.update(&record, Utc::now());
                if update.is_new {
                    info!(
                        vessel = %update.state.display_name(),
                        mac = %update.state.mac,
                        "new vessel",
                    );
                }
            }
            emit(&record)?;
        }
        // rejected sentences are counted and logged by the decoder
    }

    info!("{}", decoder.stats().summary());
    if let Some(tracker) = &tracker {
        info!("{}", tracker.summary());
    }
    Ok(())
}

async fn client(addresses: Vec<String>, track: bool) -> Result<(), Error> {
    let config = DecoderConfig::default();
    let shared = SharedReassembler::new(&config);
    let tracker = track.then(|| Arc::new(Mutex::new(VesselTracker::new())));

    let mut feeds = JoinSet::new();
    for address in addresses {
        feeds.spawn(run_feed(
            address,
            Decoder::with_shared(config, shared.clone()),
            tracker.clone(),
        ));
    }
    while let Some(feed) = feeds.join_next().await {
        if let Err(error) = feed {
            warn!(%error, "feed task failed");
        }
    }
    Ok(())
}

async fn run_feed(
    address: String,
    mut decoder: Decoder,
    tracker: Option<Arc<Mutex<VesselTracker>>>,
) {
    info!(address, "connecting");
    let stream = match TcpStream::connect(address.as_str()).await {
        Ok(stream) => stream,
        Err(error) => {
            warn!(%error, address, "connection failed");
            return;
        }
    };
    let mut lines = Reader::new(BufReader::new(stream));

    let mut report = tokio::time::interval(Duration::from_secs(10));
    loop {
        tokio::select! {
            line = lines.try_next() => {
                match line {
                    Ok(Some(line)) => {
                        if let Ok(Some(record)) = decoder.push_line(&line) {
                            if let Some(tracker) = &tracker {
                                let mut tracker = tracker.lock();
                                let update = tracker.update(&record, Utc::now());
                                if update.is_new {
                                    info!(
                                        vessel = %update.state.display_name(),
                                        mac = %update.state.mac,
                                        "new vessel",
                                    );
                                }
                            }
                            if let Err(error) = emit(&record) {
                                warn!(%error, "failed to emit record");
                            }
                        }
                    }
                    Ok(None) => break,
                    Err(error) => {
                        warn!(%error, address, "feed error");
                        break;
                    }
                }
            }
            _ = report.tick() => {
                if let Err(error) = decoder.expire_pending() {
                    warn!(%error, address, "reassembly maintenance failed");
                }
                info!(address, "{}", decoder.stats().summary());
                if let Some(tracker) = &tracker {
                    info!(address, "{}", tracker.lock().summary());
                }
            }
        }
    }

    // partial groups of a torn-down feed age out of the shared table via
    // the remaining feeds' maintenance ticks
    if let Err(error) = decoder.expire_pending() {
        warn!(%error, address, "reassembly maintenance failed");
    }
    info!(address, "feed closed: {}", decoder.stats().summary());
}

fn emit(record: &VesselRecord) -> Result<(), Error> {
    println!("{}", serde_json::to_string(record)?);
    Ok(())
}
