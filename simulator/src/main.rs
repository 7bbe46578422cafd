mod telemetry;

use anyhow::Context;
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Duration;
use telemetry::Device;
use tracing::{error, info, warn};

/// Simulates a fleet of sensor boards posting readings to the ingestor.
#[derive(Debug, Parser)]
struct Args {
    /// Base URL of the ingestor
    #[arg(long, env = "SERVER_URL", default_value = "http://localhost:3000")]
    server_url: String,

    /// Target uploads per second across all devices
    #[arg(long, env = "RATE", default_value_t = 50)]
    rate: u64,

    /// Number of simulated devices
    #[arg(long, env = "DEVICES", default_value_t = 10)]
    devices: usize,

    /// Display name shared by the simulated devices
    #[arg(long, env = "DEVICE_NAME", default_value = "esp32-sim")]
    device_name: String,

    /// Stop after this many uploads (runs forever when omitted)
    #[arg(long, env = "COUNT")]
    count: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    anyhow::ensure!(args.rate > 0, "rate must be positive");
    anyhow::ensure!(args.devices > 0, "devices must be positive");

    info!("Starting sensor simulator");
    info!(
        "Server: {}, Rate: {} uploads/s, Devices: {}",
        args.server_url, args.rate, args.devices
    );

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .context("failed to build HTTP client")?;
    let endpoint = format!("{}/api/data", args.server_url.trim_end_matches('/'));

    let devices: Vec<Device> = (0..args.devices)
        .map(|i| Device::new(&args.device_name, i))
        .collect();

    let mut rng = StdRng::from_entropy();
    let interval = Duration::from_micros((1_000_000 / args.rate).max(1));
    let mut ticker = tokio::time::interval(interval);
    let mut sent = 0u64;
    let mut failed = 0u64;

    loop {
        if args.count.is_some_and(|limit| sent + failed >= limit) {
            break;
        }
        ticker.tick().await;

        let device = &devices[((sent + failed) % devices.len() as u64) as usize];
        let upload = device.sample(&mut rng);

        match client.post(&endpoint).json(&upload).send().await {
            Ok(resp) if resp.status() == reqwest::StatusCode::CREATED => {
                sent += 1;
            }
            Ok(resp) => {
                failed += 1;
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                warn!("Server returned unexpected response {}: {}", status, body);
            }
            Err(e) => {
                failed += 1;
                error!("Error posting data: {}", e);
            }
        }

        // Log progress periodically
        if (sent + failed) % 1000 == 0 {
            info!("Uploaded {} readings ({} failed)", sent, failed);
        }
    }

    info!("Finished: {} uploaded, {} failed", sent, failed);
    Ok(())
}
