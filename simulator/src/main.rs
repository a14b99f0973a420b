use clap::Parser;
use rand::Rng;
use serde::Serialize;
use std::time::Duration;
use tracing::{error, info, warn};

/// Synthetic smoke/temperature/humidity device. Pushes one sample per
/// period to a running firewatch server, with occasional smoke events.
#[derive(Parser, Debug)]
#[command(name = "simulator")]
struct Args {
    /// Base URL of the firewatch server
    #[arg(long, env = "SERVER_URL", default_value = "http://localhost:8080")]
    server: String,

    /// Seconds between samples
    #[arg(long, env = "PERIOD_SECS", default_value_t = 10)]
    period: u64,

    /// Probability per sample of simulating a smoke event
    #[arg(long, env = "EVENT_CHANCE", default_value_t = 0.05)]
    event_chance: f64,
}

#[derive(Debug, Serialize)]
struct Sample {
    smoke: i64,
    temperature: f64,
    humidity: f64,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt::init();

    info!("Starting device simulator");
    info!("Server: {}, period: {}s", args.server, args.period);

    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(15))
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to build HTTP client: {}", e);
            std::process::exit(1);
        }
    };

    let url = format!("{}/api/sensor", args.server.trim_end_matches('/'));
    let mut ticker = tokio::time::interval(Duration::from_secs(args.period.max(1)));
    let mut counter = 0u64;

    loop {
        ticker.tick().await;

        let sample = generate_sample(args.event_chance);
        match client.post(&url).json(&sample).send().await {
            Ok(resp) if resp.status().is_success() => {
                counter += 1;
                info!(
                    "sent smoke={} temp={:.1} hum={:.1} (total {})",
                    sample.smoke, sample.temperature, sample.humidity, counter
                );
            }
            Ok(resp) => {
                warn!("server rejected sample: {}", resp.status());
            }
            Err(e) => {
                error!("POST failed: {}", e);
            }
        }
    }
}

fn generate_sample(event_chance: f64) -> Sample {
    let mut rng = rand::thread_rng();

    if rng.gen_bool(event_chance.clamp(0.0, 1.0)) {
        // smoke event: dense smoke, hot, dry
        Sample {
            smoke: rng.gen_range(300..900),
            temperature: rng.gen_range(40.0..70.0),
            humidity: rng.gen_range(10.0..40.0),
        }
    } else {
        Sample {
            smoke: rng.gen_range(20..180),
            temperature: rng.gen_range(20.0..35.0),
            humidity: rng.gen_range(35.0..75.0),
        }
    }
}
