//! threadchan pipeline driver - main entry point.
//!
//! Creates one channel, hands its numeric id to producer and consumer
//! threads (each rebuilds its own handle with `Channel::from_id`), pushes the
//! requested number of payloads through, closes the channel and prints the
//! final statistics as JSON.

use clap::Parser;
use serde::Serialize;
use std::collections::HashMap;
use std::thread;
use std::time::Instant;

use threadchan::{Channel, ChannelStats, Config, Payload};

#[derive(Debug, Parser)]
#[command(name = "threadchan", about = "Run a producer/consumer pipeline over a bounded channel")]
struct Args {
    /// Channel capacity (defaults to the configured default capacity).
    #[arg(long, env = "THREADCHAN_CAPACITY")]
    capacity: Option<usize>,

    /// Number of producer threads.
    #[arg(long, default_value_t = 2)]
    producers: usize,

    /// Number of consumer threads.
    #[arg(long, default_value_t = 2)]
    consumers: usize,

    /// Payloads sent by each producer.
    #[arg(long, default_value_t = 10_000)]
    messages: u64,

    /// Size of each payload in bytes (at least 16).
    #[arg(long, default_value_t = 64)]
    payload_bytes: usize,

    /// Optional JSON config file.
    #[arg(long)]
    config: Option<std::path::PathBuf>,
}

#[derive(Debug, Default)]
struct ConsumerTally {
    delivered: u64,
    bytes: u64,
    order_violations: u64,
}

#[derive(Debug, Serialize)]
struct RunReport {
    stats: ChannelStats,
    delivered: u64,
    bytes: u64,
    order_violations: u64,
    elapsed_ms: u128,
}

/// Payload layout: producer index (u64 LE) then sequence number (u64 LE), zero padded.
fn encode(producer: u64, seq: u64, size: usize) -> Payload {
    let mut buf = vec![0u8; size.max(16)];
    buf[..8].copy_from_slice(&producer.to_le_bytes());
    buf[8..16].copy_from_slice(&seq.to_le_bytes());
    Payload::new(buf)
}

fn decode(payload: &Payload) -> Option<(u64, u64)> {
    let producer = u64::from_le_bytes(payload.get(..8)?.try_into().ok()?);
    let seq = u64::from_le_bytes(payload.get(8..16)?.try_into().ok()?);
    Some((producer, seq))
}

fn produce(id: u64, producer: u64, messages: u64, size: usize) -> threadchan::Result<()> {
    let chan = Channel::<Payload>::from_id(id)?;
    for seq in 0..messages {
        chan.send(&encode(producer, seq, size), false)?;
    }
    Ok(())
}

fn consume(id: u64) -> threadchan::Result<ConsumerTally> {
    let chan = Channel::<Payload>::from_id(id)?;
    let mut tally = ConsumerTally::default();
    let mut last_seen: HashMap<u64, u64> = HashMap::new();

    for payload in &chan {
        tally.delivered += 1;
        tally.bytes += payload.len() as u64;
        if let Some((producer, seq)) = decode(&payload) {
            if let Some(prev) = last_seen.insert(producer, seq) {
                if seq <= prev {
                    tally.order_violations += 1;
                }
            }
        }
    }
    Ok(tally)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Load configuration
    let config = match &args.config {
        Some(path) => {
            let mut config = Config::from_json_file(path)?;
            config.apply_env()?;
            config
        }
        None => Config::from_env()?,
    };

    // Initialize observability
    threadchan::observability::init_tracing_with(&config.observability);

    let capacity = args.capacity.unwrap_or(config.channel.default_capacity);
    let chan = Channel::<Payload>::new_checked(capacity, &config.channel)?;
    let id = chan.id().as_u64();

    tracing::info!(
        channel_id = id,
        capacity,
        producers = args.producers,
        consumers = args.consumers,
        messages = args.messages,
        "pipeline starting"
    );

    let started = Instant::now();

    let consumers: Vec<_> = (0..args.consumers)
        .map(|_| thread::spawn(move || consume(id)))
        .collect();

    let producers: Vec<_> = (0..args.producers as u64)
        .map(|p| {
            let messages = args.messages;
            let size = args.payload_bytes;
            thread::spawn(move || produce(id, p, messages, size))
        })
        .collect();

    for producer in producers {
        producer.join().map_err(|_| "producer thread panicked")??;
    }
    chan.close();

    let mut total = ConsumerTally::default();
    for consumer in consumers {
        let tally = consumer.join().map_err(|_| "consumer thread panicked")??;
        total.delivered += tally.delivered;
        total.bytes += tally.bytes;
        total.order_violations += tally.order_violations;
    }

    let report = RunReport {
        stats: chan.stats(),
        delivered: total.delivered,
        bytes: total.bytes,
        order_violations: total.order_violations,
        elapsed_ms: started.elapsed().as_millis(),
    };

    tracing::info!(
        delivered = report.delivered,
        elapsed_ms = report.elapsed_ms as u64,
        "pipeline finished"
    );
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
