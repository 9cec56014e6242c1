//! # Example: Simulated Sensor Feed
//!
//! Four sensors produce a reading every 700ms. One dashboard watches
//! everything, a second one only the power meter. Snapshots go out every
//! 2s; crossing a threshold produces an alert.
//!
//! ```text
//! producer ──append──► MemoryStore ◄──list/latest── Fanout (every 2s)
//!     └──notify_new_reading──────────────────────────►│
//!                                                     ├──► "dashboard" ("*")
//!                                                     └──► "power-panel" ("PWR_001")
//! ```
//!
//! Run with `cargo run --example simulated_feed [config.toml]`, stop with Ctrl-C.

use std::sync::Arc;
use std::time::Duration;

use sensorcast::{
    ChannelSink, Config, CycleStats, DeliverFn, DeliveryError, LogConfig, LogWriter,
    MemoryStore, Message, Observe, Reading, SensorDescriptor, SensorKind, init_tracing,
    wait_for_shutdown_signal,
};
use tokio_util::sync::CancellationToken;

fn sensors() -> Vec<SensorDescriptor> {
    vec![
        SensorDescriptor::new("TEMP_001", "Server room", SensorKind::Temperature, "°C")
            .with_location("Building A")
            .with_threshold(18.0, 26.0),
        SensorDescriptor::new("HUM_001", "Server room", SensorKind::Humidity, "%")
            .with_location("Building A")
            .with_threshold(30.0, 60.0),
        SensorDescriptor::new("PWR_001", "Main feed", SensorKind::Power, "kW")
            .with_location("Building A"),
        SensorDescriptor::new("PRS_001", "Lobby", SensorKind::Pressure, "hPa")
            .with_location("Building B"),
    ]
}

/// Smooth, repeatable signal per sensor: base + amplitude * sin(step / period).
fn sample(sensor: &str, step: u64) -> f64 {
    let t = step as f64;
    match sensor {
        "TEMP_001" => 22.0 + 6.0 * (t / 5.0).sin(),
        "HUM_001" => 45.0 + 20.0 * (t / 7.0).sin(),
        "PWR_001" => 12.0 + 3.0 * (t / 3.0).cos(),
        _ => 1013.0 + 2.0 * (t / 11.0).sin(),
    }
}

async fn produce(
    store: Arc<MemoryStore>,
    fanout: Arc<sensorcast::Fanout>,
    token: CancellationToken,
) -> anyhow::Result<()> {
    let ids: Vec<String> = sensors().into_iter().map(|d| d.sensor_id).collect();
    let mut step = 0u64;
    let mut ticks = tokio::time::interval(Duration::from_millis(700));

    loop {
        tokio::select! {
            _ = token.cancelled() => return Ok(()),
            _ = ticks.tick() => {}
        }
        let id = &ids[(step as usize) % ids.len()];
        let reading = Reading::now(id.as_str(), sample(id, step));
        store.append(reading.clone())?;
        fanout.notify_new_reading(id, reading).await?;
        step += 1;
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (cfg, log) = match std::env::args().nth(1) {
        Some(path) => Config::from_toml_str(&std::fs::read_to_string(path)?)?,
        None => (
            Config {
                interval: Duration::from_secs(2),
                ..Config::default()
            },
            LogConfig::default(),
        ),
    };
    init_tracing(&log)?;

    let store = Arc::new(MemoryStore::with_sensors(sensors()));
    let stats = Arc::new(CycleStats::new());
    let fanout = sensorcast::FanoutBuilder::new(cfg.clone(), store.clone())
        .with_observers(vec![
            Arc::new(LogWriter::new()) as Arc<dyn Observe>,
            stats.clone(),
        ])
        .build();

    // Dashboard: everything, printed as JSON lines.
    let (sink, mut rx) = ChannelSink::new(64);
    let dashboard = fanout.on_connect("dashboard", sink)?;
    fanout.on_join_topic(&dashboard, "*")?;
    let printer = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            match msg.to_json() {
                Ok(line) => println!("[dashboard] {line}"),
                Err(e) => eprintln!("[dashboard] encode error: {e}"),
            }
        }
    });

    // Power panel: one sensor, closure-backed.
    let panel = fanout.on_connect(
        "power-panel",
        DeliverFn::arc(|msg: Arc<Message>| async move {
            if let Message::SensorUpdate(u) = &*msg {
                println!("[power-panel] {} = {:.2} {}", u.sensor_id, u.value, u.unit);
            }
            Ok::<(), DeliveryError>(())
        }),
    )?;
    fanout.on_join_topic(&panel, "PWR_001")?;

    fanout.start(cfg.interval)?;

    let token = CancellationToken::new();
    let producer = tokio::spawn(produce(store, fanout.clone(), token.clone()));

    let signal = wait_for_shutdown_signal().await?;
    println!("received {signal}, shutting down");

    token.cancel();
    producer.await??;
    fanout.shutdown().await;
    printer.await?;

    let s = stats.snapshot();
    println!(
        "cycles: completed={} skipped={} failed={} read_failures={} delivery_failures={}",
        s.completed, s.skipped, s.failed, s.read_failures, s.delivery_failures
    );
    Ok(())
}
