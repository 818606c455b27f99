//! Main entry point for the telemetry agent.

use agent::bootstrap::{
    spawn_trigger_loop, BootstrapFlow, BootstrapTrigger, CsrBuilder, HttpBootstrapAuthority,
};
use agent::identity::{HardwareKeyManager, IdentityManager};
use agent::metrics::{
    gauge_family_from_pairs, CellularCollector, CertifiedMetricsChannel, DeviceCollector,
    EnvInfoSource, MetricPushManager, WifiCollector,
};
use agent::register::RegistrationManager;
use clap::Parser;
use common::bootstrap::MetricsContainer;
use common::types::{Identifier, MetricTimestamp};
use common::{AgentConfig, Result};
use env_logger::fmt::Color;
use env_logger::Builder;
use log::{error, info, warn, LevelFilter};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

const BANNER: &str = r#"
╔═══════════════════════════════════════════════════════════════════╗
║                                                                   ║
║    █████╗  ██████╗ ███████╗███╗   ██╗████████╗                    ║
║   ██╔══██╗██╔════╝ ██╔════╝████╗  ██║╚══██╔══╝                    ║
║   ███████║██║  ███╗█████╗  ██╔██╗ ██║   ██║                       ║
║   ██╔══██║██║   ██║██╔══╝  ██║╚██╗██║   ██║                       ║
║   ██║  ██║╚██████╔╝███████╗██║ ╚████║   ██║                       ║
║   ╚═╝  ╚═╝ ╚═════╝ ╚══════╝╚═╝  ╚═══╝   ╚═╝                       ║
║                                                                   ║
║   Telemetry Agent v1.0.0                                          ║
║                                                                   ║
╚═══════════════════════════════════════════════════════════════════╝
"#;

fn setup_logger() {
    let mut builder = Builder::from_default_env();

    builder
        .format(|buf, record| {
            let mut timestamp_style = buf.style();
            let mut level_style = buf.style();
            let mut target_style = buf.style();
            let mut message_style = buf.style();

            let level_color = match record.level() {
                log::Level::Error => Color::Red,
                log::Level::Warn => Color::Yellow,
                log::Level::Info => Color::Green,
                log::Level::Debug => Color::Cyan,
                log::Level::Trace => Color::White,
            };

            let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
            writeln!(
                buf,
                "{} {} [{}] {}",
                timestamp_style
                    .set_color(Color::Rgb(100, 100, 100))
                    .value(timestamp),
                level_style.set_color(level_color).value(record.level()),
                target_style.set_color(Color::Blue).value(record.target()),
                message_style.set_color(Color::White).value(record.args())
            )
        })
        .filter(None, LevelFilter::Info)
        .init();
}

#[derive(Parser)]
struct Args {
    /// Directory holding the persisted UUID and key material.
    #[arg(long)]
    data_dir: Option<String>,

    /// Client type reported in the push identifier.
    #[arg(long)]
    client_type: Option<String>,

    /// Seconds between metric collection rounds.
    #[arg(long, default_value_t = 60)]
    push_interval_secs: u64,

    /// Skip the backend registration request.
    #[arg(long, default_value_t = false)]
    skip_register: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logger();

    println!("{}", BANNER);

    info!("Starting telemetry agent...");

    let args = Args::parse();
    let mut config = AgentConfig::load();
    if let Some(data_dir) = args.data_dir {
        config.data_dir = data_dir;
    }
    if let Some(client_type) = args.client_type {
        config.client_type = client_type;
    }

    let data_dir = Path::new(&config.data_dir).to_path_buf();

    let identity = Arc::new(IdentityManager::new(&data_dir)?);
    info!("Device UUID: {}", identity.uuid());

    let hardware_key = Arc::new(HardwareKeyManager::new(&data_dir)?);
    info!("✓ Hardware key ready");

    if !args.skip_register {
        let registration = RegistrationManager::new(&config, &data_dir)?;
        match registration
            .register_device(&identity.uuid(), &hardware_key.public_key_base64()?)
            .await
        {
            Ok(outcome) => info!("Registration outcome: {:?}", outcome),
            Err(e) => warn!("Registration request failed: {}", e),
        }
    }

    // Bootstrap runs on its own task; triggers re-enter it, overlapping
    // triggers are skipped by the in-flight guard.
    let authority = Arc::new(HttpBootstrapAuthority::new(&config)?);
    let csr_builder = CsrBuilder::new(&data_dir);
    let flow = Arc::new(BootstrapFlow::new(
        identity.clone(),
        hardware_key.clone(),
        csr_builder,
        authority,
    ));

    let (trigger_tx, trigger_rx) = mpsc::channel(8);
    let (cert_tx, mut cert_rx) = watch::channel(None);
    let bootstrap_handle = spawn_trigger_loop(flow, trigger_rx, cert_tx);

    if trigger_tx.send(BootstrapTrigger::Startup).await.is_err() {
        error!("Bootstrap trigger channel closed before startup trigger");
    }

    let push_manager = MetricPushManager::new(&config)?;
    let env_source = Arc::new(EnvInfoSource::new());
    let cellular = CellularCollector::new(env_source.clone());
    let wifi = WifiCollector::new(env_source.clone());
    let device = DeviceCollector::new(env_source);

    let csr_key_reader = CsrBuilder::new(&data_dir);
    let mut certified_channel: Option<CertifiedMetricsChannel> = None;

    let mut interval = tokio::time::interval(Duration::from_secs(args.push_interval_secs));
    loop {
        interval.tick().await;

        let identifier = Identifier {
            client_type: config.client_type.clone(),
            uuid: identity.uuid(),
        };

        for (metric_name, pairs) in [
            (wifi.metric_name(), wifi.collect()),
            (cellular.metric_name(), cellular.collect()),
            (device.metric_name(), device.collect()),
        ] {
            let result = push_manager
                .push_metric(metric_name, pairs, identifier.clone(), MetricTimestamp::now())
                .await;
            if let Err(e) = result {
                warn!("Failed to push {}: {}", metric_name, e);
            }
        }

        // Build the certified channel once a bootstrap certificate lands.
        if certified_channel.is_none() {
            if let Some(certificate) = cert_rx.borrow_and_update().clone() {
                match csr_key_reader.current_key_pem() {
                    Ok(key_pem) => {
                        match CertifiedMetricsChannel::new(&config, &certificate, &key_pem) {
                            Ok(channel) => {
                                info!("Certified metrics channel established");
                                certified_channel = Some(channel);
                            }
                            Err(e) => warn!("Failed to build certified channel: {}", e),
                        }
                    }
                    Err(e) => warn!("CSR key unavailable for certified channel: {}", e),
                }
            }
        }

        if let Some(channel) = &certified_channel {
            let container = MetricsContainer {
                gateway_id: identity.uuid(),
                family: vec![
                    gauge_family_from_pairs("wifi_network_info", &wifi.collect()),
                    gauge_family_from_pairs("cellular_network_info", &cellular.collect()),
                ],
            };
            if let Err(e) = channel.collect(&container).await {
                warn!("Certified collect failed: {}", e);
            }
        }

        if bootstrap_handle.is_finished() {
            warn!("Bootstrap loop ended");
        }
    }
}
