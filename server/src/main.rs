//! Main entry point for the telemetry ingestion server.

use common::{Result, ServerConfig};
use env_logger::fmt::Color;
use env_logger::Builder;
use log::{info, LevelFilter};
use std::io::Write;
use telemetry_server::TelemetryServer;

const BANNER: &str = r#"
╔═══════════════════════════════════════════════════════════════════╗
║                                                                   ║
║   ████████╗███████╗██╗     ███████╗███╗   ███╗███████╗████████╗   ║
║   ╚══██╔══╝██╔════╝██║     ██╔════╝████╗ ████║██╔════╝╚══██╔══╝   ║
║      ██║   █████╗  ██║     █████╗  ██╔████╔██║█████╗     ██║      ║
║      ██║   ██╔══╝  ██║     ██╔══╝  ██║╚██╔╝██║██╔══╝     ██║      ║
║      ██║   ███████╗███████╗███████╗██║ ╚═╝ ██║███████╗   ██║      ║
║      ╚═╝   ╚══════╝╚══════╝╚══════╝╚═╝     ╚═╝╚══════╝   ╚═╝      ║
║                                                                   ║
║   Telemetry Ingestion Server v1.0.0                               ║
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

#[actix_web::main]
async fn main() -> Result<()> {
    setup_logger();

    println!("{}", BANNER);

    info!("Starting telemetry ingestion server...");

    let config = ServerConfig::load();
    info!("Configuration loaded successfully");
    info!("Storage: {}", config.redis_url);
    info!("Bind address: {}", config.bind_address);

    let server = TelemetryServer::from_config(config)?;
    info!("✓ Server instance created successfully");

    server.start().await
}
