use clap::Parser;
use smol_macros::{main, Executor};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod classify;
mod config;
mod cycle;
mod error;
mod http;
mod notify;

use classify::{HttpCamera, HttpClassifier};
use config::Config;
use cycle::controller::{CycleSettings, LifecycleController};
use cycle::source::SerialDevice;
use error::CycleError;
use http::HttpClient;
use notify::telegram::TelegramBot;
use notify::thingspeak::ThingSpeak;
use notify::Dispatcher;

#[derive(Parser)]
#[command(name = "waste-sens")]
#[command(about = "Smart bin detection cycle: sample, classify, notify", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "waste-sens.toml")]
    config: PathBuf,

    /// Serial device, overrides device.path
    #[arg(short, long)]
    device: Option<PathBuf>,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

main! {
    async fn main(ex: &Executor<'_>) -> anyhow::Result<()> {
        let cli = Cli::parse();
        let mut config = Config::load(&cli.config)?;
        if let Some(device) = cli.device {
            config.device.path = device;
        }
        config.validate()?;

        if cli.print_config {
            print!("{}", config.to_toml()?);
            return Ok(());
        }

        init_tracing(&config.logging.level);

        // Set a handler that sends a message through a channel.
        let (ctrl_c_sender, ctrl_c_receiver) = async_broadcast::broadcast(10);
        let handle = move || {
            ctrl_c_sender.try_broadcast(()).ok();
        };
        ctrlc::set_handler(handle)?;

        let device = SerialDevice::open(&config.device.path, config.device.baud_rate)?;

        if config.telegram.token.is_empty() || config.telegram.chat_id.is_empty() {
            warn!("telegram.token or telegram.chat_id not set, alerts will fail");
        }
        if config.thingspeak.write_api_key.is_empty() {
            warn!("thingspeak.write_api_key not set, telemetry will be rejected");
        }

        let client = HttpClient::new(config.http.timeout_secs.map(Duration::from_secs));
        let dispatcher = Dispatcher::new(
            TelegramBot::new(
                client.clone(),
                &config.telegram.api_base,
                &config.telegram.token,
                &config.telegram.chat_id,
            ),
            ThingSpeak::new(
                client.clone(),
                &config.thingspeak.url,
                &config.thingspeak.write_api_key,
                &config.thingspeak.field,
            ),
            &config.telegram.location,
        );

        let mut controller = LifecycleController::new(
            device,
            HttpCamera::new(client.clone(), &config.camera.url),
            HttpClassifier::new(client, &config.classifier.url),
            dispatcher,
            CycleSettings::from(&config),
            ctrl_c_receiver,
        );

        let result = controller.run(ex).await;
        info!(
            lifecycle = ?controller.lifecycle(),
            state = ?controller.cycle_state(),
            "Controller stopped"
        );

        match result {
            Ok(report) => {
                if let Some(outcome) = &report.dispatch {
                    if !outcome.is_complete() {
                        warn!("Dispatch incomplete: {outcome:?}");
                    }
                }
                info!(
                    windows = report.windows,
                    avg_load = report.summary.avg_load,
                    avg_trash = report.summary.avg_trash,
                    waste_type = ?report.waste_type,
                    "Cycle complete"
                );
                Ok(())
            }
            Err(CycleError::Interrupted) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
