#![allow(dead_code)]

use clap::Parser;
use std::sync::Arc;
use tokio::sync::broadcast;

mod codec;
mod config;
mod consumer;
mod core;
mod logging;
mod pubsub;
mod simulator;

use crate::consumer::{BatchConsumer, ControlMessage, Decorator};
use crate::core::channel::{Channel, EventChannel};
use crate::core::event::Event;
use crate::pubsub::MemoryBroker;
use crate::simulator::Simulator;

/// Culvert - A bounded-batch pull/ack consumer for pub/sub subscriptions
#[derive(Parser)]
#[command(name = "culvert")]
#[command(version = "0.1.0")]
#[command(about = "Culvert: a pull/ack pub/sub consumer with at-least-once delivery")]
#[command(long_about =
"------------------------------------------------------------
     ██████╗██╗   ██╗██╗    ██╗   ██╗███████╗██████╗ ████████╗
    ██╔════╝██║   ██║██║    ██║   ██║██╔════╝██╔══██╗╚══██╔══╝
    ██║     ██║   ██║██║    ██║   ██║█████╗  ██████╔╝   ██║
    ██║     ██║   ██║██║    ╚██╗ ██╔╝██╔══╝  ██╔══██╗   ██║
    ╚██████╗╚██████╔╝███████╗╚████╔╝ ███████╗██║  ██║   ██║
     ╚═════╝ ╚═════╝ ╚══════╝ ╚═══╝  ╚══════╝╚═╝  ╚═╝   ╚═╝

    Pulls bounded batches from a pub/sub subscription, decodes
    them into events, and acknowledges only what was forwarded.
------------------------------------------------------------")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "./config/config.toml")]
    config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// List available codec types
    #[arg(short = 'L', long)]
    list_codecs: bool,
}

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize logging with specified level
    logging::init_logging(&cli.log_level);

    // Handle list codecs command
    if cli.list_codecs {
        println!("Available codec types:");
        for codec in codec::list_codecs() {
            println!("  - {}", codec);
        }
        return;
    }

    // Load configuration from specified file
    let config = match config::load_config(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("Failed to load config from '{}': {}", cli.config, e);
            std::process::exit(1);
        }
    };

    // Validate configuration
    if let Err(e) = config::validate_config(&config) {
        tracing::error!("Configuration error: {e}");
        std::process::exit(1);
    }

    tracing::info!("Configuration loaded and validated successfully.");

    let broker = Arc::new(MemoryBroker::new());

    // Provisioning runs once; failure here is fatal to startup.
    let subscription =
        match consumer::provision(broker.as_ref(), &config.pubsub, &config.consumer).await {
            Ok(subscription) => subscription,
            Err(e) => {
                tracing::error!("Provisioning failed: {e}");
                std::process::exit(1);
            }
        };

    let codec = match codec::create_codec(&config.codec.r#type, &config.codec.parameters) {
        Ok(codec) => codec,
        Err(e) => {
            tracing::error!("Codec error: {e}");
            std::process::exit(1);
        }
    };

    let decorator = Decorator::new(&config.decorate);

    let channel: Arc<Channel<Event>> =
        Arc::new(Channel::new(config.sink.r#type.clone(), config.sink.capacity));
    let mut subscriber = channel.subscribe();

    let (control_tx, _) = broadcast::channel(8);

    // Translate interrupts into a cooperative terminate signal.
    {
        let control_tx = control_tx.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Interrupt received, stopping consumer...");
                let _ = control_tx.send(ControlMessage::Terminate);
            }
        });
    }

    // Optional local publisher feeding the broker
    if config.simulator.enabled {
        let simulator = Simulator::new(
            "simulator",
            config.simulator.clone(),
            broker.clone(),
            subscription.topic.clone(),
        );
        tokio::spawn(simulator.run());
    }

    // Drain the downstream channel, standing in for the host pipeline.
    let drain = tokio::spawn(async move {
        while let Some(event) = subscriber.recv().await {
            tracing::info!("event: {}", event);
        }
    });

    let mut consumer = BatchConsumer::new(
        "pubsub",
        broker.clone(),
        subscription,
        codec,
        decorator,
        channel.clone(),
        config.consumer.clone(),
    );
    consumer.attach_control_channel(control_tx.subscribe());

    consumer.run().await;

    // Consumer dropped its channel reference; dropping ours closes the
    // sink so the drain task can finish.
    drop(channel);
    let _ = drain.await;

    tracing::info!("Consumer stopped.");
}
