use clap::Parser;
use dhcpkit::{network, Args, Client, ClientConfig, ExchangeError};
use std::error::Error as StdError;
use std::fmt::Display;
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn print_conversation<M: Display>(conversation: &[M]) {
    for (i, msg) in conversation.iter().enumerate() {
        println!("[{}] {}", i + 1, msg);
    }
}

fn report_failure<M: Display>(e: &ExchangeError<M>) {
    eprintln!("{e}: {}", e.source);
    if !e.conversation.is_empty() {
        eprintln!("Messages exchanged before the failure:");
        for (i, msg) in e.conversation.iter().enumerate() {
            eprintln!("[{}] {}", i + 1, msg);
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn StdError>> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let mac_addr = network::hardware_address(&args.interface).await?;
    let config = if args.v6 {
        let link_local = network::link_local_address(&args.interface).await?;
        tracing::info!("Using link-local address {} on {}", link_local, args.interface);
        ClientConfig::new_v6(args.interface.clone(), mac_addr)
    } else {
        ClientConfig::new(args.interface.clone(), mac_addr)
    }
    .with_args(&args);

    println!(
        "Starting {} exchange on interface '{}' (port {})...",
        if config.is_v6() { "DHCPv6" } else { "DHCPv4" },
        config.interface,
        config.client_port
    );
    let client = Client::new(config).await?;

    if args.v6 {
        match client.exchange_v6(None).await {
            Ok(conversation) => print_conversation(&conversation),
            Err(e) => {
                report_failure(&e);
                return Err(e.into());
            }
        }
    } else {
        match client.exchange_v4(None).await {
            Ok(conversation) => print_conversation(&conversation),
            Err(e) => {
                report_failure(&e);
                return Err(e.into());
            }
        }
    }

    Ok(())
}
