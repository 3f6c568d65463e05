use std::error::Error;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use broadlink_lib::family::{DeviceFamily, LearnDialect, RfDialect, SendDialect, descriptor};
use broadlink_lib::learn;
use broadlink_lib::session::{Session, SessionOptions};
use broadlink_lib::store::CommandStore;

#[derive(Parser)]
#[command(name = "broadlink", about = "Broadlink LAN device tool")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Broadcast a discovery probe and print the first responder
    Discover {
        /// Our own IP address, embedded in the probe
        #[arg(long)]
        local_ip: Ipv4Addr,
        /// Probe a specific device instead of broadcasting
        #[arg(long)]
        target: Option<IpAddr>,
        /// Seconds to wait for an answer
        #[arg(long, default_value_t = 5)]
        timeout: u64,
    },
    /// Authenticate and print the raw status payload
    Status {
        #[command(flatten)]
        device: DeviceArgs,
    },
    /// Put the device in learning mode and store the captured command
    Learn {
        #[command(flatten)]
        device: DeviceArgs,
        /// Capture an RF command instead of IR
        #[arg(long)]
        rf: bool,
        #[arg(long, default_value = "commands")]
        store_dir: PathBuf,
    },
    /// Send a stored command by name
    Send {
        #[command(flatten)]
        device: DeviceArgs,
        name: String,
        #[arg(long, default_value = "commands")]
        store_dir: PathBuf,
    },
    /// List stored commands for a device
    List {
        /// Device MAC, e.g. 78:0f:77:63:4a:1c
        #[arg(long)]
        mac: String,
        #[arg(long, default_value = "commands")]
        store_dir: PathBuf,
    },
}

#[derive(clap::Args)]
struct DeviceArgs {
    /// Device IP address
    #[arg(long)]
    ip: IpAddr,
    /// Device MAC, e.g. 78:0f:77:63:4a:1c
    #[arg(long)]
    mac: String,
    /// Device type code from discovery, e.g. 0x649b
    #[arg(long, value_parser = parse_devtype)]
    devtype: u16,
}

fn parse_mac(raw: &str) -> Result<[u8; 6], String> {
    let cleaned = raw.replace([':', '-'], "");
    let bytes = hex::decode(&cleaned).map_err(|e| e.to_string())?;
    bytes
        .try_into()
        .map_err(|_| format!("expected 6 MAC bytes in {raw:?}"))
}

fn parse_devtype(raw: &str) -> Result<u16, String> {
    let raw = raw.trim_start_matches("0x");
    u16::from_str_radix(raw, 16).map_err(|e| e.to_string())
}

fn counter_seed() -> u16 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos() as u16)
        .unwrap_or(0)
}

async fn connect(device: &DeviceArgs) -> Result<Session, Box<dyn Error>> {
    let mac = parse_mac(&device.mac)?;
    let mut session = Session::new(SessionOptions {
        counter: counter_seed(),
        device_type: device.devtype,
        mac,
        ip_address: Some(device.ip),
        ..SessionOptions::default()
    });
    let auth = session.authenticate().await?;
    debug!(id = %hex::encode(auth.id), "device authenticated");
    Ok(session)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match cli.command {
        Command::Discover {
            local_ip,
            target,
            timeout,
        } => {
            let mut session = Session::new(SessionOptions {
                counter: counter_seed(),
                ..SessionOptions::default()
            });
            let found = session
                .discover(Duration::from_secs(timeout), local_ip, target)
                .await?;
            let mut mac = found.mac;
            mac.reverse();
            let info = descriptor(found.device_type);
            println!("Found device at {}", found.address);
            println!("  MAC:    {}", format_mac(&mac));
            println!("  Type:   {:#06x} ({})", info.code, info.name);
            println!("  Family: {}", info.family);
            session.destroy();
        }
        Command::Status { device } => {
            let mut session = connect(&device).await?;
            let status = session.read_status().await?;
            println!("Status payload: {}", hex::encode(&status));
            session.destroy();
        }
        Command::Learn {
            device,
            rf,
            store_dir,
        } => {
            let mut session = connect(&device).await?;
            let mac = parse_mac(&device.mac)?;
            let mut store = CommandStore::open(&store_dir, &mac)?;

            let token = CancellationToken::new();
            let cancel = token.clone();
            tokio::spawn(async move {
                let _ = tokio::signal::ctrl_c().await;
                cancel.cancel();
            });

            let family = descriptor(device.devtype).family;
            let name = if rf {
                let dialect = match family {
                    DeviceFamily::Rm4Pro => RfDialect::Rm4Pro,
                    _ => RfDialect::RmPlus,
                };
                println!("Long-press the remote button until the frequency locks...");
                learn::learn_rf_to_store(&mut session, dialect, &mut store, &token).await?
            } else {
                let dialect = if device.devtype == 0x5f36 {
                    LearnDialect::RedBean
                } else {
                    match family {
                        DeviceFamily::Rm4Mini | DeviceFamily::Rm4Pro => LearnDialect::Rm4,
                        _ => LearnDialect::Classic,
                    }
                };
                println!("Press a button on the remote...");
                learn::learn_ir_to_store(&mut session, dialect, &mut store, &token).await?
            };
            println!("Stored command: {name}");
            session.destroy();
        }
        Command::Send {
            device,
            name,
            store_dir,
        } => {
            let mut session = connect(&device).await?;
            let mac = parse_mac(&device.mac)?;
            let store = CommandStore::open(&store_dir, &mac)?;

            let dialect = if device.devtype == 0x5f36 {
                SendDialect::MiniRed
            } else {
                match descriptor(device.devtype).family {
                    DeviceFamily::Rm4Pro => SendDialect::Rm4Pro,
                    DeviceFamily::Rm4Mini => SendDialect::RedBean,
                    _ => SendDialect::Classic,
                }
            };
            learn::send_stored(&mut session, dialect, &store, &name).await?;
            println!("Sent {name}");
            session.destroy();
        }
        Command::List { mac, store_dir } => {
            let mac = parse_mac(&mac)?;
            let store = CommandStore::open(&store_dir, &mac)?;
            for name in store.names() {
                println!("{name}");
            }
        }
    }

    Ok(())
}

fn format_mac(mac: &[u8; 6]) -> String {
    mac.iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(":")
}
