use clap::{CommandFactory, Parser};
use common::platform::NETWORK_PROVIDER;
use module_core::{EventBus, EventKind, Module};
use permission::PermissionCoordinator;
use simulator::{PermissionPolicy, RoutePoint, SimulatedPlatform, SimulatorModule, default_route};
use std::str::FromStr;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracker::LocationTracker;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// CSV route file with longitude,latitude,accuracy records
    #[arg(short = 'f', long)]
    route_file: Option<String>,
    /// Permission prompt policy: grant, deny-then-grant or deny
    #[arg(short, long, default_value = "grant")]
    permission_policy: String,
    /// Simulator tick and tracker update interval in milliseconds
    #[arg(short, long, default_value_t = 500)]
    interval_ms: u64,
}

fn read_route_from_file(file_path: &str) -> Result<Vec<RoutePoint>, ()> {
    let mut rdr = csv::Reader::from_path(file_path).unwrap();
    let mut route = Vec::new();

    for result in rdr.records() {
        let record = result.unwrap();
        let longitude: f64 = f64::from_str(record.get(0).unwrap()).unwrap();
        let latitude: f64 = f64::from_str(record.get(1).unwrap()).unwrap();
        let accuracy: f64 = f64::from_str(record.get(2).unwrap()).unwrap();
        route.push(RoutePoint {
            latitude,
            longitude,
            accuracy,
        });
    }
    Ok(route)
}

fn parse_policy(cli: &Cli) -> Result<PermissionPolicy, ()> {
    match cli.permission_policy.as_str() {
        "grant" => Ok(PermissionPolicy::AlwaysGrant),
        "deny-then-grant" => Ok(PermissionPolicy::DenyThenGrant),
        "deny" => Ok(PermissionPolicy::AlwaysDeny),
        other => {
            error!("Unknown permission policy: {other}");
            Cli::command().print_help().unwrap();
            Err(())
        }
    }
}

fn spawn_event_logger(eb: &EventBus) -> tokio::task::JoinHandle<()> {
    let mut receiver = eb.subscribe();
    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(event) => match &event.kind {
                    EventKind::LocationChangedEvent(fix) => {
                        info!(
                            "Location changed: lat {:.5} lon {:.5} accuracy {} m provider {:?}",
                            fix.latitude(),
                            fix.longitude(),
                            fix.accuracy(),
                            fix.provider()
                        );
                    }
                    EventKind::PermissionDeniedEvent(denied) => {
                        warn!("Permissions denied: {denied:?}");
                    }
                    EventKind::ShowRationaleEvent(permissions) => {
                        warn!(
                            "Rationale requested for {permissions:?}, grant the permission in the app settings"
                        );
                    }
                    EventKind::QuitEvent => break,
                    _ => (),
                },
                Err(e) => {
                    error!("Failed to receive event in the event logger. Error:{e}");
                    break;
                }
            }
        }
    })
}

#[tokio::main]
async fn main() -> Result<(), ()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let policy = parse_policy(&cli)?;
    let route = if let Some(route_file) = &cli.route_file {
        read_route_from_file(route_file)?
    } else {
        default_route()
    };
    let interval = Duration::from_millis(cli.interval_ms);

    let eb = EventBus::default();
    let platform = SimulatedPlatform::new(policy);
    platform.add_provider(NETWORK_PROVIDER, true);

    let mut simulator = match SimulatorModule::new(eb.context(), platform.clone(), &route, interval)
    {
        Ok(simulator) => simulator,
        Err(e) => {
            error!("Failed to create the simulator module. Error: {e}");
            return Err(());
        }
    };
    let mut tracker = LocationTracker::new(platform.clone(), platform.clone(), eb.context());
    tracker.set_min_time(interval);
    let mut coordinator = PermissionCoordinator::new(platform.clone(), platform, eb.context());

    let quit_ctx = eb.context();
    if ctrlc::set_handler(move || {
        let _ = quit_ctx.publish_event(EventKind::QuitEvent);
    })
    .is_err()
    {
        error!("Failed to install the shutdown handler");
        return Err(());
    }

    let logger = spawn_event_logger(&eb);

    info!("Starting modules...");
    let result = tokio::join!(simulator.run(), tracker.run(), coordinator.run()).0;
    let _ = logger.await;
    result
}
