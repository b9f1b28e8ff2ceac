//! Command line over stdin/stdout.
//!
//! Bytes are read on a separate thread and handed to the bridge through its
//! inbox, the same way a UART interrupt would on firmware. Set `CLI_LOG` to
//! change the log level.

mod commands;
mod device;
mod logger;

use cli_core::{
    CliBridge, CliNotification, CliService, CliStatus, Inbox, ServiceConfig, ServiceId,
};
use device::StdioDevice;
use embassy_executor::Spawner;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::pubsub::{PubSubChannel, Subscriber};
use log::{error, info};
use static_cell::StaticCell;

const INBOX_DEPTH: usize = 32;

type StatusChannel = PubSubChannel<CriticalSectionRawMutex, CliNotification, 4, 1, 0>;
type Bridge = CliBridge<CriticalSectionRawMutex, &'static StatusChannel, INBOX_DEPTH>;
pub(crate) type Service = CliService<CriticalSectionRawMutex, INBOX_DEPTH>;

static INBOX: Inbox<CriticalSectionRawMutex, INBOX_DEPTH> = Inbox::new();
static STATUS: StatusChannel = PubSubChannel::new();
static DEVICE: StdioDevice = StdioDevice::new();

static BRIDGE: StaticCell<Bridge> = StaticCell::new();
static SERVICE: StaticCell<Service> = StaticCell::new();

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    if let Err(e) = logger::init() {
        eprintln!("logger already set: {}", e);
    }
    info!("cli-linux starting...");

    let Ok(status) = STATUS.subscriber() else {
        error!("no status subscriber slot");
        return;
    };

    let config = ServiceConfig::new(ServiceId(1)).with_invitation("linux> ");
    let bridge = BRIDGE.init(CliBridge::new(config, &INBOX, &STATUS));
    let service = SERVICE.init(bridge.service());

    if let Err(e) = DEVICE.spawn_reader() {
        error!("failed to start stdin reader: {}", e);
        return;
    }

    service.begin_cli_async(&DEVICE);
    for binding in commands::bindings(service) {
        service.add_cli_binding_async(binding);
    }

    // Bridge and subscriber move into their tasks from here on
    if let Err(e) = spawner.spawn(cli_task(bridge)) {
        error!("failed to spawn cli task: {:?}", e);
        return;
    }
    if let Err(e) = spawner.spawn(status_task(status)) {
        error!("failed to spawn status task: {:?}", e);
    }
}

/// Bridge task - the only context the command engine runs in.
#[embassy_executor::task]
async fn cli_task(bridge: &'static mut Bridge) {
    bridge.run().await
}

/// Status task - logs transitions and quits once the CLI goes inactive again.
#[embassy_executor::task]
async fn status_task(
    mut status: Subscriber<'static, CriticalSectionRawMutex, CliNotification, 4, 1, 0>,
) {
    let mut was_active = false;
    loop {
        let notification = status.next_message_pure().await;
        info!("cli {} is {:?}", notification.service.0, notification.status);
        match notification.status {
            CliStatus::Active => was_active = true,
            CliStatus::Inactive if was_active => {
                info!("cli-linux done");
                std::process::exit(0);
            }
            CliStatus::Inactive => {}
        }
    }
}
