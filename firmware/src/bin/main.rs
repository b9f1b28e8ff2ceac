#![no_std]
#![no_main]

use defmt::{error, info};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Level, Output};
use embassy_rp::peripherals::UART1;
use embassy_rp::uart::{Async, Config as UartConfig, Uart, UartRx, UartTx};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::pubsub::{PubSubChannel, Subscriber};
use embassy_sync::signal::Signal;
use static_cell::StaticCell;
use uart_cli::{
    led_bindings, CliBridge, CliNotification, CliService, CliStatus, CliUint, Inbox, LedCommand,
    LedSignal, ServiceConfig, ServiceId, UartDevice,
};

#[cfg(feature = "dev-panic")]
use panic_probe as _;
#[cfg(feature = "prod-panic")]
use panic_reset as _;

bind_interrupts!(struct Irqs {
    UART1_IRQ => embassy_rp::uart::InterruptHandler<UART1>;
});

const INBOX_DEPTH: usize = 64;

/// Engine storage in words; the bridge checks it against the configuration at startup.
const CLI_BUFFER_WORDS: usize = 160;

type StatusChannel = PubSubChannel<CriticalSectionRawMutex, CliNotification, 4, 1, 0>;
type Bridge = CliBridge<CriticalSectionRawMutex, &'static StatusChannel, INBOX_DEPTH>;

static INBOX: Inbox<CriticalSectionRawMutex, INBOX_DEPTH> = Inbox::new();
static STATUS: StatusChannel = PubSubChannel::new();
static UART_DEVICE: UartDevice = UartDevice::new();
static LED_SIGNAL: LedSignal = Signal::new();

static CLI_BUFFER: StaticCell<[CliUint; CLI_BUFFER_WORDS]> = StaticCell::new();
static BRIDGE: StaticCell<Bridge> = StaticCell::new();

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("UART CLI starting...");

    let p = embassy_rp::init(embassy_rp::config::Config::default());

    // --- UART Setup ---
    let mut uart_config = UartConfig::default();
    uart_config.baudrate = 115_200;

    let uart = Uart::new(
        p.UART1,
        p.PIN_8, // TX
        p.PIN_9, // RX
        Irqs,
        p.DMA_CH0,
        p.DMA_CH1,
        uart_config,
    );
    let (tx, rx) = uart.split();

    // --- CLI Setup ---
    let buffer = CLI_BUFFER.init([0; CLI_BUFFER_WORDS]);
    let config = ServiceConfig::new(ServiceId(0))
        .with_buffer(buffer)
        .with_invitation("rp2040> ")
        .with_max_binding_count(4);
    let bridge = BRIDGE.init(CliBridge::new(config, &INBOX, &STATUS));
    info!("CLI needs {} of {} words", bridge.required_size(), CLI_BUFFER_WORDS);

    let status = match STATUS.subscriber() {
        Ok(status) => status,
        Err(e) => {
            error!("status subscriber: {:?}", e);
            return;
        }
    };

    let led = Output::new(p.PIN_25, Level::Low);

    // Bridge and subscriber move into their tasks from here on
    let service = bridge.service();
    let spawned = spawner
        .spawn(uart_tx_task(tx))
        .and_then(|()| spawner.spawn(uart_rx_task(rx)))
        .and_then(|()| spawner.spawn(led_task(led)))
        .and_then(|()| spawner.spawn(status_task(status, service)))
        .and_then(|()| spawner.spawn(cli_task(bridge)));
    if let Err(e) = spawned {
        error!("task spawn failed: {:?}", e);
        return;
    }

    info!("UART CLI initialized");
}

/// Bridge task - the only context the command engine runs in.
#[embassy_executor::task]
async fn cli_task(bridge: &'static mut Bridge) {
    bridge.run().await
}

/// Status task - activates the CLI on the UART and registers bindings once active.
#[embassy_executor::task]
async fn status_task(
    mut status: Subscriber<'static, CriticalSectionRawMutex, CliNotification, 4, 1, 0>,
    cli: CliService<CriticalSectionRawMutex, INBOX_DEPTH>,
) {
    cli.begin_cli_async(&UART_DEVICE);
    loop {
        let notification = status.next_message_pure().await;
        info!("CLI {} {:?}", notification.service.0, notification.status);
        if notification.status == CliStatus::Active {
            for binding in led_bindings(&LED_SIGNAL) {
                cli.add_cli_binding_async(binding);
            }
        }
    }
}

/// UART TX task - drains bytes written by the CLI.
#[embassy_executor::task]
async fn uart_tx_task(tx: UartTx<'static, Async>) {
    UART_DEVICE.tx_loop(tx).await
}

/// UART RX task - delivers received bytes to the CLI inbox.
#[embassy_executor::task]
async fn uart_rx_task(rx: UartRx<'static, Async>) {
    UART_DEVICE.rx_loop(rx).await
}

/// LED task - applies the latest LED command.
#[embassy_executor::task]
async fn led_task(mut led: Output<'static>) {
    loop {
        match LED_SIGNAL.wait().await {
            LedCommand::On => led.set_high(),
            LedCommand::Off => led.set_low(),
            LedCommand::Toggle => led.toggle(),
        }
    }
}
