//! CliBridge: runs a command engine over a character device.

use crate::config::ServiceConfig;
use crate::device::CharacterDevice;
use crate::error::{fatal, ContractViolation};
use crate::event::{Inbox, WorkItem};
use crate::notify::{CliNotification, CliStatus, NotificationSink, ServiceId};
use crate::service::CliService;
use crate::writer::DeviceWriter;
use cli_engine::{BindingError, CliUint, Engine, EngineConfig, EngineError, Storage};
use embassy_sync::blocking_mutex::raw::RawMutex;

/// Lifecycle state of a bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BridgeState {
    /// Constructed, not yet run.
    Initial,
    /// No engine, no device.
    Inactive,
    /// Engine running over a device.
    Active,
}

/// An active CLI: the device and the engine bound to it.
struct Session {
    device: &'static dyn CharacterDevice,
    engine: Engine<'static, DeviceWriter>,
}

enum Phase {
    Initial,
    Inactive,
    Active(Session),
}

/// Where the engine's storage comes from.
enum Backing {
    /// Static buffer; `None` while lent to the running engine.
    Static(Option<&'static mut [CliUint]>),
    #[cfg(feature = "alloc")]
    Dynamic,
}

impl Backing {
    #[cfg_attr(not(feature = "alloc"), allow(unused_variables))]
    fn lend(&mut self, words: usize) -> Storage<'static> {
        match self {
            Backing::Static(buffer) => match buffer.take() {
                Some(buffer) => Storage::from(buffer),
                None => fatal(ContractViolation::NoBackingStorage),
            },
            #[cfg(feature = "alloc")]
            Backing::Dynamic => Storage::allocate(words),
        }
    }

    fn reclaim(&mut self, storage: Storage<'static>) {
        match self {
            Backing::Static(slot) => *slot = storage.into_borrowed(),
            #[cfg(feature = "alloc")]
            Backing::Dynamic => drop(storage),
        }
    }
}

/// A single-threaded state machine that owns a command engine and feeds it
/// from a character device.
///
/// Every engine operation runs from [`dispatch`](Self::dispatch), which is only
/// ever called from the bridge's own execution context. Other contexts talk to
/// the bridge exclusively by posting [`WorkItem`]s into its [`Inbox`]: the
/// device callback posts bytes, application code posts requests through a
/// [`CliService`].
///
/// # Lifecycle
///
/// ```text
/// Initial --(first run)--> Inactive --Begin--> Active --End--> Inactive
/// ```
///
/// # Error Handling
///
/// Caller bugs (adding a binding while inactive, an empty binding name, a full
/// binding table, an undersized static buffer) are contract violations and
/// stop the system through [`fatal`]. Bytes the device refuses to send are
/// only counted.
pub struct CliBridge<M: RawMutex + Sync + 'static, S: NotificationSink, const N: usize> {
    id: ServiceId,
    inbox: &'static Inbox<M, N>,
    notifier: S,
    config: EngineConfig<'static>,
    backing: Backing,
    phase: Phase,
}

impl<M: RawMutex + Sync + 'static, S: NotificationSink, const N: usize> CliBridge<M, S, N> {
    /// Create a bridge consuming `inbox` and announcing transitions to `notifier`.
    ///
    /// The engine requirement is computed from the fully applied `config`;
    /// a static buffer smaller than that is fatal here, before any device I/O.
    #[track_caller]
    pub fn new(config: ServiceConfig, inbox: &'static Inbox<M, N>, notifier: S) -> Self {
        let engine_config = config.engine_config();
        if let Err(err) = engine_config.validate() {
            fatal(ContractViolation::InvalidConfig(err));
        }

        let backing = match config.buffer {
            Some(buffer) => {
                let required = engine_config.required_size();
                if buffer.len() < required {
                    fatal(ContractViolation::BufferTooSmall {
                        required,
                        supplied: buffer.len(),
                    });
                }
                Backing::Static(Some(buffer))
            }
            #[cfg(feature = "alloc")]
            None => Backing::Dynamic,
            #[cfg(not(feature = "alloc"))]
            None => fatal(ContractViolation::NoBackingStorage),
        };

        Self {
            id: config.id,
            inbox,
            notifier,
            config: engine_config,
            backing,
            phase: Phase::Initial,
        }
    }

    /// Take the initial transition into Inactive. Later calls do nothing.
    pub fn start(&mut self) {
        if matches!(self.phase, Phase::Initial) {
            self.enter_inactive();
        }
    }

    /// Run forever, processing work items as they arrive.
    pub async fn run(&mut self) -> ! {
        self.start();
        loop {
            self.process_one().await;
        }
    }

    /// Wait for one work item and process it to completion.
    pub async fn process_one(&mut self) {
        self.start();
        let item = self.inbox.receive().await;
        self.dispatch(item);
    }

    /// Process every work item already waiting, returning how many there were.
    pub fn process_pending(&mut self) -> usize {
        self.start();
        let mut handled = 0;
        while let Some(item) = self.inbox.try_receive() {
            self.dispatch(item);
            handled += 1;
        }
        handled
    }

    /// Process one work item to completion.
    #[track_caller]
    pub fn dispatch(&mut self, item: WorkItem) {
        self.start();

        match item {
            WorkItem::Begin(device) => {
                if self.is_active() {
                    debug!("cli {} already active, begin ignored", self.id.0);
                } else {
                    self.enter_active(device);
                }
            }
            WorkItem::End => {
                if self.is_active() {
                    self.enter_inactive();
                }
            }
            WorkItem::AddBinding(binding) => {
                let Phase::Active(session) = &mut self.phase else {
                    fatal(ContractViolation::NotActive);
                };
                match session.engine.add_binding(binding) {
                    Ok(()) => session.engine.process(),
                    Err(BindingError::EmptyName) => fatal(ContractViolation::EmptyBindingName),
                    Err(BindingError::TableFull) => fatal(ContractViolation::BindingTableFull),
                }
            }
            WorkItem::NewByte(byte) => {
                if let Phase::Active(session) = &mut self.phase {
                    session.engine.receive_char(byte);
                    session.engine.process();
                } else {
                    trace!("cli {} inactive, byte {} ignored", self.id.0, byte);
                }
            }
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> BridgeState {
        match self.phase {
            Phase::Initial => BridgeState::Initial,
            Phase::Inactive => BridgeState::Inactive,
            Phase::Active(_) => BridgeState::Active,
        }
    }

    /// True while an engine is running.
    pub fn is_active(&self) -> bool {
        matches!(self.phase, Phase::Active(_))
    }

    /// Identity carried in notifications.
    pub fn id(&self) -> ServiceId {
        self.id
    }

    /// User bindings registered with the running engine (0 when inactive).
    pub fn binding_count(&self) -> usize {
        match &self.phase {
            Phase::Active(session) => session.engine.binding_count(),
            _ => 0,
        }
    }

    /// Maximum number of user bindings.
    pub fn binding_capacity(&self) -> usize {
        self.config.max_binding_count as usize
    }

    /// Engine storage requirement in words.
    pub fn required_size(&self) -> usize {
        self.config.required_size()
    }

    /// The device of the running CLI.
    pub fn device(&self) -> Option<&'static dyn CharacterDevice> {
        match &self.phase {
            Phase::Active(session) => Some(session.device),
            _ => None,
        }
    }

    /// Output bytes refused by the device since the current activation.
    pub fn rejected_writes(&self) -> usize {
        match &self.phase {
            Phase::Active(session) => session.engine.writer().rejected(),
            _ => 0,
        }
    }

    /// Handle for posting requests to this bridge.
    pub fn service(&self) -> CliService<M, N> {
        CliService::new(self.inbox)
    }

    /// Get a reference to the notification sink.
    pub fn notifier(&self) -> &S {
        &self.notifier
    }

    fn enter_inactive(&mut self) {
        if let Phase::Active(session) = core::mem::replace(&mut self.phase, Phase::Inactive) {
            let (storage, writer) = session.engine.release();
            if writer.rejected() > 0 {
                warn!("cli {}: device rejected {} bytes", self.id.0, writer.rejected());
            }
            self.backing.reclaim(storage);
        }

        info!("cli {} inactive", self.id.0);
        self.notifier.notify(CliNotification {
            service: self.id,
            status: CliStatus::Inactive,
        });
    }

    fn enter_active(&mut self, device: &'static dyn CharacterDevice) {
        device.register_new_byte_callback(self.inbox);

        let storage = self.backing.lend(self.config.required_size());
        let mut engine = match Engine::new(&self.config, storage, DeviceWriter::new(device)) {
            Ok(engine) => engine,
            Err(EngineError::Config(err)) => fatal(ContractViolation::InvalidConfig(err)),
            Err(EngineError::BufferTooSmall { required, supplied }) => {
                fatal(ContractViolation::BufferTooSmall { required, supplied })
            }
        };
        engine.process();
        self.phase = Phase::Active(Session { device, engine });

        info!("cli {} active", self.id.0);
        self.notifier.notify(CliNotification {
            service: self.id,
            status: CliStatus::Active,
        });
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::notify::NoNotifications;
    use crate::testing::{MockDevice, Recorder};
    use cli_engine::{BindingContext, CliOutput, CommandArgs, CommandBinding};
    use core::future::Future;
    use core::pin::Pin;
    use core::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};
    use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
    use embassy_sync::pubsub::PubSubChannel;
    use std::boxed::Box;
    use std::panic::{catch_unwind, AssertUnwindSafe};
    use std::string::String;
    use std::sync::Mutex;
    use std::thread;
    use std::vec;
    use std::vec::Vec;

    type TestInbox = Inbox<CriticalSectionRawMutex, 16>;
    type TestBridge = CliBridge<CriticalSectionRawMutex, Recorder, 16>;

    fn inbox() -> &'static TestInbox {
        Box::leak(Box::new(Inbox::new()))
    }

    fn bridge(config: ServiceConfig) -> TestBridge {
        CliBridge::new(config, inbox(), Recorder::default())
    }

    fn statuses(bridge: &TestBridge) -> Vec<CliStatus> {
        bridge.notifier().events().iter().map(|n| n.status).collect()
    }

    fn text(bytes: &[u8]) -> String {
        String::from_utf8_lossy(bytes).into_owned()
    }

    fn ping(cli: &mut CliOutput<'_>, _args: CommandArgs<'_>, _context: BindingContext) {
        cli.print("pong");
    }

    fn noop(_cli: &mut CliOutput<'_>, _args: CommandArgs<'_>, _context: BindingContext) {}

    fn record(_cli: &mut CliOutput<'_>, args: CommandArgs<'_>, context: BindingContext) {
        if let Some(seen) = context.and_then(|c| c.downcast_ref::<Mutex<Vec<String>>>()) {
            seen.lock().unwrap().push(String::from(args.raw().unwrap_or_default()));
        }
    }

    // Helper to run a future to completion (simple blocking executor)
    fn block_on<F: Future>(mut f: F) -> F::Output {
        fn noop_raw_waker() -> RawWaker {
            fn noop(_: *const ()) {}
            fn clone(_: *const ()) -> RawWaker {
                noop_raw_waker()
            }
            static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, noop, noop, noop);
            RawWaker::new(core::ptr::null(), &VTABLE)
        }

        let waker = unsafe { Waker::from_raw(noop_raw_waker()) };
        let mut cx = Context::from_waker(&waker);

        // SAFETY: We don't move f after pinning
        let mut f = unsafe { Pin::new_unchecked(&mut f) };

        match f.as_mut().poll(&mut cx) {
            Poll::Ready(result) => result,
            Poll::Pending => panic!("future returned Pending unexpectedly"),
        }
    }

    #[test]
    fn test_first_run_emits_single_inactive() {
        let mut bridge = bridge(ServiceConfig::default());
        assert_eq!(bridge.state(), BridgeState::Initial);

        bridge.process_pending();
        bridge.process_pending();

        assert_eq!(bridge.state(), BridgeState::Inactive);
        assert_eq!(statuses(&bridge), [CliStatus::Inactive]);
        assert_eq!(bridge.notifier().events()[0].service, ServiceId(0));
    }

    #[test]
    fn test_bytes_while_inactive_never_reach_device() {
        let device = MockDevice::leak();
        let mut bridge = bridge(ServiceConfig::default());

        for &b in b"help\n" {
            bridge.dispatch(WorkItem::NewByte(b));
        }
        bridge.process_pending();

        assert!(device.written().is_empty());
        assert_eq!(bridge.state(), BridgeState::Inactive);
    }

    #[test]
    fn test_begin_writes_default_prompt() {
        let device = MockDevice::leak();
        let mut bridge = bridge(ServiceConfig::new(ServiceId(7)));

        bridge.service().begin_cli_async(device);
        bridge.process_pending();

        assert_eq!(device.written(), b"> ");
        assert!(device.has_receiver());
        assert_eq!(bridge.state(), BridgeState::Active);
        assert_eq!(statuses(&bridge), [CliStatus::Inactive, CliStatus::Active]);
        assert_eq!(bridge.notifier().events()[1].service, ServiceId(7));
    }

    #[test]
    fn test_custom_prompt_replaces_default() {
        let device = MockDevice::leak();
        let mut bridge = bridge(ServiceConfig::default().with_invitation("test> "));

        bridge.service().begin_cli_async(device);
        bridge.process_pending();

        assert_eq!(device.written(), b"test> ");
    }

    #[test]
    fn test_second_begin_is_ignored() {
        let device = MockDevice::leak();
        let other = MockDevice::leak();
        let mut bridge = bridge(ServiceConfig::default());
        let service = bridge.service();

        service.begin_cli_async(device);
        service.begin_cli_async(other);
        bridge.process_pending();

        assert_eq!(device.written(), b"> ");
        assert!(other.written().is_empty());
        assert_eq!(statuses(&bridge), [CliStatus::Inactive, CliStatus::Active]);
    }

    #[test]
    fn test_empty_line_reprompts() {
        let device = MockDevice::leak();
        let mut bridge = bridge(ServiceConfig::default());
        bridge.service().begin_cli_async(device);
        bridge.process_pending();
        device.take_written();

        device.inject(b"\n");
        assert_eq!(bridge.process_pending(), 1);

        assert_eq!(device.written(), b"\r\n> \x1b[s\x1b[u");
    }

    #[test]
    fn test_binding_runs_from_device_input() {
        let device = MockDevice::leak();
        let mut bridge = bridge(ServiceConfig::default());
        let service = bridge.service();

        service.begin_cli_async(device);
        service.add_cli_binding_async(CommandBinding::new("ping", ping));
        bridge.process_pending();
        assert_eq!(bridge.binding_count(), 1);

        device.inject(b"ping\n");
        bridge.process_pending();

        assert!(text(&device.written()).contains("pong\r\n"));
    }

    #[test]
    #[should_panic(expected = "binding added while CLI inactive")]
    fn test_add_binding_while_inactive_is_fatal() {
        let mut bridge = bridge(ServiceConfig::default());
        bridge.service().add_cli_binding_async(CommandBinding::new("ping", ping));
        bridge.process_pending();
    }

    #[test]
    #[should_panic(expected = "binding name is empty")]
    fn test_empty_binding_name_is_fatal() {
        let device = MockDevice::leak();
        let mut bridge = bridge(ServiceConfig::default());
        bridge.service().begin_cli_async(device);
        bridge.service().add_cli_binding_async(CommandBinding::new("", ping));
        bridge.process_pending();
    }

    #[test]
    fn test_binding_table_overflow_is_fatal_and_table_unchanged() {
        let device = MockDevice::leak();
        let mut bridge = bridge(ServiceConfig::default().with_max_binding_count(2));
        let service = bridge.service();

        service.begin_cli_async(device);
        service.add_cli_binding_async(CommandBinding::new("a", noop));
        service.add_cli_binding_async(CommandBinding::new("b", noop));
        bridge.process_pending();
        assert_eq!(bridge.binding_count(), 2);

        let result = catch_unwind(AssertUnwindSafe(|| {
            bridge.dispatch(WorkItem::AddBinding(CommandBinding::new("c", noop)));
        }));

        assert!(result.is_err());
        assert_eq!(bridge.binding_count(), 2);
        assert_eq!(bridge.binding_capacity(), 2);
    }

    #[test]
    fn test_undersized_static_buffer_is_fatal_before_io() {
        let device = MockDevice::leak();
        let buffer: &'static mut [CliUint] = Box::leak(vec![0; 4].into_boxed_slice());
        let inbox = inbox();
        let config = ServiceConfig::default().with_buffer(buffer);

        let result = catch_unwind(AssertUnwindSafe(move || {
            let mut bridge: TestBridge = CliBridge::new(config, inbox, Recorder::default());
            bridge.dispatch(WorkItem::Begin(device));
        }));

        assert!(result.is_err());
        assert!(device.written().is_empty());
        assert!(!device.has_receiver());
    }

    #[test]
    fn test_static_buffer_sized_after_all_overrides() {
        let config = ServiceConfig::default()
            .with_invitation("a-long-custom-prompt> ")
            .with_max_binding_count(20);
        let required = config.engine_config().required_size();
        let short = EngineConfig::default().required_size();
        assert!(required > short);

        let buffer: &'static mut [CliUint] = Box::leak(vec![0; short].into_boxed_slice());
        let config = config.with_buffer(buffer);
        let result = catch_unwind(AssertUnwindSafe(move || bridge(config)));
        assert!(result.is_err());
    }

    #[test]
    fn test_static_buffer_reused_across_activations() {
        let device = MockDevice::leak();
        let required = EngineConfig::default().required_size();
        let buffer: &'static mut [CliUint] = Box::leak(vec![0; required].into_boxed_slice());
        let mut bridge = bridge(ServiceConfig::default().with_buffer(buffer));
        let service = bridge.service();

        service.begin_cli_async(device);
        service.end_cli_async();
        service.begin_cli_async(device);
        bridge.process_pending();

        assert_eq!(bridge.state(), BridgeState::Active);
        assert_eq!(device.written(), b"> > ");
        assert_eq!(bridge.required_size(), required);
    }

    #[test]
    fn test_end_deactivates_once() {
        let device = MockDevice::leak();
        let mut bridge = bridge(ServiceConfig::default());
        let service = bridge.service();

        service.begin_cli_async(device);
        service.end_cli_async();
        service.end_cli_async();
        bridge.process_pending();

        assert_eq!(bridge.state(), BridgeState::Inactive);
        assert!(bridge.device().is_none());
        assert_eq!(bridge.binding_count(), 0);
        assert_eq!(
            statuses(&bridge),
            [CliStatus::Inactive, CliStatus::Active, CliStatus::Inactive]
        );

        // Callback still registered, but nothing reaches an engine
        device.take_written();
        device.inject(b"help\n");
        bridge.process_pending();
        assert!(device.written().is_empty());
    }

    #[test]
    fn test_items_before_end_are_processed_first() {
        let device = MockDevice::leak();
        let mut bridge = bridge(ServiceConfig::default());
        let service = bridge.service();
        service.begin_cli_async(device);
        bridge.process_pending();
        device.take_written();

        device.inject(b"x");
        service.end_cli_async();
        device.inject(b"y");
        bridge.process_pending();

        let written = text(&device.written());
        assert!(written.starts_with('x'));
        assert!(!written.contains('y'));
    }

    #[test]
    fn test_two_bridges_write_to_their_own_devices() {
        let first_device = MockDevice::leak();
        let second_device = MockDevice::leak();
        let mut first = bridge(ServiceConfig::new(ServiceId(1)).with_invitation("one> "));
        let mut second = bridge(ServiceConfig::new(ServiceId(2)).with_invitation("two> "));

        first.service().begin_cli_async(first_device);
        second.service().begin_cli_async(second_device);
        first.process_pending();
        second.process_pending();

        first_device.inject(b"a");
        second_device.inject(b"b");
        first.process_pending();
        second.process_pending();

        assert!(text(&first_device.written()).starts_with("one> a"));
        assert!(text(&second_device.written()).starts_with("two> b"));
    }

    #[test]
    fn test_rejected_writes_are_counted_not_fatal() {
        let device = MockDevice::leak();
        device.set_accept(false);
        let mut bridge = bridge(ServiceConfig::default());

        bridge.service().begin_cli_async(device);
        bridge.process_pending();

        assert_eq!(bridge.state(), BridgeState::Active);
        assert_eq!(bridge.rejected_writes(), 2);
    }

    #[test]
    fn test_process_one_handles_posted_item() {
        let device = MockDevice::leak();
        let mut bridge = bridge(ServiceConfig::default());
        bridge.service().begin_cli_async(device);

        block_on(bridge.process_one());

        assert_eq!(bridge.state(), BridgeState::Active);
        assert_eq!(device.written(), b"> ");
    }

    #[test]
    fn test_bytes_from_another_thread_arrive_in_order() {
        const DEPTH: usize = 16;
        let device = MockDevice::leak();
        let inbox: &'static Inbox<CriticalSectionRawMutex, DEPTH> =
            Box::leak(Box::new(Inbox::new()));
        let seen: &'static Mutex<Vec<String>> = Box::leak(Box::new(Mutex::new(Vec::new())));
        let mut bridge = CliBridge::new(ServiceConfig::new(ServiceId(3)), inbox, NoNotifications);
        let service = bridge.service();

        service.begin_cli_async(device);
        service.add_cli_binding_async(CommandBinding::new("echo", record).with_context(seen));
        bridge.process_pending();
        assert_eq!(bridge.binding_count(), 1);

        let expected: Vec<String> = (0..40).map(|i| std::format!("line {} of 40", i)).collect();
        let input: Vec<u8> = expected
            .iter()
            .flat_map(|line| std::format!("echo {}\n", line).into_bytes())
            .collect();
        let total = input.len();

        let sender = thread::spawn(move || {
            for b in input {
                // Single producer: once there is room, the post cannot overflow
                while inbox.len() >= DEPTH {
                    thread::yield_now();
                }
                device.inject(&[b]);
            }
        });

        let mut handled = 0;
        loop {
            handled += bridge.process_pending();
            if sender.is_finished() && inbox.is_empty() {
                break;
            }
            thread::yield_now();
        }
        sender.join().unwrap();
        handled += bridge.process_pending();

        assert_eq!(handled, total);
        assert_eq!(*seen.lock().unwrap(), expected);
        assert_eq!(bridge.id(), ServiceId(3));
        assert_eq!(bridge.state(), BridgeState::Active);
    }

    #[test]
    fn test_notifications_reach_pubsub_subscribers() {
        static CHANNEL: PubSubChannel<CriticalSectionRawMutex, CliNotification, 4, 1, 1> =
            PubSubChannel::new();
        let mut sub = CHANNEL.subscriber().unwrap();
        let device = MockDevice::leak();
        let mut bridge = CliBridge::new(ServiceConfig::new(ServiceId(5)), inbox(), &CHANNEL);

        bridge.service().begin_cli_async(device);
        bridge.process_pending();

        let inactive = sub.try_next_message_pure().unwrap();
        let active = sub.try_next_message_pure().unwrap();
        assert_eq!(inactive.status, CliStatus::Inactive);
        assert_eq!(active.status, CliStatus::Active);
        assert_eq!(active.service, ServiceId(5));
    }
}
