use crate::{
    ble::{BleConnector, Connector, NotificationHandler, Transport},
    error::{Result, TreadmillError},
    frame::to_hex,
    pending::PendingResponses,
    protocol::{DeviceInfo, Message, UserProfile},
    types::{CommandType, MessageType, Program, SessionConfig, SexType, WorkoutMode},
};
use std::{
    panic::{catch_unwind, AssertUnwindSafe},
    sync::{Arc, Mutex as StdMutex, PoisonError},
    time::Duration,
};
use tokio::{sync::Mutex, time::sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Observer invoked once per inbound frame with the decoded message, or
/// with the decode error when the frame could not be parsed
pub type MessageListener =
    Arc<dyn Fn(std::result::Result<&Message, &TreadmillError>) + Send + Sync>;

/// A session with one treadmill
///
/// `Treadmill` owns the GATT link, serializes every outbound write, fans
/// inbound messages out to registered listeners, and transparently sends
/// the acknowledgements the console protocol demands. One session maps to
/// one connect/close cycle, but the object is restartable: the workout
/// bring-up ritual deliberately closes and reconnects the link.
///
/// # Examples
///
/// ```no_run
/// use solelink::Treadmill;
/// use tokio_util::sync::CancellationToken;
///
/// #[tokio::main]
/// async fn main() -> solelink::Result<()> {
///     let treadmill = Treadmill::new("AA:BB:CC:DD:EE:FF")?;
///     treadmill.connect(&CancellationToken::new()).await?;
///
///     let info = treadmill.get_device_info().await?;
///     println!("connected to a {}", info.model);
///
///     treadmill.start_workout().await?;
///     Ok(())
/// }
/// ```
pub struct Treadmill {
    inner: Arc<Inner>,
}

struct Inner {
    connector: Box<dyn Connector>,
    config: SessionConfig,
    /// Owns the live link; the lock doubles as the write mutex, so holding
    /// it for one encode + one GATT write is what keeps frames whole.
    transport: Mutex<Option<Box<dyn Transport>>>,
    listeners: StdMutex<Vec<MessageListener>>,
    pending: Arc<PendingResponses>,
    profile: StdMutex<UserProfile>,
}

impl Treadmill {
    /// Create a session for the treadmill at the given Bluetooth address
    ///
    /// # Errors
    ///
    /// Returns [`TreadmillError::InvalidAddress`] if the address string is
    /// not a valid Bluetooth device address.
    pub fn new(address: &str) -> Result<Self> {
        Self::with_config(address, SessionConfig::default())
    }

    /// Create a session with custom timing parameters
    ///
    /// # Errors
    ///
    /// Returns [`TreadmillError::InvalidAddress`] if the address string is
    /// not a valid Bluetooth device address.
    pub fn with_config(address: &str, config: SessionConfig) -> Result<Self> {
        let connector = BleConnector::new(address, config.scan_timeout)?;
        Ok(Self::with_connector(Box::new(connector), config))
    }

    /// Create a session over a custom [`Connector`]
    ///
    /// Useful for alternative transports and for driving the session
    /// against an in-memory link in tests.
    #[must_use]
    pub fn with_connector(connector: Box<dyn Connector>, config: SessionConfig) -> Self {
        let pending = Arc::new(PendingResponses::new());

        let inner = Arc::new(Inner {
            connector,
            config,
            transport: Mutex::new(None),
            listeners: StdMutex::new(Vec::new()),
            pending: Arc::clone(&pending),
            profile: StdMutex::new(UserProfile::default()),
        });

        // The response registry is fed through the ordinary listener path;
        // it gets no privileged hook into the notification handler.
        inner.push_listener(Arc::new(move |event| match event {
            Ok(msg) => pending.deliver(msg),
            Err(err) => pending.fail_all(err),
        }));

        Self { inner }
    }

    /// Session timing parameters
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// Connect to the treadmill and subscribe to its notifications
    ///
    /// # Errors
    ///
    /// Returns [`TreadmillError::Cancelled`] if `cancel` fires before the
    /// link is up, or any connection-setup error from the underlying
    /// transport ([`TreadmillError::DeviceNotFound`],
    /// [`TreadmillError::MissingService`], ...).
    pub async fn connect(&self, cancel: &CancellationToken) -> Result<()> {
        let transport = tokio::select! {
            result = self.inner.connector.connect() => result?,
            () = cancel.cancelled() => return Err(TreadmillError::Cancelled),
        };

        let weak = Arc::downgrade(&self.inner);
        let handler: NotificationHandler = Arc::new(move |data| {
            if let Some(inner) = weak.upgrade() {
                inner.handle_notification(data);
            }
        });

        transport.subscribe(handler).await?;

        if let Some(old) = self.inner.transport.lock().await.replace(transport) {
            // A stale link from an earlier connect cycle; tear it down so
            // its notification pump stops.
            let _ = old.close().await;
        }

        Ok(())
    }

    /// Close the link and fail every outstanding response waiter
    ///
    /// # Errors
    ///
    /// Returns transport errors from the disconnect. The session is left
    /// detached either way and can be reconnected.
    pub async fn close(&self) -> Result<()> {
        info!("closing treadmill session");

        let transport = self.inner.transport.lock().await.take();
        self.inner.pending.fail_all(&TreadmillError::Disconnected);

        if let Some(transport) = transport {
            transport.close().await?;
        }

        Ok(())
    }

    /// Whether the session currently holds a live transport
    pub async fn is_connected(&self) -> bool {
        self.inner.transport.lock().await.is_some()
    }

    /// Query the device model and capability report
    ///
    /// # Errors
    ///
    /// Returns [`TreadmillError::AckTimeout`] if the console never answers,
    /// or any transport error from the write.
    pub async fn get_device_info(&self) -> Result<DeviceInfo> {
        let response = self
            .inner
            .write_with_response(&Message::GetDeviceInfo, MessageType::DeviceInfo)
            .await?;

        match response {
            Message::DeviceInfo(info) => Ok(info),
            other => Err(TreadmillError::InvalidMessage(format!(
                "expected a device info report, got {other}"
            ))),
        }
    }

    /// Send a user profile and remember it for the workout bring-up
    ///
    /// # Errors
    ///
    /// Returns [`TreadmillError::AckTimeout`] if the console never
    /// acknowledges the profile, or any transport error from the write.
    pub async fn set_user_profile(
        &self,
        sex: SexType,
        age: u8,
        weight: u16,
        height: u8,
    ) -> Result<()> {
        let profile = UserProfile {
            sex,
            age,
            weight,
            height,
        };

        self.inner
            .write_with_response(&Message::UserProfile(profile), MessageType::Ack)
            .await?;

        *lock_unpoisoned(&self.inner.profile) = profile;

        Ok(())
    }

    /// Set the workout time target; the duration is truncated to whole
    /// minutes (and saturates at 255)
    ///
    /// # Errors
    ///
    /// Returns [`TreadmillError::AckTimeout`] if the console never
    /// acknowledges the target, or any transport error from the write.
    pub async fn set_workout_time(&self, duration: Duration) -> Result<()> {
        let minutes = u8::try_from(duration.as_secs() / 60).unwrap_or(u8::MAX);

        self.inner
            .write_with_response(
                &Message::WorkoutTarget {
                    time: minutes,
                    calories: 0,
                },
                MessageType::Ack,
            )
            .await?;

        Ok(())
    }

    /// Set the maximum incline the console will allow
    ///
    /// # Errors
    ///
    /// Returns [`TreadmillError::AckTimeout`] if the console never
    /// acknowledges the setting, or any transport error from the write.
    pub async fn set_max_incline(&self, max_incline: u8) -> Result<()> {
        self.inner
            .write_with_response(&Message::MaxIncline { max_incline }, MessageType::Ack)
            .await?;

        Ok(())
    }

    /// Request a workout mode change
    ///
    /// Mode changes are not ACKed: the console echoes the `SetWorkoutMode`
    /// frame back, and that echo is what this call waits for.
    ///
    /// # Errors
    ///
    /// Returns [`TreadmillError::AckTimeout`] if the echo never arrives, or
    /// any transport error from the write.
    pub async fn set_workout_mode(&self, mode: WorkoutMode) -> Result<()> {
        self.inner
            .write_with_response(
                &Message::SetWorkoutMode { mode },
                MessageType::SetWorkoutMode,
            )
            .await?;

        Ok(())
    }

    /// Select a workout program
    ///
    /// # Errors
    ///
    /// Returns [`TreadmillError::AckTimeout`] if the console never
    /// acknowledges the selection, or any transport error from the write.
    pub async fn set_program(&self, program: Program) -> Result<()> {
        self.inner
            .write_with_response(&Message::Program { program }, MessageType::Ack)
            .await?;

        Ok(())
    }

    /// Increase the level by one step
    ///
    /// # Errors
    ///
    /// Returns [`TreadmillError::AckTimeout`] if the console never
    /// acknowledges the command, or any transport error from the write.
    pub async fn level_up(&self) -> Result<()> {
        self.send_command(CommandType::LevelUp).await
    }

    /// Decrease the level by one step
    ///
    /// # Errors
    ///
    /// Returns [`TreadmillError::AckTimeout`] if the console never
    /// acknowledges the command, or any transport error from the write.
    pub async fn level_down(&self) -> Result<()> {
        self.send_command(CommandType::LevelDown).await
    }

    async fn send_command(&self, command: CommandType) -> Result<()> {
        self.inner
            .write_with_response(&Message::Command { command }, MessageType::Ack)
            .await?;

        Ok(())
    }

    /// Run the workout bring-up ritual
    ///
    /// Programs the console (profile, manual program, zeroed target), puts
    /// it into start mode, and then rides out the link drop the console
    /// performs when it leaves programming mode: close, wait, reconnect,
    /// and confirm the fresh link with a device info query.
    ///
    /// # Errors
    ///
    /// Returns the first programming-step error, or the last reconnect
    /// error if the console never comes back.
    pub async fn start_workout(&self) -> Result<()> {
        info!("starting workout");

        let profile = *lock_unpoisoned(&self.inner.profile);
        self.inner
            .write_with_response(&Message::UserProfile(profile), MessageType::Ack)
            .await?;

        self.inner
            .write_with_response(
                &Message::Program {
                    program: Program::Manual,
                },
                MessageType::Ack,
            )
            .await?;

        self.inner
            .write_with_response(
                &Message::WorkoutTarget {
                    time: 0,
                    calories: 0,
                },
                MessageType::Ack,
            )
            .await?;

        self.inner
            .write_with_response(
                &Message::SetWorkoutMode {
                    mode: WorkoutMode::Start,
                },
                MessageType::SetWorkoutMode,
            )
            .await?;

        // The console drops the BLE link when it transitions from
        // programming to running; only a fresh connection resumes
        // telemetry.
        self.close().await?;
        sleep(self.inner.config.restart_delay).await;

        let cancel = CancellationToken::new();
        let mut last_error = TreadmillError::Disconnected;

        for attempt in 1..=self.inner.config.reconnect_attempts {
            match self.connect(&cancel).await {
                Ok(()) => {
                    info!("reconnected after workout start (attempt {attempt})");
                    self.get_device_info().await?;
                    return Ok(());
                }
                Err(err) => {
                    warn!("reconnect attempt {attempt} failed: {err}");
                    last_error = err;
                }
            }
        }

        Err(last_error)
    }

    /// Block until the next inbound message of `message_type` arrives
    ///
    /// # Errors
    ///
    /// Returns [`TreadmillError::Cancelled`] if `cancel` fires first, or
    /// the broadcast error if a decode failure desynchronizes the session
    /// while waiting.
    pub async fn wait_for_response(
        &self,
        message_type: MessageType,
        cancel: &CancellationToken,
    ) -> Result<Message> {
        let mut waiter = self.inner.pending.register(message_type);

        tokio::select! {
            result = waiter.recv() => result,
            () = cancel.cancelled() => Err(TreadmillError::Cancelled),
        }
    }

    /// Register an observer for every decoded inbound message
    ///
    /// Listeners are invoked in registration order; a listener that panics
    /// is logged and skipped without affecting the others.
    pub fn add_listener<F>(&self, listener: F)
    where
        F: Fn(std::result::Result<&Message, &TreadmillError>) + Send + Sync + 'static,
    {
        self.inner.push_listener(Arc::new(listener));
    }
}

impl Inner {
    fn push_listener(&self, listener: MessageListener) {
        lock_unpoisoned(&self.listeners).push(listener);
    }

    /// Deliver an inbound event to every listener in registration order
    fn fan_out(&self, event: std::result::Result<&Message, &TreadmillError>) {
        let snapshot: Vec<MessageListener> = lock_unpoisoned(&self.listeners).clone();

        for listener in snapshot {
            if catch_unwind(AssertUnwindSafe(|| listener(event))).is_err() {
                warn!("message listener panicked");
            }
        }
    }

    /// Entry point for raw frames arriving from the transport
    ///
    /// Runs on the transport's dispatch task and must not block: replies
    /// are spawned onto their own task before the listeners run.
    fn handle_notification(self: &Arc<Self>, data: &[u8]) {
        let msg = match Message::parse(data) {
            Ok(msg) => msg,
            Err(err) => {
                warn!("dropping inbound frame: {err}");
                self.fan_out(Err(&err));
                return;
            }
        };

        debug!("T->C: {} -- {msg}", to_hex(data));

        match msg.message_type() {
            // Never reply to a reply.
            MessageType::Ack | MessageType::SetWorkoutMode | MessageType::DeviceInfo => {}
            // Mode broadcasts are special: the console expects them echoed
            // back verbatim.
            MessageType::WorkoutMode => self.spawn_reply(msg.clone()),
            MessageType::WorkoutData
            | MessageType::HeartRateType
            | MessageType::ErrorCode
            | MessageType::Speed
            | MessageType::Incline
            | MessageType::Level
            | MessageType::Rpm
            | MessageType::HeartRate
            | MessageType::TargetHeartRate
            | MessageType::MaxSpeed
            | MessageType::MaxIncline
            | MessageType::MaxLevel
            | MessageType::EndWorkout
            | MessageType::ProgramGraphics => self.spawn_reply(Message::Ack {
                acknowledged: msg.message_type(),
            }),
            _ => warn!("unhandled ack condition: {msg}"),
        }

        self.fan_out(Ok(&msg));
    }

    /// Send a protocol-mandated reply without blocking the notification
    /// handler; failures are reported through the listener channel
    fn spawn_reply(self: &Arc<Self>, reply: Message) {
        let inner = Arc::clone(self);

        tokio::spawn(async move {
            if let Err(err) = inner.write(&reply).await {
                error!("failed to send automatic reply {reply}: {err}");
                inner.fan_out(Err(&err));
            }
        });
    }

    /// Encode and write one frame while holding the write mutex
    async fn write(&self, msg: &Message) -> Result<()> {
        let transport = self.transport.lock().await;
        let Some(transport) = transport.as_ref() else {
            return Err(TreadmillError::Disconnected);
        };

        let frame_bytes = msg.encode()?;
        debug!("C->T: {} -- {msg}", to_hex(&frame_bytes));

        transport.write(&frame_bytes).await
    }

    /// Retransmit `msg` until a message of type `expect` arrives
    ///
    /// The waiter is registered once, before the first write, so a response
    /// landing between retransmissions short-circuits the loop.
    async fn write_with_response(&self, msg: &Message, expect: MessageType) -> Result<Message> {
        let mut waiter = self.pending.register(expect);

        for _ in 0..self.config.write_attempts {
            self.write(msg).await?;

            tokio::select! {
                result = waiter.recv() => return result,
                () = sleep(self.config.write_gap) => {}
            }
        }

        Err(TreadmillError::AckTimeout {
            expected: expect,
            request: msg.to_string(),
        })
    }
}

fn lock_unpoisoned<T>(mutex: &StdMutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
