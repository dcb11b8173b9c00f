use std::any::TypeId;
use std::sync::{Arc, Mutex};
use btleplug::api::{Central, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures::channel::mpsc::{Receiver, Sender};
use futures::{SinkExt, StreamExt};
use iced::subscription::{self, Subscription};
use log::{debug, info, warn};
use tokio::spawn;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use tokio_util::sync::CancellationToken;

use crate::device::constants::{fitness_service_uuid, POLL_DELAY, SCAN_ATTEMPTS, SCAN_POLL_DELAY};
use crate::device::session::{decode_steps, DeviceSession};
use crate::device::transport::{BtleTransport, GattTransport};
use crate::device::types::{DeviceCommand, DeviceEvent, DeviceState, Feature};
use crate::error::DeviceError;

async fn start_scanning(manager: &Manager) -> Result<Vec<Adapter>, DeviceError> {
    let adapters = manager.adapters().await?;
    if adapters.is_empty() {
        return Err(DeviceError::NoAdapter);
    }

    let filter = ScanFilter {
        services: vec![fitness_service_uuid()],
    };

    for adapter in &adapters {
        info!("Scanning using adapter {}...", adapter.adapter_info().await.unwrap_or("UNKNOWN".to_string()));
        adapter.start_scan(filter.clone()).await?;
    }

    Ok(adapters)
}

async fn stop_scanning(adapters: &[Adapter]) {
    for adapter in adapters {
        if let Err(err) = adapter.stop_scan().await {
            warn!("Failed to stop scanning: {:?}", err);
        }
    }
}

async fn find_peripheral(adapters: &[Adapter], name_prefix: &str) -> Result<Option<Peripheral>, DeviceError> {
    let service_uuid = fitness_service_uuid();

    for adapter in adapters {
        let peripherals = match adapter.peripherals().await {
            Ok(v) => v,
            Err(err) => {
                warn!("Failed to query BLE adapter for peripherals: {}", err);
                continue;
            },
        };

        for peripheral in peripherals {
            let properties = peripheral.properties().await;

            match properties {
                Err(err) => {
                    warn!("Could not query peripheral for properties: {:?}", err);
                },
                Ok(None) => {
                    warn!("Peripheral has no properties");
                },
                Ok(Some(properties)) => {
                    // Some platforms ignore the scan filter, and some do not
                    // expose the advertised name; accept either signal
                    let name_matches = properties
                        .local_name
                        .as_ref()
                        .map_or(false, |name| name.starts_with(name_prefix));

                    if name_matches || properties.services.contains(&service_uuid) {
                        info!(
                            "Using peripheral {} {:?} {} {:?}",
                            properties.address,
                            properties.address_type,
                            properties.local_name.unwrap_or(String::from("NONE")),
                            properties.services,
                        );
                        return Ok(Some(peripheral));
                    }
                }
            }
        }
    }

    Ok(None)
}

/**
 * Web Bluetooth pops a chooser that either yields a device or a user
 * cancel; here the equivalent is a bounded scan window.
 */
async fn select_peripheral(manager: &Manager, name_prefix: &str) -> Result<Peripheral, DeviceError> {
    let adapters = start_scanning(manager).await?;

    let mut found = None;
    for _ in 0..SCAN_ATTEMPTS {
        match find_peripheral(&adapters, name_prefix).await {
            Ok(Some(peripheral)) => {
                found = Some(peripheral);
                break;
            },
            Ok(None) => debug!("No peripherals matched yet"),
            Err(err) => warn!("Finding peripheral failed: {:?}", err),
        }

        sleep(Duration::from_millis(SCAN_POLL_DELAY)).await;
    }

    stop_scanning(&adapters).await;
    found.ok_or(DeviceError::DeviceNotFound)
}

async fn send_event(events: &mut Sender<DeviceEvent>, event: DeviceEvent) {
    if let Err(err) = events.send(event).await {
        warn!("Failed to send device event: {:?}", err);
    }
}

/**
 * Runs the discovery chain, pushing a `FeatureFound` event the moment each
 * step succeeds so the matching region lights up while later steps are
 * still in flight. Features found before a failing step have already been
 * reported; the caller tears the session down on error, which disables
 * them again.
 */
async fn discover_and_report<T: GattTransport>(
    session: &mut DeviceSession<T>,
    events: &mut Sender<DeviceEvent>,
) -> Result<(), DeviceError> {
    session
        .discover(|feature| {
            if let Err(err) = events.try_send(DeviceEvent::FeatureFound(feature)) {
                warn!("Failed to send device event: {:?}", err);
            }
        })
        .await
}

async fn connect_session(
    manager: &Manager,
    name_prefix: &str,
    session: &mut DeviceSession<BtleTransport>,
    events: &mut Sender<DeviceEvent>,
) -> Result<(), DeviceError> {
    send_event(events, DeviceEvent::StateChange(DeviceState::Scanning)).await;
    let peripheral = select_peripheral(manager, name_prefix).await?;

    send_event(events, DeviceEvent::StateChange(DeviceState::Connecting)).await;
    info!("Connecting to peripheral...");
    peripheral.connect().await?;

    send_event(events, DeviceEvent::StateChange(DeviceState::Discovering)).await;
    session.attach(BtleTransport::new(peripheral));
    discover_and_report(session, events).await?;

    send_event(events, DeviceEvent::StateChange(DeviceState::Ready)).await;
    Ok(())
}

fn steps_notifications_task(
    cancel: CancellationToken,
    peripheral: &Peripheral,
    mut events: Sender<DeviceEvent>,
) -> JoinHandle<Result<(), DeviceError>> {
    let peripheral = peripheral.clone();
    let steps_uuid = Feature::Steps.uuid();

    spawn(async move {
        let mut notifications = peripheral.notifications().await?;

        'mainloop: loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    break 'mainloop;
                },
                Some(data) = notifications.next() => {
                    if data.uuid == steps_uuid {
                        match decode_steps(&data.value) {
                            Some(steps) => {
                                info!("Total steps (notified): {}", steps);
                                if events.send(DeviceEvent::Steps(steps)).await.is_err() {
                                    break 'mainloop;
                                }
                            },
                            None => warn!("Short steps notification: {:02x?}", data.value),
                        }
                    }
                }
            }
        }

        Ok(())
    })
}

/**
 * Both the user toggling off and an out-of-band disconnect converge here.
 * Safe to run repeatedly; with nothing connected it only re-emits the idle
 * state.
 */
async fn teardown(
    cancel: &CancellationToken,
    session: &mut DeviceSession<BtleTransport>,
    notify_cancel: &mut CancellationToken,
    notify_task: &mut Option<JoinHandle<Result<(), DeviceError>>>,
    events: &mut Sender<DeviceEvent>,
) {
    notify_cancel.cancel();
    *notify_cancel = cancel.child_token();

    if let Some(handle) = notify_task.take() {
        info!("Waiting for steps notifications task to stop");
        match handle.await {
            Ok(Ok(())) => info!("Steps notifications task stopped"),
            Ok(Err(err)) => warn!("Steps notifications task failed: {:?}", err),
            Err(err) => warn!("Failed to join steps notifications task: {:?}", err),
        }
    }

    if let Some(transport) = session.transport() {
        info!("Disconnecting...");
        if let Err(err) = transport.disconnect().await {
            warn!("Failed to disconnect peripheral: {:?}", err);
        }
    }

    session.reset();
    send_event(events, DeviceEvent::StateChange(DeviceState::Idle)).await;
}

async fn run_worker(
    cancel: CancellationToken,
    name_prefix: String,
    mut commands: Receiver<DeviceCommand>,
    mut events: Sender<DeviceEvent>,
) {
    let manager = match Manager::new().await {
        Ok(manager) => manager,
        Err(err) => {
            warn!("Failed to initialize the bluetooth manager: {:?}", err);
            return;
        },
    };

    let mut session: DeviceSession<BtleTransport> = DeviceSession::new();
    let mut notify_cancel = cancel.child_token();
    let mut notify_task: Option<JoinHandle<Result<(), DeviceError>>> = None;

    'mainloop: loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                break 'mainloop;
            },

            _ = sleep(Duration::from_millis(POLL_DELAY)), if session.is_connected() => {
                let connected = match session.transport() {
                    Some(transport) => transport.is_connected().await.unwrap_or(false),
                    None => false,
                };

                if !connected {
                    warn!("Connection lost");
                    teardown(&cancel, &mut session, &mut notify_cancel, &mut notify_task, &mut events).await;
                }
            },

            Some(command) = commands.next() => match command {
                DeviceCommand::ToggleConnection => {
                    if session.is_connected() {
                        info!("Disconnecting on request...");
                        teardown(&cancel, &mut session, &mut notify_cancel, &mut notify_task, &mut events).await;
                    } else {
                        info!("Request connection to BLE device <UT - Shape The World>...");
                        match connect_session(&manager, &name_prefix, &mut session, &mut events).await {
                            Ok(()) => {
                                if let Some(transport) = session.transport() {
                                    notify_task = Some(steps_notifications_task(
                                        notify_cancel.clone(),
                                        transport.peripheral(),
                                        events.clone(),
                                    ));
                                }
                            },
                            Err(err) => {
                                warn!("Bluetooth service discovery related error: {:?}", err);
                                teardown(&cancel, &mut session, &mut notify_cancel, &mut notify_task, &mut events).await;
                            },
                        }
                    }
                },
                DeviceCommand::ReadFeature(feature) => {
                    if let Some(value) = session.read_feature(feature).await {
                        send_event(&mut events, DeviceEvent::Reading { feature, value }).await;
                    }
                },
                DeviceCommand::ChangePlotMode(direction) => {
                    if let Some(mode) = session.write_plot_mode(direction).await {
                        send_event(&mut events, DeviceEvent::PlotMode(mode)).await;
                    }
                },
                DeviceCommand::ActivateGrader(code) => {
                    session.activate_grader(code).await;
                },
                DeviceCommand::ToggleStepsNotification => {
                    let enable = !session.is_steps_notifying();
                    let notifying = session.set_steps_notification(enable).await;
                    send_event(&mut events, DeviceEvent::StepsNotifying(notifying)).await;
                },
            },
        }
    }

    teardown(&cancel, &mut session, &mut notify_cancel, &mut notify_task, &mut events).await;
}

/**
 * Runs the device worker inside an iced subscription. The command receiver
 * is handed over through a shared slot because the subscription closure may
 * be rebuilt by the runtime.
 */
pub fn session_subscription(
    cancel: CancellationToken,
    name_prefix: String,
    commands: Arc<Mutex<Option<Receiver<DeviceCommand>>>>,
) -> Subscription<DeviceEvent> {
    struct Worker;

    subscription::channel(
        TypeId::of::<Worker>(),
        64,
        move |events| {
            let cancel = cancel.clone();
            let name_prefix = name_prefix.clone();
            let commands = commands.clone();

            async move {
                let feed = commands.lock().expect("Failed to lock device command receiver").take();

                if let Some(feed) = feed {
                    run_worker(cancel, name_prefix, feed, events).await;
                }

                // note: subscription::channel expects the future to never resolve
                futures::future::pending::<std::convert::Infallible>().await
            }
        },
    )
}
