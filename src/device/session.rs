use log::{info, warn};

use crate::device::constants::{fitness_service_uuid, FITNESS_SERVICE, PLOT_MODE_COUNT};
use crate::device::transport::GattTransport;
use crate::device::types::{Feature, PlotDirection};
use crate::error::DeviceError;

/**
 * Characteristic handles, populated strictly in discovery order.
 */
#[derive(Debug)]
struct FeatureHandles<C> {
    plot_state: Option<C>,
    time: Option<C>,
    sound: Option<C>,
    temperature: Option<C>,
    light: Option<C>,
    grader: Option<C>,
    steps: Option<C>,
}

impl<C> FeatureHandles<C> {
    fn empty() -> Self {
        FeatureHandles {
            plot_state: None,
            time: None,
            sound: None,
            temperature: None,
            light: None,
            grader: None,
            steps: None,
        }
    }

    fn get(&self, feature: Feature) -> Option<&C> {
        match feature {
            Feature::PlotState => self.plot_state.as_ref(),
            Feature::Time => self.time.as_ref(),
            Feature::Sound => self.sound.as_ref(),
            Feature::Temperature => self.temperature.as_ref(),
            Feature::Light => self.light.as_ref(),
            Feature::Grader => self.grader.as_ref(),
            Feature::Steps => self.steps.as_ref(),
        }
    }

    fn set(&mut self, feature: Feature, handle: C) {
        let slot = match feature {
            Feature::PlotState => &mut self.plot_state,
            Feature::Time => &mut self.time,
            Feature::Sound => &mut self.sound,
            Feature::Temperature => &mut self.temperature,
            Feature::Light => &mut self.light,
            Feature::Grader => &mut self.grader,
            Feature::Steps => &mut self.steps,
        };
        *slot = Some(handle);
    }
}

/**
 * Owns the connection to the fitness device and the per-feature
 * characteristic handles.
 *
 * Lifecycle: everything is empty at rest, `attach` installs a transport,
 * `discover` populates the handles in the fixed order, and `reset` returns
 * the session to the at-rest state. Both user-initiated disconnects and
 * out-of-band disconnect detection converge on `reset`.
 *
 * Apart from the discovery chain, transport failures never propagate out of
 * this type: operations log and yield no value instead.
 */
pub struct DeviceSession<T: GattTransport> {
    transport: Option<T>,
    handles: FeatureHandles<T::Char>,
    ready: bool,
    steps_subscribed: bool,
    plot_mode: u8,
}

impl<T: GattTransport> DeviceSession<T> {
    pub fn new() -> Self {
        DeviceSession {
            transport: None,
            handles: FeatureHandles::empty(),
            ready: false,
            steps_subscribed: false,
            plot_mode: 0,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_some()
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn is_steps_notifying(&self) -> bool {
        self.handles.steps.is_some() && self.steps_subscribed
    }

    pub fn plot_mode(&self) -> u8 {
        self.plot_mode
    }

    pub fn feature_found(&self, feature: Feature) -> bool {
        self.handles.get(feature).is_some()
    }

    pub fn transport(&self) -> Option<&T> {
        self.transport.as_ref()
    }

    /**
     * Clears every handle and flag. Idempotent; a partially discovered
     * session must never leak handles into the next connection.
     */
    pub fn reset(&mut self) {
        self.transport = None;
        self.handles = FeatureHandles::empty();
        self.ready = false;
        self.steps_subscribed = false;
        self.plot_mode = 0;
    }

    pub fn attach(&mut self, transport: T) {
        self.reset();
        self.transport = Some(transport);
    }

    /**
     * Sequential discovery of the fitness service and its seven
     * characteristics, in the order of [`Feature::DISCOVERY_ORDER`].
     *
     * All-or-nothing: the first missing piece aborts the remaining lookups
     * and the session only becomes ready once every step succeeded. Handles
     * found before the failure stay populated until the caller tears the
     * session down with `reset`. `on_found` fires once per successful step
     * so the panel can enable the matching region as discovery progresses.
     */
    pub async fn discover(&mut self, mut on_found: impl FnMut(Feature)) -> Result<(), DeviceError> {
        let Some(transport) = self.transport.as_ref() else {
            return Err(DeviceError::NotConnected);
        };

        transport.discover_services().await?;

        let service = fitness_service_uuid();
        if !transport.has_service(service) {
            return Err(DeviceError::MissingService);
        }
        info!("Found <UT - Shape The World> service: {:#06x}", FITNESS_SERVICE);

        for feature in Feature::DISCOVERY_ORDER {
            info!("Looking for the {} characteristic", feature);

            let Some(handle) = transport.characteristic(service, feature.uuid()) else {
                return Err(DeviceError::MissingCharacteristic(feature));
            };

            info!("Found the {} characteristic: {:#06x}", feature, feature.short_uuid());
            self.handles.set(feature, handle);
            on_found(feature);
        }

        info!("Done <UT - Shape The World> service discovery");
        self.ready = true;
        Ok(())
    }

    /**
     * Reads a read-capable feature and decodes it to its numeric value.
     * Time, sound and light are big-endian u32; temperature is a single
     * byte. A missing handle or a failed read logs and yields `None`.
     */
    pub async fn read_feature(&self, feature: Feature) -> Option<u32> {
        if !feature.readable() {
            warn!("The {} feature is not readable; ignoring read", feature);
            return None;
        }

        let transport = self.transport.as_ref()?;
        let Some(handle) = self.handles.get(feature) else {
            warn!("No {} characteristic; ignoring read", feature);
            return None;
        };

        let raw = match transport.read(handle).await {
            Ok(raw) => raw,
            Err(err) => {
                warn!("Failed to read the {} characteristic: {:?}", feature, err);
                return None;
            }
        };

        let decoded = match feature {
            Feature::Temperature => decode_u8(&raw),
            _ => decode_u32(&raw),
        };

        let Some(value) = decoded else {
            warn!("Short {} value from fitness device: {:02x?}", feature, raw);
            return None;
        };

        info!("{} reading of fitness device: {}", feature, value);
        Some(value)
    }

    /**
     * Advances or retreats the plot mode cyclically over
     * {0, .., PLOT_MODE_COUNT - 1} and writes the new mode as a single
     * byte. The counter only moves once the write succeeded; the new mode
     * is returned so the caller can render it.
     */
    pub async fn write_plot_mode(&mut self, direction: PlotDirection) -> Option<u8> {
        let Some(transport) = self.transport.as_ref() else {
            return None;
        };
        let Some(handle) = self.handles.plot_state.as_ref() else {
            warn!("No plot state characteristic; ignoring mode change");
            return None;
        };

        let mode = match direction {
            PlotDirection::Up => (self.plot_mode + 1) % PLOT_MODE_COUNT,
            PlotDirection::Down => self.plot_mode.checked_sub(1).unwrap_or(PLOT_MODE_COUNT - 1),
        };

        info!("Plot mode value to write ({:?}): {}", direction, mode);
        match transport.write(handle, &[mode]).await {
            Ok(()) => {
                self.plot_mode = mode;
                Some(mode)
            }
            Err(err) => {
                warn!("Plot state write failed: {:?}", err);
                None
            }
        }
    }

    /**
     * Writes a 2-byte big-endian activation code to the grader
     * characteristic. The handle is checked here as well as at the
     * button-enable stage: a click racing teardown must not touch a
     * dangling handle.
     */
    pub async fn activate_grader(&self, code: u16) {
        let Some(transport) = self.transport.as_ref() else {
            return;
        };
        let Some(handle) = self.handles.grader.as_ref() else {
            warn!("No grader characteristic; ignoring activation");
            return;
        };

        match transport.write(handle, &code.to_be_bytes()).await {
            Ok(()) => info!("Done activating grader - check lab grade"),
            Err(err) => warn!("Activate grader error: {:?}", err),
        }
    }

    /**
     * Starts or stops steps change notifications. Idempotent: enabling
     * while already subscribed and any call without a steps handle are
     * no-ops. Returns the resulting subscription state.
     */
    pub async fn set_steps_notification(&mut self, enable: bool) -> bool {
        let Some(transport) = self.transport.as_ref() else {
            return false;
        };
        let Some(handle) = self.handles.steps.as_ref() else {
            warn!("No steps characteristic; ignoring notification change");
            return self.steps_subscribed;
        };

        if enable {
            if self.steps_subscribed {
                return true;
            }

            match transport.subscribe(handle).await {
                Ok(()) => {
                    info!("Steps notification started");
                    self.steps_subscribed = true;
                }
                Err(err) => {
                    warn!("Notification error: {:?}", err);
                    self.steps_subscribed = false;
                }
            }
        } else {
            // not supported by all platforms
            match transport.unsubscribe(handle).await {
                Ok(()) => {
                    info!("Steps notification stopped");
                    self.steps_subscribed = false;
                }
                Err(err) => warn!("Notification error: {:?}", err),
            }
        }

        self.steps_subscribed
    }
}

fn decode_u32(raw: &[u8]) -> Option<u32> {
    Some(u32::from_be_bytes(raw.get(..4)?.try_into().ok()?))
}

fn decode_u8(raw: &[u8]) -> Option<u32> {
    raw.first().map(|byte| u32::from(*byte))
}

/** Steps notifications carry a big-endian i16. */
pub(crate) fn decode_steps(raw: &[u8]) -> Option<i16> {
    Some(i16::from_be_bytes(raw.get(..2)?.try_into().ok()?))
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;
    use uuid::Uuid;

    use super::*;
    use crate::device::constants::fitness_service_uuid;

    #[derive(Default)]
    struct Calls {
        lookups: Vec<Uuid>,
        reads: Vec<Uuid>,
        writes: Vec<(Uuid, Vec<u8>)>,
        subscribes: u32,
        unsubscribes: u32,
    }

    struct MockTransport {
        missing: Vec<Feature>,
        no_service: bool,
        read_value: Vec<u8>,
        fail_writes: bool,
        calls: Rc<RefCell<Calls>>,
    }

    impl MockTransport {
        fn ready() -> Self {
            MockTransport {
                missing: Vec::new(),
                no_service: false,
                read_value: Vec::new(),
                fail_writes: false,
                calls: Rc::new(RefCell::new(Calls::default())),
            }
        }

        fn without(missing: &[Feature]) -> Self {
            MockTransport { missing: missing.to_vec(), ..MockTransport::ready() }
        }
    }

    impl GattTransport for MockTransport {
        type Char = Uuid;

        async fn discover_services(&self) -> Result<(), DeviceError> {
            Ok(())
        }

        fn has_service(&self, service: Uuid) -> bool {
            !self.no_service && service == fitness_service_uuid()
        }

        fn characteristic(&self, _service: Uuid, characteristic: Uuid) -> Option<Uuid> {
            self.calls.borrow_mut().lookups.push(characteristic);
            if self.missing.iter().any(|f| f.uuid() == characteristic) {
                None
            } else {
                Some(characteristic)
            }
        }

        async fn read(&self, characteristic: &Uuid) -> Result<Vec<u8>, DeviceError> {
            self.calls.borrow_mut().reads.push(*characteristic);
            Ok(self.read_value.clone())
        }

        async fn write(&self, characteristic: &Uuid, payload: &[u8]) -> Result<(), DeviceError> {
            if self.fail_writes {
                return Err(DeviceError::NotConnected);
            }
            self.calls.borrow_mut().writes.push((*characteristic, payload.to_vec()));
            Ok(())
        }

        async fn subscribe(&self, _characteristic: &Uuid) -> Result<(), DeviceError> {
            self.calls.borrow_mut().subscribes += 1;
            Ok(())
        }

        async fn unsubscribe(&self, _characteristic: &Uuid) -> Result<(), DeviceError> {
            self.calls.borrow_mut().unsubscribes += 1;
            Ok(())
        }

        async fn is_connected(&self) -> Result<bool, DeviceError> {
            Ok(true)
        }

        async fn disconnect(&self) -> Result<(), DeviceError> {
            Ok(())
        }
    }

    async fn discovered_session(transport: MockTransport) -> DeviceSession<MockTransport> {
        let mut session = DeviceSession::new();
        session.attach(transport);
        session.discover(|_| {}).await.expect("discovery failed");
        session
    }

    #[tokio::test]
    async fn full_discovery_marks_the_session_ready() {
        let mut session = DeviceSession::new();
        session.attach(MockTransport::ready());

        let mut found = Vec::new();
        session.discover(|feature| found.push(feature)).await.unwrap();

        assert_eq!(found, Feature::DISCOVERY_ORDER);
        assert!(session.is_ready());
        for feature in Feature::DISCOVERY_ORDER {
            assert!(session.feature_found(feature));
        }
    }

    #[tokio::test]
    async fn each_discovery_step_reports_before_the_next_lookup() {
        let transport = MockTransport::ready();
        let calls = Rc::clone(&transport.calls);

        let mut session = DeviceSession::new();
        session.attach(transport);

        let mut progress = Vec::new();
        session
            .discover(|feature| progress.push((feature, calls.borrow().lookups.len())))
            .await
            .unwrap();

        let expected: Vec<(Feature, usize)> = Feature::DISCOVERY_ORDER
            .into_iter()
            .enumerate()
            .map(|(step, feature)| (feature, step + 1))
            .collect();
        assert_eq!(progress, expected);
    }

    #[tokio::test]
    async fn discovery_aborts_at_the_first_missing_characteristic() {
        let mut session = DeviceSession::new();
        session.attach(MockTransport::without(&[Feature::Sound]));

        let mut found = Vec::new();
        let result = session.discover(|feature| found.push(feature)).await;

        assert!(matches!(result, Err(DeviceError::MissingCharacteristic(Feature::Sound))));
        assert_eq!(found, [Feature::PlotState, Feature::Time]);
        assert!(!session.is_ready());
        assert!(session.feature_found(Feature::Time));
        assert!(!session.feature_found(Feature::Temperature));
        assert!(!session.feature_found(Feature::Steps));
    }

    #[tokio::test]
    async fn discovery_requires_the_fitness_service() {
        let mut session = DeviceSession::new();
        session.attach(MockTransport { no_service: true, ..MockTransport::ready() });

        let result = session.discover(|_| {}).await;

        assert!(matches!(result, Err(DeviceError::MissingService)));
        assert!(!session.is_ready());
    }

    #[tokio::test]
    async fn discovery_without_a_transport_fails() {
        let mut session: DeviceSession<MockTransport> = DeviceSession::new();
        assert!(matches!(session.discover(|_| {}).await, Err(DeviceError::NotConnected)));
    }

    #[tokio::test]
    async fn reset_is_idempotent() {
        let mut session = discovered_session(MockTransport::ready()).await;
        session.set_steps_notification(true).await;

        for _ in 0..2 {
            session.reset();
            assert!(!session.is_connected());
            assert!(!session.is_ready());
            assert!(!session.is_steps_notifying());
            assert_eq!(session.plot_mode(), 0);
            for feature in Feature::DISCOVERY_ORDER {
                assert!(!session.feature_found(feature));
            }
        }
    }

    #[tokio::test]
    async fn plot_mode_wraps_in_both_directions() {
        let mut session = discovered_session(MockTransport::ready()).await;

        assert_eq!(session.write_plot_mode(PlotDirection::Up).await, Some(1));
        assert_eq!(session.write_plot_mode(PlotDirection::Up).await, Some(2));
        assert_eq!(session.write_plot_mode(PlotDirection::Up).await, Some(0));
        assert_eq!(session.write_plot_mode(PlotDirection::Down).await, Some(2));
        assert_eq!(session.write_plot_mode(PlotDirection::Down).await, Some(1));
        assert_eq!(session.write_plot_mode(PlotDirection::Down).await, Some(0));

        let calls = session.transport().unwrap().calls.borrow();
        let payloads: Vec<Vec<u8>> = calls.writes.iter().map(|(_, p)| p.clone()).collect();
        assert_eq!(payloads, [vec![1u8], vec![2], vec![0], vec![2], vec![1], vec![0]]);
    }

    #[tokio::test]
    async fn plot_mode_write_failure_leaves_the_counter() {
        let mut session = discovered_session(MockTransport { fail_writes: true, ..MockTransport::ready() }).await;

        assert_eq!(session.write_plot_mode(PlotDirection::Up).await, None);
        assert_eq!(session.plot_mode(), 0);
    }

    #[tokio::test]
    async fn temperature_reads_decode_a_single_byte() {
        let session = discovered_session(MockTransport { read_value: vec![0x1F], ..MockTransport::ready() }).await;

        assert_eq!(session.read_feature(Feature::Temperature).await, Some(31));
    }

    #[tokio::test]
    async fn time_reads_decode_big_endian_u32() {
        let session = discovered_session(MockTransport { read_value: vec![0x00, 0x00, 0x01, 0x2C], ..MockTransport::ready() }).await;

        assert_eq!(session.read_feature(Feature::Time).await, Some(300));
    }

    #[tokio::test]
    async fn short_values_read_as_nothing() {
        let session = discovered_session(MockTransport { read_value: vec![0x01], ..MockTransport::ready() }).await;

        assert_eq!(session.read_feature(Feature::Light).await, None);
    }

    #[tokio::test]
    async fn reading_a_missing_handle_is_a_silent_noop() {
        let mut session = DeviceSession::new();
        session.attach(MockTransport::without(&[Feature::Time]));
        let _ = session.discover(|_| {}).await;

        assert_eq!(session.read_feature(Feature::Time).await, None);
        assert!(session.transport().unwrap().calls.borrow().reads.is_empty());
    }

    #[tokio::test]
    async fn write_only_features_are_not_readable() {
        let session = discovered_session(MockTransport::ready()).await;

        assert_eq!(session.read_feature(Feature::PlotState).await, None);
        assert!(session.transport().unwrap().calls.borrow().reads.is_empty());
    }

    #[tokio::test]
    async fn enabling_steps_notifications_twice_subscribes_once() {
        let mut session = discovered_session(MockTransport::ready()).await;

        assert!(session.set_steps_notification(true).await);
        assert!(session.set_steps_notification(true).await);
        assert!(session.is_steps_notifying());
        assert_eq!(session.transport().unwrap().calls.borrow().subscribes, 1);

        assert!(!session.set_steps_notification(false).await);
        assert!(!session.is_steps_notifying());
        assert_eq!(session.transport().unwrap().calls.borrow().unsubscribes, 1);

        assert!(session.set_steps_notification(true).await);
        assert_eq!(session.transport().unwrap().calls.borrow().subscribes, 2);
    }

    #[tokio::test]
    async fn grader_codes_are_written_big_endian() {
        let session = discovered_session(MockTransport::ready()).await;

        session.activate_grader(0x1A2B).await;

        let calls = session.transport().unwrap().calls.borrow();
        assert_eq!(calls.writes, [(Feature::Grader.uuid(), vec![0x1A, 0x2B])]);
    }

    #[tokio::test]
    async fn grader_activation_without_a_handle_is_a_noop() {
        let mut session = DeviceSession::new();
        session.attach(MockTransport::without(&[Feature::Grader]));
        let _ = session.discover(|_| {}).await;

        session.activate_grader(0xFFFF).await;

        assert!(session.transport().unwrap().calls.borrow().writes.is_empty());
    }

    #[test]
    fn steps_decode_as_big_endian_i16() {
        assert_eq!(decode_steps(&[0x01, 0x2C]), Some(300));
        assert_eq!(decode_steps(&[0xFF, 0xFE]), Some(-2));
        assert_eq!(decode_steps(&[0x01]), None);
    }
}
