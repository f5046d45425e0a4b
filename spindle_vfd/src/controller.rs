//! Per-drive VFD request state machine.
//!
//! Exchange state: `Idle → AwaitingReply(context) → Idle`.
//!
//! - `set_state` and blocking `set_rpm` hold `AwaitingReply` for the whole
//!   retry loop and return to `Idle` before returning.
//! - Non-blocking `set_rpm` holds `AwaitingReply` until the transport
//!   reports the reply or exception for it.
//! - `set_state`/`set_rpm` calls made while not `Idle` are dropped.
//! - Speed read-back polls are rate limited and do not occupy the state.
//!
//! Fatal drive faults are raised through the [`AlarmSink`]; the controller
//! never recovers from one by itself.

use spindle_common::consts::RPM_UNKNOWN;
use spindle_common::spindle::alarm::{AlarmSink, SpindleAlarm};
use spindle_common::spindle::config::VfdConfig;
use spindle_common::spindle::types::{SpindleId, SpindleInfo, SpindleRuntimeData, VfdState};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::codec::{CommandWord, decode_speed, encode_speed};
use crate::modbus::{ModbusReply, ModbusRequest, VfdContext};
use crate::profile::DriveProfile;
use crate::transport::{ModbusTransport, TransportError};

/// Outstanding exchange of one drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExchangeState {
    /// Nothing outstanding.
    #[default]
    Idle,
    /// Waiting for the reply to a command.
    AwaitingReply(VfdContext),
}

impl ExchangeState {
    /// Leave `AwaitingReply(context)`; other states are kept.
    fn resolve(self, context: Option<VfdContext>) -> Self {
        match (self, context) {
            (Self::AwaitingReply(pending), Some(ctx)) if pending == ctx => Self::Idle,
            (state, _) => state,
        }
    }
}

/// Controller of one Modbus VFD.
#[derive(Debug, Clone)]
pub struct VfdController {
    spindle_id: SpindleId,
    unit: u8,
    profile: &'static DriveProfile,
    config: VfdConfig,
    exchange: ExchangeState,
    cold_start: bool,
    retry_counter: u16,
    last_poll: Option<Instant>,
    data: SpindleRuntimeData,
    vfd_state: VfdState,
    active: bool,
}

impl VfdController {
    /// Controller for the drive registered as `spindle_id` at Modbus `unit`.
    ///
    /// Starts in cold start: any exception escalates immediately until
    /// [`end_cold_start`](Self::end_cold_start).
    pub fn new(
        spindle_id: SpindleId,
        unit: u8,
        profile: &'static DriveProfile,
        config: VfdConfig,
    ) -> Self {
        let mut data = SpindleRuntimeData::default();
        data.at_speed_enabled = config.at_speed_tolerance > 0.0;
        Self {
            spindle_id,
            unit,
            profile,
            config,
            exchange: ExchangeState::Idle,
            cold_start: true,
            retry_counter: 0,
            last_poll: None,
            data,
            vfd_state: VfdState::default(),
            active: false,
        }
    }

    // ─── Accessors ──────────────────────────────────────────────────

    #[inline]
    pub fn spindle_id(&self) -> SpindleId {
        self.spindle_id
    }

    #[inline]
    pub fn unit(&self) -> u8 {
        self.unit
    }

    #[inline]
    pub fn profile(&self) -> &'static DriveProfile {
        self.profile
    }

    /// Runtime data (programmed/actual speed, at-speed window).
    #[inline]
    pub fn data(&self) -> &SpindleRuntimeData {
        &self.data
    }

    /// Last commanded run state.
    #[inline]
    pub fn state(&self) -> VfdState {
        self.vfd_state
    }

    #[inline]
    pub fn exchange_state(&self) -> ExchangeState {
        self.exchange
    }

    /// A command exchange is outstanding.
    #[inline]
    pub fn is_busy(&self) -> bool {
        self.exchange != ExchangeState::Idle
    }

    /// Exception counter driving fault escalation.
    #[inline]
    pub fn retry_counter(&self) -> u16 {
        self.retry_counter
    }

    /// This drive is the selected spindle.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[inline]
    pub fn is_cold_start(&self) -> bool {
        self.cold_start
    }

    /// Leave cold start; later exceptions go through retry handling.
    pub fn end_cold_start(&mut self) {
        self.cold_start = false;
    }

    /// Whether the drive can be used.
    pub fn config(&self, transport: &dyn ModbusTransport) -> bool {
        transport.is_up()
    }

    /// Options report line.
    pub fn report_options(&self, out: &mut Vec<String>) {
        out.push(self.profile.report_line());
    }

    // ─── Commands ───────────────────────────────────────────────────

    /// Start, stop or reverse the spindle, then program `rpm`.
    ///
    /// Blocking. Returns `false` if the call was dropped because an
    /// exchange is outstanding. On retry exhaustion a drive fault is
    /// raised and no speed request follows.
    pub fn set_state(
        &mut self,
        on: bool,
        ccw: bool,
        rpm: f32,
        transport: &mut dyn ModbusTransport,
        alarms: &mut dyn AlarmSink,
    ) -> bool {
        if self.is_busy() {
            debug!(
                "Spindle {}: set_state dropped, {:?} outstanding",
                self.spindle_id, self.exchange
            );
            return false;
        }

        let word = CommandWord::for_state(on, ccw, rpm);
        let request = ModbusRequest::write_register(
            self.unit,
            self.profile.command_register,
            word.encode(),
            VfdContext::SetStatus,
        );

        if self.vfd_state.ccw != ccw {
            self.data.rpm_programmed = RPM_UNKNOWN;
        }
        self.vfd_state.on = on;
        self.vfd_state.ccw = ccw;
        self.data.state_programmed.on = on;
        self.data.state_programmed.ccw = ccw;

        self.exchange = ExchangeState::AwaitingReply(VfdContext::SetStatus);
        let ok = self.exchange_blocking(&request, transport);
        self.exchange = ExchangeState::Idle;

        if ok {
            self.set_rpm(rpm, true, transport, alarms);
        } else {
            self.drive_fault(alarms);
        }
        true
    }

    /// Program a new target speed.
    ///
    /// Returns `false` if dropped because an exchange is outstanding. Any
    /// other outcome updates the at-speed window.
    pub fn set_rpm(
        &mut self,
        rpm: f32,
        block: bool,
        transport: &mut dyn ModbusTransport,
        alarms: &mut dyn AlarmSink,
    ) -> bool {
        if self.is_busy() {
            debug!(
                "Spindle {}: set_rpm({}) dropped, {:?} outstanding",
                self.spindle_id, rpm, self.exchange
            );
            return false;
        }

        let raw = encode_speed(rpm, self.config.rpm_per_hz, self.profile.speed_units_per_hz);
        let request = ModbusRequest::write_register(
            self.unit,
            self.profile.speed_register,
            raw,
            VfdContext::SetRpm,
        );

        self.exchange = ExchangeState::AwaitingReply(VfdContext::SetRpm);
        let ok = if block {
            let ok = self.exchange_blocking(&request, transport);
            self.exchange = ExchangeState::Idle;
            ok
        } else {
            match transport.submit(&request) {
                Ok(()) => true,
                Err(e) => {
                    warn!("Spindle {}: speed request not queued: {}", self.spindle_id, e);
                    self.exchange = ExchangeState::Idle;
                    false
                }
            }
        };

        if !ok {
            self.drive_fault(alarms);
        }

        self.data
            .set_at_speed_range(rpm, self.config.at_speed_tolerance);
        true
    }

    /// Non-blocking speed update.
    pub fn update_rpm(
        &mut self,
        rpm: f32,
        transport: &mut dyn ModbusTransport,
        alarms: &mut dyn AlarmSink,
    ) -> bool {
        self.set_rpm(rpm, false, transport, alarms)
    }

    /// Current run state, requesting a speed read-back if the poll
    /// interval has elapsed.
    ///
    /// Returns immediately with the previous state; `at_speed` comes from
    /// the programmed state as last evaluated.
    pub fn poll_speed(&mut self, now: Instant, transport: &mut dyn ModbusTransport) -> VfdState {
        let interval = Duration::from_millis(self.config.poll_interval_ms);
        let due = self.last_poll.is_none_or(|last| now > last + interval);

        if due {
            let request = ModbusRequest::read_register(
                self.unit,
                self.profile.output_frequency_register,
                VfdContext::GetRpm,
            );
            if let Err(e) = transport.submit(&request) {
                debug!("Spindle {}: speed poll not queued: {}", self.spindle_id, e);
            }
            self.last_poll = Some(now);
        }

        self.vfd_state.at_speed = self.data.state_programmed.at_speed;
        self.vfd_state
    }

    // ─── Transport callbacks ────────────────────────────────────────

    /// Handle a reply to a submitted request.
    pub fn on_reply(&mut self, reply: &ModbusReply) {
        let context = VfdContext::from_tag(reply.context);
        self.exchange = self.exchange.resolve(context);
        self.retry_counter = 0;

        if reply.is_error() {
            debug!(
                "Spindle {}: drive reported error for {:?}",
                self.spindle_id, context
            );
            return;
        }

        match (context, reply.register_value()) {
            (Some(VfdContext::GetRpm), Some(raw)) => {
                let rpm = decode_speed(raw, self.config.rpm_per_hz, self.profile.speed_units_per_hz);
                self.data.validate_at_speed(rpm);
            }
            (Some(VfdContext::GetMaxRpm), Some(raw)) => {
                let rpm = decode_speed(
                    raw,
                    self.config.rpm_per_hz,
                    self.profile.max_frequency_units_per_hz,
                );
                info!("Spindle {}: max speed {} rpm", self.spindle_id, rpm);
                self.data.rpm_max = Some(rpm);
            }
            _ => {}
        }
    }

    /// Handle a protocol exception or timeout of a submitted request.
    pub fn on_exception(
        &mut self,
        code: u8,
        tag: u8,
        transport: &mut dyn ModbusTransport,
        alarms: &mut dyn AlarmSink,
    ) {
        let context = VfdContext::from_tag(tag);
        self.exchange = self.exchange.resolve(context);

        if self.cold_start {
            error!(
                "Spindle {}: exception {} during cold start",
                self.spindle_id, code
            );
            alarms.raise(SpindleAlarm::DriveFault(self.spindle_id));
            return;
        }

        let Some(context) = context else {
            warn!(
                "Spindle {}: exception {} with unknown context {}",
                self.spindle_id, code, tag
            );
            self.retry_counter = 0;
            alarms.raise(SpindleAlarm::Spindle(self.spindle_id));
            return;
        };

        debug!(
            "Spindle {}: exception {} for {:?} (retry {})",
            self.spindle_id, code, context, self.retry_counter
        );

        if context == VfdContext::GetRpm {
            return;
        }

        self.retry_counter += 1;
        if self.retry_counter >= self.config.retries {
            error!(
                "Spindle {}: {} exceptions, raising drive fault",
                self.spindle_id, self.retry_counter
            );
            alarms.raise(SpindleAlarm::DriveFault(self.spindle_id));
            self.retry_counter = 0;
            return;
        }

        if context == VfdContext::SetRpm {
            let rpm = self.data.rpm_programmed.max(0.0);
            self.set_rpm(rpm, false, transport, alarms);
        }
    }

    // ─── Notifications ──────────────────────────────────────────────

    /// Spindle selection changed.
    ///
    /// Becoming active resets runtime data and reads the drive's maximum
    /// speed if the profile has a register for it.
    pub fn on_spindle_selected(&mut self, spindle: &SpindleInfo, transport: &mut dyn ModbusTransport) {
        if spindle.id != self.spindle_id {
            self.active = false;
            return;
        }

        self.active = true;
        self.data.reset();
        self.vfd_state = VfdState::default();
        info!("Spindle {} ({}) active", self.spindle_id, self.profile.name);

        if let Some(register) = self.profile.max_frequency_register {
            let request = ModbusRequest::read_register(self.unit, register, VfdContext::GetMaxRpm);
            if let Err(e) = transport.submit(&request) {
                debug!("Spindle {}: max speed read not queued: {}", self.spindle_id, e);
            }
        }
    }

    /// At-speed tolerance changed.
    pub fn on_settings_changed(&mut self, at_speed_tolerance: f32) {
        self.config.at_speed_tolerance = at_speed_tolerance;
        self.data.at_speed_enabled = at_speed_tolerance > 0.0;
    }

    // ─── Internals ──────────────────────────────────────────────────

    /// Up to `retries + 1` attempts. A reply with the error bit set still
    /// completes the exchange.
    fn exchange_blocking(
        &mut self,
        request: &ModbusRequest,
        transport: &mut dyn ModbusTransport,
    ) -> bool {
        let mut failures: u16 = 0;
        loop {
            match transport.exchange(request) {
                Ok(reply) => {
                    if reply.is_error() {
                        debug!(
                            "Spindle {}: drive reported error for {:?}",
                            self.spindle_id, request.context
                        );
                    }
                    self.retry_counter = 0;
                    return true;
                }
                Err(TransportError::Exception(code)) if self.cold_start => {
                    error!(
                        "Spindle {}: exception {} during cold start",
                        self.spindle_id, code
                    );
                    return false;
                }
                Err(e) => {
                    failures += 1;
                    debug!(
                        "Spindle {}: {:?} attempt {} failed: {}",
                        self.spindle_id, request.context, failures, e
                    );
                    if failures > self.config.retries {
                        return false;
                    }
                }
            }
        }
    }

    fn drive_fault(&mut self, alarms: &mut dyn AlarmSink) {
        error!("Spindle {}: drive not responding", self.spindle_id);
        alarms.raise(SpindleAlarm::DriveFault(self.spindle_id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::RunMode;
    use crate::profile::{GS20, YL620A};
    use crate::transport::Completion;
    use spindle_common::consts::VFD_RETRIES;
    use spindle_common::spindle::types::{SpindleCaps, SpindleKind, SpindleRef};

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Behaviour {
        Answer,
        Silent,
        Exception(u8),
    }

    #[derive(Debug)]
    struct ScriptedTransport {
        behaviour: Behaviour,
        up: bool,
        exchanged: Vec<ModbusRequest>,
        submitted: Vec<ModbusRequest>,
        output_frequency: u16,
    }

    impl ScriptedTransport {
        fn new(behaviour: Behaviour) -> Self {
            Self {
                behaviour,
                up: true,
                exchanged: Vec::new(),
                submitted: Vec::new(),
                output_frequency: 0,
            }
        }
    }

    impl ModbusTransport for ScriptedTransport {
        fn is_up(&self) -> bool {
            self.up
        }

        fn exchange(&mut self, request: &ModbusRequest) -> Result<ModbusReply, TransportError> {
            self.exchanged.push(*request);
            match self.behaviour {
                Behaviour::Answer => Ok(ModbusReply::write_echo(request)),
                Behaviour::Silent => Err(TransportError::Timeout),
                Behaviour::Exception(code) => Err(TransportError::Exception(code)),
            }
        }

        fn submit(&mut self, request: &ModbusRequest) -> Result<(), TransportError> {
            self.submitted.push(*request);
            Ok(())
        }

        fn poll(&mut self) -> Option<Completion> {
            None
        }
    }

    fn controller(profile: &'static DriveProfile) -> VfdController {
        let mut c = VfdController::new(SpindleId(1), 1, profile, VfdConfig::default());
        c.end_cold_start();
        c
    }

    fn info(id: u8) -> SpindleInfo {
        SpindleInfo {
            id: SpindleId(id),
            ref_id: SpindleRef::Yl620a,
            name: "YL620A".to_string(),
            kind: SpindleKind::Vfd,
            caps: SpindleCaps::VFD,
        }
    }

    #[test]
    fn set_state_programs_status_then_speed() {
        let mut c = controller(&YL620A);
        let mut t = ScriptedTransport::new(Behaviour::Answer);
        let mut alarms = Vec::new();

        assert!(c.set_state(true, false, 1200.0, &mut t, &mut alarms));
        assert_eq!(t.exchanged.len(), 2);
        assert_eq!(t.exchanged[0].context, VfdContext::SetStatus);
        assert_eq!(t.exchanged[0].payload, 0x12);
        assert_eq!(t.exchanged[1].register, 0x2001);
        assert_eq!(t.exchanged[1].payload, 200);
        assert_eq!(c.data().rpm_programmed, 1200.0);
        assert!(alarms.is_empty());
        assert!(!c.is_busy());
    }

    #[test]
    fn silent_drive_exhausts_retries_then_faults() {
        let mut c = controller(&YL620A);
        let mut t = ScriptedTransport::new(Behaviour::Silent);
        let mut alarms = Vec::new();

        c.set_rpm(1200.0, true, &mut t, &mut alarms);
        assert_eq!(t.exchanged.len(), usize::from(VFD_RETRIES) + 1);
        assert_eq!(alarms, vec![SpindleAlarm::DriveFault(SpindleId(1))]);
        assert_eq!(c.retry_counter(), 0);
        assert!(!c.is_busy());
        // The at-speed window follows the request whatever the outcome.
        assert_eq!(c.data().rpm_programmed, 1200.0);
    }

    #[test]
    fn failed_status_skips_speed_and_invalidates_rpm_on_reverse() {
        let mut c = controller(&YL620A);
        let mut t = ScriptedTransport::new(Behaviour::Answer);
        let mut alarms = Vec::new();
        c.set_state(true, false, 1200.0, &mut t, &mut alarms);
        assert_eq!(c.data().rpm_programmed, 1200.0);

        t.behaviour = Behaviour::Silent;
        t.exchanged.clear();
        c.set_state(true, true, 1200.0, &mut t, &mut alarms);
        assert!(t.exchanged.iter().all(|r| r.context == VfdContext::SetStatus));
        assert_eq!(t.exchanged.len(), usize::from(VFD_RETRIES) + 1);
        assert_eq!(alarms.len(), 1);
        assert_eq!(c.data().rpm_programmed, RPM_UNKNOWN);
        assert!(c.state().ccw);
    }

    #[test]
    fn cold_start_exception_faults_without_retry() {
        let mut c = VfdController::new(SpindleId(1), 1, &YL620A, VfdConfig::default());
        let mut t = ScriptedTransport::new(Behaviour::Exception(4));
        let mut alarms = Vec::new();

        c.set_state(true, false, 1000.0, &mut t, &mut alarms);
        assert_eq!(t.exchanged.len(), 1);
        assert_eq!(alarms, vec![SpindleAlarm::DriveFault(SpindleId(1))]);

        alarms.clear();
        c.on_exception(4, VfdContext::GetRpm.tag(), &mut t, &mut alarms);
        assert_eq!(alarms, vec![SpindleAlarm::DriveFault(SpindleId(1))]);
    }

    #[test]
    fn busy_drive_drops_new_commands() {
        let mut c = controller(&YL620A);
        let mut t = ScriptedTransport::new(Behaviour::Answer);
        let mut alarms = Vec::new();

        assert!(c.update_rpm(1000.0, &mut t, &mut alarms));
        assert!(c.is_busy());
        assert!(!c.update_rpm(2000.0, &mut t, &mut alarms));
        assert!(!c.set_state(false, false, 0.0, &mut t, &mut alarms));
        assert_eq!(t.submitted.len(), 1);
        assert!(t.exchanged.is_empty());

        c.on_reply(&ModbusReply::write_echo(&t.submitted[0]));
        assert!(!c.is_busy());
        assert!(c.update_rpm(2000.0, &mut t, &mut alarms));
    }

    #[test]
    fn polls_are_rate_limited() {
        let mut c = controller(&GS20);
        let mut t = ScriptedTransport::new(Behaviour::Answer);
        let start = Instant::now();

        c.poll_speed(start, &mut t);
        c.poll_speed(start + Duration::from_millis(50), &mut t);
        assert_eq!(t.submitted.len(), 1);
        assert_eq!(t.submitted[0].register, 0x2103);

        // Exactly one interval later is still too early.
        c.poll_speed(start + Duration::from_millis(100), &mut t);
        assert_eq!(t.submitted.len(), 1);
        c.poll_speed(start + Duration::from_millis(101), &mut t);
        assert_eq!(t.submitted.len(), 2);
    }

    #[test]
    fn poll_returns_programmed_at_speed() {
        let mut c = controller(&YL620A);
        c.on_settings_changed(5.0);
        let mut t = ScriptedTransport::new(Behaviour::Answer);
        let mut alarms = Vec::new();
        c.set_state(true, false, 1200.0, &mut t, &mut alarms);

        let now = Instant::now();
        assert!(!c.poll_speed(now, &mut t).at_speed);

        t.output_frequency = 200;
        let read = *t.submitted.last().unwrap();
        c.on_reply(&ModbusReply::read_response(&read, t.output_frequency));
        assert_eq!(c.data().rpm_actual, 1200.0);

        let state = c.poll_speed(now, &mut t);
        assert!(state.on && state.at_speed);
    }

    #[test]
    fn error_reply_is_not_decoded() {
        let mut c = controller(&YL620A);
        let mut t = ScriptedTransport::new(Behaviour::Answer);
        let mut alarms = Vec::new();
        c.update_rpm(600.0, &mut t, &mut alarms);
        c.on_exception(4, VfdContext::SetStatus.tag(), &mut t, &mut alarms);
        assert_eq!(c.retry_counter(), 1);

        let reply = ModbusReply::from_adu(&[0x81, 0x03, 0x02, 0x00, 0x64], VfdContext::GetRpm.tag());
        c.on_reply(&reply);
        assert_eq!(c.retry_counter(), 0);
        assert_eq!(c.data().rpm_actual, 0.0);
        assert!(alarms.is_empty());
    }

    #[test]
    fn speed_exceptions_resubmit_until_fault() {
        let mut c = controller(&YL620A);
        let mut t = ScriptedTransport::new(Behaviour::Answer);
        let mut alarms = Vec::new();

        c.update_rpm(900.0, &mut t, &mut alarms);
        for _ in 0..VFD_RETRIES {
            c.on_exception(0, VfdContext::SetRpm.tag(), &mut t, &mut alarms);
        }

        // Initial request plus one resubmit per exception below the bound
        assert_eq!(t.submitted.len(), usize::from(VFD_RETRIES));
        assert!(t.submitted.iter().all(|r| r.payload == 150));
        assert_eq!(alarms, vec![SpindleAlarm::DriveFault(SpindleId(1))]);
        assert_eq!(c.retry_counter(), 0);
        assert!(!c.is_busy());
    }

    #[test]
    fn drive_fault_ends_retries_and_accepts_stop() {
        let mut c = controller(&YL620A);
        let mut t = ScriptedTransport::new(Behaviour::Answer);
        let mut alarms = Vec::new();

        c.update_rpm(900.0, &mut t, &mut alarms);
        for _ in 0..VFD_RETRIES * 5 {
            if !c.is_busy() {
                break;
            }
            c.on_exception(0, VfdContext::SetRpm.tag(), &mut t, &mut alarms);
        }

        assert_eq!(alarms.len(), 1);
        assert_eq!(c.exchange_state(), ExchangeState::Idle);
        let submitted = t.submitted.len();

        assert!(c.set_state(false, false, 0.0, &mut t, &mut alarms));
        assert_eq!(t.exchanged[0].context, VfdContext::SetStatus);
        assert_eq!(
            CommandWord::decode(t.exchanged[0].payload).mode,
            RunMode::Stop
        );
        assert_eq!(t.submitted.len(), submitted);
        assert_eq!(alarms.len(), 1);
    }

    #[test]
    fn speed_read_exceptions_are_not_counted() {
        let mut c = controller(&YL620A);
        let mut t = ScriptedTransport::new(Behaviour::Answer);
        let mut alarms = Vec::new();

        for _ in 0..2 * VFD_RETRIES {
            c.on_exception(0, VfdContext::GetRpm.tag(), &mut t, &mut alarms);
        }
        assert!(alarms.is_empty());
        assert!(t.submitted.is_empty());
    }

    #[test]
    fn unknown_context_raises_spindle_alarm() {
        let mut c = controller(&YL620A);
        let mut t = ScriptedTransport::new(Behaviour::Answer);
        let mut alarms = Vec::new();

        c.on_exception(2, 0, &mut t, &mut alarms);
        assert_eq!(alarms, vec![SpindleAlarm::Spindle(SpindleId(1))]);
        assert_eq!(c.retry_counter(), 0);
    }

    #[test]
    fn selection_resets_and_reads_max_speed() {
        let mut c = controller(&YL620A);
        let mut t = ScriptedTransport::new(Behaviour::Answer);
        let mut alarms = Vec::new();
        c.set_state(true, false, 1200.0, &mut t, &mut alarms);

        c.on_spindle_selected(&info(1), &mut t);
        assert!(c.is_active());
        assert_eq!(c.data().rpm_programmed, RPM_UNKNOWN);
        assert!(!c.state().on);
        let read = *t.submitted.last().unwrap();
        assert_eq!((read.register, read.context), (0x0000, VfdContext::GetMaxRpm));

        // 400.00 Hz main frequency at 60 rpm/Hz.
        c.on_reply(&ModbusReply::read_response(&read, 40000));
        assert_eq!(c.data().rpm_max, Some(24000.0));

        c.on_spindle_selected(&info(0), &mut t);
        assert!(!c.is_active());
    }

    #[test]
    fn gs20_has_no_max_speed_read() {
        let mut c = controller(&GS20);
        let mut t = ScriptedTransport::new(Behaviour::Answer);
        c.on_spindle_selected(&info(1), &mut t);
        assert!(c.is_active());
        assert!(t.submitted.is_empty());
    }

    #[test]
    fn config_check_reports_link_state() {
        let c = controller(&GS20);
        let mut t = ScriptedTransport::new(Behaviour::Answer);
        assert!(c.config(&t));
        t.up = false;
        assert!(!c.config(&t));
    }
}
