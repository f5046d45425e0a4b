//! Spindle core: startup phases and the service cycle.
//!
//! `SpindleCore` owns the drive registry, binding table, selection policy,
//! command gateway, binding store, VFD controllers and the transport, and
//! is the single execution context all of them run on.
//!
//! ## Startup
//!
//! ```text
//! Registering ──start()──► Activating ──► Running
//!   register_drive()        load table
//!                           activation pass
//!                           select default spindle
//! ```
//!
//! Transport completions are drained and dispatched at the start of every
//! `cycle()`, before the active drive is polled. VFD controllers stay in
//! cold start until the first cycle has dispatched the completions of the
//! requests issued during startup.

use spindle_common::hooks::HookChain;
use spindle_common::spindle::alarm::SpindleAlarm;
use spindle_common::spindle::config::{DriveConfig, VfdConfig};
use spindle_common::spindle::registry::SpindleRegistry;
use spindle_common::spindle::types::{SpindleId, SpindleInfo, SpindleKind, ToolId, VfdState};
use spindle_select::settings::{self, SettingDetail, SettingId};
use spindle_select::{
    BindingStore, BindingTable, CommandGateway, GatewayStatus, LoadSource, ParserBlock,
    SelectionPolicy, SettingError, ToolData,
};
use spindle_vfd::controller::VfdController;
use spindle_vfd::profile::DriveProfile;
use spindle_vfd::transport::{Completion, ModbusTransport};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::SpindleHalConfig;
use crate::error::HalError;
use crate::registry::DriveRegistry;

/// Startup phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Drives may be registered.
    Registering,
    /// Table loaded, activation pass running.
    Activating,
    /// Normal operation.
    Running,
}

/// Spindle runtime core.
pub struct SpindleCore<T: ModbusTransport> {
    phase: Phase,
    vfd_config: VfdConfig,
    registry: DriveRegistry,
    table: BindingTable,
    policy: SelectionPolicy,
    gateway: CommandGateway,
    store: Box<dyn BindingStore + Send>,
    transport: T,
    controllers: Vec<VfdController>,
    selected_hooks: HookChain<SpindleInfo>,
    alarms: Vec<SpindleAlarm>,
    cold_start: bool,
}

impl<T: ModbusTransport> SpindleCore<T> {
    /// Create a core in the registering phase.
    ///
    /// # Errors
    /// Returns `HalError::ConfigError` if configuration validation fails.
    pub fn new(
        config: &SpindleHalConfig,
        store: Box<dyn BindingStore + Send>,
        transport: T,
    ) -> Result<Self, HalError> {
        config.validate()?;

        info!(
            "SpindleCore created: default spindle {}, {} selectable slots",
            config.select.default_spindle, config.select.selectable_slots
        );

        Ok(Self {
            phase: Phase::Registering,
            vfd_config: config.vfd.clone(),
            registry: DriveRegistry::new(),
            table: BindingTable::new(config.select.clone()),
            policy: SelectionPolicy::new(),
            gateway: CommandGateway::new(),
            store,
            transport,
            controllers: Vec::new(),
            selected_hooks: HookChain::new(),
            alarms: Vec::new(),
            cold_start: true,
        })
    }

    /// Register one physical drive.
    pub fn register_drive(&mut self, drive: &DriveConfig) -> Result<SpindleId, HalError> {
        self.require(Phase::Registering)?;

        let id = self.registry.register(drive)?;
        if drive.kind == SpindleKind::Vfd {
            let (Some(model), Some(unit)) = (drive.profile, drive.modbus_address) else {
                return Err(HalError::ConfigError(format!(
                    "VFD drive '{}' needs a profile and modbus_address",
                    drive.name
                )));
            };
            let profile = DriveProfile::for_model(model);
            self.controllers
                .push(VfdController::new(id, unit, profile, self.vfd_config.clone()));
            info!("  {} on unit {} ({})", drive.name, unit, profile.name);
        }
        Ok(id)
    }

    /// Register every configured drive in order.
    pub fn register_all(&mut self, drives: &[DriveConfig]) -> Result<(), HalError> {
        for drive in drives {
            self.register_drive(drive)?;
        }
        Ok(())
    }

    /// Finish registration: load the binding table, run the activation
    /// pass and select the default spindle.
    ///
    /// Cold start ends on the first `cycle()`.
    pub fn start(&mut self) -> Result<LoadSource, HalError> {
        self.require(Phase::Registering)?;
        if self.registry.count() == 0 {
            return Err(HalError::InitFailed("No spindle registered".to_string()));
        }

        self.phase = Phase::Activating;
        let source = self.table.load(&self.registry, self.store.as_mut());
        self.table.activate_spindles(&mut self.registry);

        let default = self.table.default_spindle();
        self.registry.select(default)?;
        self.dispatch_selections();

        for controller in &self.controllers {
            if !controller.config(&self.transport) {
                warn!(
                    "Spindle {}: transport not up",
                    controller.spindle_id()
                );
            }
        }

        self.phase = Phase::Running;
        info!(
            "SpindleCore running: {} spindles, auto-select {}",
            self.registry.count(),
            if self.table.is_auto_select() { "on" } else { "off" }
        );
        Ok(source)
    }

    /// Persist the binding table.
    pub fn shutdown(&mut self) -> Result<(), HalError> {
        info!("Shutdown requested");
        self.table.save(self.store.as_mut())?;
        Ok(())
    }

    // ─── Notifications ──────────────────────────────────────────────

    /// Listener for spindle selection, called after the drive controllers.
    pub fn on_spindle_selected(&mut self, hook: impl FnMut(&SpindleInfo) + Send + 'static) {
        self.selected_hooks.register(hook);
    }

    /// Listener for tool changes, called after tool-driven selection.
    pub fn on_tool_changed(&mut self, hook: impl FnMut(&ToolData) + Send + 'static) {
        self.policy.register_forward(hook);
    }

    /// A new tool was loaded.
    ///
    /// Returns the slot selected by the tool, if any.
    pub fn tool_changed(&mut self, tool_id: ToolId) -> Result<Option<usize>, HalError> {
        self.require(Phase::Running)?;
        let slot = self.policy.on_tool_changed(
            &ToolData { tool_id },
            &self.table,
            &mut self.registry,
        );
        self.dispatch_selections();
        Ok(slot)
    }

    /// At-speed tolerance changed.
    pub fn settings_changed(&mut self, at_speed_tolerance: f32) {
        self.vfd_config.at_speed_tolerance = at_speed_tolerance;
        for controller in &mut self.controllers {
            controller.on_settings_changed(at_speed_tolerance);
        }
    }

    // ─── Spindle select command ─────────────────────────────────────

    /// Validate a parsed block.
    pub fn validate_command(&mut self, block: &mut ParserBlock) -> Result<(), GatewayStatus> {
        self.gateway.validate(block, &self.table)
    }

    /// Execute a validated block.
    pub fn execute_command(&mut self, block: &ParserBlock) -> Result<Option<SpindleId>, HalError> {
        self.require(Phase::Running)?;
        let selected = self
            .gateway
            .execute(block, &self.table, &mut self.registry)?;
        self.dispatch_selections();
        Ok(selected)
    }

    /// Options report lines.
    pub fn report_options(&self) -> Vec<String> {
        let mut lines = Vec::new();
        self.gateway
            .report_options(&self.table, &self.registry, &mut lines);
        for controller in &self.controllers {
            controller.report_options(&mut lines);
        }
        lines
    }

    // ─── Settings ───────────────────────────────────────────────────

    /// Visible settings with their descriptions.
    pub fn settings(&self) -> Vec<SettingDetail> {
        settings::iterate(&self.table)
            .iter()
            .filter(|id| settings::is_available(**id, &self.table, &self.registry))
            .filter_map(|id| settings::details(*id, &self.table, &self.registry))
            .collect()
    }

    /// Current value of a setting.
    pub fn setting(&self, id: SettingId) -> Option<u32> {
        settings::get(id, &self.table, &self.registry)
    }

    /// Write a setting and persist the table.
    pub fn set_setting(&mut self, id: SettingId, value: u32) -> Result<(), SettingError> {
        settings::set(
            id,
            value,
            &mut self.table,
            &self.registry,
            self.store.as_mut(),
        )
    }

    // ─── Drive control ──────────────────────────────────────────────

    /// Start, stop or reverse the active spindle.
    ///
    /// Returns `false` if the active spindle has no controller or the
    /// command was dropped because its drive is busy.
    pub fn set_spindle(&mut self, on: bool, ccw: bool, rpm: f32) -> Result<bool, HalError> {
        self.require(Phase::Running)?;
        let Some(idx) = self.active_controller() else {
            debug!("Active spindle is not a VFD, state change ignored");
            return Ok(false);
        };
        Ok(self.controllers[idx].set_state(on, ccw, rpm, &mut self.transport, &mut self.alarms))
    }

    /// Update the speed of the active spindle without blocking.
    pub fn update_rpm(&mut self, rpm: f32) -> Result<bool, HalError> {
        self.require(Phase::Running)?;
        let Some(idx) = self.active_controller() else {
            return Ok(false);
        };
        Ok(self.controllers[idx].update_rpm(rpm, &mut self.transport, &mut self.alarms))
    }

    /// Service cycle: dispatch transport completions, then poll the
    /// active VFD. Returns its state.
    pub fn cycle(&mut self, now: Instant) -> Option<VfdState> {
        // Retries submitted while dispatching complete next cycle.
        let completions: Vec<Completion> = std::iter::from_fn(|| self.transport.poll()).collect();
        for completion in completions {
            self.dispatch_completion(completion);
        }

        if self.cold_start && self.phase == Phase::Running {
            for controller in &mut self.controllers {
                controller.end_cold_start();
            }
            self.cold_start = false;
            debug!("Cold start complete");
        }

        let idx = self.active_controller()?;
        Some(self.controllers[idx].poll_speed(now, &mut self.transport))
    }

    // ─── Accessors ──────────────────────────────────────────────────

    /// Current startup phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Binding table.
    pub fn table(&self) -> &BindingTable {
        &self.table
    }

    /// Drive registry.
    pub fn registry(&self) -> &DriveRegistry {
        &self.registry
    }

    /// Currently active spindle.
    pub fn active(&self) -> Option<SpindleId> {
        self.registry.active()
    }

    /// Controller of a VFD spindle.
    pub fn controller(&self, id: SpindleId) -> Option<&VfdController> {
        self.controllers.iter().find(|c| c.spindle_id() == id)
    }

    /// Alarms raised so far.
    pub fn alarms(&self) -> &[SpindleAlarm] {
        &self.alarms
    }

    /// Remove and return raised alarms.
    pub fn take_alarms(&mut self) -> Vec<SpindleAlarm> {
        std::mem::take(&mut self.alarms)
    }

    /// Transport, for inspection and fault injection.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    // ─── Internals ──────────────────────────────────────────────────

    fn require(&self, expected: Phase) -> Result<(), HalError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(HalError::InvalidPhase {
                expected,
                actual: self.phase,
            })
        }
    }

    fn active_controller(&self) -> Option<usize> {
        let active = self.registry.active()?;
        self.controllers
            .iter()
            .position(|c| c.spindle_id() == active)
    }

    /// Notify controllers, then external listeners, of every selection.
    fn dispatch_selections(&mut self) {
        for id in self.registry.take_selections() {
            let Some(info) = self.registry.info(id).cloned() else {
                continue;
            };
            for controller in &mut self.controllers {
                controller.on_spindle_selected(&info, &mut self.transport);
            }
            self.selected_hooks.notify(&info);
        }
    }

    fn dispatch_completion(&mut self, completion: Completion) {
        let unit = completion.unit();
        let Some(controller) = self.controllers.iter_mut().find(|c| c.unit() == unit) else {
            warn!("Completion for unknown unit {}", unit);
            return;
        };

        match completion {
            Completion::Reply { reply, .. } => controller.on_reply(&reply),
            Completion::Exception { code, context, .. } => {
                controller.on_exception(code, context, &mut self.transport, &mut self.alarms)
            }
        }
    }
}
