//! Simulated half-duplex Modbus bus.
//!
//! Blocking exchanges are answered immediately. Submitted requests are
//! answered at once too but their completions are held until `poll`, the
//! way a serial transport reports them from its own processing context.

use spindle_vfd::modbus::{ModbusReply, ModbusRequest};
use spindle_vfd::transport::{Completion, ModbusTransport, TIMEOUT_EXCEPTION, TransportError};
use std::collections::{BTreeMap, VecDeque};
use tracing::{debug, trace};

use super::drive::SimulatedDrive;

/// Simulated bus with drives attached by unit address.
#[derive(Debug, Default)]
pub struct SimulatedBus {
    up: bool,
    drives: BTreeMap<u8, SimulatedDrive>,
    pending: VecDeque<Completion>,
}

impl SimulatedBus {
    /// Bus with no drives, link up.
    pub fn new() -> Self {
        Self {
            up: true,
            ..Self::default()
        }
    }

    /// Attach a drive at `unit`, replacing any previous one.
    pub fn attach(&mut self, unit: u8, drive: SimulatedDrive) {
        debug!("Simulated drive attached at unit {}", unit);
        self.drives.insert(unit, drive);
    }

    /// Drive at `unit`.
    pub fn drive(&self, unit: u8) -> Option<&SimulatedDrive> {
        self.drives.get(&unit)
    }

    /// Mutable drive at `unit`, for fault injection.
    pub fn drive_mut(&mut self, unit: u8) -> Option<&mut SimulatedDrive> {
        self.drives.get_mut(&unit)
    }

    /// Take the link up or down.
    pub fn set_up(&mut self, up: bool) {
        self.up = up;
    }

    /// Completions not yet polled.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    fn answer(&mut self, request: &ModbusRequest) -> Result<ModbusReply, TransportError> {
        trace!("Simulated bus <- {:02X?}", request.adu());
        match self.drives.get_mut(&request.unit) {
            Some(drive) => drive.handle(request),
            None => Err(TransportError::Timeout),
        }
    }
}

impl ModbusTransport for SimulatedBus {
    fn is_up(&self) -> bool {
        self.up
    }

    fn exchange(&mut self, request: &ModbusRequest) -> Result<ModbusReply, TransportError> {
        if !self.up {
            return Err(TransportError::Down);
        }
        self.answer(request)
    }

    fn submit(&mut self, request: &ModbusRequest) -> Result<(), TransportError> {
        if !self.up {
            return Err(TransportError::Down);
        }

        let completion = match self.answer(request) {
            Ok(reply) => Completion::Reply {
                unit: request.unit,
                reply,
            },
            Err(e) => Completion::Exception {
                unit: request.unit,
                code: match e {
                    TransportError::Exception(code) => code,
                    _ => TIMEOUT_EXCEPTION,
                },
                context: request.context.tag(),
            },
        };
        self.pending.push_back(completion);
        Ok(())
    }

    fn poll(&mut self) -> Option<Completion> {
        self.pending.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::simulation::Fault;
    use spindle_vfd::modbus::VfdContext;
    use spindle_vfd::profile::GS20;

    #[test]
    fn submitted_requests_complete_on_poll() {
        let mut bus = SimulatedBus::new();
        bus.attach(2, SimulatedDrive::new(&GS20, 0));

        let req = ModbusRequest::read_register(2, 0x2103, VfdContext::GetRpm);
        bus.submit(&req).unwrap();
        assert_eq!(bus.pending(), 1);

        match bus.poll() {
            Some(Completion::Reply { unit, reply }) => {
                assert_eq!(unit, 2);
                assert_eq!(reply.register_value(), Some(0));
            }
            other => panic!("unexpected completion {other:?}"),
        }
        assert!(bus.poll().is_none());
    }

    #[test]
    fn silent_drive_completes_with_timeout_exception() {
        let mut bus = SimulatedBus::new();
        bus.attach(2, SimulatedDrive::new(&GS20, 0));
        bus.drive_mut(2).unwrap().set_fault(Fault::Silent);

        let req = ModbusRequest::write_register(2, 0x2001, 100, VfdContext::SetRpm);
        assert_eq!(bus.exchange(&req), Err(TransportError::Timeout));

        bus.submit(&req).unwrap();
        assert_eq!(
            bus.poll(),
            Some(Completion::Exception {
                unit: 2,
                code: TIMEOUT_EXCEPTION,
                context: VfdContext::SetRpm.tag()
            })
        );
    }

    #[test]
    fn link_down_rejects_everything() {
        let mut bus = SimulatedBus::new();
        bus.set_up(false);
        let req = ModbusRequest::read_register(1, 0x200B, VfdContext::GetRpm);
        assert_eq!(bus.exchange(&req), Err(TransportError::Down));
        assert_eq!(bus.submit(&req), Err(TransportError::Down));
        assert!(!bus.is_up());
    }
}
