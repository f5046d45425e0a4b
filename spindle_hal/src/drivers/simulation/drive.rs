//! Register model of one simulated VFD.
//!
//! The output frequency follows the programmed speed immediately while
//! the command register says run; otherwise it reads 0.

use spindle_vfd::codec::{CommandWord, RunMode};
use spindle_vfd::modbus::{FunctionCode, ModbusReply, ModbusRequest};
use spindle_vfd::profile::DriveProfile;
use spindle_vfd::transport::TransportError;

/// Modbus exception: illegal data address.
const ILLEGAL_DATA_ADDRESS: u8 = 0x02;

/// Injected misbehaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fault {
    /// Answer normally.
    #[default]
    None,
    /// Never answer.
    Silent,
    /// Answer every request with this exception code.
    Exception(u8),
    /// Answer with the error bit set in the status byte.
    ErrorReply,
}

/// One simulated drive.
#[derive(Debug, Clone)]
pub struct SimulatedDrive {
    profile: &'static DriveProfile,
    command: u16,
    speed: u16,
    max_frequency: u16,
    fault: Fault,
    requests: usize,
}

impl SimulatedDrive {
    /// Drive answering with `profile`'s register map.
    ///
    /// `max_frequency` is in the profile's max-frequency units.
    pub fn new(profile: &'static DriveProfile, max_frequency: u16) -> Self {
        Self {
            profile,
            command: 0,
            speed: 0,
            max_frequency,
            fault: Fault::None,
            requests: 0,
        }
    }

    /// Inject a fault.
    pub fn set_fault(&mut self, fault: Fault) {
        self.fault = fault;
    }

    /// Last value written to the command register.
    pub fn command(&self) -> CommandWord {
        CommandWord::decode(self.command)
    }

    /// Last value written to the speed register.
    pub fn speed(&self) -> u16 {
        self.speed
    }

    /// Output frequency register value.
    pub fn output_frequency(&self) -> u16 {
        if self.command().mode == RunMode::Run {
            self.speed
        } else {
            0
        }
    }

    /// Number of requests received, answered or not.
    pub fn requests(&self) -> usize {
        self.requests
    }

    /// Apply `request` and build the reply.
    pub fn handle(&mut self, request: &ModbusRequest) -> Result<ModbusReply, TransportError> {
        self.requests += 1;

        match self.fault {
            Fault::Silent => return Err(TransportError::Timeout),
            Fault::Exception(code) => return Err(TransportError::Exception(code)),
            Fault::ErrorReply => {
                let mut adu = request.adu();
                adu[0] |= spindle_vfd::modbus::REPLY_ERROR_BIT;
                return Ok(ModbusReply::from_adu(&adu[..3], request.context.tag()));
            }
            Fault::None => {}
        }

        let profile = self.profile;
        match request.function {
            FunctionCode::WriteRegister => {
                if request.register == profile.command_register {
                    self.command = request.payload;
                } else if request.register == profile.speed_register {
                    self.speed = request.payload;
                } else {
                    return Err(TransportError::Exception(ILLEGAL_DATA_ADDRESS));
                }
                Ok(ModbusReply::write_echo(request))
            }
            FunctionCode::ReadHoldingRegisters => {
                let value = if request.register == profile.output_frequency_register {
                    self.output_frequency()
                } else if Some(request.register) == profile.max_frequency_register {
                    self.max_frequency
                } else {
                    return Err(TransportError::Exception(ILLEGAL_DATA_ADDRESS));
                };
                Ok(ModbusReply::read_response(request, value))
            }
        }
    }
}
