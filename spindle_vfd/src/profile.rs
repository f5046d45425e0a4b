//! Register maps of supported drives.

use spindle_common::spindle::config::VfdProfile;
use spindle_common::spindle::types::SpindleRef;

/// Register map and scaling of one drive model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriveProfile {
    /// Model name.
    pub name: &'static str,
    /// Driver version reported in the options report.
    pub version: &'static str,
    /// Driver reference id.
    pub ref_id: SpindleRef,
    /// Run/direction command register.
    pub command_register: u16,
    /// Target speed register.
    pub speed_register: u16,
    /// Output frequency register.
    pub output_frequency_register: u16,
    /// Maximum (main) frequency register, if the drive exposes one.
    pub max_frequency_register: Option<u16>,
    /// Native speed units per Hz.
    pub speed_units_per_hz: u32,
    /// Native units per Hz of the maximum frequency register.
    pub max_frequency_units_per_hz: u32,
}

/// Yalang YL620A.
pub const YL620A: DriveProfile = DriveProfile {
    name: "Yalang VFD YL620A",
    version: "0.03",
    ref_id: SpindleRef::Yl620a,
    command_register: 0x2000,
    speed_register: 0x2001,
    output_frequency_register: 0x200B,
    max_frequency_register: Some(0x0000),
    speed_units_per_hz: 10,
    max_frequency_units_per_hz: 100,
};

/// Durapulse GS20.
pub const GS20: DriveProfile = DriveProfile {
    name: "Durapulse VFD GS20",
    version: "0.06",
    ref_id: SpindleRef::Gs20,
    command_register: 0x2000,
    speed_register: 0x2001,
    output_frequency_register: 0x2103,
    max_frequency_register: None,
    speed_units_per_hz: 100,
    max_frequency_units_per_hz: 100,
};

impl DriveProfile {
    /// Profile for a configured drive model.
    pub const fn for_model(model: VfdProfile) -> &'static DriveProfile {
        match model {
            VfdProfile::Yl620a => &YL620A,
            VfdProfile::Gs20 => &GS20,
        }
    }

    /// Options report line.
    pub fn report_line(&self) -> String {
        format!("[PLUGIN:{} v{}]", self.name, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profiles_share_command_registers() {
        for profile in [&YL620A, &GS20] {
            assert_eq!(profile.command_register, 0x2000);
            assert_eq!(profile.speed_register, 0x2001);
        }
        assert_eq!(YL620A.output_frequency_register, 0x200B);
        assert_eq!(GS20.output_frequency_register, 0x2103);
    }

    #[test]
    fn lookup_by_model() {
        assert_eq!(DriveProfile::for_model(VfdProfile::Gs20).ref_id, SpindleRef::Gs20);
        assert_eq!(
            DriveProfile::for_model(VfdProfile::Yl620a).report_line(),
            "[PLUGIN:Yalang VFD YL620A v0.03]"
        );
    }
}
