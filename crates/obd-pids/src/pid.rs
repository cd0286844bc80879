//! OBD-II Mode-01 PID Catalog
//!
//! Each supported Parameter ID is a [`PidDefinition`] in a fixed static
//! table. Decoding is dispatched over the closed [`PidKind`] variant, so
//! there is no dynamic typing on the hot path and every decode function is
//! pure and total for a given byte count.

use crate::unit::SpeedUnit;

/// Conversion factor from km/h to mph.
const KMH_TO_MPH: f64 = 0.621371;

/// Decode strategy for one PID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PidKind {
    /// ((b0*256)+b1)/4, rounded to whole rpm
    EngineSpeed,
    /// b0 km/h, or b0*0.621371 mph to 1 decimal
    VehicleSpeed,
    /// b0*100/255 percent to 1 decimal
    ThrottlePosition,
    /// b0-40 degrees C
    CoolantTemp,
    /// b0*100/255 percent to 1 decimal
    EngineLoad,
    /// b0-40 degrees C
    IntakeTemp,
    /// ((b0*256)+b1)/100 g/s to 2 decimals
    MassAirFlow,
}

impl PidKind {
    /// Decode payload bytes into the value string.
    ///
    /// Total for any input: insufficient bytes yield `default` rather than
    /// an error, and identical bytes and unit always yield identical output.
    pub fn decode(&self, bytes: &[u8], unit: SpeedUnit, default: &str) -> String {
        match self {
            PidKind::EngineSpeed => match bytes {
                [a, b, ..] => {
                    let rpm = ((u32::from(*a) * 256 + u32::from(*b)) as f64 / 4.0).round();
                    format!("{}", rpm as u32)
                }
                _ => default.to_string(),
            },
            PidKind::VehicleSpeed => match bytes {
                [a, ..] => match unit {
                    SpeedUnit::Kmh => a.to_string(),
                    SpeedUnit::Mph => format!("{:.1}", f64::from(*a) * KMH_TO_MPH),
                },
                _ => default.to_string(),
            },
            PidKind::ThrottlePosition | PidKind::EngineLoad => match bytes {
                [a, ..] => format!("{:.1}", f64::from(*a) * 100.0 / 255.0),
                _ => default.to_string(),
            },
            PidKind::CoolantTemp | PidKind::IntakeTemp => match bytes {
                [a, ..] => (i32::from(*a) - 40).to_string(),
                _ => default.to_string(),
            },
            PidKind::MassAirFlow => match bytes {
                [a, b, ..] => {
                    format!("{:.2}", (u32::from(*a) * 256 + u32::from(*b)) as f64 / 100.0)
                }
                _ => default.to_string(),
            },
        }
    }
}

/// One supported mode-01 PID.
#[derive(Debug, Clone, Copy)]
pub struct PidDefinition {
    /// Stable symbolic name, used as the sample key
    pub name: &'static str,
    /// Human-readable description
    pub description: &'static str,
    /// Full mode-01 request command, e.g. "010C"
    pub command: &'static str,
    /// The 2-hex-digit PID code
    pub code: u8,
    /// Unit of the decoded value
    pub unit: &'static str,
    /// Minimum payload bytes a decodable response carries
    pub min_bytes: usize,
    /// Value substituted when the query or decode fails
    pub default: &'static str,
    /// Whether this PID is polled by default
    pub enabled: bool,
    /// Decode strategy
    pub kind: PidKind,
}

impl PidDefinition {
    /// The positive-response signature for this PID: "41" + code.
    pub fn signature(&self) -> String {
        format!("41{:02X}", self.code)
    }

    /// Decode payload bytes with this PID's strategy and default.
    pub fn decode(&self, bytes: &[u8], unit: SpeedUnit) -> String {
        self.kind.decode(bytes, unit, self.default)
    }
}

/// The supported PID table. Order is the polling order.
pub static SUPPORTED_PIDS: [PidDefinition; 7] = [
    PidDefinition {
        name: "RPM",
        description: "Engine RPM",
        command: "010C",
        code: 0x0C,
        unit: "rpm",
        min_bytes: 2,
        default: "0",
        enabled: true,
        kind: PidKind::EngineSpeed,
    },
    PidDefinition {
        name: "Speed",
        description: "Vehicle Speed",
        command: "010D",
        code: 0x0D,
        unit: "km/h",
        min_bytes: 1,
        default: "0",
        enabled: true,
        kind: PidKind::VehicleSpeed,
    },
    PidDefinition {
        name: "Throttle",
        description: "Throttle Position",
        command: "0111",
        code: 0x11,
        unit: "%",
        min_bytes: 1,
        default: "0",
        enabled: true,
        kind: PidKind::ThrottlePosition,
    },
    PidDefinition {
        name: "CoolantTemp",
        description: "Engine Coolant Temperature",
        command: "0105",
        code: 0x05,
        unit: "°C",
        min_bytes: 1,
        default: "0",
        enabled: true,
        kind: PidKind::CoolantTemp,
    },
    PidDefinition {
        name: "EngineLoad",
        description: "Calculated Engine Load",
        command: "0104",
        code: 0x04,
        unit: "%",
        min_bytes: 1,
        default: "0",
        enabled: false,
        kind: PidKind::EngineLoad,
    },
    PidDefinition {
        name: "IntakeTemp",
        description: "Intake Air Temperature",
        command: "010F",
        code: 0x0F,
        unit: "°C",
        min_bytes: 1,
        default: "0",
        enabled: false,
        kind: PidKind::IntakeTemp,
    },
    PidDefinition {
        name: "MAF",
        description: "Mass Air Flow Rate",
        command: "0110",
        code: 0x10,
        unit: "g/s",
        min_bytes: 2,
        default: "0",
        enabled: false,
        kind: PidKind::MassAirFlow,
    },
];

/// All supported PIDs.
pub fn all() -> &'static [PidDefinition] {
    &SUPPORTED_PIDS
}

/// PIDs polled by default.
pub fn enabled() -> impl Iterator<Item = &'static PidDefinition> {
    SUPPORTED_PIDS.iter().filter(|p| p.enabled)
}

/// Look up a PID by symbolic name.
pub fn by_name(name: &str) -> Option<&'static PidDefinition> {
    SUPPORTED_PIDS.iter().find(|p| p.name == name)
}

/// Look up a PID by its mode-01 request command.
pub fn by_command(command: &str) -> Option<&'static PidDefinition> {
    SUPPORTED_PIDS.iter().find(|p| p.command == command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enabled_set() {
        let names: Vec<_> = enabled().map(|p| p.name).collect();
        assert_eq!(names, vec!["RPM", "Speed", "Throttle", "CoolantTemp"]);
    }

    #[test]
    fn test_lookup_by_name_and_command() {
        assert_eq!(by_name("MAF").unwrap().command, "0110");
        assert_eq!(by_command("010C").unwrap().name, "RPM");
        assert!(by_name("Boost").is_none());
    }

    #[test]
    fn test_signature_matches_code() {
        for pid in all() {
            assert_eq!(pid.signature(), format!("41{}", &pid.command[2..]));
        }
    }

    #[test]
    fn test_rpm_decode() {
        // 410C1AF8 => ((0x1A*256)+0xF8)/4 = 1726
        let pid = by_name("RPM").unwrap();
        assert_eq!(pid.decode(&[0x1A, 0xF8], SpeedUnit::Kmh), "1726");
    }

    #[test]
    fn test_speed_decode_both_units() {
        let pid = by_name("Speed").unwrap();
        assert_eq!(pid.decode(&[0x50], SpeedUnit::Kmh), "80");
        assert_eq!(pid.decode(&[0x50], SpeedUnit::Mph), "49.7");
    }

    #[test]
    fn test_throttle_decode_extremes() {
        let pid = by_name("Throttle").unwrap();
        assert_eq!(pid.decode(&[0xFF], SpeedUnit::Kmh), "100.0");
        assert_eq!(pid.decode(&[0x00], SpeedUnit::Kmh), "0.0");
    }

    #[test]
    fn test_coolant_decode() {
        let pid = by_name("CoolantTemp").unwrap();
        assert_eq!(pid.decode(&[0x28], SpeedUnit::Kmh), "0");
        assert_eq!(pid.decode(&[0x00], SpeedUnit::Kmh), "-40");
    }

    #[test]
    fn test_maf_decode() {
        let pid = by_name("MAF").unwrap();
        // (0x02*256 + 0x8A) / 100 = 650 / 100 = 6.50
        assert_eq!(pid.decode(&[0x02, 0x8A], SpeedUnit::Kmh), "6.50");
    }

    #[test]
    fn test_short_payload_yields_default() {
        let rpm = by_name("RPM").unwrap();
        assert_eq!(rpm.decode(&[0x1A], SpeedUnit::Kmh), "0");
        assert_eq!(rpm.decode(&[], SpeedUnit::Kmh), "0");
        let speed = by_name("Speed").unwrap();
        assert_eq!(speed.decode(&[], SpeedUnit::Mph), "0");
    }
}
