//! Device families and the static device-type descriptor table.
//!
//! Physical devices report a numeric type code during discovery; the
//! table maps it to the command-byte dialect the device speaks.

use strum_macros::Display;

/// A class of devices sharing one command-byte dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Default)]
pub enum DeviceFamily {
    #[default]
    Unknown,
    Sp1,
    Sp2,
    Sp3Plus,
    Rm,
    RmPlus,
    A1,
    Mp1,
    Hysen,
    S1c,
    Dooya,
    Rm4Mini,
    Rm4Pro,
}

/// Static descriptor for one numeric device-type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceDescriptor {
    pub code: u16,
    pub family: DeviceFamily,
    pub name: &'static str,
}

/// Map a discovery-reported device-type code to its descriptor.
pub fn descriptor(code: u16) -> DeviceDescriptor {
    use DeviceFamily::*;

    let (family, name) = match code {
        // OEM SP2 range
        0x7530..=0x7918 => (Sp2, "SPMini2 (OEM)"),

        0x0000 => (Sp1, "SP1"),

        0x2711 => (Sp2, "SP2"),
        0x2719 | 0x7919 | 0x271a | 0x791a => (Sp2, "Honeywell SP2"),
        0x2720 => (Sp2, "SPMini"),
        0x2728 => (Sp2, "SPMini2"),
        0x2733 | 0x273e => (Sp2, "OEM branded SPMini"),
        0x2736 => (Sp2, "SPMiniPlus"),
        0x7d00 => (Sp2, "OEM branded SP3"),

        0x947a | 0x9479 => (Sp3Plus, "SP3S"),

        0x2712 => (Rm, "RM2"),
        0x2737 => (Rm, "RM Mini"),
        0x273d => (Rm, "RM Pro Phicomm"),
        0x2783 => (Rm, "RM2 Home Plus"),
        0x277c => (Rm, "RM2 Home Plus GDT"),
        0x278f => (Rm, "RM Mini Shate"),
        0x2797 => (Rm, "RM2 Pro HYC"),
        0x5f36 => (Rm, "RM Mini 3 Red Bean"),

        0x272a => (RmPlus, "RM2 Pro Plus"),
        0x2787 => (RmPlus, "RM2 Pro Plus2"),
        0x278b => (RmPlus, "RM2 Pro Plus BL"),
        0x279d => (RmPlus, "RM3 Pro Plus"),
        0x27a9 => (RmPlus, "RM2 Pro Plus_300"),
        0x27a1 => (RmPlus, "RM2 Pro Plus R1"),
        0x27a6 => (RmPlus, "RM2 Pro PP"),

        0x2714 => (A1, "A1"),

        0x4eb5 => (Mp1, "MP1"),
        0x4ef7 => (Mp1, "Hontar MP1"),

        0x4ead => (Hysen, "Thermostat"),

        0x2722 => (S1c, "S1 (SmartOne Alarm Kit)"),

        0x4e4d => (Dooya, "Dooya DT360E (DOOYA_CURTAIN_V2)"),

        0x51da | 0x520c | 0x5216 | 0x521c | 0x610e | 0x62bc | 0x648d | 0x653a => {
            (Rm4Mini, "RM4 mini")
        }
        0x520d | 0x6070 | 0x610f | 0x62be | 0x6539 => (Rm4Mini, "RM4C mini"),
        0x5209 | 0x5212 => (Rm4Mini, "RM4 TV mate"),
        0x5211 => (Rm4Mini, "RM4C mate"),
        0x6364 => (Rm4Mini, "RM4S"),

        0x520b | 0x5213 | 0x6026 | 0x61a2 | 0x649b | 0x653c => (Rm4Pro, "RM4 pro"),
        0x5218 | 0x6184 => (Rm4Pro, "RM4C pro"),

        _ => (Unknown, "unknown"),
    };
    DeviceDescriptor { code, family, name }
}

/// Wire dialect used when replaying learned command data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendDialect {
    Classic,
    RedBean,
    MiniRed,
    Rm4Pro,
}

impl SendDialect {
    /// Fixed bytes prepended to the raw command data.
    pub fn prefix(self) -> &'static [u8] {
        match self {
            SendDialect::Classic => &[0x02, 0x00, 0x00, 0x00],
            SendDialect::RedBean => &[0xd0, 0x00, 0x02, 0x00],
            SendDialect::MiniRed => &[0xd0, 0x00, 0x02, 0x00, 0x00, 0x00],
            SendDialect::Rm4Pro => &[0xda, 0x00, 0x02, 0x00, 0x00, 0x00],
        }
    }
}

/// Learning-mode dialect: payload prefixes for entering capture mode and
/// probing for sampled data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LearnDialect {
    Classic,
    RedBean,
    Rm4,
}

impl LearnDialect {
    pub fn enter_prefix(self) -> &'static [u8] {
        match self {
            LearnDialect::Classic => &[0x03],
            LearnDialect::RedBean | LearnDialect::Rm4 => &[0x04, 0x00, 0x03],
        }
    }

    pub fn probe_prefix(self) -> &'static [u8] {
        match self {
            LearnDialect::Classic => &[0x04],
            LearnDialect::RedBean => &[0x00, 0x00, 0x04],
            LearnDialect::Rm4 => &[0x04, 0x00, 0x04],
        }
    }

    /// Leading bytes to strip from a captured waveform.
    pub fn strip(self) -> usize {
        match self {
            LearnDialect::Rm4 => 2,
            _ => 0,
        }
    }
}

/// RF sweep dialect, structurally identical between the two families but
/// with different payload shapes and ready markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RfDialect {
    RmPlus,
    Rm4Pro,
}

impl RfDialect {
    pub fn sweep_prefix(self) -> &'static [u8] {
        match self {
            RfDialect::RmPlus => &[0x19],
            RfDialect::Rm4Pro => &[0x04, 0x00, 0x19],
        }
    }

    pub fn cancel_prefix(self) -> &'static [u8] {
        match self {
            RfDialect::RmPlus => &[0x1e],
            RfDialect::Rm4Pro => &[0x04, 0x00, 0x1e],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oem_range_maps_to_sp2() {
        assert_eq!(descriptor(0x7530).family, DeviceFamily::Sp2);
        assert_eq!(descriptor(0x7918).family, DeviceFamily::Sp2);
        assert_eq!(descriptor(0x753e).name, "SPMini2 (OEM)");
    }

    #[test]
    fn known_codes_resolve() {
        assert_eq!(descriptor(0x2737).family, DeviceFamily::Rm);
        assert_eq!(descriptor(0x5f36).name, "RM Mini 3 Red Bean");
        assert_eq!(descriptor(0x279d).family, DeviceFamily::RmPlus);
        assert_eq!(descriptor(0x649b).family, DeviceFamily::Rm4Pro);
        assert_eq!(descriptor(0x4eb5).family, DeviceFamily::Mp1);
        assert_eq!(descriptor(0x9479).family, DeviceFamily::Sp3Plus);
    }

    #[test]
    fn unknown_code_falls_through() {
        let info = descriptor(0x1234);
        assert_eq!(info.family, DeviceFamily::Unknown);
        assert_eq!(info.code, 0x1234);
    }
}
