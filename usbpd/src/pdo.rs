//! Power Data Objects: 32-bit descriptors of offered power profiles, and
//! the request object used to pick one.

use {
    byteorder::{ByteOrder, LittleEndian},
    proc_bitfield::bitfield,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PowerDataObject {
    FixedSupply(FixedSupply),
    Battery(Battery),
    VariableSupply(VariableSupply),
    Unknown(PowerDataObjectRaw),
}

impl PowerDataObject {
    pub fn parse(word: u32) -> Self {
        let raw = PowerDataObjectRaw(word);
        match raw.kind() {
            0b00 => Self::FixedSupply(FixedSupply(word)),
            0b01 => Self::Battery(Battery(word)),
            0b10 => Self::VariableSupply(VariableSupply(word)),
            _ => Self::Unknown(raw),
        }
    }

    pub fn raw(&self) -> u32 {
        match *self {
            Self::FixedSupply(pdo) => pdo.0,
            Self::Battery(pdo) => pdo.0,
            Self::VariableSupply(pdo) => pdo.0,
            Self::Unknown(pdo) => pdo.0,
        }
    }
}

bitfield! {
    #[derive(Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct PowerDataObjectRaw(pub u32): Debug, FromRaw, IntoRaw {
        pub kind: u8 @ 30..=31,
    }
}

bitfield! {
    #[derive(Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct FixedSupply(pub u32): Debug, FromRaw, IntoRaw {
        /// Fixed supply
        pub kind: u8 @ 30..=31,
        /// Dual-role power
        pub dual_role_power: bool @ 29,
        /// USB suspend supported
        pub usb_suspend_supported: bool @ 28,
        /// Unconstrained power
        pub unconstrained_power: bool @ 27,
        /// USB communications capable
        pub usb_communications_capable: bool @ 26,
        /// Dual-role data
        pub dual_role_data: bool @ 25,
        /// Peak current
        pub peak_current: u8 @ 20..=21,
        /// Voltage in 50mV units
        pub voltage: u16 @ 10..=19,
        /// Maximum current in 10mA units
        pub max_current: u16 @ 0..=9,
    }
}

bitfield! {
    #[derive(Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct Battery(pub u32): Debug, FromRaw, IntoRaw {
        /// Battery
        pub kind: u8 @ 30..=31,
        /// Maximum voltage in 50mV units
        pub max_voltage: u16 @ 20..=29,
        /// Minimum voltage in 50mV units
        pub min_voltage: u16 @ 10..=19,
        /// Maximum allowable power in 250mW units
        pub max_power: u16 @ 0..=9,
    }
}

bitfield! {
    #[derive(Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct VariableSupply(pub u32): Debug, FromRaw, IntoRaw {
        /// Variable supply (non-battery)
        pub kind: u8 @ 30..=31,
        /// Maximum voltage in 50mV units
        pub max_voltage: u16 @ 20..=29,
        /// Minimum voltage in 50mV units
        pub min_voltage: u16 @ 10..=19,
        /// Maximum current in 10mA units
        pub max_current: u16 @ 0..=9,
    }
}

bitfield! {
    /// Request object for fixed and variable supplies.
    #[derive(Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct FixedVariableRequestDataObject(pub u32): Debug, FromRaw, IntoRaw {
        /// Valid range 1..=7
        pub object_position: u8 @ 28..=30,
        pub giveback_flag: bool @ 27,
        pub capability_mismatch: bool @ 26,
        pub usb_communications_capable: bool @ 25,
        pub no_usb_suspend: bool @ 24,
        /// Operating current in 10mA units
        pub operating_current: u16 @ 10..=19,
        /// Maximum operating current in 10mA units
        pub maximum_operating_current: u16 @ 0..=9,
    }
}

impl FixedVariableRequestDataObject {
    pub fn to_bytes(&self, buf: &mut [u8]) {
        LittleEndian::write_u32(buf, self.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_supply_field_packing() {
        let pdo = FixedSupply(0)
            .with_voltage(100)
            .with_max_current(150)
            .with_dual_role_power(true);
        assert_eq!(pdo.0, (1 << 29) | (100 << 10) | 150);
    }

    #[test]
    fn kind_dispatch() {
        assert!(matches!(
            PowerDataObject::parse(100 << 10),
            PowerDataObject::FixedSupply(_)
        ));
        assert!(matches!(
            PowerDataObject::parse(0b01 << 30),
            PowerDataObject::Battery(_)
        ));
        assert!(matches!(
            PowerDataObject::parse(0b10 << 30),
            PowerDataObject::VariableSupply(_)
        ));
        assert!(matches!(
            PowerDataObject::parse(0b11 << 30),
            PowerDataObject::Unknown(_)
        ));
    }

    #[test]
    fn request_object_packing() {
        let request = FixedVariableRequestDataObject(0)
            .with_object_position(1)
            .with_usb_communications_capable(true);
        assert_eq!(request.0, (1 << 28) | (1 << 25));

        let mut buf = [0u8; 4];
        request.to_bytes(&mut buf);
        assert_eq!(buf, request.0.to_le_bytes());
    }
}
