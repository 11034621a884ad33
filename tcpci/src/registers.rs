//! TCPCI registers
//!
//! Addresses and layouts from the USB Type-C Port Controller Interface
//! specification. Typed accessors are generated with macros; `Default`
//! for each register is its reset value.

use {
    byteorder::{ByteOrder, LittleEndian},
    embedded_hal::blocking::i2c::{Write, WriteRead},
    proc_bitfield::bitfield,
    usbpd::{header::SpecificationRevision, DataRole, PowerRole},
};

/// Longest block transfer: the 28-byte RX/TX data buffers.
pub const MAX_BLOCK_LEN: usize = 28;

macro_rules! generate_register_read {
    ($reg:ident, $fn:ident, u8) => {
        pub fn $fn(&mut self) -> $reg {
            $reg(self.read8(Register::$reg))
        }
    };
    ($reg:ident, $fn:ident, u16) => {
        pub fn $fn(&mut self) -> $reg {
            $reg(self.read16(Register::$reg))
        }
    };
}

macro_rules! generate_register_write {
    ($reg:ident, $fn:ident, u8) => {
        paste::item! {
            pub fn [<set_ $fn>](&mut self, value: $reg) {
                self.write8(Register::$reg, value.0);
            }
        }
    };
    ($reg:ident, $fn:ident, u16) => {
        paste::item! {
            pub fn [<set_ $fn>](&mut self, value: $reg) {
                self.write16(Register::$reg, value.0);
            }
        }
    };
}

macro_rules! generate_register_accessors {
    () => {};

    (($reg:ident, $fn:ident, $width:tt, r), $($tail:tt)*) => {
        generate_register_read!($reg, $fn, $width);

        generate_register_accessors!($($tail)*);
    };

    (($reg:ident, $fn:ident, $width:tt, w), $($tail:tt)*) => {
        generate_register_write!($reg, $fn, $width);

        generate_register_accessors!($($tail)*);
    };

    (($reg:ident, $fn:ident, $width:tt, rw), $($tail:tt)*) => {
        generate_register_read!($reg, $fn, $width);
        generate_register_write!($reg, $fn, $width);

        generate_register_accessors!($($tail)*);
    };
}

/// Register access adapter.
///
/// Every call is one addressed bus transaction; the HAL implementation
/// holds the bus exclusively for its duration. Bus errors are logged and
/// absorbed: failed reads return zero, failed writes are dropped. The
/// calling sequences have no recovery path of their own.
pub struct Registers<I2C> {
    pub(crate) i2c: I2C,
    addr: u8,
}

impl<I2C: Write + WriteRead> Registers<I2C> {
    pub fn new(i2c: I2C, addr: u8) -> Self {
        Self { i2c, addr }
    }

    pub fn release(self) -> I2C {
        self.i2c
    }

    pub fn read8(&mut self, reg: Register) -> u8 {
        let mut buf = [0u8; 1];
        if self
            .i2c
            .write_read(self.addr, &[reg as u8], &mut buf)
            .is_err()
        {
            error!("cannot read register {:x}", reg as u8);
            return 0;
        }
        buf[0]
    }

    pub fn write8(&mut self, reg: Register, value: u8) {
        if self.i2c.write(self.addr, &[reg as u8, value]).is_err() {
            error!("cannot write register {:x}", reg as u8);
        }
    }

    /// 16-bit registers are little-endian on the wire.
    pub fn read16(&mut self, reg: Register) -> u16 {
        let mut buf = [0u8; 2];
        if self
            .i2c
            .write_read(self.addr, &[reg as u8], &mut buf)
            .is_err()
        {
            error!("cannot read register {:x}", reg as u8);
            return 0;
        }
        LittleEndian::read_u16(&buf)
    }

    pub fn write16(&mut self, reg: Register, value: u16) {
        let mut buf = [reg as u8, 0, 0];
        LittleEndian::write_u16(&mut buf[1..], value);
        if self.i2c.write(self.addr, &buf).is_err() {
            error!("cannot write register {:x}", reg as u8);
        }
    }

    pub fn read_block(&mut self, reg: Register, buf: &mut [u8]) {
        if self.i2c.write_read(self.addr, &[reg as u8], buf).is_err() {
            error!("cannot read register {:x}", reg as u8);
            buf.fill(0);
        }
    }

    pub fn write_block(&mut self, reg: Register, data: &[u8]) {
        debug_assert!(data.len() <= MAX_BLOCK_LEN);
        let mut buf = [0u8; MAX_BLOCK_LEN + 1];
        buf[0] = reg as u8;
        buf[1..=data.len()].copy_from_slice(data);
        if self.i2c.write(self.addr, &buf[..=data.len()]).is_err() {
            error!("cannot write register {:x}", reg as u8);
        }
    }

    pub fn command(&mut self, command: Command) {
        self.write8(Register::Command, command as u8);
    }

    generate_register_accessors!(
        (Alert, alert, u16, rw),
        (AlertMask, alert_mask, u16, rw),
        (PowerStatusMask, power_status_mask, u8, rw),
        (TcpcControl, tcpc_control, u8, rw),
        (RoleControl, role_control, u8, rw),
        (PowerControl, power_control, u8, rw),
        (CcStatus, cc_status, u8, r),
        (PowerStatus, power_status, u8, r),
        (FaultStatus, fault_status, u8, rw),
        (MsgHeaderInfo, msg_header_info, u8, rw),
        (RxDetect, rx_detect, u8, rw),
        (Transmit, transmit, u8, w),
    );
}

/// Register addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Register {
    Alert = 0x10,
    AlertMask = 0x12,
    PowerStatusMask = 0x14,
    TcpcControl = 0x19,
    RoleControl = 0x1a,
    PowerControl = 0x1c,
    CcStatus = 0x1d,
    PowerStatus = 0x1e,
    FaultStatus = 0x1f,
    Command = 0x23,
    MsgHeaderInfo = 0x2e,
    RxDetect = 0x2f,
    RxByteCnt = 0x30,
    RxBufFrameType = 0x31,
    RxHdr = 0x32,
    RxData = 0x34,
    Transmit = 0x50,
    TxByteCnt = 0x51,
    TxHdr = 0x52,
    TxData = 0x54,
    VbusVoltageAlarmLoCfg = 0x78,
}

/// COMMAND register opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    WakeI2c = 0x11,
    DisableVbusDetect = 0x22,
    EnableVbusDetect = 0x33,
    DisableSinkVbus = 0x44,
    SinkVbus = 0x55,
    DisableSourceVbus = 0x66,
    SourceVbusDefault = 0x77,
    SourceVbusHigh = 0x88,
    Look4Connection = 0x99,
    RxOneMore = 0xaa,
    I2cIdle = 0xff,
}

bitfield! {
    /// Pending events. Writing a one to a bit clears it.
    #[derive(Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct Alert(pub u16): Debug, FromRaw, IntoRaw {
        pub vbus_sink_disconnect: bool @ 11,
        pub rx_buffer_overflow: bool @ 10,
        pub fault: bool @ 9,
        pub vbus_alarm_lo: bool @ 8,
        pub vbus_alarm_hi: bool @ 7,
        pub tx_success: bool @ 6,
        pub tx_discarded: bool @ 5,
        pub tx_failed: bool @ 4,
        pub rx_hard_reset: bool @ 3,
        pub rx_status: bool @ 2,
        pub power_status: bool @ 1,
        pub cc_status: bool @ 0,
    }
}

impl Default for Alert {
    fn default() -> Self {
        Self(0x0000)
    }
}

bitfield! {
    /// A set bit allows the matching [`Alert`] bit to assert the
    /// interrupt line.
    #[derive(Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct AlertMask(pub u16): Debug, FromRaw, IntoRaw {
        pub vbus_sink_disconnect: bool @ 11,
        pub rx_buffer_overflow: bool @ 10,
        pub fault: bool @ 9,
        pub vbus_alarm_lo: bool @ 8,
        pub vbus_alarm_hi: bool @ 7,
        pub tx_success: bool @ 6,
        pub tx_discarded: bool @ 5,
        pub tx_failed: bool @ 4,
        pub rx_hard_reset: bool @ 3,
        pub rx_status: bool @ 2,
        pub power_status: bool @ 1,
        pub cc_status: bool @ 0,
    }
}

impl Default for AlertMask {
    fn default() -> Self {
        Self(0x0fff)
    }
}

bitfield! {
    #[derive(Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct PowerStatus(pub u8): Debug, FromRaw, IntoRaw {
        pub debug_accessory_connected: bool @ 7,
        /// Still initializing; registers are not yet valid
        pub tcpc_initializing: bool @ 6,
        pub sourcing_high_voltage: bool @ 5,
        pub sourcing_vbus: bool @ 4,
        pub vbus_detection_enabled: bool @ 3,
        pub vbus_present: bool @ 2,
        pub vconn_present: bool @ 1,
        pub sinking_vbus: bool @ 0,
    }
}

impl Default for PowerStatus {
    fn default() -> Self {
        Self(0b0000_1000)
    }
}

bitfield! {
    /// A set bit allows the matching [`PowerStatus`] change to raise the
    /// POWER_STATUS alert.
    #[derive(Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct PowerStatusMask(pub u8): Debug, FromRaw, IntoRaw {
        pub debug_accessory_connected: bool @ 7,
        pub tcpc_initializing: bool @ 6,
        pub sourcing_high_voltage: bool @ 5,
        pub sourcing_vbus: bool @ 4,
        pub vbus_detection_enabled: bool @ 3,
        pub vbus_present: bool @ 2,
        pub vconn_present: bool @ 1,
        pub sinking_vbus: bool @ 0,
    }
}

impl Default for PowerStatusMask {
    fn default() -> Self {
        Self(0xff)
    }
}

bitfield! {
    #[derive(Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct TcpcControl(pub u8): Debug, FromRaw, IntoRaw {
        pub bist_mode: bool @ 1,
        /// Clear for CC1, set for CC2
        pub plug_orientation: bool @ 0,
    }
}

impl Default for TcpcControl {
    fn default() -> Self {
        Self(0b0000_0000)
    }
}

/// Termination presented on a CC pin via [`RoleControl`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CcPull {
    Ra,
    Rp,
    Rd,
    Open,
}

impl From<u8> for CcPull {
    fn from(value: u8) -> Self {
        match value {
            0b00 => Self::Ra,
            0b01 => Self::Rp,
            0b10 => Self::Rd,
            _ => Self::Open,
        }
    }
}

impl From<CcPull> for u8 {
    fn from(value: CcPull) -> Self {
        match value {
            CcPull::Ra => 0b00,
            CcPull::Rp => 0b01,
            CcPull::Rd => 0b10,
            CcPull::Open => 0b11,
        }
    }
}

bitfield! {
    #[derive(Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct RoleControl(pub u8): Debug, FromRaw, IntoRaw {
        /// Enable dual-role auto-toggle from the CC1/CC2 pattern below
        pub drp: bool @ 6,
        /// Rp current advertisement: default, 1.5 A or 3.0 A
        pub rp_value: u8 @ 4..=5,
        pub cc2: u8 [set CcPull, get CcPull] @ 2..=3,
        pub cc1: u8 [set CcPull, get CcPull] @ 0..=1,
    }
}

impl Default for RoleControl {
    fn default() -> Self {
        Self(0b0000_1010)
    }
}

bitfield! {
    #[derive(Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct PowerControl(pub u8): Debug, FromRaw, IntoRaw {
        /// Disable the VBUS voltage alarm comparators
        pub disable_voltage_alarms: bool @ 5,
        pub auto_discharge_disconnect: bool @ 4,
        pub enable_bleed_discharge: bool @ 3,
        pub force_discharge: bool @ 2,
        pub vconn_power_supported: bool @ 1,
        pub vconn_enable: bool @ 0,
    }
}

impl Default for PowerControl {
    fn default() -> Self {
        Self(0b0110_0000)
    }
}

bitfield! {
    /// Comparator result for both CC pins.
    ///
    /// The two-bit per-pin codes change meaning with `connect_result`:
    /// clear means the TCPC presents Rp and the codes report Ra/Rd, set
    /// means it presents Rd and the codes report the partner's Rp level.
    #[derive(Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct CcStatus(pub u8): Debug, FromRaw, IntoRaw {
        pub looking4connection: bool @ 5,
        pub connect_result: bool @ 4,
        pub cc2_state: u8 @ 2..=3,
        pub cc1_state: u8 @ 0..=1,
    }
}

impl Default for CcStatus {
    fn default() -> Self {
        Self(0b0000_0000)
    }
}

bitfield! {
    /// Latched faults. Writing a one to a bit clears it.
    #[derive(Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct FaultStatus(pub u8): Debug, FromRaw, IntoRaw {
        /// Set after reset until the fault register is acknowledged
        pub all_registers_reset: bool @ 7,
        pub force_off_vbus: bool @ 6,
        pub auto_discharge_failed: bool @ 5,
        pub force_discharge_failed: bool @ 4,
        pub vbus_over_current: bool @ 3,
        pub vbus_over_voltage: bool @ 2,
        pub vconn_over_current: bool @ 1,
        pub i2c_interface_error: bool @ 0,
    }
}

impl Default for FaultStatus {
    fn default() -> Self {
        Self(0b1000_0000)
    }
}

bitfield! {
    /// Role and revision bits the TCPC uses when it builds GoodCRC
    /// responses on our behalf.
    #[derive(Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct MsgHeaderInfo(pub u8): Debug, FromRaw, IntoRaw {
        pub cable_plug: bool @ 4,
        pub data_role: bool [set DataRole, get DataRole] @ 3,
        pub pd_revision: u8 [set SpecificationRevision, get SpecificationRevision] @ 1..=2,
        pub power_role: bool [set PowerRole, get PowerRole] @ 0,
    }
}

impl Default for MsgHeaderInfo {
    fn default() -> Self {
        Self(0b0000_0010)
    }
}

bitfield! {
    /// Which frame types the receiver accepts.
    #[derive(Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct RxDetect(pub u8): Debug, FromRaw, IntoRaw {
        pub hard_reset: bool @ 5,
        pub sop_debug_prime_prime: bool @ 4,
        pub sop_debug_prime: bool @ 3,
        pub sop_prime_prime: bool @ 2,
        pub sop_prime: bool @ 1,
        pub sop: bool @ 0,
    }
}

impl Default for RxDetect {
    fn default() -> Self {
        Self(0b0000_0000)
    }
}

impl RxDetect {
    /// Accept every SOP* variant plus hard resets.
    pub fn all_frames() -> Self {
        Self(0)
            .with_sop(true)
            .with_sop_prime(true)
            .with_sop_prime_prime(true)
            .with_sop_debug_prime(true)
            .with_sop_debug_prime_prime(true)
            .with_hard_reset(true)
    }
}

/// Framing selected in the TRANSMIT register; the RX_BUF_FRAME_TYPE
/// register reports received frames with the same coding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TxFrameType {
    Sop,
    SopPrime,
    SopPrimePrime,
    SopDebugPrime,
    SopDebugPrimePrime,
    HardReset,
    CableReset,
    BistMode2,
}

impl From<u8> for TxFrameType {
    fn from(value: u8) -> Self {
        match value {
            0b000 => Self::Sop,
            0b001 => Self::SopPrime,
            0b010 => Self::SopPrimePrime,
            0b011 => Self::SopDebugPrime,
            0b100 => Self::SopDebugPrimePrime,
            0b101 => Self::HardReset,
            0b110 => Self::CableReset,
            _ => Self::BistMode2,
        }
    }
}

impl From<TxFrameType> for u8 {
    fn from(value: TxFrameType) -> Self {
        value as u8
    }
}

bitfield! {
    #[derive(Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct Transmit(pub u8): Debug, FromRaw, IntoRaw {
        /// Automatic hardware retries on missing GoodCRC
        pub retry_count: u8 @ 4..=5,
        pub frame_type: u8 [set TxFrameType, get TxFrameType] @ 0..=2,
    }
}

impl Default for Transmit {
    fn default() -> Self {
        Self(0b0000_0000)
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::testutil::{FailingBus, MockBus},
    };

    #[test]
    fn sixteen_bit_registers_are_little_endian() {
        let mut bus = MockBus::new();
        bus.set16(Register::Alert as u8, 0x0204);
        let mut registers = Registers::new(bus, 0x52);

        assert_eq!(registers.alert().0, 0x0204);

        registers.set_alert(Alert(0x0104));
        let writes = registers.i2c.writes_to(Register::Alert as u8);
        assert_eq!(writes, vec![vec![0x04, 0x01]]);
    }

    #[test]
    fn failed_reads_default_to_zero() {
        let mut registers = Registers::new(FailingBus, 0x52);
        assert_eq!(registers.cc_status().0, 0);
        assert_eq!(registers.read16(Register::Alert), 0);
        // writes are dropped without panicking
        registers.command(Command::Look4Connection);
    }

    #[test]
    fn role_control_pull_coding() {
        let role = RoleControl(0)
            .with_drp(true)
            .with_cc1(CcPull::Rd)
            .with_cc2(CcPull::Rd);
        assert_eq!(role.0, 0x4a);

        let role = RoleControl(0).with_cc1(CcPull::Rd).with_cc2(CcPull::Open);
        assert_eq!(role.0, 0x0e);
        assert_eq!(role.cc1(), CcPull::Rd);
        assert_eq!(role.cc2(), CcPull::Open);
    }

    #[test]
    fn block_write_prefixes_register_address() {
        let bus = MockBus::new();
        let mut registers = Registers::new(bus, 0x52);
        registers.write_block(Register::TxData, &[1, 2, 3, 4]);
        assert_eq!(
            registers.i2c.writes_to(Register::TxData as u8),
            vec![vec![1, 2, 3, 4]]
        );
    }
}
