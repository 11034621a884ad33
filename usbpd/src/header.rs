use {
    crate::{DataRole, PowerRole},
    byteorder::{ByteOrder, LittleEndian},
    proc_bitfield::bitfield,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SpecificationRevision {
    R1_0,
    R2_0,
    R3_0,
}

impl From<u8> for SpecificationRevision {
    fn from(value: u8) -> Self {
        match value {
            0b00 => Self::R1_0,
            0b10 => Self::R3_0,
            _ => Self::R2_0,
        }
    }
}

impl From<SpecificationRevision> for u8 {
    fn from(value: SpecificationRevision) -> Self {
        match value {
            SpecificationRevision::R1_0 => 0b00,
            SpecificationRevision::R2_0 => 0b01,
            SpecificationRevision::R3_0 => 0b10,
        }
    }
}

bitfield! {
    /// 16-bit message header common to control and data messages.
    #[derive(Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct Header(pub u16): Debug, FromRaw, IntoRaw {
        pub extended: bool @ 15,
        pub num_objects: u8 @ 12..=14,
        pub message_id: u8 @ 9..=11,
        pub port_power_role: bool [set PowerRole, get PowerRole] @ 8,
        pub spec_revision: u8 [set SpecificationRevision, get SpecificationRevision] @ 6..=7,
        pub port_data_role: bool [set DataRole, get DataRole] @ 5,
        pub message_type_raw: u8 @ 0..=3,
    }
}

impl Header {
    pub fn from_bytes(buf: &[u8]) -> Self {
        Header(LittleEndian::read_u16(buf))
    }

    pub fn to_bytes(self, buf: &mut [u8]) {
        LittleEndian::write_u16(buf, self.0);
    }

    /// A header with no data objects carries a control message.
    pub fn message_type(&self) -> MessageType {
        if self.num_objects() == 0 {
            MessageType::Control(self.message_type_raw().into())
        } else {
            MessageType::Data(self.message_type_raw().into())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MessageType {
    Control(ControlMessageType),
    Data(DataMessageType),
}

/// Control message codes defined by PD r2.0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlMessageType {
    GoodCrc = 0b0001,
    GotoMin = 0b0010,
    Accept = 0b0011,
    Reject = 0b0100,
    Ping = 0b0101,
    PsRdy = 0b0110,
    GetSourceCap = 0b0111,
    GetSinkCap = 0b1000,
    DrSwap = 0b1001,
    PrSwap = 0b1010,
    VconnSwap = 0b1011,
    Wait = 0b1100,
    SoftReset = 0b1101,
    Reserved,
}

impl From<u8> for ControlMessageType {
    fn from(value: u8) -> Self {
        match value {
            0b0001 => Self::GoodCrc,
            0b0010 => Self::GotoMin,
            0b0011 => Self::Accept,
            0b0100 => Self::Reject,
            0b0101 => Self::Ping,
            0b0110 => Self::PsRdy,
            0b0111 => Self::GetSourceCap,
            0b1000 => Self::GetSinkCap,
            0b1001 => Self::DrSwap,
            0b1010 => Self::PrSwap,
            0b1011 => Self::VconnSwap,
            0b1100 => Self::Wait,
            0b1101 => Self::SoftReset,
            _ => Self::Reserved,
        }
    }
}

/// Data message codes defined by PD r2.0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataMessageType {
    SourceCapabilities = 0b0001,
    Request = 0b0010,
    Bist = 0b0011,
    SinkCapabilities = 0b0100,
    VendorDefined = 0b1111,
    Reserved = 0b0000,
}

impl From<u8> for DataMessageType {
    fn from(value: u8) -> Self {
        match value {
            0b0001 => Self::SourceCapabilities,
            0b0010 => Self::Request,
            0b0011 => Self::Bist,
            0b0100 => Self::SinkCapabilities,
            0b1111 => Self::VendorDefined,
            _ => Self::Reserved,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trips_through_wire_order() {
        let header = Header(0)
            .with_message_type_raw(DataMessageType::SourceCapabilities as u8)
            .with_num_objects(2)
            .with_message_id(5)
            .with_spec_revision(SpecificationRevision::R2_0)
            .with_port_power_role(PowerRole::Source)
            .with_port_data_role(DataRole::Dfp);

        let mut buf = [0u8; 2];
        header.to_bytes(&mut buf);
        assert_eq!(buf, header.0.to_le_bytes());
        assert_eq!(Header::from_bytes(&buf), header);
    }

    #[test]
    fn num_objects_selects_control_or_data() {
        let control = Header(0).with_message_type_raw(ControlMessageType::Accept as u8);
        assert_eq!(
            control.message_type(),
            MessageType::Control(ControlMessageType::Accept)
        );

        let data = Header(0)
            .with_message_type_raw(DataMessageType::Request as u8)
            .with_num_objects(1);
        assert_eq!(
            data.message_type(),
            MessageType::Data(DataMessageType::Request)
        );
    }

    #[test]
    fn unknown_codes_fall_back_to_reserved() {
        assert_eq!(ControlMessageType::from(0b1110), ControlMessageType::Reserved);
        assert_eq!(DataMessageType::from(0b0101), DataMessageType::Reserved);
    }

    #[test]
    fn role_bits_pack_into_header() {
        let header = Header(0)
            .with_port_power_role(PowerRole::Source)
            .with_port_data_role(DataRole::Dfp);
        assert_eq!(header.0, (1 << 8) | (1 << 5));
    }
}
