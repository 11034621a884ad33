use {
    crate::{
        header::{ControlMessageType, DataMessageType, Header, MessageType},
        pdo::{FixedVariableRequestDataObject, PowerDataObject},
    },
    heapless::Vec,
};

/// Largest payload a non-extended message may carry, in 32-bit words.
pub const MAX_PAYLOAD_WORDS: usize = 7;

/// A PD message as it moves through the port controller: header plus
/// payload words in host byte order.
///
/// The driver retains the last frame it sent so it can be retransmitted
/// when the controller reports a discard or failure.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PdFrame {
    pub header: Header,
    pub payload: Vec<u32, MAX_PAYLOAD_WORDS>,
}

impl PdFrame {
    pub fn num_objects(&self) -> usize {
        self.payload.len()
    }
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Message {
    Control(ControlMessageType),
    SourceCapabilities(Vec<PowerDataObject, MAX_PAYLOAD_WORDS>),
    Request(FixedVariableRequestDataObject),
    VendorDefined(Vec<u32, MAX_PAYLOAD_WORDS>),
    Unknown,
}

impl Message {
    /// Decode a message from its header and host-order payload words.
    pub fn parse(header: Header, payload: &[u32]) -> Self {
        match header.message_type() {
            MessageType::Control(control) => Message::Control(control),
            MessageType::Data(DataMessageType::SourceCapabilities) => Message::SourceCapabilities(
                payload
                    .iter()
                    .take(header.num_objects() as usize)
                    .map(|&word| PowerDataObject::parse(word))
                    .collect(),
            ),
            MessageType::Data(DataMessageType::Request) => match payload.first() {
                Some(&word) => Message::Request(FixedVariableRequestDataObject(word)),
                None => Message::Unknown,
            },
            MessageType::Data(DataMessageType::VendorDefined) => Message::VendorDefined(
                payload.iter().copied().take(MAX_PAYLOAD_WORDS).collect(),
            ),
            MessageType::Data(_) => {
                warn!("unknown data message type {}", header.message_type_raw());
                Message::Unknown
            }
        }
    }
}
