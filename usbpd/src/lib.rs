//! USB Power Delivery message types, revision 2.0.
//!
//! Shared vocabulary between a Type-C port controller driver and the
//! platform: roles, CC terminations, message headers, Power Data Objects
//! and whole messages.

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod header;
pub mod message;
pub mod pdo;

/// Configuration channel pin, also used to express plug orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CcPin {
    Cc1,
    Cc2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PowerRole {
    Source,
    Sink,
}

impl From<bool> for PowerRole {
    fn from(value: bool) -> Self {
        match value {
            false => Self::Sink,
            true => Self::Source,
        }
    }
}

impl From<PowerRole> for bool {
    fn from(role: PowerRole) -> bool {
        match role {
            PowerRole::Sink => false,
            PowerRole::Source => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataRole {
    Ufp,
    Dfp,
}

impl From<bool> for DataRole {
    fn from(value: bool) -> Self {
        match value {
            false => Self::Ufp,
            true => Self::Dfp,
        }
    }
}

impl From<DataRole> for bool {
    fn from(role: DataRole) -> bool {
        match role {
            DataRole::Ufp => false,
            DataRole::Dfp => true,
        }
    }
}

/// Termination detected on a single CC pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CcTermination {
    Open,
    /// Accessory / VCONN pull-down
    Ra,
    /// Device pull-down
    Rd,
    /// Host pull-up advertising default USB current
    RpDefault,
    /// Host pull-up advertising 1.5 A
    Rp1_5,
    /// Host pull-up advertising 3.0 A
    Rp3_0,
}

impl CcTermination {
    pub fn is_rp(self) -> bool {
        matches!(self, Self::RpDefault | Self::Rp1_5 | Self::Rp3_0)
    }
}

/// Counter tagging outgoing messages.
///
/// Kept as a 4-bit wrapping count; the header field only carries its low
/// three bits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MessageId(u8);

impl MessageId {
    pub const fn new() -> Self {
        Self(0)
    }

    /// Tag for the next outgoing header.
    pub fn value(&self) -> u8 {
        self.0 & 0x7
    }

    /// Advance after a successful transmission.
    pub fn advance(&mut self) {
        self.0 = (self.0 + 1) & 0xf;
    }

    /// Restart the sequence on a new connection.
    pub fn reset(&mut self) {
        self.0 = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_id_wraps_after_sixteen() {
        let mut id = MessageId::new();
        for _ in 0..16 {
            id.advance();
        }
        assert_eq!(id, MessageId::new());
    }

    #[test]
    fn message_id_header_tag_is_three_bits() {
        let mut id = MessageId::new();
        for _ in 0..9 {
            id.advance();
        }
        assert_eq!(id.value(), 1);
    }

    #[test]
    fn rp_classification() {
        assert!(CcTermination::RpDefault.is_rp());
        assert!(CcTermination::Rp3_0.is_rp());
        assert!(!CcTermination::Rd.is_rp());
        assert!(!CcTermination::Open.is_rp());
    }
}
