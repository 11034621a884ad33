//! CC pin classification.
//!
//! Pure functions from the CC_STATUS comparator codes to the attach
//! decision; the driver applies the resulting side effects.

use usbpd::{CcPin, CcTermination};

/// Decode one two-bit CC_STATUS pin code.
///
/// The coding depends on which termination the TCPC itself presents on
/// that pin: presenting Rd, the codes report the partner's Rp
/// advertisement; presenting Rp, they report Ra or Rd.
pub fn termination(code: u8, presenting_rd: bool) -> CcTermination {
    if presenting_rd {
        match code {
            0b01 => CcTermination::RpDefault,
            0b10 => CcTermination::Rp1_5,
            0b11 => CcTermination::Rp3_0,
            _ => CcTermination::Open,
        }
    } else {
        match code {
            0b01 => CcTermination::Ra,
            0b10 => CcTermination::Rd,
            _ => CcTermination::Open,
        }
    }
}

/// Connection state derived from both CC pins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Connection {
    Unattached,
    /// Partner presents Rd; we source. `vconn` is set when the other
    /// pin carries Ra, meaning a powered cable wants VCONN.
    Source { polarity: CcPin, vconn: bool },
    /// Partner presents Rp; we sink.
    Sink { polarity: CcPin },
    AudioAccessory,
    AudioDetached,
}

/// Classify a CC pin pair, `None` when the combination is not a state
/// Type-C defines.
pub fn classify(cc1: CcTermination, cc2: CcTermination) -> Option<Connection> {
    use CcTermination::{Open, Ra, Rd};

    match (cc1, cc2) {
        (Open, Open) => Some(Connection::Unattached),
        (Rd, other) if other != Rd => Some(Connection::Source {
            polarity: CcPin::Cc1,
            vconn: other == Ra,
        }),
        (other, Rd) if other != Rd => Some(Connection::Source {
            polarity: CcPin::Cc2,
            vconn: other == Ra,
        }),
        (rp, Open) if rp.is_rp() => Some(Connection::Sink {
            polarity: CcPin::Cc1,
        }),
        (Open, rp) if rp.is_rp() => Some(Connection::Sink {
            polarity: CcPin::Cc2,
        }),
        (Ra, Ra) => Some(Connection::AudioAccessory),
        (Ra, Open) | (Open, Ra) => Some(Connection::AudioDetached),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn termination_depends_on_presented_pull() {
        assert_eq!(termination(0b01, true), CcTermination::RpDefault);
        assert_eq!(termination(0b10, true), CcTermination::Rp1_5);
        assert_eq!(termination(0b11, true), CcTermination::Rp3_0);
        assert_eq!(termination(0b00, true), CcTermination::Open);

        assert_eq!(termination(0b01, false), CcTermination::Ra);
        assert_eq!(termination(0b10, false), CcTermination::Rd);
        assert_eq!(termination(0b11, false), CcTermination::Open);
    }

    #[test]
    fn open_open_is_unattached() {
        assert_eq!(
            classify(CcTermination::Open, CcTermination::Open),
            Some(Connection::Unattached)
        );
    }

    #[test]
    fn rd_wins_over_ra_and_sets_polarity() {
        assert_eq!(
            classify(CcTermination::Rd, CcTermination::Open),
            Some(Connection::Source {
                polarity: CcPin::Cc1,
                vconn: false
            })
        );
        assert_eq!(
            classify(CcTermination::Ra, CcTermination::Rd),
            Some(Connection::Source {
                polarity: CcPin::Cc2,
                vconn: true
            })
        );
    }

    #[test]
    fn rp_with_open_other_pin_is_sink() {
        assert_eq!(
            classify(CcTermination::RpDefault, CcTermination::Open),
            Some(Connection::Sink {
                polarity: CcPin::Cc1
            })
        );
        assert_eq!(
            classify(CcTermination::Open, CcTermination::Rp3_0),
            Some(Connection::Sink {
                polarity: CcPin::Cc2
            })
        );
    }

    #[test]
    fn audio_accessory_states() {
        assert_eq!(
            classify(CcTermination::Ra, CcTermination::Ra),
            Some(Connection::AudioAccessory)
        );
        assert_eq!(
            classify(CcTermination::Ra, CcTermination::Open),
            Some(Connection::AudioDetached)
        );
        assert_eq!(
            classify(CcTermination::Open, CcTermination::Ra),
            Some(Connection::AudioDetached)
        );
    }

    #[test]
    fn undefined_combinations_are_rejected() {
        assert_eq!(classify(CcTermination::Rd, CcTermination::Rd), None);
        assert_eq!(
            classify(CcTermination::RpDefault, CcTermination::Ra),
            None
        );
        assert_eq!(
            classify(CcTermination::Rp1_5, CcTermination::Rp3_0),
            None
        );
    }
}
