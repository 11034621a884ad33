//! Mock bus, delay and interrupt line for driver tests.

use {
    crate::registers::Register,
    embedded_hal::blocking::{
        delay::DelayUs,
        i2c::{Write, WriteRead},
    },
    std::collections::VecDeque,
};

/// In-memory register file behind the I2C traits.
///
/// Reads of the ALERT register pop from `alert_script` while it has
/// entries, so tests can feed the driver a sequence of alert states.
/// Writes to ALERT clear bits in the backing store, matching the
/// write-one-to-clear hardware; every read and write is also recorded.
pub struct MockBus {
    pub regs: [u8; 256],
    pub writes: Vec<(u8, Vec<u8>)>,
    pub reads: Vec<u8>,
    pub alert_script: VecDeque<u16>,
}

impl MockBus {
    pub fn new() -> Self {
        Self {
            regs: [0; 256],
            writes: Vec::new(),
            reads: Vec::new(),
            alert_script: VecDeque::new(),
        }
    }

    pub fn set8(&mut self, reg: u8, value: u8) {
        self.regs[reg as usize] = value;
    }

    pub fn set16(&mut self, reg: u8, value: u16) {
        self.regs[reg as usize..reg as usize + 2].copy_from_slice(&value.to_le_bytes());
    }

    pub fn push_alert(&mut self, alert: u16) {
        self.alert_script.push_back(alert);
    }

    /// Payloads of every write to `reg`, in order, register byte stripped.
    pub fn writes_to(&self, reg: u8) -> Vec<Vec<u8>> {
        self.writes
            .iter()
            .filter(|(r, _)| *r == reg)
            .map(|(_, data)| data.clone())
            .collect()
    }

    /// Opcodes written to the COMMAND register, in order.
    pub fn commands(&self) -> Vec<u8> {
        self.writes_to(Register::Command as u8)
            .iter()
            .map(|data| data[0])
            .collect()
    }
}

impl Write for MockBus {
    type Error = ();

    fn write(&mut self, _addr: u8, bytes: &[u8]) -> Result<(), ()> {
        let reg = bytes[0];
        let data = bytes[1..].to_vec();

        if reg == Register::Alert as u8 && data.len() == 2 {
            let mask = u16::from_le_bytes([data[0], data[1]]);
            let current = u16::from_le_bytes([
                self.regs[reg as usize],
                self.regs[reg as usize + 1],
            ]);
            let cleared = current & !mask;
            self.regs[reg as usize..reg as usize + 2].copy_from_slice(&cleared.to_le_bytes());
        } else {
            for (i, byte) in data.iter().enumerate() {
                self.regs[reg as usize + i] = *byte;
            }
        }

        self.writes.push((reg, data));
        Ok(())
    }
}

impl WriteRead for MockBus {
    type Error = ();

    fn write_read(&mut self, _addr: u8, bytes: &[u8], buffer: &mut [u8]) -> Result<(), ()> {
        let reg = bytes[0];
        self.reads.push(reg);

        if reg == Register::Alert as u8 && buffer.len() == 2 {
            if let Some(alert) = self.alert_script.pop_front() {
                buffer.copy_from_slice(&alert.to_le_bytes());
                return Ok(());
            }
        }

        let start = reg as usize;
        buffer.copy_from_slice(&self.regs[start..start + buffer.len()]);
        Ok(())
    }
}

/// Bus whose every transaction fails.
pub struct FailingBus;

impl Write for FailingBus {
    type Error = ();

    fn write(&mut self, _addr: u8, _bytes: &[u8]) -> Result<(), ()> {
        Err(())
    }
}

impl WriteRead for FailingBus {
    type Error = ();

    fn write_read(&mut self, _addr: u8, _bytes: &[u8], _buffer: &mut [u8]) -> Result<(), ()> {
        Err(())
    }
}

pub struct NoopDelay;

impl DelayUs<u32> for NoopDelay {
    fn delay_us(&mut self, _us: u32) {}
}

#[derive(Default)]
pub struct MockIrq {
    pub disabled: usize,
    pub enabled: usize,
}

impl crate::intake::IrqControl for MockIrq {
    fn disable(&mut self) {
        self.disabled += 1;
    }

    fn enable(&mut self) {
        self.enabled += 1;
    }
}
