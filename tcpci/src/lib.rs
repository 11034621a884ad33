//! Driver for TCPCI USB Type-C port controllers such as the NXP PTN5110.
//!
//! The port controller sits on an I2C bus and raises a level-triggered
//! interrupt line. [`Tcpci::interrupt`] runs in interrupt context and only
//! masks the line and queues work; [`Tcpci::poll`] runs in task context,
//! drains the ALERT register, drives the CC state machine and a minimal
//! PD r2.0 engine, then unmasks the line.

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod cc;
pub mod intake;
pub mod registers;

#[cfg(test)]
mod testutil;

use {
    crate::{
        cc::{classify, termination, Connection},
        intake::{IrqControl, TaskSlot},
        registers::{
            Alert, AlertMask, CcPull, Command, MsgHeaderInfo, PowerControl, PowerStatusMask,
            Register, Registers, RoleControl, RxDetect, TcpcControl, Transmit, TxFrameType,
            MAX_BLOCK_LEN,
        },
    },
    byteorder::{ByteOrder, LittleEndian},
    embedded_hal::blocking::{
        delay::DelayUs,
        i2c::{Write, WriteRead},
    },
    heapless::Vec,
    usbpd::{
        header::{
            ControlMessageType, DataMessageType, Header, MessageType, SpecificationRevision,
        },
        message::{Message, PdFrame, MAX_PAYLOAD_WORDS},
        CcPin, DataRole, MessageId, PowerRole,
    },
};

/// Typical PTN5110 slave address.
pub const DEFAULT_ADDRESS: u8 = 0x52;

/// Retries granted to one logical transmission after its first attempt.
pub const TX_RETRY_BUDGET: u8 = 20;

/// Alert polls per transmit attempt before the attempt is written off.
pub const TX_POLL_ITERATIONS: usize = 1000;

/// Pause between transmit-completion polls.
pub const TX_POLL_DELAY_US: u32 = 10_000;

/// Reset value of VBUS_VOLTAGE_ALARM_LO_CFG.
pub const VBUS_ALARM_LO_DEFAULT: u16 = 0x001c;

/// VDM advertised to sinks once a contract is in place, so Apple devices
/// accept the port as a debug host.
pub const APPLE_VDM: [u32; 2] = [0x05ac_8012, 0x0182_0306];

/// Receive frames carry a byte count, a frame-type byte and a two-byte
/// header before any payload.
const RX_OVERHEAD: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// CC_STATUS reported a pin pair no Type-C state defines.
    InvalidCcCombination { cc: u8 },
}

/// Static port configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Capabilities offered when sourcing, as raw PDO words. Empty means
    /// capability requests are rejected.
    pub source_pdos: Vec<u32, MAX_PAYLOAD_WORDS>,
    /// Capabilities reported on GetSinkCap, as raw PDO words.
    pub sink_pdos: Vec<u32, MAX_PAYLOAD_WORDS>,
    /// Role the DRP toggle favours while unattached.
    pub try_data: DataRole,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_pdos: Vec::new(),
            sink_pdos: Vec::new(),
            try_data: DataRole::Dfp,
        }
    }
}

pub struct Tcpci<I2C, DELAY, IRQ> {
    pub(crate) registers: Registers<I2C>,
    delay: DELAY,
    irq: IRQ,
    task: TaskSlot,
    config: Config,
    attached: bool,
    data_role: DataRole,
    power_role: PowerRole,
    message_id: MessageId,
    last_tx: Option<PdFrame>,
    /// Raw CC_STATUS from the previous change, for debounce.
    last_cc: u8,
    vbus_present: bool,
}

impl<I2C, DELAY, IRQ> Tcpci<I2C, DELAY, IRQ>
where
    I2C: Write + WriteRead,
    DELAY: DelayUs<u32>,
    IRQ: IrqControl,
{
    pub fn new(i2c: I2C, addr: u8, delay: DELAY, irq: IRQ, config: Config) -> Self {
        Self {
            registers: Registers::new(i2c, addr),
            delay,
            irq,
            task: TaskSlot::new(),
            config,
            attached: false,
            data_role: DataRole::Ufp,
            power_role: PowerRole::Sink,
            message_id: MessageId::new(),
            last_tx: None,
            last_cc: 0,
            vbus_present: false,
        }
    }

    /// Destroys the driver, returning the bus handle.
    pub fn release(self) -> I2C {
        self.registers.release()
    }

    /// Brings the controller to its idle DRP state and unmasks the
    /// alerts the driver handles.
    pub fn init(&mut self) {
        self.registers.set_alert(Alert(0xffff));

        let fault = self.registers.fault_status();
        if fault.0 != 0 {
            self.registers.set_fault_status(fault);
        }

        self.registers
            .set_power_status_mask(PowerStatusMask(0).with_vbus_present(true));
        self.registers
            .set_power_control(PowerControl::default().with_disable_voltage_alarms(false));
        self.registers.set_alert_mask(
            AlertMask(0)
                .with_cc_status(true)
                .with_power_status(true)
                .with_rx_status(true)
                .with_rx_hard_reset(true)
                .with_vbus_alarm_lo(true)
                .with_fault(true)
                .with_rx_buffer_overflow(true),
        );
        self.registers.set_role_control(self.drp_role_control());
        self.registers.command(Command::Look4Connection);
    }

    /// Interrupt-context entry point. Masks the level-triggered line and
    /// queues a [`poll`](Self::poll) run; returns true so shared-line
    /// dispatchers know the interrupt was ours.
    pub fn interrupt(&mut self) -> bool {
        self.irq.disable();
        self.task.schedule();
        true
    }

    /// Task-context entry point. Drains the chip if a run is queued,
    /// then unmasks the interrupt line.
    pub fn poll(&mut self) -> Result<(), Error> {
        if !self.task.take() {
            return Ok(());
        }
        let result = self.process_alerts();
        self.irq.enable();
        result
    }

    fn process_alerts(&mut self) -> Result<(), Error> {
        let alert = self.registers.alert();
        if alert.0 == 0 {
            return Ok(());
        }

        // Acknowledge everything except RX_STATUS up front; that bit
        // must stay asserted until the receive buffer is drained.
        let ack = alert.with_rx_status(false);
        if ack.0 != 0 {
            self.registers.set_alert(ack);
        }

        if alert.cc_status() {
            self.cc_change()?;
        }
        if alert.power_status() {
            self.power_change();
        }
        if alert.rx_status() {
            self.rx_change();
        }
        if alert.rx_hard_reset() {
            info!("hard reset received");
            self.message_id.reset();
        }
        if alert.rx_buffer_overflow() {
            warn!("receive buffer overflow");
        }
        if alert.vbus_alarm_lo() {
            // Discharge after disconnect has completed.
            self.registers.write16(Register::VbusVoltageAlarmLoCfg, 0);
            let ctrl = self.registers.power_control();
            self.registers
                .set_power_control(ctrl.with_force_discharge(false));
        }
        if alert.fault() {
            let fault = self.registers.fault_status();
            warn!("fault status {:x}", fault.0);
            self.registers.set_fault_status(fault);
        }

        Ok(())
    }

    fn cc_change(&mut self) -> Result<(), Error> {
        let cc = self.registers.cc_status();
        if cc.0 == self.last_cc {
            return Ok(());
        }

        let presenting_rd = cc.connect_result();
        let cc1 = termination(cc.cc1_state(), presenting_rd);
        let cc2 = termination(cc.cc2_state(), presenting_rd);
        let connection =
            classify(cc1, cc2).ok_or(Error::InvalidCcCombination { cc: cc.0 })?;

        match connection {
            Connection::Unattached => {
                if self.attached {
                    info!("disconnected");
                }
                self.registers.set_rx_detect(RxDetect(0));
                self.set_vbus(false, false);
                self.set_vconn(false);
                self.set_polarity(CcPin::Cc1);
                self.registers.set_role_control(self.drp_role_control());
                self.registers.command(Command::Look4Connection);
                self.attached = false;
            }
            Connection::Source { polarity, vconn } => {
                info!("attached as source");
                self.message_id.reset();
                self.set_polarity(polarity);
                self.set_roles(DataRole::Dfp, PowerRole::Source);
                self.registers.set_rx_detect(RxDetect::all_frames());
                if vconn {
                    self.set_vconn(true);
                }
                self.set_vbus(true, false);
                self.attached = true;
            }
            Connection::Sink { polarity } => {
                info!("attached as sink");
                self.message_id.reset();
                self.set_polarity(polarity);
                let role = match polarity {
                    CcPin::Cc1 => RoleControl(0)
                        .with_cc1(CcPull::Rd)
                        .with_cc2(CcPull::Open),
                    CcPin::Cc2 => RoleControl(0)
                        .with_cc1(CcPull::Open)
                        .with_cc2(CcPull::Rd),
                };
                self.registers.set_role_control(role);
                self.set_roles(DataRole::Ufp, PowerRole::Sink);
                self.registers.set_rx_detect(RxDetect::all_frames());
                self.set_vbus(false, false);
                self.attached = true;
            }
            Connection::AudioAccessory => info!("audio accessory attached"),
            Connection::AudioDetached => info!("audio accessory detached"),
        }

        self.last_cc = cc.0;
        Ok(())
    }

    fn power_change(&mut self) {
        // The mask reverting to its all-ones reset value means the chip
        // lost and regained power behind our back.
        if self.registers.power_status_mask().0 == 0xff {
            info!("power status reset");
        }

        let present = self.registers.power_status().vbus_present();
        if present == self.vbus_present {
            return;
        }
        self.vbus_present = present;

        if present {
            info!("vbus present");
            // As the power provider, open negotiation once VBUS is up.
            if self.data_role == DataRole::Dfp {
                self.send_source_caps();
            }
        } else {
            info!("vbus removed");
        }
    }

    fn rx_change(&mut self) {
        let len = self.registers.read8(Register::RxByteCnt) as usize;
        if len < RX_OVERHEAD {
            warn!("short receive frame, {} bytes", len as u8);
            self.clear_rx_alert();
            return;
        }
        let payload_len = len - RX_OVERHEAD;
        if payload_len > MAX_BLOCK_LEN {
            warn!("oversized receive frame, {} bytes", len as u8);
            self.clear_rx_alert();
            return;
        }

        let frame_type = self.registers.read8(Register::RxBufFrameType) & 0x07;
        let header = Header(self.registers.read16(Register::RxHdr));
        let mut buf = [0u8; MAX_BLOCK_LEN];
        if payload_len > 0 {
            self.registers
                .read_block(Register::RxData, &mut buf[..payload_len]);
        }

        // Buffer drained, the controller may accept the next frame.
        self.clear_rx_alert();

        if TxFrameType::from(frame_type) != TxFrameType::Sop {
            debug!("ignoring frame type {}", frame_type);
            return;
        }

        let mut payload: Vec<u32, MAX_PAYLOAD_WORDS> = Vec::new();
        for chunk in buf[..payload_len].chunks_exact(4) {
            if payload.push(LittleEndian::read_u32(chunk)).is_err() {
                warn!("receive payload exceeds {} words", MAX_PAYLOAD_WORDS as u8);
                return;
            }
        }

        self.recv_message(&PdFrame { header, payload });
    }

    fn clear_rx_alert(&mut self) {
        self.registers.set_alert(Alert(0).with_rx_status(true));
    }

    fn recv_message(&mut self, frame: &PdFrame) {
        if frame.header.extended() {
            warn!("extended messages not supported");
            return;
        }

        match Message::parse(frame.header, &frame.payload) {
            Message::Control(control) => self.recv_ctrl(control),
            Message::SourceCapabilities(caps) => {
                info!("received {} source capabilities", caps.len() as u8);
                if self.power_role == PowerRole::Sink {
                    // Minimal policy: take the vSafe5V object as offered.
                    let request = usbpd::pdo::FixedVariableRequestDataObject(0)
                        .with_object_position(1)
                        .with_usb_communications_capable(true);
                    self.send_data(DataMessageType::Request, &[request.0]);
                }
            }
            Message::Request(request) => self.recv_request(frame.header, request),
            Message::VendorDefined(_) => warn!("unexpected vendor defined message"),
            Message::Unknown => warn!("unknown message"),
        }
    }

    fn recv_ctrl(&mut self, control: ControlMessageType) {
        match control {
            ControlMessageType::Accept => info!("request accepted"),
            ControlMessageType::Reject => info!("request rejected"),
            ControlMessageType::PsRdy => info!("power supply ready"),
            ControlMessageType::GetSourceCap => self.send_source_caps(),
            ControlMessageType::GetSinkCap => self.send_sink_caps(),
            _ => warn!("unhandled control message"),
        }
    }

    fn recv_request(
        &mut self,
        header: Header,
        request: usbpd::pdo::FixedVariableRequestDataObject,
    ) {
        if self.power_role != PowerRole::Source
            || header.num_objects() != 1
            || header.spec_revision() == SpecificationRevision::R1_0
        {
            self.send_control(ControlMessageType::Reject);
            return;
        }

        info!("granting request for object {}", request.object_position());
        self.send_control(ControlMessageType::Accept);
        self.send_control(ControlMessageType::PsRdy);
        self.send_data(DataMessageType::VendorDefined, &APPLE_VDM);
    }

    fn send_source_caps(&mut self) {
        if self.config.source_pdos.is_empty() {
            self.send_control(ControlMessageType::Reject);
            return;
        }
        let pdos = self.config.source_pdos.clone();
        self.send_data(DataMessageType::SourceCapabilities, &pdos);
    }

    fn send_sink_caps(&mut self) {
        if self.config.sink_pdos.is_empty() {
            self.send_control(ControlMessageType::Reject);
            return;
        }
        let pdos = self.config.sink_pdos.clone();
        self.send_data(DataMessageType::SinkCapabilities, &pdos);
    }

    fn send_control(&mut self, message_type: ControlMessageType) {
        self.send_message(message_type as u8, &[]);
    }

    fn send_data(&mut self, message_type: DataMessageType, payload: &[u32]) {
        self.send_message(message_type as u8, payload);
    }

    fn send_message(&mut self, message_type_raw: u8, payload: &[u32]) {
        let header = Header(0)
            .with_message_type_raw(message_type_raw)
            .with_num_objects(payload.len() as u8)
            .with_message_id(self.message_id.value())
            .with_spec_revision(SpecificationRevision::R2_0)
            .with_port_power_role(self.power_role)
            .with_port_data_role(self.data_role);

        let mut frame = PdFrame {
            header,
            payload: Vec::new(),
        };
        if frame.payload.extend_from_slice(payload).is_err() {
            warn!("transmit payload exceeds {} words", MAX_PAYLOAD_WORDS as u8);
            return;
        }

        self.last_tx = Some(frame);
        self.transmit_frame();
    }

    /// Pushes the retained frame into the transmit buffer and waits for a
    /// completion alert, resending on discard or failure until the retry
    /// budget is spent. The message counter only advances on success, so
    /// every resend reuses the same message id.
    fn transmit_frame(&mut self) {
        let frame = match self.last_tx.clone() {
            Some(frame) => frame,
            None => return,
        };

        let num_objects = frame.num_objects();
        let mut buf = [0u8; MAX_BLOCK_LEN];
        for (i, word) in frame.payload.iter().enumerate() {
            LittleEndian::write_u32(&mut buf[4 * i..4 * i + 4], *word);
        }

        // Vendor messages sent while hosting go out SOP''-debug, the
        // framing Apple debug accessories listen on.
        let frame_type = if num_objects > 0
            && frame.header.message_type() == MessageType::Data(DataMessageType::VendorDefined)
            && self.data_role == DataRole::Dfp
        {
            TxFrameType::SopDebugPrimePrime
        } else {
            TxFrameType::Sop
        };

        let mut retries = TX_RETRY_BUDGET;
        'attempt: loop {
            self.registers
                .write8(Register::TxByteCnt, (2 + 4 * num_objects) as u8);
            self.registers.write16(Register::TxHdr, frame.header.0);
            if num_objects > 0 {
                self.registers
                    .write_block(Register::TxData, &buf[..4 * num_objects]);
            }
            self.registers.set_transmit(
                Transmit(0).with_retry_count(0b11).with_frame_type(frame_type),
            );

            for _ in 0..TX_POLL_ITERATIONS {
                let alert = self.registers.alert();
                let done = Alert(0)
                    .with_tx_success(alert.tx_success())
                    .with_tx_discarded(alert.tx_discarded())
                    .with_tx_failed(alert.tx_failed());
                if done.0 != 0 {
                    self.registers.set_alert(done);
                }

                if alert.tx_success() {
                    self.message_id.advance();
                    return;
                }
                if alert.tx_discarded() || alert.tx_failed() {
                    if retries == 0 {
                        warn!("transmit abandoned after {} retries", TX_RETRY_BUDGET);
                        return;
                    }
                    retries -= 1;
                    self.delay.delay_us(TX_POLL_DELAY_US);
                    continue 'attempt;
                }

                self.delay.delay_us(TX_POLL_DELAY_US);
            }

            warn!("transmit completion never signalled");
            return;
        }
    }

    fn set_roles(&mut self, data: DataRole, power: PowerRole) {
        self.registers.set_msg_header_info(
            MsgHeaderInfo(0)
                .with_pd_revision(SpecificationRevision::R2_0)
                .with_data_role(data)
                .with_power_role(power),
        );
        match data {
            DataRole::Dfp => info!("entering host mode"),
            DataRole::Ufp => info!("entering device mode"),
        }
        self.data_role = data;
        self.power_role = power;
    }

    fn set_polarity(&mut self, pin: CcPin) {
        self.registers
            .set_tcpc_control(TcpcControl(0).with_plug_orientation(pin == CcPin::Cc2));
    }

    fn set_vconn(&mut self, enable: bool) {
        let ctrl = self.registers.power_control();
        self.registers
            .set_power_control(ctrl.with_vconn_enable(enable));
    }

    fn set_vbus(&mut self, source: bool, sink: bool) {
        if !source {
            self.registers.command(Command::DisableSourceVbus);
        }
        if !sink {
            self.registers.command(Command::DisableSinkVbus);
        }
        if !source && !sink {
            // Arm the low alarm and force a discharge; the alarm fires
            // once VBUS has collapsed and the handler disarms both.
            self.registers
                .write16(Register::VbusVoltageAlarmLoCfg, VBUS_ALARM_LO_DEFAULT);
            let ctrl = self.registers.power_control();
            self.registers
                .set_power_control(ctrl.with_force_discharge(true));
        }
        if source {
            self.registers.command(Command::SourceVbusDefault);
        }
        if sink {
            self.registers.command(Command::SinkVbus);
        }
    }

    fn drp_role_control(&self) -> RoleControl {
        match self.config.try_data {
            // Presenting Rd while toggling biases the DRP toward the
            // partner sourcing first; Rp biases it the other way.
            DataRole::Dfp => RoleControl(0)
                .with_drp(true)
                .with_cc1(CcPull::Rd)
                .with_cc2(CcPull::Rd),
            DataRole::Ufp => RoleControl(0)
                .with_drp(true)
                .with_cc1(CcPull::Rp)
                .with_cc2(CcPull::Rp),
        }
    }
}
