//! Event intake: the interrupt handler defers all register traffic to a
//! single task-context slot.
//!
//! The interrupt line is level triggered, so the handler masks it and
//! marks the slot; the task drains the chip and unmasks the line when
//! done. At most one run is ever queued, further interrupts while a run
//! is pending collapse into it.

/// Masking control for the port controller's interrupt line.
pub trait IrqControl {
    fn disable(&mut self);
    fn enable(&mut self);
}

/// Single-slot deferred work marker.
#[derive(Debug, Default)]
pub struct TaskSlot {
    pending: bool,
}

impl TaskSlot {
    pub const fn new() -> Self {
        Self { pending: false }
    }

    /// Mark the slot; returns false when a run was already queued.
    pub fn schedule(&mut self) -> bool {
        !core::mem::replace(&mut self.pending, true)
    }

    /// Claim the pending run, clearing the slot.
    pub fn take(&mut self) -> bool {
        core::mem::replace(&mut self.pending, false)
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_is_idempotent() {
        let mut slot = TaskSlot::new();
        assert!(!slot.is_pending());
        assert!(slot.schedule());
        assert!(!slot.schedule());
        assert!(slot.is_pending());
    }

    #[test]
    fn take_claims_exactly_one_run() {
        let mut slot = TaskSlot::new();
        assert!(!slot.take());

        slot.schedule();
        slot.schedule();
        assert!(slot.take());
        assert!(!slot.take());
        assert!(!slot.is_pending());
    }
}
