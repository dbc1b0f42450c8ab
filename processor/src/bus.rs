use apb_script_core::{ApbRequest, BusTransaction, Retirement};

use crate::ApbTarget;

// BUS MASTER
// ================================================================================================

/// Phase of the single transaction the master may have outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Setup(BusTransaction),
    Access(BusTransaction),
}

/// Drives the bus for one transaction at a time.
///
/// A transaction handed to [BusMaster::issue] is presented in its setup phase on the next cycle,
/// then in its access phase until the target reports ready.
#[derive(Debug)]
pub struct BusMaster {
    phase: Phase,
    issued: usize,
}

impl Default for BusMaster {
    fn default() -> Self {
        Self { phase: Phase::Idle, issued: 0 }
    }
}

impl BusMaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if no transaction is outstanding.
    pub fn is_idle(&self) -> bool {
        self.phase == Phase::Idle
    }

    /// Returns the number of transactions issued since the master was created.
    pub fn issued(&self) -> usize {
        self.issued
    }

    /// Queues `transaction` for the next cycle.
    ///
    /// Returns false, leaving the bus unchanged, if a transaction is already outstanding.
    pub fn issue(&mut self, transaction: BusTransaction) -> bool {
        if !self.is_idle() {
            return false;
        }
        tracing::trace!(%transaction, "issue");
        self.phase = Phase::Setup(transaction);
        self.issued += 1;
        true
    }

    /// Presents the current phase to `target` for one cycle.
    ///
    /// Returns the outstanding transaction together with its outcome on the cycle it retires.
    pub fn drive(
        &mut self,
        target: &mut impl ApbTarget,
    ) -> Option<(BusTransaction, Retirement)> {
        match self.phase {
            Phase::Idle => {
                target.access(&ApbRequest::idle());
                None
            },
            Phase::Setup(transaction) => {
                target.access(&transaction.setup_request());
                self.phase = Phase::Access(transaction);
                None
            },
            Phase::Access(transaction) => {
                let response = target.access(&transaction.access_request());
                match transaction.retire(&response) {
                    Retirement::Pending => None,
                    retirement => {
                        tracing::trace!(%transaction, ?retirement, "retire");
                        self.phase = Phase::Idle;
                        Some((transaction, retirement))
                    },
                }
            },
        }
    }
}

// TESTS
// ================================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryTarget;

    #[test]
    fn transaction_takes_setup_and_access_cycles() {
        let mut target = MemoryTarget::new().with_wait_states(1);
        target.store(0x40, 0x1234);
        let mut bus = BusMaster::new();

        assert!(bus.issue(BusTransaction::read(0x40)));
        assert!(!bus.issue(BusTransaction::read(0x44)));

        assert_eq!(bus.drive(&mut target), None); // setup
        assert_eq!(bus.drive(&mut target), None); // wait state
        assert_eq!(
            bus.drive(&mut target),
            Some((BusTransaction::read(0x40), Retirement::Read(0x1234)))
        );
        assert!(bus.is_idle());
        assert_eq!(bus.issued(), 1);
    }

    #[test]
    fn faulting_target_retires_with_fault() {
        let mut target = MemoryTarget::new().with_fault(0x10);
        let mut bus = BusMaster::new();

        bus.issue(BusTransaction::write(0x10, 1));
        bus.drive(&mut target);
        assert_eq!(
            bus.drive(&mut target),
            Some((BusTransaction::write(0x10, 1), Retirement::Fault))
        );
        assert_eq!(target.load(0x10), 0);
    }
}
