//! Wire representation of the APB bus and the codec between it and [BusTransaction].
//!
//! A transaction occupies the bus for one setup cycle (`psel` asserted, `penable` clear) followed
//! by one or more access cycles (`psel` and `penable` asserted). The transaction retires on the
//! first access cycle in which the target asserts `pready`; if `perr` is asserted in that cycle
//! the transaction is faulted.

use core::fmt;

// WIRE TYPES
// ================================================================================================

/// Request half of the APB bus, driven by the master.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ApbRequest {
    pub paddr: u32,
    pub penable: bool,
    pub psel: bool,
    pub pwrite: bool,
    pub pwdata: u32,
}

impl ApbRequest {
    /// Returns the request driven while no transaction is outstanding.
    pub const fn idle() -> Self {
        Self {
            paddr: 0,
            penable: false,
            psel: false,
            pwrite: false,
            pwdata: 0,
        }
    }

    /// Returns true if this request is in its access phase, i.e. the target must respond.
    pub const fn is_access(&self) -> bool {
        self.psel && self.penable
    }

    /// Decodes the transaction carried by this request, if the request selects a target.
    pub fn transaction(&self) -> Option<BusTransaction> {
        if !self.psel {
            return None;
        }
        let access = if self.pwrite {
            Access::Write(self.pwdata)
        } else {
            Access::Read
        };
        Some(BusTransaction { address: self.paddr, access })
    }
}

/// Response half of the APB bus, driven by the selected target.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ApbResponse {
    pub prdata: u32,
    pub pready: bool,
    pub perr: bool,
}

impl ApbResponse {
    /// A response which holds the bus in its current access cycle.
    pub const fn wait() -> Self {
        Self { prdata: 0, pready: false, perr: false }
    }

    /// A successful response carrying `prdata` (ignored by the master for writes).
    pub const fn ready(prdata: u32) -> Self {
        Self { prdata, pready: true, perr: false }
    }

    /// A response which completes the access with an error.
    pub const fn error() -> Self {
        Self { prdata: 0, pready: true, perr: true }
    }
}

// TRANSACTIONS
// ================================================================================================

/// Direction of a bus transaction; writes carry their data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write(u32),
}

/// A single-address bus transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusTransaction {
    pub address: u32,
    pub access: Access,
}

/// The result of presenting an access cycle of a transaction to the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retirement {
    /// The target has not asserted `pready` yet.
    Pending,
    /// A read retired with the returned data.
    Read(u32),
    /// A write retired.
    Written,
    /// The target asserted `perr`.
    Fault,
}

impl BusTransaction {
    pub const fn read(address: u32) -> Self {
        Self { address, access: Access::Read }
    }

    pub const fn write(address: u32, data: u32) -> Self {
        Self { address, access: Access::Write(data) }
    }

    pub const fn is_write(&self) -> bool {
        matches!(self.access, Access::Write(_))
    }

    /// Returns the request for the setup cycle of this transaction.
    ///
    /// Address, direction and write data are already stable in this cycle and stay unchanged
    /// through every access cycle that follows.
    pub const fn setup_request(&self) -> ApbRequest {
        let (pwrite, pwdata) = match self.access {
            Access::Read => (false, 0),
            Access::Write(data) => (true, data),
        };
        ApbRequest {
            paddr: self.address,
            penable: false,
            psel: true,
            pwrite,
            pwdata,
        }
    }

    /// Returns the request for an access cycle of this transaction.
    pub const fn access_request(&self) -> ApbRequest {
        let mut request = self.setup_request();
        request.penable = true;
        request
    }

    /// Interprets the target's response to an access cycle of this transaction.
    pub const fn retire(&self, response: &ApbResponse) -> Retirement {
        if !response.pready {
            return Retirement::Pending;
        }
        if response.perr {
            return Retirement::Fault;
        }
        match self.access {
            Access::Read => Retirement::Read(response.prdata),
            Access::Write(_) => Retirement::Written,
        }
    }
}

impl fmt::Display for BusTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.access {
            Access::Read => write!(f, "read {:#010x}", self.address),
            Access::Write(data) => write!(f, "write {:#010x} <- {data:#010x}", self.address),
        }
    }
}

// TESTS
// ================================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setup_and_access_carry_same_operands() {
        let tx = BusTransaction::write(0x1000_0004, 0xdead_beef);
        let setup = tx.setup_request();
        let access = tx.access_request();

        assert!(setup.psel && !setup.penable);
        assert!(access.is_access());
        assert_eq!((setup.paddr, setup.pwrite, setup.pwdata), (access.paddr, access.pwrite, access.pwdata));
        assert_eq!(access.transaction(), Some(tx));
    }

    #[test]
    fn idle_request_selects_nothing() {
        assert_eq!(ApbRequest::idle().transaction(), None);
        assert!(!ApbRequest::idle().is_access());
    }

    #[test]
    fn retire_follows_ready_and_error() {
        let read = BusTransaction::read(0x20);
        assert_eq!(read.retire(&ApbResponse::wait()), Retirement::Pending);
        assert_eq!(read.retire(&ApbResponse::ready(7)), Retirement::Read(7));
        assert_eq!(read.retire(&ApbResponse::error()), Retirement::Fault);

        let write = BusTransaction::write(0x20, 1);
        assert_eq!(write.retire(&ApbResponse::ready(7)), Retirement::Written);
        // an error without ready is still a wait state
        let not_ready = ApbResponse { prdata: 0, pready: false, perr: true };
        assert_eq!(write.retire(&not_ready), Retirement::Pending);
    }
}
