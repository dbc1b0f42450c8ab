use alloc::{
    collections::{BTreeMap, BTreeSet, VecDeque},
    vec::Vec,
};

use apb_script_core::{Access, ApbRequest, ApbResponse, BusTransaction};

// APB TARGET
// ================================================================================================

/// A peripheral attached to the bus.
///
/// The engine calls [ApbTarget::access] exactly once per cycle with the request it drives. The
/// returned response is only sampled during access cycles; for idle and setup cycles it is
/// ignored.
pub trait ApbTarget {
    fn access(&mut self, request: &ApbRequest) -> ApbResponse;
}

impl<T: ApbTarget + ?Sized> ApbTarget for &mut T {
    fn access(&mut self, request: &ApbRequest) -> ApbResponse {
        (**self).access(request)
    }
}

// MEMORY TARGET
// ================================================================================================

/// A word-per-address memory which answers every access cycle.
///
/// Each transaction is held for a configurable number of wait states before it completes.
/// Addresses registered as faulting complete with an error and leave memory unchanged. Reads of
/// addresses never written return zero.
#[derive(Debug, Default)]
pub struct MemoryTarget {
    memory: BTreeMap<u32, u32>,
    scripted_reads: BTreeMap<u32, VecDeque<u32>>,
    faults: BTreeSet<u32>,
    wait_states: u32,
    waited: u32,
    log: Vec<(BusTransaction, bool)>,
}

impl MemoryTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of access cycles each transaction is held before it completes.
    pub fn with_wait_states(mut self, wait_states: u32) -> Self {
        self.wait_states = wait_states;
        self
    }

    /// Makes every transaction addressing `address` complete with an error.
    pub fn with_fault(mut self, address: u32) -> Self {
        self.faults.insert(address);
        self
    }

    pub fn store(&mut self, address: u32, value: u32) {
        self.memory.insert(address, value);
    }

    /// Makes the next reads of `address` return `values` in order. Once they are used up, the
    /// last one stays in memory.
    pub fn script_reads(&mut self, address: u32, values: impl IntoIterator<Item = u32>) {
        self.scripted_reads.entry(address).or_default().extend(values);
    }

    pub fn load(&self, address: u32) -> u32 {
        self.memory.get(&address).copied().unwrap_or(0)
    }

    /// Returns the completed transactions in completion order, each with a flag telling whether
    /// it faulted.
    pub fn log(&self) -> &[(BusTransaction, bool)] {
        &self.log
    }

    /// Returns the successfully completed transactions in completion order.
    pub fn transactions(&self) -> impl Iterator<Item = &BusTransaction> {
        self.log.iter().filter(|(_, faulted)| !faulted).map(|(transaction, _)| transaction)
    }

    fn complete(&mut self, transaction: BusTransaction) -> ApbResponse {
        if self.faults.contains(&transaction.address) {
            self.log.push((transaction, true));
            return ApbResponse::error();
        }
        self.log.push((transaction, false));
        match transaction.access {
            Access::Read => {
                if let Some(value) = self
                    .scripted_reads
                    .get_mut(&transaction.address)
                    .and_then(VecDeque::pop_front)
                {
                    self.memory.insert(transaction.address, value);
                }
                ApbResponse::ready(self.load(transaction.address))
            },
            Access::Write(data) => {
                self.memory.insert(transaction.address, data);
                ApbResponse::ready(0)
            },
        }
    }
}

impl ApbTarget for MemoryTarget {
    fn access(&mut self, request: &ApbRequest) -> ApbResponse {
        let Some(transaction) = request.transaction() else {
            return ApbResponse::wait();
        };
        if !request.is_access() {
            self.waited = 0;
            return ApbResponse::wait();
        }
        if self.waited < self.wait_states {
            self.waited += 1;
            return ApbResponse::wait();
        }
        self.waited = 0;
        self.complete(transaction)
    }
}

// TESTS
// ================================================================================================
