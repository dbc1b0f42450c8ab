// SCRIPT OPTIONS
// ================================================================================================

/// Parameters of the script engine and of the run helpers which drive it.
///
/// - `poll_count` and `poll_delay` are the values the poll registers take after a `start-clear`.
/// - `address_stride` is added to the transaction address after each transaction of an
///   incrementing read or write.
/// - `max_cycles` bounds the number of cycles a run helper steps the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptOptions {
    poll_count: u32,
    poll_delay: u32,
    address_stride: u32,
    max_cycles: u32,
}

impl Default for ScriptOptions {
    fn default() -> Self {
        ScriptOptions {
            poll_count: Self::DEFAULT_POLL_COUNT,
            poll_delay: 0,
            address_stride: 1,
            max_cycles: Self::DEFAULT_MAX_CYCLES,
        }
    }
}

impl ScriptOptions {
    // CONSTANTS
    // --------------------------------------------------------------------------------------------

    /// The maximum number of cycles a run is allowed to take.
    pub const MAX_CYCLES: u32 = 1 << 29;

    /// The number of cycles a run is allowed to take unless configured otherwise.
    pub const DEFAULT_MAX_CYCLES: u32 = 1 << 20;

    pub const DEFAULT_POLL_COUNT: u32 = 1024;

    // CONSTRUCTOR
    // --------------------------------------------------------------------------------------------

    /// Creates a new instance of [ScriptOptions] from the specified parameters.
    ///
    /// If `max_cycles` is `None` the cycle limit is set to [Self::DEFAULT_MAX_CYCLES].
    ///
    /// # Errors
    /// Returns an error if `max_cycles` exceeds [Self::MAX_CYCLES] or `address_stride` is zero.
    pub fn new(
        poll_count: u32,
        poll_delay: u32,
        address_stride: u32,
        max_cycles: Option<u32>,
    ) -> Result<Self, OptionsError> {
        let max_cycles = max_cycles.unwrap_or(Self::DEFAULT_MAX_CYCLES);
        if max_cycles > Self::MAX_CYCLES {
            return Err(OptionsError::MaxCycleNumTooBig(max_cycles));
        }
        if address_stride == 0 {
            return Err(OptionsError::ZeroAddressStride);
        }
        Ok(ScriptOptions {
            poll_count,
            poll_delay,
            address_stride,
            max_cycles,
        })
    }

    /// Sets the number of poll attempts a `start-clear` loads into the poll count register.
    pub fn with_poll_count(mut self, poll_count: u32) -> Self {
        self.poll_count = poll_count;
        self
    }

    /// Sets the number of idle cycles a `start-clear` loads into the poll delay register.
    pub fn with_poll_delay(mut self, poll_delay: u32) -> Self {
        self.poll_delay = poll_delay;
        self
    }

    // PUBLIC ACCESSORS
    // --------------------------------------------------------------------------------------------

    pub fn poll_count(&self) -> u32 {
        self.poll_count
    }

    pub fn poll_delay(&self) -> u32 {
        self.poll_delay
    }

    pub fn address_stride(&self) -> u32 {
        self.address_stride
    }

    /// Returns the maximum number of cycles a run helper steps the engine.
    pub fn max_cycles(&self) -> u32 {
        self.max_cycles
    }
}

// OPTIONS ERROR
// ================================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum OptionsError {
    #[error("maximum number of cycles {0} is greater than the allowed 2^29")]
    MaxCycleNumTooBig(u32),
    #[error("address stride must be non-zero")]
    ZeroAddressStride,
}

// TESTS
// ================================================================================================
