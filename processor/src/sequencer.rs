use apb_script_core::{
    BusTransaction, CommandWord, DataWidth, OpHeader, ReadData, ResponseState, Retirement,
    ScriptCommand, ScriptRegister, ScriptResponse, TransferHeader,
};

use crate::{ApbTarget, BusMaster, CommandUnpacker, ScriptError, ScriptOptions};

// SEQUENCER STATE
// ================================================================================================

/// The operation being executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Read {
        address: u32,
        width: DataWidth,
        remaining: u8,
        increment: bool,
    },
    Write {
        address: u32,
        width: DataWidth,
        remaining: u8,
        increment: bool,
    },
    Poll {
        address: u32,
        bit: u8,
        until_set: bool,
        attempts: u32,
        budget: u32,
        /// Idle cycles left before the next attempt.
        delay: u32,
    },
}

impl Operation {
    /// Returns the number of operand bytes this operation still has to take from the queue.
    fn bytes_needed(&self) -> usize {
        match self {
            Self::Write { width, remaining, .. } => *remaining as usize * width.bytes(),
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    /// A run was started; the next operation header is expected.
    AwaitingHeader,
    Executing(Operation),
    /// The input is exhausted and every transaction has retired.
    Completing,
    /// The run failed while a transaction was outstanding. The transaction is carried to
    /// retirement before the terminal state is reported.
    Draining(ResponseState),
    /// A terminal state, reported for exactly one cycle.
    Terminal(ResponseState),
}

impl State {
    fn response_state(&self) -> ResponseState {
        match self {
            Self::Idle => ResponseState::Idle,
            Self::AwaitingHeader | Self::Executing(_) | Self::Completing | Self::Draining(_) => {
                ResponseState::Running
            },
            Self::Terminal(state) => *state,
        }
    }
}

/// Registers loaded by `set` operations. They persist across runs started with `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Registers {
    address_high: u32,
    poll_delay: u32,
    poll_count: u32,
}

impl Registers {
    fn new(options: &ScriptOptions) -> Self {
        Self {
            address_high: 0,
            poll_delay: options.poll_delay(),
            poll_count: options.poll_count(),
        }
    }

    fn set(&mut self, register: ScriptRegister, value: u8) {
        let shift = register.shift();
        let target = match register {
            ScriptRegister::AddressByte(_) => &mut self.address_high,
            ScriptRegister::PollDelay(_) => &mut self.poll_delay,
            ScriptRegister::PollCount(_) => &mut self.poll_count,
        };
        *target = (*target & !(0xff << shift)) | (u32::from(value) << shift);
    }

    fn address(&self, low: u8) -> u32 {
        (self.address_high & !0xff) | u32::from(low)
    }
}

// SEQUENCER
// ================================================================================================

/// The transaction sequencer: executes scripts presented one command word per cycle.
///
/// Every call to [Sequencer::step] models one clock cycle, which proceeds in this order:
/// 1. a terminal state reported in the previous cycle returns to idle;
/// 2. the bus is driven for one cycle, retiring the outstanding transaction once the target is
///    ready;
/// 3. the presented command word is unpacked and accepted;
/// 4. the sequencer makes one decision: decode a header, apply a `set`, issue a transaction or
///    finish the run.
#[derive(Debug)]
pub struct Sequencer {
    options: ScriptOptions,
    state: State,
    unpacker: CommandUnpacker,
    bus: BusMaster,
    registers: Registers,
    last_error: Option<ScriptError>,
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new(ScriptOptions::default())
    }
}

impl Sequencer {
    // CONSTRUCTOR
    // --------------------------------------------------------------------------------------------

    pub fn new(options: ScriptOptions) -> Self {
        Self {
            options,
            state: State::Idle,
            unpacker: CommandUnpacker::new(),
            bus: BusMaster::new(),
            registers: Registers::new(&options),
            last_error: None,
        }
    }

    // PUBLIC ACCESSORS
    // --------------------------------------------------------------------------------------------

    /// Returns the state reported by the most recent cycle.
    pub fn state(&self) -> ResponseState {
        self.state.response_state()
    }

    /// Returns true if no run is in progress or being reported.
    pub fn is_idle(&self) -> bool {
        self.state == State::Idle
    }

    /// Returns the error which ended the most recent unsuccessful run.
    ///
    /// The error is kept until it is replaced by a later error or cleared by `start-clear`.
    pub fn last_error(&self) -> Option<ScriptError> {
        self.last_error
    }

    /// Returns true if the sequencer can take a new command word this cycle, i.e. no bus
    /// transaction is outstanding.
    pub fn can_accept(&self) -> bool {
        self.bus.is_idle() && !matches!(self.state, State::Draining(_))
    }

    /// Returns the number of bus transactions issued since the sequencer was created.
    pub fn transactions_issued(&self) -> usize {
        self.bus.issued()
    }

    pub fn options(&self) -> &ScriptOptions {
        &self.options
    }

    // STEPPING
    // --------------------------------------------------------------------------------------------

    /// Executes one cycle with `word` presented on the request channel.
    pub fn step(&mut self, word: CommandWord, target: &mut impl ApbTarget) -> ScriptResponse {
        self.unpacker.tick();
        if let State::Terminal(_) = self.state {
            self.state = State::Idle;
        }

        let mut response = ScriptResponse::default();
        if let Some((transaction, retirement)) = self.bus.drive(target) {
            response.result = self.retire(transaction, retirement);
        }

        if !matches!(self.state, State::Terminal(_) | State::Draining(_)) {
            response.bytes_consumed = self.accept(word);
        }

        match self.state {
            State::AwaitingHeader => self.next_operation(),
            State::Executing(operation) => self.execute(operation),
            State::Completing => self.finish(ResponseState::Completed, None),
            State::Idle | State::Draining(_) | State::Terminal(_) => {},
        }

        response.state = self.state.response_state();
        response
    }

    /// Handles the outcome of a retired transaction and returns the data to report, if any.
    fn retire(&mut self, transaction: BusTransaction, retirement: Retirement) -> Option<ReadData> {
        // the error which started draining stands, whatever the outcome
        if let State::Draining(state) = self.state {
            tracing::trace!(%transaction, %state, "drained");
            self.state = State::Terminal(state);
            return None;
        }
        if retirement == Retirement::Fault {
            let error = ScriptError::BusFault {
                address: transaction.address,
                write: transaction.is_write(),
            };
            self.finish(ResponseState::Errored, Some(error));
            return None;
        }

        let State::Executing(operation) = &mut self.state else {
            return None;
        };
        match (operation, retirement) {
            (Operation::Read { width, remaining, .. }, Retirement::Read(value)) => {
                let data = ReadData { width: *width, value: value & width.mask() };
                if *remaining == 0 {
                    self.state = State::AwaitingHeader;
                }
                Some(data)
            },
            (Operation::Write { remaining, .. }, Retirement::Written) => {
                if *remaining == 0 {
                    self.state = State::AwaitingHeader;
                }
                None
            },
            (
                Operation::Poll {
                    address,
                    bit,
                    until_set,
                    attempts,
                    budget,
                    delay,
                },
                Retirement::Read(value),
            ) => {
                if ((value >> *bit) & 1 == 1) == *until_set {
                    tracing::debug!(address = *address, attempts = *attempts, "poll satisfied");
                    self.state = State::AwaitingHeader;
                } else if *attempts >= *budget {
                    let error = ScriptError::PollExhausted { address: *address, attempts: *attempts };
                    self.finish(ResponseState::PollFailed, Some(error));
                } else {
                    *delay = self.registers.poll_delay;
                }
                None
            },
            _ => None,
        }
    }

    /// Accepts the presented command word and returns the number of operand bytes taken.
    fn accept(&mut self, word: CommandWord) -> u8 {
        let command = match CommandUnpacker::unpack(word) {
            Ok(command) => command,
            Err(err) => {
                self.finish(ResponseState::Errored, Some(err.into()));
                return 0;
            },
        };

        match (command, self.state) {
            (ScriptCommand::Idle, _) => 0,
            (ScriptCommand::Start | ScriptCommand::StartClear, State::Idle) => {
                if command == ScriptCommand::StartClear {
                    self.registers = Registers::new(&self.options);
                    self.last_error = None;
                }
                tracing::debug!(?command, "script started");
                self.unpacker.reset();
                self.state = State::AwaitingHeader;
                0
            },
            (ScriptCommand::Start | ScriptCommand::StartClear, _) => {
                self.finish(ResponseState::Errored, Some(ScriptError::UnexpectedStart));
                0
            },
            (ScriptCommand::Data(_) | ScriptCommand::DataLast(_), State::Idle) => {
                self.finish(ResponseState::Errored, Some(ScriptError::NotStarted));
                0
            },
            (ScriptCommand::Data(payload), _) => self.unpacker.take(&payload, false),
            (ScriptCommand::DataLast(payload), _) => self.unpacker.take(&payload, true),
        }
    }

    /// Decodes the next operation header once enough bytes are queued.
    fn next_operation(&mut self) {
        if self.unpacker.input_closed() && self.unpacker.is_empty() {
            self.state = State::Completing;
            return;
        }
        let Some(bytes) = self.unpacker.pop::<{ OpHeader::SIZE }>() else {
            if self.unpacker.input_closed() {
                self.finish(ResponseState::Errored, Some(ScriptError::IncompleteOperation));
            }
            return;
        };

        let header = match OpHeader::decode(bytes) {
            Ok(header) => header,
            Err(err) => {
                self.finish(ResponseState::Errored, Some(err.into()));
                return;
            },
        };
        tracing::debug!(?header, "decoded operation");

        let operation = match header {
            OpHeader::Set { register, value } => {
                self.registers.set(register, value);
                return;
            },
            OpHeader::Poll { address, bit, until_set } => Operation::Poll {
                address: self.registers.address(address),
                bit,
                until_set,
                attempts: 0,
                budget: self.registers.poll_count.max(1),
                delay: 0,
            },
            OpHeader::Read(TransferHeader { address, width, count, increment }) => {
                Operation::Read {
                    address: self.registers.address(address),
                    width,
                    remaining: count,
                    increment,
                }
            },
            OpHeader::Write(TransferHeader { address, width, count, increment }) => {
                Operation::Write {
                    address: self.registers.address(address),
                    width,
                    remaining: count,
                    increment,
                }
            },
        };
        self.state = State::Executing(operation);
    }

    /// Advances the operation in progress by at most one transaction.
    fn execute(&mut self, mut operation: Operation) {
        if self.unpacker.input_closed() && self.unpacker.len() < operation.bytes_needed() {
            self.finish(ResponseState::Errored, Some(ScriptError::IncompleteOperation));
            return;
        }
        if !self.bus.is_idle() {
            return;
        }

        let stride = self.options.address_stride();
        match &mut operation {
            Operation::Read { address, remaining, increment, .. } => {
                if *remaining == 0 {
                    return;
                }
                self.bus.issue(BusTransaction::read(*address));
                advance(address, remaining, *increment, stride);
            },
            Operation::Write { address, width, remaining, increment } => {
                if *remaining == 0 {
                    return;
                }
                let Some(data) = self.unpacker.pop_le(width.bytes()) else {
                    return;
                };
                self.bus.issue(BusTransaction::write(*address, data));
                advance(address, remaining, *increment, stride);
            },
            Operation::Poll { address, attempts, delay, .. } => {
                if *delay > 0 {
                    *delay -= 1;
                } else {
                    self.bus.issue(BusTransaction::read(*address));
                    *attempts += 1;
                }
            },
        }
        self.state = State::Executing(operation);
    }

    /// Ends the run with `state`.
    ///
    /// The terminal state is entered at once if the bus is idle. Otherwise the outstanding
    /// transaction is kept on the bus and the state is reported once it retires.
    fn finish(&mut self, state: ResponseState, error: Option<ScriptError>) {
        if let State::Draining(_) = self.state {
            return;
        }
        match error {
            Some(error) => {
                tracing::warn!(%state, %error, "script failed");
                self.last_error = Some(error);
            },
            None => tracing::debug!(%state, "script finished"),
        }
        self.unpacker.reset();
        self.state = if self.bus.is_idle() {
            State::Terminal(state)
        } else {
            State::Draining(state)
        };
    }
}

fn advance(address: &mut u32, remaining: &mut u8, increment: bool, stride: u32) {
    *remaining -= 1;
    if increment {
        *address = address.wrapping_add(stride);
    }
}
