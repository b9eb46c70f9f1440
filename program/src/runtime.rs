// Proxied Lottery - Host Runtime
//
// In-process host ledger.
//
// Accounts hold lamports, optional code and a namespaced Storage. The
// runtime serializes calls into atomic transactions: every call frame
// (top-level instruction, invoke, delegate call, value transfer hook) either
// commits all of its effects or none of them.
use std::{collections::BTreeMap, fmt, rc::Rc};

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    clock::{Clock, UnixTimestamp},
    entrypoint::ProgramResult,
    hash::{hashv, Hash},
    instruction::Instruction,
    msg,
    program_error::ProgramError,
    pubkey::Pubkey,
};

use crate::{
    error::LotteryError,
    event::Event,
    storage::{Namespace, Storage, StorageKey},
    utils,
};

pub const DEFAULT_GENESIS_TIMESTAMP: UnixTimestamp = 1_700_000_000;
pub const DEFAULT_MAX_CALL_DEPTH: usize = 16;

/// Capability advertised by a program's code
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InterfaceId(pub [u8; 8]);

/// Code that can be attached to an account
pub trait Program {
    /// Bytes fingerprinted for deterministic addresses
    fn code(&self) -> &'static [u8];

    /// Storage namespace this code writes to
    fn namespace(&self) -> Namespace;

    fn supports_interface(&self, _interface: &InterfaceId) -> bool {
        false
    }

    fn process(&self, ctx: &mut InvokeContext, input: &[u8]) -> Result<Vec<u8>, ProgramError>;

    /// Runs when lamports are transferred to the account holding this code
    fn receive(&self, _ctx: &mut InvokeContext) -> ProgramResult {
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct Account {
    pub lamports: u64,
    pub code: Option<Rc<dyn Program>>,
    pub storage: Storage,
}

impl Account {
    /// No code and no storage; lamports alone do not occupy an address
    pub fn is_vacant(&self) -> bool {
        self.code.is_none() && self.storage.is_empty()
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("lamports", &self.lamports)
            .field(
                "code",
                &self
                    .code
                    .as_ref()
                    .map(|code| String::from_utf8_lossy(code.code()).into_owned()),
            )
            .field("storage_slots", &self.storage.len())
            .finish()
    }
}

#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    pub genesis_timestamp: UnixTimestamp,
    pub max_call_depth: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            genesis_timestamp: DEFAULT_GENESIS_TIMESTAMP,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Log {
    pub emitter: Pubkey,
    pub event: Event,
}

struct Snapshot {
    accounts: BTreeMap<Pubkey, Account>,
    nonces: BTreeMap<Pubkey, u64>,
    logs: usize,
}

pub struct Runtime {
    config: RuntimeConfig,
    clock: Clock,
    recent_blockhash: Hash,
    accounts: BTreeMap<Pubkey, Account>,
    nonces: BTreeMap<Pubkey, u64>,
    logs: Vec<Log>,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new(RuntimeConfig::default())
    }
}

impl Runtime {
    pub fn new(config: RuntimeConfig) -> Self {
        let clock = Clock {
            unix_timestamp: config.genesis_timestamp,
            epoch_start_timestamp: config.genesis_timestamp,
            ..Clock::default()
        };
        let recent_blockhash = hashv(&[b"genesis", &config.genesis_timestamp.to_le_bytes()]);
        Self {
            config,
            clock,
            recent_blockhash,
            accounts: BTreeMap::new(),
            nonces: BTreeMap::new(),
            logs: Vec::new(),
        }
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn recent_blockhash(&self) -> Hash {
        self.recent_blockhash
    }

    /// Advance wall-clock time by `seconds` and produce a new slot
    pub fn warp_forward(&mut self, seconds: u64) {
        let seconds = UnixTimestamp::try_from(seconds).unwrap_or(UnixTimestamp::MAX);
        self.clock.unix_timestamp = self.clock.unix_timestamp.saturating_add(seconds);
        self.advance_slot();
    }

    fn advance_slot(&mut self) {
        self.clock.slot = self.clock.slot.saturating_add(1);
        self.recent_blockhash = hashv(&[
            self.recent_blockhash.as_ref(),
            &self.clock.slot.to_le_bytes(),
        ]);
    }

    pub fn airdrop(&mut self, to: &Pubkey, lamports: u64) -> ProgramResult {
        let account = self.accounts.entry(*to).or_default();
        account.lamports = account
            .lamports
            .checked_add(lamports)
            .ok_or(LotteryError::ArithmeticOverflow)?;
        Ok(())
    }

    pub fn balance(&self, address: &Pubkey) -> u64 {
        self.accounts.get(address).map_or(0, |account| account.lamports)
    }

    pub fn account(&self, address: &Pubkey) -> Option<&Account> {
        self.accounts.get(address)
    }

    pub fn storage(&self, address: &Pubkey) -> Option<&Storage> {
        self.accounts.get(address).map(|account| &account.storage)
    }

    pub fn logs(&self) -> &[Log] {
        &self.logs
    }

    /// Events emitted with `emitter` as the executing account
    pub fn events(&self, emitter: &Pubkey) -> Vec<&Event> {
        self.logs
            .iter()
            .filter(|log| log.emitter == *emitter)
            .map(|log| &log.event)
            .collect()
    }

    /// Attach `code` to the next nonce-derived address of `deployer`
    pub fn deploy(&mut self, deployer: &Pubkey, code: Rc<dyn Program>) -> Result<Pubkey, ProgramError> {
        let nonce = self.nonces.get(deployer).copied().unwrap_or(0);
        let address = utils::derive_deploy_address(deployer, nonce)?;
        self.install_code(&address, code)?;
        self.nonces.insert(*deployer, nonce.saturating_add(1));
        Ok(address)
    }

    fn install_code(&mut self, address: &Pubkey, code: Rc<dyn Program>) -> ProgramResult {
        if self.accounts.get(address).map_or(false, |account| !account.is_vacant()) {
            msg!("Address {} is already occupied", address);
            return Err(LotteryError::AddressInUse.into());
        }
        msg!(
            "Deployed {} at {}",
            String::from_utf8_lossy(code.code()),
            address
        );
        self.accounts.entry(*address).or_default().code = Some(code);
        Ok(())
    }

    /// Execute a transaction; the caller is the first signer of `instruction`
    pub fn process_instruction(&mut self, instruction: &Instruction, value: u64) -> Result<Vec<u8>, ProgramError> {
        let caller = Self::signer(instruction)?;
        self.advance_slot();
        let result = self.call(&caller, &instruction.program_id, value, &instruction.data, 0);
        if let Err(err) = &result {
            match LotteryError::from_program_error(err) {
                Some(named) => msg!("Transaction failed: {:?} ({})", named, named),
                None => msg!("Transaction failed: {}", err),
            }
        }
        result
    }

    /// Execute without committing anything; used for read-only queries
    pub fn simulate(&mut self, instruction: &Instruction) -> Result<Vec<u8>, ProgramError> {
        let caller = Self::signer(instruction)?;
        let snapshot = self.snapshot();
        let result = self.call(&caller, &instruction.program_id, 0, &instruction.data, 0);
        self.restore(snapshot);
        result
    }

    fn signer(instruction: &Instruction) -> Result<Pubkey, ProgramError> {
        instruction
            .accounts
            .iter()
            .find(|meta| meta.is_signer)
            .map(|meta| meta.pubkey)
            .ok_or(ProgramError::MissingRequiredSignature)
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            accounts: self.accounts.clone(),
            nonces: self.nonces.clone(),
            logs: self.logs.len(),
        }
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.accounts = snapshot.accounts;
        self.nonces = snapshot.nonces;
        self.logs.truncate(snapshot.logs);
    }

    fn code_of(&self, address: &Pubkey) -> Option<Rc<dyn Program>> {
        self.accounts.get(address).and_then(|account| account.code.clone())
    }

    fn check_depth(&self, depth: usize) -> ProgramResult {
        if depth >= self.config.max_call_depth {
            msg!("Call depth {} exceeds limit {}", depth, self.config.max_call_depth);
            return Err(LotteryError::CallDepthExceeded.into());
        }
        Ok(())
    }

    fn move_lamports(&mut self, from: &Pubkey, to: &Pubkey, lamports: u64) -> ProgramResult {
        if lamports == 0 {
            return Ok(());
        }
        let source = self.accounts.entry(*from).or_default();
        source.lamports = source
            .lamports
            .checked_sub(lamports)
            .ok_or(ProgramError::InsufficientFunds)?;
        let destination = self.accounts.entry(*to).or_default();
        destination.lamports = destination
            .lamports
            .checked_add(lamports)
            .ok_or(LotteryError::ArithmeticOverflow)?;
        Ok(())
    }

    /// Run `f` as one atomic frame
    fn atomic<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T, ProgramError>) -> Result<T, ProgramError> {
        let snapshot = self.snapshot();
        let result = f(self);
        if result.is_err() {
            self.restore(snapshot);
        }
        result
    }

    fn call(
        &mut self,
        caller: &Pubkey,
        to: &Pubkey,
        value: u64,
        data: &[u8],
        depth: usize,
    ) -> Result<Vec<u8>, ProgramError> {
        self.atomic(|runtime| {
            runtime.check_depth(depth)?;
            let code = runtime.code_of(to).ok_or_else(|| {
                msg!("No code at {}", to);
                ProgramError::from(LotteryError::AccountHasNoCode)
            })?;
            runtime.move_lamports(caller, to, value)?;
            let mut ctx = InvokeContext {
                runtime,
                code: code.clone(),
                this: *to,
                caller: *caller,
                value,
                depth,
            };
            code.process(&mut ctx, data)
        })
    }

    fn delegate(
        &mut self,
        this: &Pubkey,
        caller: &Pubkey,
        value: u64,
        implementation: &Pubkey,
        data: &[u8],
        depth: usize,
    ) -> Result<Vec<u8>, ProgramError> {
        self.atomic(|runtime| {
            runtime.check_depth(depth)?;
            let code = runtime.code_of(implementation).ok_or_else(|| {
                msg!("No code at implementation {}", implementation);
                ProgramError::from(LotteryError::AccountHasNoCode)
            })?;
            let mut ctx = InvokeContext {
                runtime,
                code: code.clone(),
                this: *this,
                caller: *caller,
                value,
                depth,
            };
            code.process(&mut ctx, data)
        })
    }

    fn transfer(&mut self, from: &Pubkey, to: &Pubkey, lamports: u64, depth: usize) -> ProgramResult {
        self.atomic(|runtime| {
            runtime.check_depth(depth)?;
            runtime.move_lamports(from, to, lamports)?;
            match runtime.code_of(to) {
                Some(code) => {
                    let mut ctx = InvokeContext {
                        runtime,
                        code: code.clone(),
                        this: *to,
                        caller: *from,
                        value: lamports,
                        depth,
                    };
                    code.receive(&mut ctx)
                }
                None => Ok(()),
            }
        })
    }
}

/// View of the runtime handed to executing code.
///
/// `this` is the account whose storage and lamports the code operates on. Under
/// delegated execution that is the proxy, not the implementation.
pub struct InvokeContext<'a> {
    runtime: &'a mut Runtime,
    code: Rc<dyn Program>,
    this: Pubkey,
    caller: Pubkey,
    value: u64,
    depth: usize,
}

impl<'a> InvokeContext<'a> {
    pub fn this(&self) -> &Pubkey {
        &self.this
    }

    pub fn caller(&self) -> &Pubkey {
        &self.caller
    }

    /// Lamports attached to the current call
    pub fn value(&self) -> u64 {
        self.value
    }

    pub fn clock(&self) -> &Clock {
        &self.runtime.clock
    }

    pub fn recent_blockhash(&self) -> Hash {
        self.runtime.recent_blockhash
    }

    /// Namespace of the code at `address`, if any
    pub fn namespace_of(&self, address: &Pubkey) -> Option<Namespace> {
        self.runtime.code_of(address).map(|code| code.namespace())
    }

    pub fn supports_interface(&self, address: &Pubkey, interface: &InterfaceId) -> bool {
        self.runtime
            .code_of(address)
            .map_or(false, |code| code.supports_interface(interface))
    }

    fn check_namespace(&self, namespace: Namespace) -> ProgramResult {
        if namespace == self.code.namespace() || namespace == Namespace::ACCESS {
            return Ok(());
        }
        msg!(
            "Code in namespace {:?} touched namespace {:?} of {}",
            self.code.namespace(),
            namespace,
            self.this
        );
        Err(LotteryError::StorageNamespaceViolation.into())
    }

    pub fn get_raw(&self, key: &StorageKey) -> Result<Option<Vec<u8>>, ProgramError> {
        self.check_namespace(key.namespace)?;
        Ok(self
            .runtime
            .accounts
            .get(&self.this)
            .and_then(|account| account.storage.get_raw(key))
            .map(<[u8]>::to_vec))
    }

    pub fn set_raw(&mut self, key: StorageKey, value: Vec<u8>) -> ProgramResult {
        self.check_namespace(key.namespace)?;
        self.runtime
            .accounts
            .entry(self.this)
            .or_default()
            .storage
            .set_raw(key, value);
        Ok(())
    }

    pub fn get<T: BorshDeserialize>(&self, key: &StorageKey) -> Result<Option<T>, ProgramError> {
        self.get_raw(key)?
            .map(|data| utils::decode(&data))
            .transpose()
    }

    pub fn set<T: BorshSerialize>(&mut self, key: StorageKey, value: &T) -> ProgramResult {
        let data = utils::encode(value)?;
        self.set_raw(key, data)
    }

    pub fn emit(&mut self, event: Event) {
        self.runtime.logs.push(Log {
            emitter: self.this,
            event,
        });
    }

    /// Call `to` with `this` as the caller
    pub fn invoke(&mut self, to: &Pubkey, value: u64, data: &[u8]) -> Result<Vec<u8>, ProgramError> {
        let this = self.this;
        self.runtime.call(&this, to, value, data, self.depth + 1)
    }

    /// Run the code at `implementation` against this account's storage, keeping
    /// the original caller and attached value
    pub fn delegate_call(&mut self, implementation: &Pubkey, data: &[u8]) -> Result<Vec<u8>, ProgramError> {
        let (this, caller) = (self.this, self.caller);
        self.runtime
            .delegate(&this, &caller, self.value, implementation, data, self.depth + 1)
    }

    /// Pay `lamports` from this account; runs the recipient's receive hook
    pub fn transfer(&mut self, to: &Pubkey, lamports: u64) -> ProgramResult {
        let this = self.this;
        self.runtime.transfer(&this, to, lamports, self.depth + 1)
    }

    /// Attach `code` at the deterministic address for (`this`, code, `salt`)
    pub fn create_instance(&mut self, code: Rc<dyn Program>, salt: &[u8]) -> Result<Pubkey, ProgramError> {
        let address = utils::derive_instance_address(&self.this, code.code(), salt)?;
        self.runtime.install_code(&address, code)?;
        Ok(address)
    }
}
