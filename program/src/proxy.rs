// Proxied Lottery - Delegating Proxy
//
// Holds the canonical storage of an instance and forwards every instruction it
// does not implement itself to the configured implementation.
use solana_program::{
    entrypoint::ProgramResult,
    instruction::{AccountMeta, Instruction},
    msg,
    program_error::ProgramError,
    pubkey::{Pubkey, PUBKEY_BYTES},
};
use std::convert::TryInto;

use crate::{
    access,
    error::LotteryError,
    event::Event,
    runtime::{InvokeContext, Program},
    storage::{Namespace, StorageKey},
    utils,
};

pub const PROXY_CODE: &[u8] = b"proxied-lottery/proxy/v1";

/// Instruction tags at or above this value belong to the proxy itself
pub const PROXY_TAG_BASE: u8 = 0xF0;

#[derive(Clone, Debug, PartialEq)]
pub enum ProxyInstruction {
    /// One-time setup
    ///
    /// Accounts expected:
    /// 0. `[signer]` The deployer; becomes owner when `owner` is None
    Initialize {
        implementation: Pubkey,
        owner: Option<Pubkey>,
    },

    /// Returns the implementation address (owner only)
    Implementation {},

    /// Returns `Option<Pubkey>`
    Owner {},

    /// Point the proxy at new logic
    ///
    /// Accounts expected:
    /// 0. `[signer]` The owner
    UpgradeTo { implementation: Pubkey },

    /// Hand the owner role to another address
    ///
    /// Accounts expected:
    /// 0. `[signer]` The owner
    TransferOwnership { new_owner: Pubkey },
}

impl ProxyInstruction {
    /// Unpacks a proxy instruction; `None` means the input is for the
    /// implementation
    pub fn unpack(input: &[u8]) -> Result<Option<Self>, ProgramError> {
        let (tag, rest) = match input.split_first() {
            Some((tag, rest)) if *tag >= PROXY_TAG_BASE => (*tag, rest),
            _ => return Ok(None),
        };

        Ok(Some(match tag - PROXY_TAG_BASE {
            0 => {
                let (implementation, rest) = Self::unpack_pubkey(rest)?;
                let owner = match rest.split_first() {
                    Some((0, _)) => None,
                    Some((1, rest)) => Some(Self::unpack_pubkey(rest)?.0),
                    _ => return Err(ProgramError::InvalidInstructionData),
                };
                Self::Initialize {
                    implementation,
                    owner,
                }
            }
            1 => Self::Implementation {},
            2 => Self::Owner {},
            3 => {
                let (implementation, _) = Self::unpack_pubkey(rest)?;
                Self::UpgradeTo { implementation }
            }
            4 => {
                let (new_owner, _) = Self::unpack_pubkey(rest)?;
                Self::TransferOwnership { new_owner }
            }
            _ => return Err(ProgramError::InvalidInstructionData),
        }))
    }

    fn unpack_pubkey(input: &[u8]) -> Result<(Pubkey, &[u8]), ProgramError> {
        let key = input
            .get(..PUBKEY_BYTES)
            .and_then(|slice| slice.try_into().ok())
            .map(Pubkey::new_from_array)
            .ok_or(ProgramError::InvalidInstructionData)?;
        Ok((key, &input[PUBKEY_BYTES..]))
    }

    /// Packs a ProxyInstruction into a byte buffer
    pub fn pack(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(1 + 2 * PUBKEY_BYTES + 1);
        match self {
            Self::Initialize {
                implementation,
                owner,
            } => {
                buf.push(PROXY_TAG_BASE);
                buf.extend_from_slice(implementation.as_ref());
                match owner {
                    Some(owner) => {
                        buf.push(1);
                        buf.extend_from_slice(owner.as_ref());
                    }
                    None => buf.push(0),
                }
            }
            Self::Implementation {} => buf.push(PROXY_TAG_BASE + 1),
            Self::Owner {} => buf.push(PROXY_TAG_BASE + 2),
            Self::UpgradeTo { implementation } => {
                buf.push(PROXY_TAG_BASE + 3);
                buf.extend_from_slice(implementation.as_ref());
            }
            Self::TransferOwnership { new_owner } => {
                buf.push(PROXY_TAG_BASE + 4);
                buf.extend_from_slice(new_owner.as_ref());
            }
        }
        buf
    }
}

fn implementation_key() -> StorageKey {
    StorageKey::new(Namespace::PROXY, b"implementation".to_vec())
}

/// Delegating proxy program
pub struct Proxy;

impl Program for Proxy {
    fn code(&self) -> &'static [u8] {
        PROXY_CODE
    }

    fn namespace(&self) -> Namespace {
        Namespace::PROXY
    }

    fn process(&self, ctx: &mut InvokeContext, input: &[u8]) -> Result<Vec<u8>, ProgramError> {
        match ProxyInstruction::unpack(input)? {
            Some(ProxyInstruction::Initialize {
                implementation,
                owner,
            }) => {
                msg!("Instruction: Initialize Proxy");
                Self::process_initialize(ctx, &implementation, owner)?;
                Ok(Vec::new())
            }
            Some(ProxyInstruction::Implementation {}) => {
                access::require_owner(ctx)?;
                utils::encode(&Self::implementation(ctx)?)
            }
            Some(ProxyInstruction::Owner {}) => utils::encode(&access::owner(ctx)?),
            Some(ProxyInstruction::UpgradeTo { implementation }) => {
                msg!("Instruction: Upgrade To");
                Self::process_upgrade_to(ctx, &implementation)?;
                Ok(Vec::new())
            }
            Some(ProxyInstruction::TransferOwnership { new_owner }) => {
                msg!("Instruction: Transfer Ownership");
                access::transfer_owner(ctx, &new_owner)?;
                Ok(Vec::new())
            }
            None => Self::fallback(ctx, input),
        }
    }
}

impl Proxy {
    pub fn implementation(ctx: &InvokeContext) -> Result<Option<Pubkey>, ProgramError> {
        ctx.get(&implementation_key())
    }

    /// Implementations must carry code and keep out of the proxy's namespaces
    fn validate_implementation(ctx: &InvokeContext, implementation: &Pubkey) -> ProgramResult {
        match ctx.namespace_of(implementation) {
            Some(namespace) if !namespace.is_reserved() => Ok(()),
            Some(namespace) => {
                msg!("Implementation {} uses reserved namespace {:?}", implementation, namespace);
                Err(LotteryError::InvalidImplementation.into())
            }
            None => {
                msg!("Implementation {} has no code", implementation);
                Err(LotteryError::InvalidImplementation.into())
            }
        }
    }

    fn process_initialize(ctx: &mut InvokeContext, implementation: &Pubkey, owner: Option<Pubkey>) -> ProgramResult {
        if Self::implementation(ctx)?.is_some() {
            msg!("Proxy is already initialized");
            return Err(LotteryError::AlreadyInitialized.into());
        }
        Self::validate_implementation(ctx, implementation)?;

        let owner = owner.unwrap_or(*ctx.caller());
        access::set_owner(ctx, &owner)?;
        ctx.set(implementation_key(), implementation)?;

        msg!("Proxy initialized: implementation={}, owner={}", implementation, owner);
        ctx.emit(Event::ProxyInitialized {
            implementation: *implementation,
            owner,
        });
        Ok(())
    }

    fn process_upgrade_to(ctx: &mut InvokeContext, implementation: &Pubkey) -> ProgramResult {
        access::require_owner(ctx)?;
        if Self::implementation(ctx)?.is_none() {
            return Err(LotteryError::ImplementationNotSet.into());
        }
        Self::validate_implementation(ctx, implementation)?;

        ctx.set(implementation_key(), implementation)?;
        msg!("Proxy upgraded to {}", implementation);
        ctx.emit(Event::Upgraded {
            implementation: *implementation,
        });
        Ok(())
    }

    /// Delegate to the implementation; its return data or error passes through
    fn fallback(ctx: &mut InvokeContext, input: &[u8]) -> Result<Vec<u8>, ProgramError> {
        let implementation = Self::implementation(ctx)?.ok_or_else(|| {
            msg!("Proxy {} has no implementation", ctx.this());
            ProgramError::from(LotteryError::ImplementationNotSet)
        })?;
        ctx.delegate_call(&implementation, input)
    }
}

fn proxy_instruction(proxy: &Pubkey, signer: &Pubkey, instruction: ProxyInstruction) -> Instruction {
    Instruction {
        program_id: *proxy,
        accounts: vec![AccountMeta::new(*signer, true)],
        data: instruction.pack(),
    }
}

/// Create initialize instruction
pub fn initialize(proxy: &Pubkey, deployer: &Pubkey, implementation: &Pubkey, owner: Option<Pubkey>) -> Instruction {
    proxy_instruction(
        proxy,
        deployer,
        ProxyInstruction::Initialize {
            implementation: *implementation,
            owner,
        },
    )
}

pub fn implementation(proxy: &Pubkey, owner: &Pubkey) -> Instruction {
    proxy_instruction(proxy, owner, ProxyInstruction::Implementation {})
}

pub fn owner(proxy: &Pubkey, reader: &Pubkey) -> Instruction {
    proxy_instruction(proxy, reader, ProxyInstruction::Owner {})
}

/// Create upgrade_to instruction
pub fn upgrade_to(proxy: &Pubkey, owner: &Pubkey, implementation: &Pubkey) -> Instruction {
    proxy_instruction(
        proxy,
        owner,
        ProxyInstruction::UpgradeTo {
            implementation: *implementation,
        },
    )
}

/// Create transfer_ownership instruction
pub fn transfer_ownership(proxy: &Pubkey, owner: &Pubkey, new_owner: &Pubkey) -> Instruction {
    proxy_instruction(
        proxy,
        owner,
        ProxyInstruction::TransferOwnership {
            new_owner: *new_owner,
        },
    )
}
