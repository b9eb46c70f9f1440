// Proxied Lottery - Deterministic Proxy Factory
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    instruction::{AccountMeta, Instruction},
    msg,
    program_error::ProgramError,
    pubkey::Pubkey,
};
use std::rc::Rc;

use crate::{
    event::Event,
    proxy::{self, Proxy},
    runtime::{InvokeContext, Program},
    storage::Namespace,
    utils,
};

pub const FACTORY_CODE: &[u8] = b"proxied-lottery/proxy-factory/v1";

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq)]
pub enum FactoryInstruction {
    /// Deploy and initialize a proxy at its deterministic address
    ///
    /// Accounts expected:
    /// 0. `[signer]` Anyone
    Deploy {
        salt: Vec<u8>,
        implementation: Pubkey,
        owner: Pubkey,
    },

    /// Returns the address `code` deployed with `salt` by this factory gets
    ComputeAddress { code: Vec<u8>, salt: Vec<u8> },
}

/// Address a deployment of `code` with `salt` by `deployer` lands at
pub fn compute_address(deployer: &Pubkey, code: &[u8], salt: &[u8]) -> Result<Pubkey, ProgramError> {
    utils::derive_instance_address(deployer, code, salt)
}

/// Proxy factory program
pub struct ProxyFactory;

impl Program for ProxyFactory {
    fn code(&self) -> &'static [u8] {
        FACTORY_CODE
    }

    fn namespace(&self) -> Namespace {
        Namespace::FACTORY
    }

    fn process(&self, ctx: &mut InvokeContext, input: &[u8]) -> Result<Vec<u8>, ProgramError> {
        let instruction =
            FactoryInstruction::try_from_slice(input).map_err(|_| ProgramError::InvalidInstructionData)?;

        match instruction {
            FactoryInstruction::Deploy {
                salt,
                implementation,
                owner,
            } => {
                msg!("Instruction: Deploy");
                let address = Self::process_deploy(ctx, &salt, &implementation, &owner)?;
                utils::encode(&address)
            }
            FactoryInstruction::ComputeAddress { code, salt } => {
                utils::encode(&compute_address(ctx.this(), &code, &salt)?)
            }
        }
    }
}

impl ProxyFactory {
    fn process_deploy(
        ctx: &mut InvokeContext,
        salt: &[u8],
        implementation: &Pubkey,
        owner: &Pubkey,
    ) -> Result<Pubkey, ProgramError> {
        let address = ctx.create_instance(Rc::new(Proxy), salt)?;

        let initialize = proxy::ProxyInstruction::Initialize {
            implementation: *implementation,
            owner: Some(*owner),
        };
        ctx.invoke(&address, 0, &initialize.pack())?;

        msg!("Proxy deployed at {}", address);
        ctx.emit(Event::Deployed { address });
        Ok(address)
    }
}

fn factory_instruction(
    factory: &Pubkey,
    signer: &Pubkey,
    instruction: &FactoryInstruction,
) -> Result<Instruction, ProgramError> {
    Ok(Instruction {
        program_id: *factory,
        accounts: vec![AccountMeta::new(*signer, true)],
        data: utils::encode(instruction)?,
    })
}

/// Create deploy instruction
pub fn deploy(
    factory: &Pubkey,
    payer: &Pubkey,
    salt: &[u8],
    implementation: &Pubkey,
    owner: &Pubkey,
) -> Result<Instruction, ProgramError> {
    factory_instruction(
        factory,
        payer,
        &FactoryInstruction::Deploy {
            salt: salt.to_vec(),
            implementation: *implementation,
            owner: *owner,
        },
    )
}

/// Create compute_address instruction
pub fn compute_address_query(
    factory: &Pubkey,
    reader: &Pubkey,
    code: &[u8],
    salt: &[u8],
) -> Result<Instruction, ProgramError> {
    factory_instruction(
        factory,
        reader,
        &FactoryInstruction::ComputeAddress {
            code: code.to_vec(),
            salt: salt.to_vec(),
        },
    )
}
