// Proxied Lottery - Utility Functions
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    hash::{hash, hashv, Hash},
    program_error::ProgramError,
    pubkey::{Pubkey, MAX_SEED_LEN},
};

/// Generate a pseudo-random value based on seed data and a maximum value
pub fn generate_random_value(seed: &[u8], max: u64) -> u64 {
    if max == 0 {
        return 0;
    }

    // Use the first 8 bytes of the seed as a u64
    let mut bytes = [0u8; 8];
    let len = std::cmp::min(seed.len(), 8);
    bytes[..len].copy_from_slice(&seed[..len]);

    let random_value = u64::from_le_bytes(bytes);
    random_value % max
}

/// Seed for a round's draw.
///
/// Host-ledger entropy: whoever produces the blockhash can bias it.
pub fn draw_seed(recent_blockhash: &Hash, instance: &Pubkey, iteration: u64, tickets_sold: u64) -> Hash {
    hashv(&[
        recent_blockhash.as_ref(),
        instance.as_ref(),
        &iteration.to_le_bytes(),
        &tickets_sold.to_le_bytes(),
    ])
}

/// Fingerprint of a program's code
pub fn code_hash(code: &[u8]) -> Hash {
    hash(code)
}

/// Address of an instance created from `code` and `salt` by `deployer`.
///
/// Depends only on its inputs, never on how many deployments came before.
pub fn derive_instance_address(
    deployer: &Pubkey,
    code: &[u8],
    salt: &[u8],
) -> Result<Pubkey, ProgramError> {
    if salt.len() > MAX_SEED_LEN {
        return Err(ProgramError::MaxSeedLengthExceeded);
    }
    let code_hash = code_hash(code);
    Pubkey::try_find_program_address(&[b"instance", code_hash.as_ref(), salt], deployer)
        .map(|(address, _bump)| address)
        .ok_or(ProgramError::InvalidSeeds)
}

/// Address of the `nonce`-th plain deployment made by `deployer`
pub fn derive_deploy_address(deployer: &Pubkey, nonce: u64) -> Result<Pubkey, ProgramError> {
    Pubkey::try_find_program_address(&[b"deploy", &nonce.to_le_bytes()], deployer)
        .map(|(address, _bump)| address)
        .ok_or(ProgramError::InvalidSeeds)
}

/// Encode program return data
pub fn encode<T: BorshSerialize>(value: &T) -> Result<Vec<u8>, ProgramError> {
    value
        .try_to_vec()
        .map_err(|e| ProgramError::BorshIoError(e.to_string()))
}

/// Decode program return data
pub fn decode<T: BorshDeserialize>(data: &[u8]) -> Result<T, ProgramError> {
    T::try_from_slice(data).map_err(|_| ProgramError::InvalidAccountData)
}
