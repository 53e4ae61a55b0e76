/*!
# txflow-testing

Scripted fake ledger node plus small fixtures for exercising the txflow
pipeline without a network. The fake records every simulation and
submission so tests can assert exactly what reached the ledger.
*/

mod fake_node;

pub use fake_node::FakeLedgerNode;

use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    signature::Keypair,
};

/// Default priority price used by the pipeline, repeated here so tests can
/// assert against the value without reaching into config internals.
pub const TEST_PRIORITY_MICRO_LAMPORTS: u64 = 100_000;

/// An opaque caller instruction targeting `program_id`, with the payer as
/// its single writable signer. The pipeline never interprets the payload.
pub fn opaque_instruction(program_id: Pubkey, payer: &Pubkey, data: &[u8]) -> Instruction {
    Instruction::new_with_bytes(program_id, data, vec![AccountMeta::new(*payer, true)])
}

pub fn test_payer() -> Keypair {
    Keypair::new()
}
