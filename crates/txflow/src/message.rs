use crate::{
    error::{PipelineError, PipelineResult},
    lifetime::LifetimeAnchor,
};
use solana_sdk::{
    compute_budget::ComputeBudgetInstruction,
    instruction::Instruction,
    message::{v0, VersionedMessage},
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    transaction::VersionedTransaction,
};

/// Compose the versioned (v0) message for one pipeline run. Pure; no I/O.
///
/// Instruction order is fixed: the compute-unit price first, then the
/// caller's instructions in their given order, then (when supplied) the
/// compute-unit limit last. The draft built without a limit and the final
/// message built with one are identical except for that appended
/// instruction, so a simulation of the draft covers exactly the bytes that
/// will be sent.
pub fn assemble_message(
    payer: &Pubkey,
    anchor: &LifetimeAnchor,
    priority_micro_lamports: u64,
    caller_instructions: &[Instruction],
    compute_unit_limit: Option<u32>,
) -> PipelineResult<v0::Message> {
    let mut instructions = Vec::with_capacity(caller_instructions.len() + 2);
    instructions.push(ComputeBudgetInstruction::set_compute_unit_price(
        priority_micro_lamports,
    ));
    instructions.extend_from_slice(caller_instructions);
    if let Some(units) = compute_unit_limit {
        instructions.push(ComputeBudgetInstruction::set_compute_unit_limit(units));
    }

    v0::Message::try_compile(payer, &instructions, &[], anchor.blockhash)
        .map_err(|e| PipelineError::Assembly(format!("message compile failed: {e}")))
}

/// A signed transaction together with the anchor it was signed against.
///
/// Construction runs both structural precondition checks, so a value of this
/// type is always sendable and always carries its anchor's blockhash. Never
/// mutated after signing; discard it once a signature has been extracted.
#[derive(Debug, Clone)]
pub struct SignedTransaction {
    transaction: VersionedTransaction,
    anchor: LifetimeAnchor,
}

/// Sign `message` with the payer's key material.
///
/// Signing is deterministic over the message's canonical serialization:
/// the same message and key always produce byte-identical signatures.
pub fn sign_message(
    message: v0::Message,
    anchor: &LifetimeAnchor,
    payer: &Keypair,
) -> PipelineResult<SignedTransaction> {
    let transaction = VersionedTransaction::try_new(VersionedMessage::V0(message), &[payer])?;
    SignedTransaction::from_parts(transaction, *anchor)
}

impl SignedTransaction {
    /// Wrap an externally signed transaction, enforcing the two structural
    /// preconditions: the message carries the anchor's blockhash, and every
    /// required signer slot holds a real signature. A violation is an
    /// assembly bug, not a transient condition.
    pub fn from_parts(
        transaction: VersionedTransaction,
        anchor: LifetimeAnchor,
    ) -> PipelineResult<Self> {
        let signed = Self {
            transaction,
            anchor,
        };
        signed.check_blockhash_lifetime()?;
        signed.check_sendable()?;
        Ok(signed)
    }

    pub fn transaction(&self) -> &VersionedTransaction {
        &self.transaction
    }

    pub fn anchor(&self) -> &LifetimeAnchor {
        &self.anchor
    }

    /// The transaction's unique signature, its stable identifier for lookup.
    pub fn signature(&self) -> &Signature {
        &self.transaction.signatures[0]
    }

    pub fn check_blockhash_lifetime(&self) -> PipelineResult<()> {
        if *self.transaction.message.recent_blockhash() != self.anchor.blockhash {
            return Err(PipelineError::Assembly(
                "signed message does not carry its lifetime anchor's blockhash".to_string(),
            ));
        }
        Ok(())
    }

    pub fn check_sendable(&self) -> PipelineResult<()> {
        let required = self.transaction.message.header().num_required_signatures as usize;
        if required == 0 || self.transaction.signatures.len() != required {
            return Err(PipelineError::Assembly(format!(
                "expected {} signatures, found {}",
                required,
                self.transaction.signatures.len()
            )));
        }
        if self
            .transaction
            .signatures
            .iter()
            .any(|sig| *sig == Signature::default())
        {
            return Err(PipelineError::Assembly(
                "missing signature for a required signer".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::{compute_budget, hash::Hash, instruction::AccountMeta, signer::Signer};

    fn test_anchor() -> LifetimeAnchor {
        LifetimeAnchor {
            blockhash: Hash::new_unique(),
            last_valid_block_height: 100,
        }
    }

    fn caller_instruction(payer: &Pubkey, data: &[u8]) -> Instruction {
        Instruction::new_with_bytes(
            Pubkey::new_unique(),
            data,
            vec![AccountMeta::new(*payer, true)],
        )
    }

    fn program_id_of(message: &v0::Message, index: usize) -> Pubkey {
        let compiled = &message.instructions[index];
        message.account_keys[compiled.program_id_index as usize]
    }

    #[test]
    fn test_instruction_order_price_callers_limit() {
        let payer = Pubkey::new_unique();
        let anchor = test_anchor();
        let caller = caller_instruction(&payer, b"increment");

        let message =
            assemble_message(&payer, &anchor, 100_000, &[caller.clone()], Some(12_000)).unwrap();

        assert_eq!(message.instructions.len(), 3);
        assert_eq!(message.recent_blockhash, anchor.blockhash);

        // First: set-compute-unit-price (discriminant 3, u64 micro-lamports).
        assert_eq!(program_id_of(&message, 0), compute_budget::id());
        assert_eq!(message.instructions[0].data[0], 3);
        assert_eq!(
            u64::from_le_bytes(message.instructions[0].data[1..9].try_into().unwrap()),
            100_000
        );

        // Middle: the caller's instruction, untouched.
        assert_eq!(program_id_of(&message, 1), caller.program_id);
        assert_eq!(message.instructions[1].data, caller.data);

        // Last: set-compute-unit-limit (discriminant 2, u32 units).
        assert_eq!(program_id_of(&message, 2), compute_budget::id());
        assert_eq!(message.instructions[2].data[0], 2);
        assert_eq!(
            u32::from_le_bytes(message.instructions[2].data[1..5].try_into().unwrap()),
            12_000
        );
    }

    #[test]
    fn test_draft_and_final_differ_only_by_appended_limit() {
        let payer = Pubkey::new_unique();
        let anchor = test_anchor();
        let callers = vec![
            caller_instruction(&payer, b"one"),
            caller_instruction(&payer, b"two"),
        ];

        let draft = assemble_message(&payer, &anchor, 50, &callers, None).unwrap();
        let fin = assemble_message(&payer, &anchor, 50, &callers, Some(7_500)).unwrap();

        assert_eq!(draft.header, fin.header);
        assert_eq!(draft.account_keys, fin.account_keys);
        assert_eq!(draft.recent_blockhash, fin.recent_blockhash);
        assert_eq!(fin.instructions.len(), draft.instructions.len() + 1);
        assert_eq!(
            &fin.instructions[..draft.instructions.len()],
            &draft.instructions[..]
        );
    }

    #[test]
    fn test_signing_is_deterministic() {
        let payer = Keypair::new();
        let anchor = test_anchor();
        let caller = caller_instruction(&payer.pubkey(), b"x");

        let message =
            assemble_message(&payer.pubkey(), &anchor, 1, &[caller], Some(5_000)).unwrap();

        let first = sign_message(message.clone(), &anchor, &payer).unwrap();
        let second = sign_message(message, &anchor, &payer).unwrap();
        assert_eq!(
            first.transaction().signatures,
            second.transaction().signatures
        );
    }

    #[test]
    fn test_different_anchors_yield_different_signatures() {
        let payer = Keypair::new();
        let caller = caller_instruction(&payer.pubkey(), b"x");

        let first_anchor = test_anchor();
        let second_anchor = test_anchor();
        assert_ne!(first_anchor.blockhash, second_anchor.blockhash);

        let first = sign_message(
            assemble_message(&payer.pubkey(), &first_anchor, 1, &[caller.clone()], None).unwrap(),
            &first_anchor,
            &payer,
        )
        .unwrap();
        let second = sign_message(
            assemble_message(&payer.pubkey(), &second_anchor, 1, &[caller], None).unwrap(),
            &second_anchor,
            &payer,
        )
        .unwrap();

        assert_ne!(first.signature(), second.signature());
    }

    #[test]
    fn test_missing_signature_fails_sendable_check() {
        let payer = Keypair::new();
        let anchor = test_anchor();
        let message = assemble_message(
            &payer.pubkey(),
            &anchor,
            1,
            &[caller_instruction(&payer.pubkey(), b"x")],
            None,
        )
        .unwrap();

        let unsigned = VersionedTransaction {
            signatures: vec![Signature::default()],
            message: VersionedMessage::V0(message),
        };
        let result = SignedTransaction::from_parts(unsigned, anchor);
        assert!(matches!(result, Err(PipelineError::Assembly(_))));
    }

    #[test]
    fn test_mismatched_anchor_fails_lifetime_check() {
        let payer = Keypair::new();
        let anchor = test_anchor();
        let message = assemble_message(
            &payer.pubkey(),
            &anchor,
            1,
            &[caller_instruction(&payer.pubkey(), b"x")],
            None,
        )
        .unwrap();
        let transaction =
            VersionedTransaction::try_new(VersionedMessage::V0(message), &[&payer]).unwrap();

        let other_anchor = test_anchor();
        let result = SignedTransaction::from_parts(transaction, other_anchor);
        assert!(matches!(result, Err(PipelineError::Assembly(_))));
    }
}
