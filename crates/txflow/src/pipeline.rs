use crate::{
    config::PipelineConfig,
    driver::{send_and_confirm, CancelToken},
    error::PipelineResult,
    estimator::estimate_compute_units,
    message::{assemble_message, sign_message},
    node::LedgerNode,
};
use solana_sdk::{
    instruction::Instruction,
    signature::{Keypair, Signature},
    signer::Signer,
};
use std::sync::Arc;
use tracing::{debug, info};

/// One transaction pipeline: lifetime fetch → draft assembly → compute
/// budget estimation → final assembly → signing → broadcast and confirm.
///
/// A single run is sequential; independent runs may share one node handle
/// concurrently. The pipeline holds no state between runs.
pub struct TxPipeline<N: LedgerNode> {
    node: Arc<N>,
    config: PipelineConfig,
}

impl<N: LedgerNode> TxPipeline<N> {
    pub fn new(node: Arc<N>) -> Self {
        Self::with_config(node, PipelineConfig::default())
    }

    pub fn with_config(node: Arc<N>, config: PipelineConfig) -> Self {
        Self { node, config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn node(&self) -> &Arc<N> {
        &self.node
    }

    /// Build, price, sign, send, and confirm one transaction for `payer`,
    /// returning its signature.
    pub async fn build_and_send(
        &self,
        payer: &Keypair,
        instructions: &[Instruction],
    ) -> PipelineResult<Signature> {
        self.build_and_send_with_cancel(payer, instructions, None)
            .await
    }

    /// Like [`build_and_send`](Self::build_and_send), with caller-held
    /// cancellation of the confirmation wait.
    pub async fn build_and_send_with_cancel(
        &self,
        payer: &Keypair,
        instructions: &[Instruction],
        cancel: Option<CancelToken>,
    ) -> PipelineResult<Signature> {
        let commitment = self.config.commitment;

        // A fresh anchor per run; anchors are never reused across
        // transactions because their validity window is short.
        let anchor = self.node.latest_blockhash(commitment).await?;
        debug!(
            blockhash = %anchor.blockhash,
            last_valid_block_height = anchor.last_valid_block_height,
            "fetched lifetime anchor"
        );

        let payer_address = payer.pubkey();
        let draft = assemble_message(
            &payer_address,
            &anchor,
            self.config.priority_micro_lamports,
            instructions,
            None,
        )?;

        let units = estimate_compute_units(self.node.as_ref(), &draft, commitment).await?;

        let message = assemble_message(
            &payer_address,
            &anchor,
            self.config.priority_micro_lamports,
            instructions,
            Some(units),
        )?;

        let signed = sign_message(message, &anchor, payer)?;
        info!(
            signature = %signed.signature(),
            caller_instructions = instructions.len(),
            compute_unit_limit = units,
            "transaction built and signed"
        );

        send_and_confirm(self.node.as_ref(), &signed, &self.config, cancel).await
    }
}
