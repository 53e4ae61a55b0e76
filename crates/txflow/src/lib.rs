/*!
# txflow

Turns a caller-supplied list of instructions into a fully-priced, signed,
broadcast, and confirmed Solana transaction. Per run the pipeline fetches a
fresh blockhash lifetime anchor, assembles a v0 message with a compute-unit
price ahead of the caller's instructions, simulates that draft to size the
compute-unit limit, appends the limit, signs, submits, and waits on a
signature-keyed status subscription until the requested commitment is
reached or the anchor expires.

Instruction payloads are opaque: the pipeline appends them in order and has
no contract with their semantics.

## Quick Start

```rust,no_run
use std::sync::Arc;
use txflow::{CommitmentConfig, Instruction, Keypair, RpcLedgerNode, TxPipeline};

# async fn example() -> Result<(), Box<dyn std::error::Error>> {
let node = RpcLedgerNode::connect(
    "https://api.devnet.solana.com",
    "wss://api.devnet.solana.com",
    CommitmentConfig::confirmed(),
)
.await?;
let pipeline = TxPipeline::new(Arc::new(node));

let payer = Keypair::new();
let instructions: Vec<Instruction> = vec![/* your instructions */];

let signature = pipeline.build_and_send(&payer, &instructions).await?;
println!("confirmed: {signature}");
# Ok(())
# }
```

## Custom Configuration

```rust,no_run
# use std::sync::Arc;
# use txflow::{CommitmentConfig, Keypair, PipelineConfig, RpcLedgerNode, TxPipeline};
# async fn example() -> Result<(), Box<dyn std::error::Error>> {
# let node = RpcLedgerNode::connect(
#     "https://api.devnet.solana.com",
#     "wss://api.devnet.solana.com",
#     CommitmentConfig::confirmed(),
# )
# .await?;
let config = PipelineConfig {
    priority_micro_lamports: 250_000,
    confirm_timeout: std::time::Duration::from_secs(45),
    ..Default::default()
};
let pipeline = TxPipeline::with_config(Arc::new(node), config);
# Ok(())
# }
```

## Cancellation

```rust,no_run
# use std::sync::Arc;
# use txflow::{cancel_pair, CommitmentConfig, Instruction, Keypair, RpcLedgerNode, TxPipeline};
# async fn example() -> Result<(), Box<dyn std::error::Error>> {
# let node = RpcLedgerNode::connect(
#     "https://api.devnet.solana.com",
#     "wss://api.devnet.solana.com",
#     CommitmentConfig::confirmed(),
# )
# .await?;
# let pipeline = TxPipeline::new(Arc::new(node));
# let payer = Keypair::new();
# let instructions: Vec<Instruction> = vec![];
let (handle, token) = cancel_pair();
// handle.cancel() from elsewhere abandons the wait; the transaction may
// still land, so the run ends with PipelineError::Cancelled.
let result = pipeline
    .build_and_send_with_cancel(&payer, &instructions, Some(token))
    .await;
# Ok(())
# }
```
*/

mod config;
mod driver;
mod error;
mod estimator;
mod lifetime;
mod message;
mod node;
mod pipeline;

pub use config::PipelineConfig;
pub use driver::{cancel_pair, send_and_confirm, CancelHandle, CancelToken};
pub use error::{PipelineError, PipelineResult};
pub use estimator::estimate_compute_units;
pub use lifetime::LifetimeAnchor;
pub use message::{assemble_message, sign_message, SignedTransaction};
pub use node::{LedgerNode, RpcLedgerNode, SignatureStatus, SimulationOutcome};
pub use pipeline::TxPipeline;

// Re-export key Solana types for convenience
pub use solana_sdk::{
    commitment_config::CommitmentConfig,
    hash::Hash,
    instruction::Instruction,
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    transaction::VersionedTransaction,
};
