//! Outbound call capability.

use async_trait::async_trait;
use herald_core::{ObjectRef, RemoteFault};
use serde_json::Value;

/// Sends calls to remote objects.
///
/// Argument encoding on the wire is the transport's business; Herald hands
/// it JSON values already checked against the operation signature.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a one-way call of `operation` on `target`.
    ///
    /// Returns once the call has been handed to the network. There is no
    /// reply.
    async fn invoke_oneway(
        &self,
        target: &ObjectRef,
        operation: &str,
        args: Vec<Value>,
    ) -> Result<(), RemoteFault>;
}
