//! Termination Handler
//!
//! A node asks to be removed by writing `jobs/<job>/terminate/<instance>`.
//! The instance is terminated before the marker is deleted; if termination
//! fails the marker stays, so the request is not lost.

use super::HandlerError;
use crate::context::Context;

pub async fn terminate_instance(
    ctx: &Context,
    bucket: &str,
    marker_key: &str,
    instance_id: &str,
) -> Result<(), HandlerError> {
    ctx.fleet.terminate(instance_id).await?;
    ctx.store.delete_object(bucket, marker_key).await?;

    tracing::info!("Instance {} terminated, marker {} removed", instance_id, marker_key);
    Ok(())
}
