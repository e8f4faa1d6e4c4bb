//! Fan-out of a received chunk to every other watched connection

use crate::connection_set::Descriptor;
use log::{debug, warn};
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Writes `chunk` to every recipient except `sender`
///
/// Recipients are visited in the order the iterator yields them. A failed
/// write does not stop the fan-out; the descriptors that could not be
/// written to are returned so the caller can drop them.
pub async fn broadcast<'a, W, I>(recipients: I, sender: Descriptor, chunk: &[u8]) -> Vec<Descriptor>
where
    W: AsyncWrite + Unpin + 'a,
    I: IntoIterator<Item = (Descriptor, &'a mut W)>,
{
    let mut failed = Vec::new();
    let mut delivered = 0;

    for (descriptor, writer) in recipients {
        if descriptor == sender {
            continue;
        }

        match writer.write_all(chunk).await {
            Ok(()) => delivered += 1,
            Err(e) => {
                warn!("Failed to relay to socket {}: {}", descriptor, e);
                failed.push(descriptor);
            }
        }
    }

    debug!(
        "Relayed {} bytes from socket {} to {} clients",
        chunk.len(),
        sender,
        delivered
    );
    failed
}
