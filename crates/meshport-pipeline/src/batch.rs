//! Batch conversion in fixed-size concurrent chunks.

use std::collections::HashMap;

use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use meshport_core::{ConvertError, OutputFormat};

use crate::converter::Converter;
use crate::models::{BatchItem, BatchOptions, BatchResult};

/// Chunk size for a requested concurrency. `None` and `0` mean `default`.
pub fn effective_concurrency(requested: Option<usize>, default: usize) -> usize {
    match requested {
        Some(0) | None => default.max(1),
        Some(n) => n,
    }
}

impl Converter {
    /// Convert every item to `output_format`.
    ///
    /// Items run in consecutive chunks of `options.concurrency`; a chunk
    /// settles completely before the next one starts. Failures, panics
    /// included, become failed entries. The result has one entry per item,
    /// in input order.
    #[instrument(
        skip(self, items, options),
        fields(batch_id, items = items.len(), to = %output_format)
    )]
    pub async fn convert_batch(
        &self,
        items: Vec<BatchItem>,
        output_format: OutputFormat,
        options: &BatchOptions,
    ) -> Vec<BatchResult> {
        let batch_id = Uuid::now_v7();
        tracing::Span::current().record("batch_id", batch_id.to_string());

        let total = items.len();
        let chunk_size = effective_concurrency(options.concurrency, self.default_concurrency());
        let mut slots: Vec<Option<BatchResult>> = (0..total).map(|_| None).collect();
        let mut pending = items.into_iter().enumerate();

        loop {
            let chunk: Vec<(usize, BatchItem)> = pending.by_ref().take(chunk_size).collect();
            if chunk.is_empty() {
                break;
            }
            debug!(first = chunk[0].0, size = chunk.len(), "Starting chunk");

            let mut tasks = JoinSet::new();
            let mut in_flight = HashMap::with_capacity(chunk.len());

            for (index, item) in chunk {
                let proc = self.clone();
                let conversion = options.conversion.clone();
                let submitted = item.clone();

                let handle = tasks.spawn(async move {
                    let outcome = proc
                        .convert(&item.input, item.input_format, output_format, &conversion)
                        .await;
                    (index, BatchResult { item, outcome })
                });
                in_flight.insert(handle.id(), (index, submitted));
            }

            while let Some(joined) = tasks.join_next_with_id().await {
                match joined {
                    Ok((id, (index, result))) => {
                        in_flight.remove(&id);
                        slots[index] = Some(result);
                    }
                    Err(e) => {
                        if let Some((index, item)) = in_flight.remove(&e.id()) {
                            warn!(index, name = ?item.name, error = %e, "Batch item task failed");
                            slots[index] = Some(BatchResult {
                                item,
                                outcome: Err(ConvertError::wrap(e)),
                            });
                        }
                    }
                }
            }
        }

        let results: Vec<BatchResult> = slots.into_iter().flatten().collect();
        let succeeded = results.iter().filter(|r| r.success()).count();
        info!(
            total,
            succeeded,
            failed = total - succeeded,
            chunk_size,
            "Batch completed"
        );
        results
    }
}
