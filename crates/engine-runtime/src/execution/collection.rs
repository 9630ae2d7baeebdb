use crate::{
    error::MigrationError,
    execution::{factory::Connections, workers::WorkerPool},
};
use engine_config::{report::summary::CollectionReport, settings::validated::MigrationSettings};
use engine_core::{metrics::Metrics, state::MigrationStore};
use engine_processing::{
    consumer::{
        DataConsumer, DocumentConsumer, Termination, components::writer::BatchWriter,
        config::ConsumerConfig,
    },
    producer::{DataProducer, DocumentProducer, config::ProducerConfig},
    progress::ProgressTracker,
    queue::batch_queue,
};
use model::{
    execution::{migration::MigrationProgress, status::ProgressStatus},
    transform::mapping::CollectionMapping,
};
use planner::query::{dialect::Postgres, generator::QueryGenerator};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Everything one collection task needs. Cloned per collection.
#[derive(Clone)]
pub struct CollectionContext {
    pub run_id: Uuid,
    pub connections: Connections,
    pub store: Arc<dyn MigrationStore>,
    pub settings: MigrationSettings,
    pub cancel: CancellationToken,
}

/// Runs one collection end to end and reports its outcome. Failures stay
/// inside this collection: they mark its progress FAILED and are returned in
/// the report, never raised to sibling collections.
pub async fn process_collection(ctx: CollectionContext, mapping: CollectionMapping) -> CollectionReport {
    let collection = mapping.source_collection.clone();
    let table = mapping.target_table.clone();
    info!(collection = %collection, table = %table, "Collection started");

    let progress = MigrationProgress::start(ctx.run_id, &collection, &table);
    if let Err(e) = ctx.store.create_progress(&progress).await {
        error!(table = %table, error = %e, "Failed to create progress record");
        return CollectionReport::failed(collection, table, e.to_string());
    }
    let tracker = ProgressTracker::new(&progress, ctx.store.clone());
    let metrics = Metrics::new(&table);

    let result = run_pipeline(&ctx, &mapping, &tracker, &metrics).await;
    let snapshot = metrics.snapshot();

    let (status, counted, failure) = match result {
        Ok(total) => {
            info!(metrics = %metrics, "Collection completed");
            (ProgressStatus::Completed, total, None)
        }
        Err(e) => {
            error!(collection = %collection, table = %table, error = %e, "Collection failed");
            (ProgressStatus::Failed, 0, Some(e.to_string()))
        }
    };

    let rows_total = match tracker.finish(status, snapshot.consumed).await {
        Ok(progress) => progress.rows_total,
        Err(e) => {
            warn!(table = %table, error = %e, "Failed to finalize progress");
            counted
        }
    };

    let report = CollectionReport::new(collection, table, rows_total, &snapshot, status);
    match failure {
        Some(reason) => report.with_failure(reason),
        None => report,
    }
}

async fn run_pipeline(
    ctx: &CollectionContext,
    mapping: &CollectionMapping,
    tracker: &ProgressTracker,
    metrics: &Metrics,
) -> Result<u64, MigrationError> {
    let generator = QueryGenerator::new(&Postgres);
    let ddl = generator.create_table(mapping);
    info!(table = %mapping.target_table, sql = %ddl, "Creating target table");
    ctx.connections
        .target
        .execute(&ddl)
        .await
        .map_err(|source| MigrationError::Ddl {
            table: mapping.target_table.clone(),
            source,
        })?;

    let total = ctx
        .connections
        .source
        .count(&mapping.source_collection)
        .await
        .map_err(|source| MigrationError::Count {
            collection: mapping.source_collection.clone(),
            source,
        })?;
    tracker.set_total(total).await?;
    info!(collection = %mapping.source_collection, total, "Source documents counted");

    let (batch_tx, batch_rx) = batch_queue(ctx.settings.queue_capacity);

    let producer = DocumentProducer::new(
        mapping,
        ctx.connections.source.clone(),
        ProducerConfig::from_settings(&ctx.settings),
        batch_tx,
        metrics.clone(),
        ctx.cancel.clone(),
    );

    let consumer_config = ConsumerConfig::from_settings(&ctx.settings);
    let writer = Arc::new(BatchWriter::new(
        mapping,
        &Postgres,
        ctx.connections.target.clone(),
        consumer_config.retry_policy(),
        metrics.clone(),
        ctx.cancel.clone(),
    ));
    let consumers = (0..ctx.settings.consumer_threads)
        .map(|id| {
            Box::new(DocumentConsumer::new(
                id,
                batch_rx.clone(),
                writer.clone(),
                tracker.clone(),
                metrics.clone(),
                consumer_config.clone(),
                ctx.cancel.clone(),
            )) as Box<dyn DataConsumer + Send>
        })
        .collect();
    drop(batch_rx);

    let outcome = WorkerPool::spawn(Box::new(producer) as Box<dyn DataProducer + Send>, consumers)
        .join()
        .await?;
    outcome.produced?;

    let cancelled = outcome
        .consumers
        .iter()
        .any(|summary| summary.termination == Termination::Cancelled);
    if cancelled || ctx.cancel.is_cancelled() {
        return Err(MigrationError::Interrupted {
            collection: mapping.source_collection.clone(),
            produced: metrics.produced(),
            consumed: metrics.consumed(),
        });
    }

    Ok(total)
}
