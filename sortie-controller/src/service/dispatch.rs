//! Event Router
//!
//! Classifies each change notification by key shape and hands it to the
//! matching handler. Records are processed one at a time in delivery order;
//! a failing record is logged and reported but never stops the rest of the
//! batch.

use serde::Serialize;
use sortie_core::domain::event::{ObjectEvent, classify};
use sortie_core::dto::notification::{NotificationBatch, ObjectChange};

use super::completion::{self, Completion};
use super::{HandlerError, job_start, termination};
use crate::context::Context;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Handled,
    Ignored,
    Failed,
}

/// What happened to one notification record
#[derive(Debug, Clone, Serialize)]
pub struct RecordReport {
    pub bucket: String,
    pub key: String,
    pub event: &'static str,
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Per-record results of one batch
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub records: Vec<RecordReport>,
}

impl BatchReport {
    pub fn count(&self, outcome: Outcome) -> usize {
        self.records.iter().filter(|r| r.outcome == outcome).count()
    }

    pub fn has_failures(&self) -> bool {
        self.count(Outcome::Failed) > 0
    }
}

/// Processes every record of a notification batch
pub async fn dispatch_batch(ctx: &Context, batch: &NotificationBatch) -> BatchReport {
    let mut report = BatchReport::default();

    for (index, decoded) in batch.changes().into_iter().enumerate() {
        let record = match decoded {
            Ok(change) => dispatch(ctx, &change).await,
            Err(e) => {
                tracing::error!("Record {} is not an object notification: {}", index, e);
                RecordReport {
                    bucket: String::new(),
                    key: String::new(),
                    event: "unrecognized",
                    outcome: Outcome::Failed,
                    detail: None,
                    error: Some(format!("record {}: {}", index, e)),
                }
            }
        };
        report.records.push(record);
    }

    tracing::info!(
        "Batch processed: {} handled, {} ignored, {} failed",
        report.count(Outcome::Handled),
        report.count(Outcome::Ignored),
        report.count(Outcome::Failed)
    );

    report
}

/// Routes one change to its handler
pub async fn dispatch(ctx: &Context, change: &ObjectChange) -> RecordReport {
    tracing::info!("Received notification for {}/{}", change.bucket, change.key);

    let event = classify(&change.key);
    let result = route(ctx, change, &event).await;

    let (outcome, detail, error) = match result {
        Ok(Some(detail)) => (Outcome::Handled, Some(detail), None),
        Ok(None) => {
            tracing::info!("Ignoring {}/{}", change.bucket, change.key);
            (Outcome::Ignored, None, None)
        }
        Err(e) => {
            tracing::error!("Handler for {}/{} failed: {}", change.bucket, change.key, e);
            (Outcome::Failed, None, Some(e.to_string()))
        }
    };

    RecordReport {
        bucket: change.bucket.clone(),
        key: change.key.clone(),
        event: event.kind(),
        outcome,
        detail,
        error,
    }
}

/// Returns a short description of what the handler did, `None` for ignored keys
async fn route(
    ctx: &Context,
    change: &ObjectChange,
    event: &ObjectEvent,
) -> Result<Option<String>, HandlerError> {
    let detail = match event {
        ObjectEvent::JobStart => {
            let started = job_start::start_job(ctx, &change.bucket).await?;
            format!(
                "job {} started on {} nodes{}",
                started.job_name,
                started.capacity,
                if started.newly_frozen { "" } else { " (redelivery)" }
            )
        }
        ObjectEvent::ResultUploaded { job_name } => {
            match completion::check_completion(ctx, &change.bucket, job_name).await? {
                Completion::AlreadyFinished => "already finished".to_string(),
                Completion::InProgress { results, target } => {
                    format!("{}/{} results", results, target)
                }
                Completion::Finished { links } => format!("finished with {} results", links),
                Completion::LostRace => "finished by a concurrent invocation".to_string(),
            }
        }
        ObjectEvent::TerminateRequested { instance_id, .. } => {
            termination::terminate_instance(ctx, &change.bucket, &change.key, instance_id)
                .await?;
            format!("instance {} terminated", instance_id)
        }
        ObjectEvent::Ignored => return Ok(None),
    };
    Ok(Some(detail))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{BUCKET, FleetCall, Harness, SCENARIO_MANIFEST};
    use sortie_core::domain::aggregate::AggregateRecord;
    use sortie_core::dto::notification::{NotificationEntry, NotificationRecord};

    fn batch(keys: &[&str]) -> NotificationBatch {
        NotificationBatch {
            records: keys
                .iter()
                .map(|key| NotificationRecord::new(BUCKET, *key).into())
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_end_to_end_scenario() {
        let h = Harness::new();

        h.store.insert(BUCKET, "manifest.json", SCENARIO_MANIFEST.as_bytes());
        let report = dispatch_batch(&h.context, &batch(&["manifest.json"])).await;
        assert_eq!(report.count(Outcome::Handled), 1);
        assert!(h.store.contains(BUCKET, "do_stuff.sh"));
        assert!(h.store.contains(BUCKET, "jobs/t1/resources/sortie_manifest.json"));
        assert_eq!(
            h.fleet.calls(),
            vec![FleetCall::SetCapacity(0), FleetCall::SetCapacity(4)]
        );

        h.store.insert(BUCKET, "jobs/t1/results/out.dat.0.i-a", b"1");
        let report = dispatch_batch(&h.context, &batch(&["jobs/t1/results/out.dat.0.i-a"])).await;
        assert_eq!(report.records[0].detail.as_deref(), Some("1/2 results"));
        assert!(!h.store.contains(BUCKET, "jobs/t1/results/sortie_results.json"));
        assert_eq!(h.fleet.calls().len(), 2);

        h.store.insert(BUCKET, "jobs/t1/results/out.dat.0.i-b", b"2");
        dispatch_batch(&h.context, &batch(&["jobs/t1/results/out.dat.0.i-b"])).await;

        let aggregate = h
            .store
            .body(BUCKET, "jobs/t1/results/sortie_results.json")
            .unwrap();
        let record = AggregateRecord::parse(&aggregate).unwrap();
        assert_eq!(record.len(), 2);
        assert!(record.links()[0].contains("out.dat.0.i-a"));
        assert!(record.links()[1].contains("out.dat.0.i-b"));
        assert_eq!(h.fleet.calls().last(), Some(&FleetCall::SetCapacity(0)));
    }

    #[tokio::test]
    async fn test_unrecognized_key_has_no_effects() {
        let h = Harness::new();

        let report = dispatch_batch(&h.context, &batch(&["jobs/foo/other/x"])).await;

        assert_eq!(report.records[0].outcome, Outcome::Ignored);
        assert_eq!(report.records[0].event, "ignored");
        assert!(h.store.writes().is_empty());
        assert!(h.fleet.calls().is_empty());
    }

    #[tokio::test]
    async fn test_failure_does_not_block_siblings() {
        let h = Harness::new();
        h.store.insert(BUCKET, "jobs/t1/terminate/i-abc", b"i-abc");

        // No frozen manifest for t9, so the completion check fails
        let report = dispatch_batch(
            &h.context,
            &batch(&["jobs/t9/results/out.0.i-x", "jobs/t1/terminate/i-abc"]),
        )
        .await;

        assert_eq!(report.records[0].outcome, Outcome::Failed);
        assert!(report.records[0].error.is_some());
        assert_eq!(report.records[1].outcome, Outcome::Handled);
        assert_eq!(report.records[1].detail.as_deref(), Some("instance i-abc terminated"));
        assert!(report.has_failures());
        assert_eq!(h.fleet.calls(), vec![FleetCall::Terminate("i-abc".to_string())]);
    }

    #[tokio::test]
    async fn test_malformed_record_does_not_block_siblings() {
        let h = Harness::new();
        h.store.insert(BUCKET, "jobs/t1/terminate/i-abc", b"i-abc");

        let mut batch = batch(&["jobs/t1/terminate/i-abc"]);
        batch.records.insert(
            0,
            NotificationEntry::Unrecognized(serde_json::json!({
                "eventSource": "aws:sqs",
                "body": "x"
            })),
        );

        let report = dispatch_batch(&h.context, &batch).await;

        assert_eq!(report.records.len(), 2);
        assert_eq!(report.records[0].outcome, Outcome::Failed);
        assert_eq!(report.records[0].event, "unrecognized");
        assert!(report.records[0].error.as_deref().unwrap().contains("s3"));
        assert_eq!(report.records[1].outcome, Outcome::Handled);
        assert_eq!(h.fleet.calls(), vec![FleetCall::Terminate("i-abc".to_string())]);
        assert!(!h.store.contains(BUCKET, "jobs/t1/terminate/i-abc"));
    }

    #[tokio::test]
    async fn test_terminate_once_per_marker_in_mixed_batch() {
        let h = Harness::new();
        h.store.insert(BUCKET, "jobs/t1/terminate/i-abc", b"i-abc");

        dispatch_batch(
            &h.context,
            &batch(&[
                "jobs/foo/other/x",
                "jobs/t1/terminate/i-abc",
                "jobs/t1/logs/i-abc.syslog",
            ]),
        )
        .await;

        assert_eq!(h.fleet.calls(), vec![FleetCall::Terminate("i-abc".to_string())]);
        assert!(!h.store.contains(BUCKET, "jobs/t1/terminate/i-abc"));
    }

    #[tokio::test]
    async fn test_store_failure_reported() {
        let h = Harness::new();
        h.store.fail_on("manifest.json");

        let report = dispatch_batch(&h.context, &batch(&["manifest.json"])).await;

        assert_eq!(report.records[0].outcome, Outcome::Failed);
        assert_eq!(report.records[0].event, "job_start");
    }

    #[tokio::test]
    async fn test_encoded_key_is_decoded_before_routing() {
        let h = Harness::new();
        h.store.insert(BUCKET, "jobs/t1/terminate/i abc", b"x");

        let report = dispatch_batch(&h.context, &batch(&["jobs/t1/terminate/i+abc"])).await;

        assert_eq!(report.records[0].key, "jobs/t1/terminate/i abc");
        assert_eq!(h.fleet.calls(), vec![FleetCall::Terminate("i abc".to_string())]);
    }
}
