//! Bounded background pipeline running classify-then-notify jobs.
//!
//! The inbound HTTP handler must acknowledge within Slack's deadline, so
//! qualifying events are handed to a fixed pool of worker tasks draining a
//! bounded queue and the response returns immediately. A full queue drops
//! the job with a warning; the caller has already been acknowledged and
//! this layer is best-effort by contract. Outcomes are logged and, when a
//! completion channel is configured, forwarded for observability.

use crate::classifier::Classifier;
use crate::slack::Notifier;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

/// A classification job: mention-stripped incident text plus reply target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncidentJob {
    pub channel: String,
    pub text: String,
    /// Delivery id, carried for log correlation.
    pub event_id: Option<String>,
}

/// Why a job failed. Notification failures carry the label that was computed
/// but never delivered, since the two cases alert differently.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("classification failed: {0:#}")]
    Classify(anyhow::Error),
    #[error("reply not delivered after classifying as {label:?}: {source:#}")]
    Notify {
        label: String,
        source: anyhow::Error,
    },
}

/// Outcome of one job, delivered on the completion channel when configured.
#[derive(Debug)]
pub struct JobOutcome {
    pub channel: String,
    pub result: Result<String, JobError>,
}

/// Handle for submitting jobs to the worker pool.
pub struct Pipeline {
    jobs: mpsc::Sender<IncidentJob>,
}

struct Workers {
    classifier: Classifier,
    notifier: Notifier,
    completions: Option<mpsc::UnboundedSender<JobOutcome>>,
}

impl Pipeline {
    /// Spawn `workers` tasks draining a queue of at most `queue_depth`
    /// pending jobs.
    pub fn start(
        classifier: Classifier,
        notifier: Notifier,
        workers: usize,
        queue_depth: usize,
        completions: Option<mpsc::UnboundedSender<JobOutcome>>,
    ) -> Self {
        let (tx, rx) = mpsc::channel::<IncidentJob>(queue_depth.max(1));
        let rx = Arc::new(tokio::sync::Mutex::new(rx));
        let shared = Arc::new(Workers {
            classifier,
            notifier,
            completions,
        });

        for _ in 0..workers.max(1) {
            let rx = Arc::clone(&rx);
            let shared = Arc::clone(&shared);
            tokio::spawn(async move {
                loop {
                    let job = rx.lock().await.recv().await;
                    let Some(job) = job else { break };
                    shared.run_job(job).await;
                }
            });
        }

        Self { jobs: tx }
    }

    /// Submit a job without blocking. Returns `false` when the queue is full
    /// and the job was dropped.
    pub fn submit(&self, job: IncidentJob) -> bool {
        match self.jobs.try_send(job) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(job)) => {
                tracing::warn!(channel = %job.channel, "pipeline queue full; dropping job");
                false
            }
            Err(mpsc::error::TrySendError::Closed(job)) => {
                tracing::error!(channel = %job.channel, "pipeline workers gone; dropping job");
                false
            }
        }
    }
}

impl Workers {
    async fn run_job(&self, job: IncidentJob) {
        tracing::debug!(
            channel = %job.channel,
            event_id = job.event_id.as_deref().unwrap_or("-"),
            "classifying incident"
        );

        let outcome = JobOutcome {
            result: self.classify_and_notify(&job).await,
            channel: job.channel,
        };
        match &outcome.result {
            Ok(label) => {
                tracing::info!(channel = %outcome.channel, label = %label, "incident classified");
            }
            Err(e @ JobError::Classify(_)) => {
                tracing::warn!(channel = %outcome.channel, "{e}");
            }
            // Inference cost was paid and the result lost: louder than a
            // classify failure.
            Err(e @ JobError::Notify { .. }) => {
                tracing::error!(channel = %outcome.channel, "{e}");
            }
        }

        if let Some(tx) = &self.completions {
            let _ = tx.send(outcome);
        }
    }

    async fn classify_and_notify(&self, job: &IncidentJob) -> Result<String, JobError> {
        let classification = self
            .classifier
            .classify(&job.text)
            .await
            .map_err(JobError::Classify)?;

        self.notifier
            .notify(&job.channel, &classification.label)
            .await
            .map_err(|source| JobError::Notify {
                label: classification.label.clone(),
                source,
            })?;

        Ok(classification.label)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
