use std::sync::Arc;

use futures::stream::FuturesUnordered;
use tokio::{
    sync::mpsc::{self, Receiver, Sender},
    task::JoinHandle,
};
use tokio_stream::StreamExt;
use uuid::Uuid;

use crate::{
    constants::RES_TX_ERR,
    core::{
        domain::{ScoringResult, SubmissionRequest},
        grader::Grader,
    },
};

/// Snapshots buffered per submission before its run waits on the forwarder.
const PROGRESS_BUFFER: usize = 8;

#[derive(Clone, Debug)]
pub struct Submission {
    pub id: Uuid,
    pub request: SubmissionRequest,
}

impl Submission {
    pub fn new(request: SubmissionRequest) -> Self {
        Self {
            id: Uuid::new_v4(),
            request,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct GradingUpdate {
    pub submission_id: Uuid,
    pub result: ScoringResult,
}

impl GradingUpdate {
    pub fn is_final(&self) -> bool {
        self.result.is_finished()
    }
}

/// Grades every submission received on `grade_rx` in its own task and reports
/// each stage change on `res_tx`. Finishes once `grade_rx` is closed and all
/// runs started so far are done.
#[tracing::instrument(skip_all)]
pub fn handle_grading(
    res_tx: Sender<GradingUpdate>,
    mut grade_rx: Receiver<Submission>,
    grader: Arc<Grader>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut runs = Vec::new();

        while let Some(submission) = grade_rx.recv().await {
            let grader = grader.clone();
            let res_tx = res_tx.clone();

            runs.push(tokio::spawn(async move {
                grade_submission(submission, res_tx, grader).await;
            }));
        }

        for run in runs {
            if let Err(e) = run.await {
                tracing::error!(error = %e, "Grading task failed");
            }
        }
    })
}

#[tracing::instrument(skip_all, fields(submission_id = %submission.id))]
async fn grade_submission(submission: Submission, res_tx: Sender<GradingUpdate>, grader: Arc<Grader>) {
    let submission_id = submission.id;
    let (progress_tx, mut progress_rx) = mpsc::channel(PROGRESS_BUFFER);

    let forwarder = tokio::spawn(async move {
        while let Some(result) = progress_rx.recv().await {
            let update = GradingUpdate {
                submission_id,
                result,
            };
            if res_tx.send(update).await.is_err() {
                tracing::warn!("{}", RES_TX_ERR);
                break;
            }
        }
    });

    tracing::debug!("Start grading");
    let result = grader
        .grade_reporting(&submission.request, Some(&progress_tx))
        .await;
    drop(progress_tx);
    tracing::debug!(outcome = ?result.outcome, "Submission graded");

    if let Err(e) = forwarder.await {
        tracing::error!(error = %e, "Progress forwarder failed");
    }
}

/// Grades all `requests` concurrently. Results come back in input order.
pub async fn grade_batch(grader: &Grader, requests: &[SubmissionRequest]) -> Vec<ScoringResult> {
    let mut futures: FuturesUnordered<_> = requests
        .iter()
        .enumerate()
        .map(|(idx, request)| async move { (idx, grader.grade(request).await) })
        .collect();

    let mut results: Vec<Option<ScoringResult>> = vec![None; requests.len()];
    while let Some((idx, result)) = futures.next().await {
        results[idx] = Some(result);
    }

    results.into_iter().flatten().collect()
}
