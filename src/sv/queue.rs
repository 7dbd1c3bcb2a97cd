//! Background execution of payout tasks.

use tokio::{sync::Semaphore, task::JoinHandle};

use crate::{
  prelude::*,
  sv::{
    gateway::PayoutGateway,
    payout::{PayoutOutcome, payout_order},
  },
};

/// One unit of payout work: settle a single order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayoutTask {
  pub order_id: i32,
}

#[must_use = "dropping a handle detaches the task"]
pub struct TaskHandle {
  pub task: PayoutTask,
  inner: JoinHandle<Result<PayoutOutcome>>,
}

impl TaskHandle {
  pub async fn join(self) -> Result<PayoutOutcome> {
    self.inner.await.map_err(|e| {
      Error::Internal(format!(
        "payout task for order {} aborted: {e}",
        self.task.order_id
      ))
    })?
  }
}

pub trait TaskQueue: Send + Sync {
  fn submit(&self, task: PayoutTask) -> TaskHandle;
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
  pub max_attempts: u32,
  pub delay: Duration,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self { max_attempts: 3, delay: Duration::from_secs(30) }
  }
}

/// Runs payout tasks on the tokio runtime, at most `workers` at a time.
/// Retryable failures are rescheduled until the policy gives up.
#[derive(Clone)]
pub struct TokioQueue {
  db: DatabaseConnection,
  gateway: Arc<dyn PayoutGateway>,
  permits: Arc<Semaphore>,
  policy: RetryPolicy,
}

impl TokioQueue {
  pub fn new(
    db: DatabaseConnection,
    gateway: Arc<dyn PayoutGateway>,
    workers: usize,
    policy: RetryPolicy,
  ) -> Self {
    Self {
      db,
      gateway,
      permits: Arc::new(Semaphore::new(workers.max(1))),
      policy,
    }
  }

  async fn run(&self, task: PayoutTask) -> Result<PayoutOutcome> {
    let mut attempt = 1;

    loop {
      let result = {
        let _permit = self
          .permits
          .acquire()
          .await
          .map_err(|_| Error::Internal("payout queue closed".into()))?;
        payout_order(&self.db, self.gateway.as_ref(), task.order_id).await
      };

      match result {
        Ok(outcome) => return Ok(outcome),
        Err(err)
          if err.is_retryable() && attempt < self.policy.max_attempts =>
        {
          warn!(
            "payout of order {} failed (attempt {}/{}), retrying in {:?}: {}",
            task.order_id, attempt, self.policy.max_attempts, self.policy.delay,
            err
          );
          attempt += 1;
          tokio::time::sleep(self.policy.delay).await;
        }
        Err(err) => {
          error!(
            "payout of order {} failed after {} attempt(s): {}",
            task.order_id, attempt, err
          );
          return Err(err);
        }
      }
    }
  }
}

impl TaskQueue for TokioQueue {
  fn submit(&self, task: PayoutTask) -> TaskHandle {
    let queue = self.clone();
    let inner = tokio::spawn(async move { queue.run(task).await });
    TaskHandle { task, inner }
  }
}
