//! Fan-out / fan-in of one collection round.
//!
//! Every worker gets its own channel sender; the learner keeps the only
//! receiver and waits for exactly one message per worker, bounded by a
//! single deadline for the whole round.

use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use burn::tensor::backend::Backend;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use tracing::{debug, warn};

use crate::environment::{EnvError, Environment};
use crate::error::{Result, TrainError};

use super::trajectory::Trajectory;
use super::worker::{spawn_worker, WorkerMessage, WorkerTask};

/// Wait for `expected` worker messages, all before `timeout` elapses.
///
/// The first worker error is returned as-is. If the deadline passes, or
/// every sender is dropped before `expected` messages arrived, the round
/// fails with [`TrainError::WorkerTimeout`] or
/// [`TrainError::WorkersDisconnected`].
pub fn gather_trajectories(
    receiver: &Receiver<WorkerMessage>,
    expected: usize,
    timeout: Duration,
) -> Result<Vec<Trajectory>> {
    let deadline = Instant::now() + timeout;
    let mut trajectories = Vec::with_capacity(expected);

    while trajectories.len() < expected {
        match receiver.recv_deadline(deadline) {
            Ok(Ok(trajectory)) => trajectories.push(trajectory),
            Ok(Err(e)) => return Err(e),
            Err(RecvTimeoutError::Timeout) => {
                return Err(TrainError::WorkerTimeout {
                    received: trajectories.len(),
                    expected,
                    timeout,
                })
            }
            Err(RecvTimeoutError::Disconnected) => {
                return Err(TrainError::WorkersDisconnected {
                    received: trajectories.len(),
                    expected,
                })
            }
        }
    }

    Ok(trajectories)
}

/// Join finished worker threads, reporting the first one that panicked.
pub fn join_workers(handles: Vec<(usize, JoinHandle<()>)>) -> Result<()> {
    let mut panicked = None;
    for (worker_id, handle) in handles {
        if handle.join().is_err() && panicked.is_none() {
            panicked = Some(worker_id);
        }
    }
    match panicked {
        Some(worker_id) => Err(TrainError::WorkerPanicked { worker_id }),
        None => Ok(()),
    }
}

/// Run one collection round: spawn a worker per task, gather, join.
///
/// Trajectories are validated against the task's step count and returned
/// ordered by worker id. On timeout the stragglers are left detached; they
/// exit on their own once their send fails.
pub fn collect_rollouts<B, E, F>(
    tasks: Vec<WorkerTask>,
    env_factory: F,
    device: &B::Device,
    timeout: Duration,
) -> Result<Vec<Trajectory>>
where
    B: Backend,
    E: Environment + 'static,
    F: Fn(usize) -> std::result::Result<E, EnvError> + Clone + Send + 'static,
{
    let expected = tasks.len();
    let steps: Vec<(usize, usize)> = tasks.iter().map(|t| (t.worker_id, t.steps)).collect();
    let (sender, receiver) = crossbeam_channel::bounded::<WorkerMessage>(expected.max(1));

    let mut handles = Vec::with_capacity(expected);
    for task in tasks {
        let worker_id = task.worker_id;
        let handle = spawn_worker::<B, E, F>(task, env_factory.clone(), device.clone(), sender.clone())?;
        handles.push((worker_id, handle));
    }
    // Only workers hold senders now, so a dead worker shows up as a disconnect
    drop(sender);

    let mut trajectories = match gather_trajectories(&receiver, expected, timeout) {
        Ok(trajectories) => trajectories,
        Err(e @ TrainError::WorkerTimeout { .. }) => {
            warn!(error = %e, "abandoning rollout round");
            return Err(e);
        }
        Err(e @ TrainError::WorkersDisconnected { .. }) => {
            join_workers(handles)?;
            return Err(e);
        }
        Err(e) => return Err(e),
    };
    join_workers(handles)?;

    for trajectory in &trajectories {
        let expected_len = steps
            .iter()
            .find(|(id, _)| *id == trajectory.worker_id)
            .map(|(_, s)| *s)
            .ok_or_else(|| TrainError::InvalidTrajectory {
                worker_id: trajectory.worker_id,
                message: "no task was issued for this worker".to_string(),
            })?;
        trajectory.validate(expected_len)?;
    }
    trajectories.sort_by_key(|t| t.worker_id);

    debug!(workers = expected, "rollout round complete");
    Ok(trajectories)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::MockEnv;
    use crate::model::ActorCriticConfig;
    use crate::rollout::snapshot::ModelSnapshot;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    fn tasks(num_workers: usize, steps: usize) -> Vec<WorkerTask> {
        let device = Default::default();
        let model_config = ActorCriticConfig::new(35, vec![-1.0, -1.0], vec![1.0, 1.0]).with_hidden_dim(8);
        let snapshot = ModelSnapshot::capture(&model_config.init::<TestBackend>(&device, 3)).unwrap();
        (0..num_workers)
            .map(|worker_id| WorkerTask {
                worker_id,
                seed: 100 + worker_id as u64,
                steps,
                model_config: model_config.clone(),
                snapshot: snapshot.clone(),
            })
            .collect()
    }

    #[test]
    fn test_gather_times_out() {
        let (sender, receiver) = crossbeam_channel::unbounded::<WorkerMessage>();
        sender.send(Ok(Trajectory::default())).unwrap();

        let err = gather_trajectories(&receiver, 2, Duration::from_millis(20)).unwrap_err();
        assert!(matches!(
            err,
            TrainError::WorkerTimeout {
                received: 1,
                expected: 2,
                ..
            }
        ));
        drop(sender);
    }

    #[test]
    fn test_gather_detects_disconnect() {
        let (sender, receiver) = crossbeam_channel::unbounded::<WorkerMessage>();
        sender.send(Ok(Trajectory::default())).unwrap();
        drop(sender);

        let err = gather_trajectories(&receiver, 3, Duration::from_secs(5)).unwrap_err();
        assert!(matches!(
            err,
            TrainError::WorkersDisconnected {
                received: 1,
                expected: 3
            }
        ));
    }

    #[test]
    fn test_gather_forwards_worker_error() {
        let (sender, receiver) = crossbeam_channel::unbounded::<WorkerMessage>();
        sender
            .send(Err(TrainError::Env {
                worker_id: Some(4),
                source: EnvError::Simulation("boom".to_string()),
            }))
            .unwrap();

        let err = gather_trajectories(&receiver, 2, Duration::from_secs(5)).unwrap_err();
        assert!(matches!(err, TrainError::Env { worker_id: Some(4), .. }));
    }

    #[test]
    fn test_join_reports_panicked_worker() {
        let ok = std::thread::spawn(|| {});
        let bad = std::thread::spawn(|| panic!("worker blew up"));
        let err = join_workers(vec![(0, ok), (1, bad)]).unwrap_err();
        assert!(matches!(err, TrainError::WorkerPanicked { worker_id: 1 }));
    }

    #[test]
    fn test_collect_rollouts_is_ordered_and_complete() {
        let device = Default::default();
        let trajectories = collect_rollouts::<TestBackend, _, _>(
            tasks(3, 16),
            |_| Ok(MockEnv::driving_like(5)),
            &device,
            Duration::from_secs(60),
        )
        .unwrap();

        assert_eq!(trajectories.len(), 3);
        for (i, trajectory) in trajectories.iter().enumerate() {
            assert_eq!(trajectory.worker_id, i);
            assert_eq!(trajectory.len(), 16);
            assert_eq!(trajectory.observations.len(), 16 * 35);
            assert_eq!(trajectory.actions.len(), 16 * 2);
        }
    }

    #[test]
    fn test_collect_rollouts_surfaces_env_failure() {
        let device = Default::default();
        let err = collect_rollouts::<TestBackend, _, _>(
            tasks(2, 10),
            |worker_id| {
                let env = MockEnv::driving_like(50);
                Ok(if worker_id == 1 { env.with_fail_at_step(4) } else { env })
            },
            &device,
            Duration::from_secs(60),
        )
        .unwrap_err();

        assert!(matches!(err, TrainError::Env { worker_id: Some(1), .. }));
    }

    #[test]
    fn test_collect_rollouts_surfaces_factory_failure() {
        let device = Default::default();
        let err = collect_rollouts::<TestBackend, MockEnv, _>(
            tasks(2, 10),
            |_| Err(EnvError::Creation("missing scenario".to_string())),
            &device,
            Duration::from_secs(60),
        )
        .unwrap_err();

        assert!(matches!(
            err,
            TrainError::Env {
                source: EnvError::Creation(_),
                ..
            }
        ));
    }
}
