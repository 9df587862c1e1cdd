use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};

use crate::detection::domain::emotion_classifier::ClassifyError;
use crate::detection::domain::face_locator::LocateError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StageFailure {
    Timeout(Duration),
    Busy,
    Disconnected,
}

impl From<StageFailure> for LocateError {
    fn from(f: StageFailure) -> Self {
        match f {
            StageFailure::Timeout(t) => LocateError::Timeout(t),
            StageFailure::Busy => LocateError::Busy,
            StageFailure::Disconnected => LocateError::Disconnected,
        }
    }
}

impl From<StageFailure> for ClassifyError {
    fn from(f: StageFailure) -> Self {
        match f {
            StageFailure::Timeout(t) => ClassifyError::Timeout(t),
            StageFailure::Busy => ClassifyError::Busy,
            StageFailure::Disconnected => ClassifyError::Disconnected,
        }
    }
}

/// Runs a handler on a dedicated thread and waits a bounded time per call.
///
/// A call that times out keeps running on the worker. Until its result has
/// been drained, further calls fail fast with [`StageFailure::Busy`] rather
/// than queueing behind it.
pub(crate) struct StageWorker<I, O> {
    jobs: Sender<I>,
    results: Receiver<O>,
    timeout: Duration,
    abandoned: bool,
}

impl<I: Send + 'static, O: Send + 'static> StageWorker<I, O> {
    pub(crate) fn spawn<F>(timeout: Duration, mut handler: F) -> Self
    where
        F: FnMut(I) -> O + Send + 'static,
    {
        let (job_tx, job_rx) = bounded::<I>(1);
        let (result_tx, result_rx) = bounded::<O>(1);

        thread::spawn(move || {
            for job in job_rx {
                if result_tx.send(handler(job)).is_err() {
                    break;
                }
            }
        });

        Self {
            jobs: job_tx,
            results: result_rx,
            timeout,
            abandoned: false,
        }
    }

    pub(crate) fn call(&mut self, input: I) -> Result<O, StageFailure> {
        if self.abandoned {
            match self.results.try_recv() {
                Ok(_) => self.abandoned = false,
                Err(TryRecvError::Empty) => return Err(StageFailure::Busy),
                Err(TryRecvError::Disconnected) => return Err(StageFailure::Disconnected),
            }
        }

        self.jobs
            .send(input)
            .map_err(|_| StageFailure::Disconnected)?;

        match self.results.recv_timeout(self.timeout) {
            Ok(output) => Ok(output),
            Err(RecvTimeoutError::Timeout) => {
                self.abandoned = true;
                Err(StageFailure::Timeout(self.timeout))
            }
            Err(RecvTimeoutError::Disconnected) => Err(StageFailure::Disconnected),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fast_handler_returns_result() {
        let mut worker = StageWorker::spawn(Duration::from_secs(1), |x: u32| x * 2);
        assert_eq!(worker.call(21), Ok(42));
        assert_eq!(worker.call(5), Ok(10));
    }

    #[test]
    fn test_slow_handler_times_out_then_busy_then_recovers() {
        let mut worker = StageWorker::spawn(Duration::from_millis(50), |delay_ms: u64| {
            thread::sleep(Duration::from_millis(delay_ms));
            delay_ms
        });

        assert_eq!(
            worker.call(300),
            Err(StageFailure::Timeout(Duration::from_millis(50)))
        );
        assert_eq!(worker.call(0), Err(StageFailure::Busy));

        thread::sleep(Duration::from_millis(400));
        assert_eq!(worker.call(0), Ok(0));
    }

    #[test]
    fn test_panicking_handler_disconnects() {
        let mut worker = StageWorker::spawn(Duration::from_secs(1), |fail: bool| {
            if fail {
                panic!("backend crashed");
            }
            1
        });
        assert_eq!(worker.call(true), Err(StageFailure::Disconnected));
        assert_eq!(worker.call(false), Err(StageFailure::Disconnected));
    }
}
