use std::{sync::mpsc, time::Duration};

use tokio::sync::oneshot;

use crate::contexts::gesture_context::GestureSample;

/// Something that turns whatever the host's sensor sees into gesture samples.
///
/// Classifiers run on the worker thread, so they must be [`Send`]. `now` is the number of seconds
/// since the worker started.
pub trait GestureClassifier: Send + 'static {
    /// Produce the latest classification, or `None` if there is nothing new
    fn classify(&mut self, now: f64) -> Option<GestureSample>;
}

impl<F> GestureClassifier for F
where
    F: FnMut(f64) -> Option<GestureSample> + Send + 'static,
{
    fn classify(&mut self, now: f64) -> Option<GestureSample> {
        self(now)
    }
}

#[derive(Debug, Clone)]
pub(crate) enum WorkerMessage {
    GestureSampled(GestureSample),
    Error(WorkerError),
}

#[derive(Debug, Clone)]
pub(crate) enum WorkerError {
    TaskFailed(String),
}

pub(crate) struct Workers {
    pub(crate) receiver: mpsc::Receiver<WorkerMessage>,
    /// Dropping this stops the classifier thread
    _shutdown: oneshot::Sender<()>,
}

impl Workers {
    /// Run `classifier` every `period` on its own thread until this `Workers` is dropped.
    pub fn new(mut classifier: impl GestureClassifier, period: Duration) -> Self {
        let (to_engine, from_worker) = mpsc::channel();
        let (shutdown, mut stopped) = oneshot::channel::<()>();

        std::thread::spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    let _ = to_engine.send(WorkerMessage::Error(WorkerError::TaskFailed(format!(
                        "{e:?}"
                    ))));
                    return;
                }
            };

            log::info!("[TELEKINESIS_WORKER] Classifier starting, period {period:?}");
            runtime.block_on(async move {
                let start = tokio::time::Instant::now();
                let mut interval = tokio::time::interval(period.max(Duration::from_millis(1)));
                interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
                loop {
                    tokio::select! {
                        _ = &mut stopped => break,
                        _ = interval.tick() => {}
                    }
                    let Some(sample) = classifier.classify(start.elapsed().as_secs_f64()) else {
                        continue;
                    };
                    if to_engine.send(WorkerMessage::GestureSampled(sample)).is_err() {
                        // The engine has been dropped.
                        break;
                    }
                }
            });
            log::info!("[TELEKINESIS_WORKER] Classifier stopped");
        });

        Self {
            receiver: from_worker,
            _shutdown: shutdown,
        }
    }

    /// The newest sample that arrived since the last call, if any, and whether the worker has
    /// gone away. Errors reported by the worker are logged.
    pub fn drain(&self) -> (Option<GestureSample>, bool) {
        let mut latest = None;
        loop {
            match self.receiver.try_recv() {
                Ok(WorkerMessage::GestureSampled(sample)) => latest = Some(sample),
                Ok(WorkerMessage::Error(WorkerError::TaskFailed(e))) => {
                    log::error!("[TELEKINESIS_WORKER] Classifier failed: {e}");
                }
                Err(mpsc::TryRecvError::Empty) => return (latest, false),
                Err(mpsc::TryRecvError::Disconnected) => return (latest, true),
            }
        }
    }
}
