//! Live monitoring sessions: bounded frame queue and worker tasks.
//!
//! The capture side never blocks: frames go through a bounded queue that
//! drops its oldest entry on overflow, trading completeness for freshness.
//! Worker tasks drain the queue and run the full frame pipeline; audio and
//! gesture inputs bypass the queue and hit the engine directly on their own
//! cadence.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::Frame;
use crate::triggers::GestureSample;
use crate::MonitorEngine;

/// Bounded frame queue with drop-oldest overflow.
struct FrameQueue {
    frames: Mutex<VecDeque<Frame>>,
    capacity: usize,
    notify: Notify,
}

impl FrameQueue {
    fn new(capacity: usize) -> Self {
        Self {
            frames: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            notify: Notify::new(),
        }
    }

    /// Enqueue a frame, returning whether an older frame was dropped.
    fn push(&self, frame: Frame) -> bool {
        let dropped = {
            let mut frames = self.frames.lock();
            let dropped = if frames.len() == self.capacity {
                frames.pop_front();
                true
            } else {
                false
            };
            frames.push_back(frame);
            dropped
        };
        self.notify.notify_one();
        dropped
    }

    /// Dequeue the next frame, waiting until one arrives or the stop flag
    /// is raised. Remaining frames are drained before stopping.
    async fn pop(&self, stop: &AtomicBool) -> Option<Frame> {
        loop {
            let notified = self.notify.notified();
            if let Some(frame) = self.frames.lock().pop_front() {
                return Some(frame);
            }
            if stop.load(Ordering::SeqCst) {
                return None;
            }
            notified.await;
        }
    }
}

/// A running monitoring session over a shared engine.
///
/// Dropping the session without calling [`shutdown`](Self::shutdown) aborts
/// nothing; workers keep draining until the stop flag is raised.
pub struct MonitoringSession {
    engine: Arc<MonitorEngine>,
    queue: Arc<FrameQueue>,
    stop: Arc<AtomicBool>,
    workers: Vec<JoinHandle<()>>,
}

impl MonitoringSession {
    /// Spawn `worker_count` frame workers against the engine.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(engine: Arc<MonitorEngine>, worker_count: usize) -> Self {
        let queue = Arc::new(FrameQueue::new(engine.config().queue_capacity));
        let stop = Arc::new(AtomicBool::new(false));

        let workers = (0..worker_count.max(1))
            .map(|worker| {
                let engine = engine.clone();
                let queue = queue.clone();
                let stop = stop.clone();
                tokio::spawn(async move {
                    debug!(worker, "frame worker started");
                    while let Some(frame) = queue.pop(&stop).await {
                        match engine.process_frame(&frame) {
                            Ok((_, Some(alert))) => engine.dispatch_alert(&alert).await,
                            Ok(_) => {}
                            Err(err) => warn!(worker, error = %err, "frame rejected"),
                        }
                    }
                    debug!(worker, "frame worker stopped");
                })
            })
            .collect();

        info!(workers = worker_count.max(1), "monitoring session started");
        Self {
            engine,
            queue,
            stop,
            workers,
        }
    }

    /// Submit a frame for processing. Never blocks; on queue overflow the
    /// oldest queued frame is dropped and counted.
    pub fn submit_frame(&self, frame: Frame) {
        if self.queue.push(frame) {
            self.engine.note_dropped_frame();
            debug!("frame queue full, dropped oldest frame");
        }
    }

    /// Run an audio buffer through the engine's help detector.
    pub async fn submit_audio(&self, pcm: &[i16], sample_rate: u32) -> bool {
        self.engine.process_audio(pcm, sample_rate).await
    }

    /// Run a gesture sample through the engine's gesture detector.
    pub async fn submit_gesture(&self, sample: Option<&GestureSample>) -> bool {
        self.engine.process_gesture(sample).await
    }

    /// The engine this session runs against.
    pub fn engine(&self) -> &Arc<MonitorEngine> {
        &self.engine
    }

    /// Whether shutdown has been requested.
    pub fn is_stopping(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// Raise the stop flag, drain queued frames, and wait for every worker
    /// to finish. In-flight inference is never interrupted mid-frame.
    pub async fn shutdown(self) {
        self.stop.store(true, Ordering::SeqCst);
        self.queue.notify.notify_waiters();
        for worker in self.workers {
            if let Err(err) = worker.await {
                warn!(error = %err, "frame worker panicked during shutdown");
            }
        }
        info!("monitoring session stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SimulatedBackend;
    use crate::domain::RiskLevel;
    use crate::EngineConfig;

    fn frame() -> Frame {
        Frame::new(vec![0u8; 64 * 48 * 3], 64, 48, 3)
    }

    fn engine(lean: f64) -> Arc<MonitorEngine> {
        Arc::new(
            MonitorEngine::builder(EngineConfig::default())
                .register_backend(Box::new(SimulatedBackend::with_lean("sim", lean)))
                .build()
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_session_processes_submitted_frames() {
        let engine = engine(0.0);
        let session = MonitoringSession::start(engine.clone(), 2);

        for _ in 0..4 {
            session.submit_frame(frame());
        }
        session.shutdown().await;

        let status = engine.status();
        assert_eq!(status.frames_processed, 4);
        assert_eq!(status.falls_detected, 0);
    }

    #[tokio::test]
    async fn test_fall_frames_reach_the_fusion_machine() {
        let engine = engine(40.0);
        let session = MonitoringSession::start(engine.clone(), 1);
        session.submit_frame(frame());
        session.shutdown().await;

        let status = engine.status();
        assert_eq!(status.falls_detected, 1);
        assert_eq!(status.alerts_emitted, 1);
        assert_eq!(
            engine.alert_history(10)[0].risk_level(),
            RiskLevel::Critical
        );
    }

    #[tokio::test]
    async fn test_overflow_drops_oldest_and_counts() {
        let engine = Arc::new(
            MonitorEngine::builder(EngineConfig {
                queue_capacity: 2,
                ..EngineConfig::default()
            })
            .register_backend(Box::new(SimulatedBackend::upright("sim")))
            .build()
            .unwrap(),
        );

        // Queue is filled before any worker exists to drain it.
        let queue = FrameQueue::new(engine.config().queue_capacity);
        assert!(!queue.push(frame()));
        assert!(!queue.push(frame()));
        assert!(queue.push(frame()));
        assert_eq!(queue.frames.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_audio_path_through_session() {
        let engine = engine(0.0);
        let session = MonitoringSession::start(engine.clone(), 1);

        let loud: Vec<i16> = (0..1600)
            .map(|i| if i % 2 == 0 { 30_000 } else { -30_000 })
            .collect();
        assert!(session.submit_audio(&loud, 16_000).await);
        session.shutdown().await;

        assert_eq!(engine.status().alerts_emitted, 1);
    }

    #[tokio::test]
    async fn test_shutdown_drains_queue() {
        let engine = engine(0.0);
        let session = MonitoringSession::start(engine.clone(), 1);
        for _ in 0..3 {
            session.submit_frame(frame());
        }
        session.shutdown().await;
        assert_eq!(engine.status().frames_processed, 3);
    }
}
