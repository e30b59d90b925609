#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use bridge_core::scheduler::{SharedWorkerPool, WorkerPool};
    use bridge_core::types::BridgeError;
    use crossbeam::channel::unbounded;

    #[test]
    fn runs_every_job() {
        let pool = WorkerPool::new(4).unwrap();
        assert_eq!(pool.size(), 4);

        let counter = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = unbounded();
        for _ in 0..100 {
            let counter = Arc::clone(&counter);
            let tx = tx.clone();
            pool.push(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                tx.send(()).unwrap();
            })
            .unwrap();
        }
        for _ in 0..100 {
            rx.recv_timeout(Duration::from_secs(5)).unwrap();
        }
        assert_eq!(counter.load(Ordering::SeqCst), 100);
        pool.shutdown();
    }

    #[test]
    fn single_worker_drains_in_fifo_order() {
        let pool = WorkerPool::new(1).unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for i in 0..50 {
            let seen = Arc::clone(&seen);
            pool.push(move || seen.lock().unwrap().push(i)).unwrap();
        }
        // Joins after the queue is drained.
        pool.shutdown();
        assert_eq!(*seen.lock().unwrap(), (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn panicking_job_does_not_kill_worker() {
        let pool = WorkerPool::new(1).unwrap();
        let (tx, rx) = unbounded();
        pool.push(|| panic!("job blew up")).unwrap();
        pool.push(move || tx.send(42).unwrap()).unwrap();
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 42);
        pool.shutdown();
    }

    #[test]
    fn zero_workers_is_a_config_error() {
        assert!(matches!(WorkerPool::new(0), Err(BridgeError::Config(_))));
    }

    #[test]
    fn shared_pool_is_lazy_and_resettable() {
        let shared = SharedWorkerPool::new(2);
        assert!(!shared.is_initialized());
        assert_eq!(shared.size(), 2);

        let (tx, rx) = unbounded();
        let first = tx.clone();
        shared.push(move || first.send("before reset").unwrap()).unwrap();
        assert!(shared.is_initialized());
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), "before reset");

        shared.reset();
        assert!(!shared.is_initialized());

        shared.push(move || tx.send("after reset").unwrap()).unwrap();
        assert!(shared.is_initialized());
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), "after reset");
    }

    #[test]
    fn reset_drops_queued_jobs() {
        let shared = SharedWorkerPool::new(1);
        let (started_tx, started_rx) = unbounded::<()>();
        let (gate_tx, gate_rx) = unbounded::<()>();
        let (ran_tx, ran_rx) = unbounded::<u32>();

        // Occupy the only worker, then queue a job behind it.
        let blocker = ran_tx.clone();
        shared
            .push(move || {
                started_tx.send(()).unwrap();
                gate_rx.recv().ok();
                blocker.send(1).unwrap();
            })
            .unwrap();
        started_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        shared.push(move || ran_tx.send(2).unwrap()).unwrap();

        shared.reset();
        gate_tx.send(()).unwrap();

        assert_eq!(ran_rx.recv_timeout(Duration::from_secs(5)).unwrap(), 1);
        // The old worker exits once its running job returns; the queued one never runs.
        assert!(ran_rx.recv_timeout(Duration::from_millis(300)).is_err());
    }
}
