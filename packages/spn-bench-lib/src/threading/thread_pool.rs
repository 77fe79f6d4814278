use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
        mpsc,
    },
    thread,
};

type Job<T> = Box<dyn (FnOnce() -> T) + Send + 'static>;

/// A fixed-size worker pool. Jobs are closures returning a value; finished
/// results accumulate behind a mutex until the caller drains them.
pub struct ThreadPool<T: Send + 'static> {
    workers: Vec<Worker>,
    sender: Option<mpsc::Sender<Job<T>>>,
    active_jobs: Arc<AtomicUsize>,
    results: Arc<Mutex<Vec<T>>>,
    joined: bool,
}

impl<T: Send + 'static> ThreadPool<T> {
    pub fn new(size: usize) -> ThreadPool<T> {
        assert!(size > 0, "thread pool needs at least one worker");

        let (sender, receiver) = mpsc::channel();
        let receiver = Arc::new(Mutex::new(receiver));
        let results = Arc::new(Mutex::new(vec![]));
        let active_jobs = Arc::new(AtomicUsize::new(0));

        let workers = (0..size)
            .map(|id| {
                Worker::new(
                    id,
                    Arc::clone(&receiver),
                    Arc::clone(&results),
                    Arc::clone(&active_jobs),
                )
            })
            .collect();

        ThreadPool {
            workers,
            sender: Some(sender),
            active_jobs,
            results,
            joined: false,
        }
    }

    /// Schedules a job. Panics if the pool was already joined.
    pub fn schedule<F>(&self, f: F)
    where
        F: FnOnce() -> T,
        F: Send + 'static,
    {
        self.active_jobs.fetch_add(1, Ordering::SeqCst);

        match &self.sender {
            Some(sender) => sender.send(Box::new(f)).unwrap(),
            None => panic!("cannot schedule jobs after joining the thread pool"),
        }
    }

    /// Drains the results of all finished jobs.
    pub fn take_finished(&self) -> Vec<T> {
        self.results.lock().unwrap().drain(..).collect()
    }

    pub fn active_jobs(&self) -> usize {
        self.active_jobs.load(Ordering::SeqCst)
    }

    /// Blocks until every scheduled job has finished. Returns immediately
    /// after the pool was joined.
    pub fn wait_for_idle(&self) {
        if self.joined {
            return;
        }
        while self.active_jobs() > 0 {
            thread::sleep(std::time::Duration::from_millis(1));
        }
    }

    /// Waits for all jobs and shuts the workers down. The pool cannot
    /// schedule new jobs afterwards.
    pub fn join(&mut self) {
        if self.joined {
            return;
        }
        self.joined = true;

        drop(self.sender.take());

        for worker in &mut self.workers {
            if let Some(thread) = worker.thread.take()
                && thread.join().is_err()
            {
                eprintln!("worker {} panicked", worker.id);
            }
        }
    }
}

impl<T: Send + 'static> Drop for ThreadPool<T> {
    fn drop(&mut self) {
        self.join();
    }
}

struct Worker {
    id: usize,
    thread: Option<thread::JoinHandle<()>>,
}

impl Worker {
    fn new<T: Send + 'static>(
        id: usize,
        receiver: Arc<Mutex<mpsc::Receiver<Job<T>>>>,
        results: Arc<Mutex<Vec<T>>>,
        active_jobs: Arc<AtomicUsize>,
    ) -> Worker {
        let thread = thread::spawn(move || {
            loop {
                let job = match receiver.lock().unwrap().recv() {
                    Ok(job) => job,
                    Err(_) => break,
                };

                let result = job();

                results.lock().unwrap().push(result);
                active_jobs.fetch_sub(1, Ordering::SeqCst);
            }
        });

        Worker {
            id,
            thread: Some(thread),
        }
    }
}
