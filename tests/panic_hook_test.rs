use parking_lot::Mutex;
use std::sync::Arc;

use plugin_verifier::logging::install_panic_hook;
use plugin_verifier::tasks::*;

struct FnTask<F> {
    name: &'static str,
    body: F,
}

impl<F, O> Task for FnTask<F>
where
    F: FnOnce(&TaskContext) -> TaskResult<O> + Send + 'static,
    O: Send + 'static,
{
    type Output = O;

    fn name(&self) -> String {
        self.name.to_string()
    }

    fn execute(self, context: &TaskContext) -> TaskResult<O> {
        (self.body)(context)
    }
}

#[derive(Default)]
struct RecordingListener {
    finished: Mutex<Vec<TaskStatus>>,
}

impl TaskListener for RecordingListener {
    fn on_completed(&self, status: &TaskStatus) {
        self.finished.lock().push(status.clone());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_panic_fails_only_its_own_task() {
    install_panic_hook();

    let scheduler = TaskScheduler::new(2);
    let listener = Arc::new(RecordingListener::default());
    scheduler.add_listener(listener.clone());

    let panicking = scheduler.submit(FnTask {
        name: "panicking",
        body: |_: &TaskContext| -> TaskResult<()> { panic!("malformed class") },
    });
    let healthy = scheduler.submit(FnTask {
        name: "healthy",
        body: |_: &TaskContext| Ok("verified"),
    });

    match panicking.join().await {
        Err(TaskError::Panicked { message }) => assert!(message.contains("malformed class")),
        other => panic!("unexpected outcome {:?}", other),
    }
    assert_eq!(healthy.join().await, Ok("verified"));

    let finished = listener.finished.lock();
    let panicked = finished.iter().find(|status| status.name == "panicking").unwrap();
    assert_eq!(panicked.state, TaskState::Error);
    let sibling = finished.iter().find(|status| status.name == "healthy").unwrap();
    assert_eq!(sibling.state, TaskState::Success);
}
