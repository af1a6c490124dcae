//! Worker processes
//!
//! A job is a fixed-size pool of child processes running the current
//! executable. There is no shared memory and no inherited state: each child
//! rebuilds paths, settings and secrets from scratch and reaches the same
//! keystore files, serialised by the keystore's own file lock. Read-modify-
//! write races between workers are expected and legal — the stack prevents
//! corruption, not lost updates.
//!
//! Coordination surface per worker:
//!
//! - environment variables carrying job id, worker id, job name and the
//!   parent's log root;
//! - a control channel (the child's stdin) on which the parent sends
//!   [`CMD_CLOSE`] for cooperative shutdown;
//! - stdout/stderr captured into files in the worker's log directory.

use crate::context::{AppContext, BootOptions};
use crate::error::AppError;
use crate::identity::AppIdentity;
use crate::shutdown::ShutdownFlag;
use std::collections::HashMap;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, Command, Stdio};

/// The one command the control channel carries.
pub const CMD_CLOSE: &str = "CLOSE";

const ENV_SPAWNED: &str = "ARMATURE_SPAWNED";
const ENV_JOB_ID: &str = "ARMATURE_JOB_ID";
const ENV_WORKER_ID: &str = "ARMATURE_WORKER_ID";
const ENV_JOB_NAME: &str = "ARMATURE_JOB_NAME";
const ENV_PARENT_LOG: &str = "ARMATURE_PARENT_LOG";

/// The worker-identifying environment, as read inside a spawned child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerEnv {
    /// Job this worker belongs to.
    pub job_id: String,
    /// This worker's unique id.
    pub worker_id: String,
    /// Job name, for logs.
    pub job_name: String,
    /// The parent's logging root; worker logs nest beneath it.
    pub parent_log_path: PathBuf,
}

impl WorkerEnv {
    /// Read the worker environment, `None` in a main process.
    pub fn from_env() -> Option<Self> {
        if std::env::var(ENV_SPAWNED).ok().as_deref() != Some("1") {
            return None;
        }
        Some(Self {
            job_id: std::env::var(ENV_JOB_ID).ok()?,
            worker_id: std::env::var(ENV_WORKER_ID).ok()?,
            job_name: std::env::var(ENV_JOB_NAME).ok()?,
            parent_log_path: PathBuf::from(std::env::var(ENV_PARENT_LOG).ok()?),
        })
    }

    fn apply(&self, command: &mut Command) {
        command
            .env(ENV_SPAWNED, "1")
            .env(ENV_JOB_ID, &self.job_id)
            .env(ENV_WORKER_ID, &self.worker_id)
            .env(ENV_JOB_NAME, &self.job_name)
            .env(ENV_PARENT_LOG, &self.parent_log_path);
    }
}

struct WorkerHandle {
    worker_id: String,
    child: Child,
    control: Option<ChildStdin>,
}

/// One named job: N workers plus their control channels.
pub struct Job {
    job_id: String,
    job_name: String,
    worker_count: usize,
    args: Vec<String>,
    log_path: PathBuf,
    workers: Vec<WorkerHandle>,
}

impl Job {
    fn new(log_path: PathBuf, job_name: String, worker_count: usize, args: Vec<String>) -> Self {
        Self {
            job_id: uuid::Uuid::new_v4().to_string(),
            job_name,
            worker_count,
            args,
            log_path,
            workers: Vec::new(),
        }
    }

    /// The job's unique id.
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// The job's name.
    pub fn job_name(&self) -> &str {
        &self.job_name
    }

    /// Spawn the workers.
    ///
    /// Each child runs the current executable with the configured arguments
    /// and the worker environment; its stdout/stderr are captured into its
    /// log directory and its stdin becomes the control channel.
    pub fn start(&mut self) -> Result<(), AppError> {
        let exe = std::env::current_exe().map_err(|err| AppError::NoExecutable(err.to_string()))?;

        for _ in 0..self.worker_count {
            let worker_id = uuid::Uuid::new_v4().to_string();
            let worker_log_dir = self
                .log_path
                .join(format!("job-{}", self.job_id))
                .join(&worker_id);
            std::fs::create_dir_all(&worker_log_dir)?;

            let env = WorkerEnv {
                job_id: self.job_id.clone(),
                worker_id: worker_id.clone(),
                job_name: self.job_name.clone(),
                parent_log_path: self.log_path.clone(),
            };

            let mut command = Command::new(&exe);
            command
                .args(&self.args)
                .stdin(Stdio::piped())
                .stdout(std::fs::File::create(worker_log_dir.join("stdout.txt"))?)
                .stderr(std::fs::File::create(worker_log_dir.join("stderr.txt"))?);
            env.apply(&mut command);

            let mut child = command.spawn()?;
            let control = child.stdin.take();

            tracing::info!(
                "Started Worker {worker_id} for Job ID {} ({}).",
                self.job_id,
                self.job_name
            );
            self.workers.push(WorkerHandle {
                worker_id,
                child,
                control,
            });
        }
        Ok(())
    }

    /// Join every worker. Unresponsive children block here; there is no
    /// forced kill in the runtime.
    pub fn wait(&mut self) {
        for worker in &mut self.workers {
            match worker.child.wait() {
                Ok(status) => {
                    tracing::debug!("worker {} exited with {status}", worker.worker_id);
                }
                Err(err) => {
                    tracing::error!("failed waiting for worker {}: {err}", worker.worker_id);
                }
            }
        }
        tracing::info!(
            "All Workers for Job ID {} ({}) ended.",
            self.job_id,
            self.job_name
        );
    }

    /// Send [`CMD_CLOSE`] to every worker's control channel.
    pub fn close(&mut self) {
        tracing::info!("Sending Close CMD to Processes...");
        for worker in &mut self.workers {
            if let Some(control) = worker.control.as_mut() {
                if writeln!(control, "{CMD_CLOSE}").is_err() {
                    tracing::warn!("control channel to worker {} is gone", worker.worker_id);
                }
                let _ = control.flush();
            }
        }
    }
}

impl std::fmt::Debug for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job")
            .field("job_id", &self.job_id)
            .field("job_name", &self.job_name)
            .field("worker_count", &self.worker_count)
            .field("spawned", &self.workers.len())
            .finish()
    }
}

/// Creates and tracks jobs for this process.
#[derive(Debug)]
pub struct WorkerCoordinator {
    log_path: PathBuf,
    jobs: HashMap<String, Job>,
}

impl WorkerCoordinator {
    /// Coordinator rooted at the parent's logging path.
    pub fn new(log_path: impl Into<PathBuf>) -> Self {
        Self {
            log_path: log_path.into(),
            jobs: HashMap::new(),
        }
    }

    /// Allocate a job with a fresh id and per-worker control channels.
    ///
    /// `args` are handed to each child process verbatim (the application
    /// uses them to route into the right worker function).
    pub fn new_job(
        &mut self,
        job_name: impl Into<String>,
        worker_count: usize,
        args: Vec<String>,
    ) -> &mut Job {
        let job_name = job_name.into();
        let job = Job::new(self.log_path.clone(), job_name.clone(), worker_count, args);
        self.jobs.insert(job_name.clone(), job);
        self.jobs.get_mut(&job_name).expect("just inserted")
    }

    /// Fetch a previously-created job.
    pub fn get_job(&mut self, job_name: &str) -> Option<&mut Job> {
        self.jobs.get_mut(job_name)
    }
}

/// What a worker function receives.
#[derive(Debug)]
pub struct WorkerContext {
    env: WorkerEnv,
    running: ShutdownFlag,
    app: AppContext,
}

impl WorkerContext {
    /// The worker's unique id.
    pub fn worker_id(&self) -> &str {
        &self.env.worker_id
    }

    /// The job id this worker belongs to.
    pub fn job_id(&self) -> &str {
        &self.env.job_id
    }

    /// The job name.
    pub fn job_name(&self) -> &str {
        &self.env.job_name
    }

    /// The cooperative running flag; cleared when the parent sends
    /// [`CMD_CLOSE`].
    pub fn running(&self) -> &ShutdownFlag {
        &self.running
    }

    /// The worker's own application context (fresh paths, settings and
    /// secrets — nothing is shared with the parent).
    pub fn app(&self) -> &AppContext {
        &self.app
    }
}

/// Worker entry point, called at the top of `main`.
///
/// In a main process this is a cheap no-op returning `Ok(None)`. In a
/// spawned worker it rebuilds the full stack, starts the control-channel
/// monitor thread, runs `worker_fn` on the calling thread and returns
/// `Ok(Some(exit_code))` for the application to exit with.
pub fn run_worker_if_spawned<F>(
    identity: &AppIdentity,
    worker_fn: F,
) -> Result<Option<i32>, AppError>
where
    F: FnOnce(&WorkerContext),
{
    let Some(env) = WorkerEnv::from_env() else {
        return Ok(None);
    };

    let running = ShutdownFlag::new();
    let app = AppContext::initialise_spawned(identity.clone(), &env, BootOptions::default())?;

    let header = format!(
        "SPAWNED PROCESS --- {} ({}), Version: {}.",
        identity.full_name, identity.short_name, identity.version
    );
    tracing::info!("{header}");
    println!("{header}");

    spawn_control_monitor(running.clone());

    let ctx = WorkerContext { env, running, app };
    worker_fn(&ctx);
    Ok(Some(0))
}

// Daemon thread polling the control channel (stdin). `CLOSE` clears the
// running flag; end-of-stream means the parent is gone, which counts too.
fn spawn_control_monitor(running: ShutdownFlag) {
    let result = std::thread::Builder::new()
        .name("worker-control".to_string())
        .spawn(move || {
            tracing::info!("Starting Worker State Monitor Thread");
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                match line {
                    Ok(command) => match parse_control_command(&command) {
                        Some(CMD_CLOSE) => {
                            tracing::info!("Closed Process");
                            running.clear();
                            break;
                        }
                        _ => {
                            tracing::error!("Unrecognised Request: command = {command}");
                        }
                    },
                    Err(err) => {
                        tracing::error!("control channel read failed: {err}");
                        break;
                    }
                }
            }
            running.clear();
            tracing::info!("Worker State Monitor Thread Ended");
        });
    if let Err(err) = result {
        tracing::error!("could not start control monitor: {err}");
    }
}

/// Parse a control command line. Exposed for the monitor's tests.
pub(crate) fn parse_control_command(line: &str) -> Option<&'static str> {
    (line.trim() == CMD_CLOSE).then_some(CMD_CLOSE)
}
