//! Real-time setup of the process and of the playback thread.
//!
//! ## Setup Sequence
//! 1. `mlockall(MCL_CURRENT | MCL_FUTURE)`: lock all pages (process-wide).
//! 2. Spawn the playback thread with a dedicated stack of `stack_size` bytes.
//! 3. Inside that thread, before any waypoint is played:
//!    - `sched_setaffinity`: optional pin to one CPU core,
//!    - `pthread_setschedparam(SCHED_FIFO, priority)`: explicit policy,
//!    - prefault the first stack pages.
//!
//! The privileged calls only run with the `rt` feature. Without it they are
//! no-ops so the player works on development hosts without CAP_SYS_NICE.

use std::thread::{Scope, ScopedJoinHandle};

use rtplay_common::config::RtSection;
use rtplay_common::consts::{DEFAULT_RT_PRIORITY, DEFAULT_RT_STACK_SIZE};
use thiserror::Error;
use tracing::{debug, info};

/// Name of the playback thread.
pub const PLAYBACK_THREAD_NAME: &str = "rtplay-playback";

/// Bytes of stack touched before playback starts.
const PREFAULT_STACK_BYTES: usize = 8 * 1024;

/// Errors during RT setup.
#[derive(Debug, Error)]
pub enum RtError {
    /// Configuration rejected before any system call.
    #[error("invalid RT configuration: {0}")]
    InvalidConfig(String),

    /// `mlockall` failed.
    #[error("mlockall failed: {0}")]
    MemoryLock(nix::errno::Errno),

    /// Scheduling policy/priority could not be applied.
    #[error("scheduling setup failed: {0}")]
    Scheduling(String),

    /// CPU affinity could not be applied.
    #[error("CPU affinity setup failed: {0}")]
    Affinity(String),

    /// The playback thread could not be created.
    #[error("failed to spawn playback thread: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Scheduling policy of the playback thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedPolicy {
    /// Fixed-priority preemptive, first-in first-out.
    Fifo,
    /// Fixed-priority preemptive, time-sliced.
    RoundRobin,
    /// Default time-sharing policy (priority must be 0).
    Other,
}

impl SchedPolicy {
    /// Raw libc policy value.
    pub fn as_raw(self) -> libc::c_int {
        match self {
            Self::Fifo => libc::SCHED_FIFO,
            Self::RoundRobin => libc::SCHED_RR,
            Self::Other => libc::SCHED_OTHER,
        }
    }

    /// Valid static priority range for this policy on Linux.
    pub fn priority_range(self) -> std::ops::RangeInclusive<i32> {
        match self {
            Self::Fifo | Self::RoundRobin => 1..=99,
            Self::Other => 0..=0,
        }
    }
}

/// Whether the playback thread takes its own scheduling attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedInheritance {
    /// Apply `policy` and `priority` from [`RtConfig`].
    Explicit,
    /// Keep whatever the spawning thread had.
    Inherit,
}

/// Real-time attributes handed to [`spawn_playback`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtConfig {
    /// Scheduling policy.
    pub policy: SchedPolicy,
    /// Static priority within the policy's range.
    pub priority: i32,
    /// Dedicated stack size [bytes].
    pub stack_size: usize,
    /// Explicit or inherited scheduling.
    pub inheritance: SchedInheritance,
    /// Optional CPU core to pin the thread to.
    pub cpu_core: Option<usize>,
    /// Lock current and future pages before playback.
    pub lock_memory: bool,
}

impl Default for RtConfig {
    fn default() -> Self {
        Self {
            policy: SchedPolicy::Fifo,
            priority: DEFAULT_RT_PRIORITY,
            stack_size: DEFAULT_RT_STACK_SIZE,
            inheritance: SchedInheritance::Explicit,
            cpu_core: None,
            lock_memory: true,
        }
    }
}

impl From<&RtSection> for RtConfig {
    fn from(section: &RtSection) -> Self {
        Self {
            priority: section.priority,
            stack_size: section.stack_size,
            cpu_core: section.cpu_core,
            lock_memory: section.lock_memory,
            ..Self::default()
        }
    }
}

impl RtConfig {
    /// Check the attributes without touching the OS.
    pub fn validate(&self) -> Result<(), RtError> {
        if self.inheritance == SchedInheritance::Explicit
            && !self.policy.priority_range().contains(&self.priority)
        {
            return Err(RtError::InvalidConfig(format!(
                "priority {} outside {:?} for {:?}",
                self.priority,
                self.policy.priority_range(),
                self.policy
            )));
        }
        if self.stack_size < libc::PTHREAD_STACK_MIN {
            return Err(RtError::InvalidConfig(format!(
                "stack size {} below PTHREAD_STACK_MIN ({})",
                self.stack_size,
                libc::PTHREAD_STACK_MIN
            )));
        }
        Ok(())
    }
}

/// True when the privileged RT calls are compiled in.
pub const fn realtime_enabled() -> bool {
    cfg!(feature = "rt")
}

/// Lock all current and future memory pages (process-wide).
///
/// No-op when `lock_memory` is false or the `rt` feature is not enabled.
pub fn lock_memory(config: &RtConfig) -> Result<(), RtError> {
    if !config.lock_memory {
        debug!("Memory locking disabled by configuration");
        return Ok(());
    }
    rt_mlockall()
}

#[cfg(feature = "rt")]
fn rt_mlockall() -> Result<(), RtError> {
    use nix::sys::mman::{MlockAllFlags, mlockall};
    mlockall(MlockAllFlags::MCL_CURRENT | MlockAllFlags::MCL_FUTURE)
        .map_err(RtError::MemoryLock)?;
    info!("Memory locked (MCL_CURRENT | MCL_FUTURE)");
    Ok(())
}

#[cfg(not(feature = "rt"))]
fn rt_mlockall() -> Result<(), RtError> {
    debug!("mlockall skipped (rt feature disabled)");
    Ok(())
}

/// Pin the calling thread to a specific CPU core.
#[cfg(feature = "rt")]
fn rt_set_affinity(cpu: usize) -> Result<(), RtError> {
    use nix::sched::{CpuSet, sched_setaffinity};
    use nix::unistd::Pid;

    let mut cpuset = CpuSet::new();
    cpuset
        .set(cpu)
        .map_err(|e| RtError::Affinity(format!("CpuSet::set({cpu}) failed: {e}")))?;
    sched_setaffinity(Pid::from_raw(0), &cpuset)
        .map_err(|e| RtError::Affinity(format!("sched_setaffinity failed: {e}")))?;
    Ok(())
}

#[cfg(not(feature = "rt"))]
fn rt_set_affinity(_cpu: usize) -> Result<(), RtError> {
    Ok(())
}

/// Apply policy and priority to the calling thread.
#[cfg(feature = "rt")]
fn rt_set_scheduler(policy: SchedPolicy, priority: i32) -> Result<(), RtError> {
    let param = libc::sched_param {
        sched_priority: priority,
    };
    // SAFETY: `param` is a valid sched_param and pthread_self() is the calling thread.
    let ret = unsafe { libc::pthread_setschedparam(libc::pthread_self(), policy.as_raw(), &param) };
    if ret != 0 {
        let err = nix::errno::Errno::from_raw(ret);
        return Err(RtError::Scheduling(format!(
            "pthread_setschedparam({policy:?}, {priority}) failed: {err}"
        )));
    }
    Ok(())
}

#[cfg(not(feature = "rt"))]
fn rt_set_scheduler(_policy: SchedPolicy, _priority: i32) -> Result<(), RtError> {
    Ok(())
}

/// Touch the first stack pages so the playback loop does not fault them in.
fn prefault_stack() {
    let mut buf = [0u8; PREFAULT_STACK_BYTES];
    for byte in buf.iter_mut() {
        // SAFETY: `byte` is a valid, exclusive reference into `buf`.
        unsafe { core::ptr::write_volatile(byte, 0xFF) };
    }
    core::hint::black_box(&buf);
}

/// Apply the RT attributes to the calling thread.
///
/// Called from inside the playback thread before the engine runs.
pub fn apply_to_current_thread(config: &RtConfig) -> Result<(), RtError> {
    if let Some(cpu) = config.cpu_core {
        rt_set_affinity(cpu)?;
    }
    match config.inheritance {
        SchedInheritance::Explicit => rt_set_scheduler(config.policy, config.priority)?,
        SchedInheritance::Inherit => debug!("Scheduling inherited from spawning thread"),
    }
    prefault_stack();
    Ok(())
}

/// Spawn `body` on a dedicated thread configured by `config`.
///
/// The thread lives in `scope`, so `body` may borrow data owned by the
/// caller. RT attributes are applied before `body` runs; if that fails
/// `body` is never called and the error is returned through the join handle.
pub fn spawn_playback<'scope, 'env, F, T>(
    scope: &'scope Scope<'scope, 'env>,
    config: &RtConfig,
    body: F,
) -> Result<ScopedJoinHandle<'scope, Result<T, RtError>>, RtError>
where
    F: FnOnce() -> T + Send + 'scope,
    T: Send + 'scope,
{
    config.validate()?;
    let thread_config = config.clone();

    let handle = std::thread::Builder::new()
        .name(PLAYBACK_THREAD_NAME.to_string())
        .stack_size(config.stack_size)
        .spawn_scoped(scope, move || {
            apply_to_current_thread(&thread_config)?;
            info!(
                "Playback thread ready (policy={:?}, priority={}, stack={}B, cpu={:?}, rt={})",
                thread_config.policy,
                thread_config.priority,
                thread_config.stack_size,
                thread_config.cpu_core,
                realtime_enabled()
            );
            Ok(body())
        })
        .map_err(RtError::Spawn)?;

    Ok(handle)
}
