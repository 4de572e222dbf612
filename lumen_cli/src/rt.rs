//! Memory locking for real-time operation (Linux/macOS mlockall).

use crate::cli::RtLock;

#[cfg(any(target_os = "linux", target_os = "macos"))]
pub fn setup_rt_once(rt: bool, lock: RtLock) {
    use std::sync::OnceLock;
    static RT_ONCE: OnceLock<()> = OnceLock::new();

    if !rt {
        return;
    }
    RT_ONCE.get_or_init(|| match try_apply_mem_lock(lock) {
        Ok(()) => match lock {
            RtLock::None => tracing::info!("RT: memory locking disabled (none)"),
            RtLock::Current => tracing::info!("RT: memory lock = current"),
            RtLock::All => tracing::info!("RT: memory lock = all (current|future)"),
        },
        Err(err) => tracing::warn!(error = %err, "mlockall failed; continuing unlocked"),
    });
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
pub fn setup_rt_once(rt: bool, _lock: RtLock) {
    if rt {
        tracing::warn!("--rt is not supported on this platform; ignoring");
    }
}

#[cfg(any(target_os = "linux", target_os = "macos"))]
fn is_retryable_memlock_error(err: &std::io::Error) -> bool {
    matches!(err.raw_os_error(), Some(code) if code == libc::EPERM || code == libc::ENOMEM || code == libc::EAGAIN)
}

#[cfg(any(target_os = "linux", target_os = "macos"))]
fn memlock_limit_hint() -> Option<String> {
    let mut rlim = std::mem::MaybeUninit::<libc::rlimit>::uninit();
    // SAFETY: getrlimit writes a full rlimit on success and we only read it then.
    let rc = unsafe { libc::getrlimit(libc::RLIMIT_MEMLOCK, rlim.as_mut_ptr()) };
    if rc != 0 {
        return None;
    }
    // SAFETY: rc == 0 above.
    let cur = unsafe { rlim.assume_init() }.rlim_cur;
    if cur == libc::RLIM_INFINITY {
        Some("memlock limit: unlimited".to_string())
    } else {
        Some(format!("memlock limit: {} KiB", cur / 1024))
    }
}

#[cfg(any(target_os = "linux", target_os = "macos"))]
fn mlockall(flags: libc::c_int) -> std::io::Result<()> {
    // SAFETY: mlockall takes no pointers.
    let rc = unsafe { libc::mlockall(flags) };
    if rc != 0 {
        Err(std::io::Error::last_os_error())
    } else {
        Ok(())
    }
}

/// Apply process memory locking according to the selected mode.
///
/// `All` that fails for lack of privileges or memory falls back to `Current`.
#[cfg(any(target_os = "linux", target_os = "macos"))]
fn try_apply_mem_lock(lock: RtLock) -> eyre::Result<()> {
    use libc::{MCL_CURRENT, MCL_FUTURE};

    let attempted_all = matches!(lock, RtLock::All);
    let err = match lock {
        RtLock::None => return Ok(()),
        RtLock::Current => mlockall(MCL_CURRENT),
        RtLock::All => mlockall(MCL_CURRENT | MCL_FUTURE),
    };
    let Err(err) = err else {
        return Ok(());
    };

    let mut fallback_err: Option<std::io::Error> = None;
    if attempted_all && is_retryable_memlock_error(&err) {
        match mlockall(MCL_CURRENT) {
            Ok(()) => {
                tracing::warn!(error = %err, "mlockall(current|future) failed; locked current pages only");
                return Ok(());
            }
            Err(e2) => fallback_err = Some(e2),
        }
    }

    let mut msg = format!(
        "mlockall({}) failed: {err}",
        if attempted_all {
            "current|future"
        } else {
            "current"
        }
    );
    if is_retryable_memlock_error(&err) {
        if let Some(h) = memlock_limit_hint() {
            msg.push_str("; ");
            msg.push_str(&h);
        }
        msg.push_str("; hint: needs CAP_IPC_LOCK (or root) and sufficient 'ulimit -l'");
        if let Some(e2) = fallback_err {
            msg.push_str(&format!("; fallback mlockall(current) also failed: {e2}"));
        }
    }
    Err(eyre::eyre!(msg))
}
