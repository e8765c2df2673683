//! Process hardening for a server that keeps secrets in memory.
//!
//! The cache holds plaintext secret values for the lifetime of the process.
//! A core dump would write all of them to disk, so `main` turns core dumps
//! off before the cache is primed.

/// Disable core dumps by setting `RLIMIT_CORE` to 0.
///
/// # Errors
///
/// Returns the OS error if the `setrlimit` syscall fails.
#[cfg(unix)]
pub fn disable_core_dumps() -> std::io::Result<()> {
    let rlim = libc::rlimit {
        rlim_cur: 0,
        rlim_max: 0,
    };

    // SAFETY: `setrlimit` only changes a resource limit of this process. We
    // pass a pointer to a fully initialised `rlimit` that outlives the call.
    #[allow(unsafe_code)]
    let result = unsafe { libc::setrlimit(libc::RLIMIT_CORE, &rlim) };

    if result == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

/// No-op on non-Unix platforms.
///
/// # Errors
///
/// Never fails.
#[cfg(not(unix))]
pub fn disable_core_dumps() -> std::io::Result<()> {
    Ok(())
}

#[cfg(all(test, unix))]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn core_dumps_can_be_disabled() {
        disable_core_dumps().unwrap();

        let mut rlim = libc::rlimit {
            rlim_cur: 1,
            rlim_max: 1,
        };
        // SAFETY: `getrlimit` writes into the provided, valid `rlimit`.
        #[allow(unsafe_code)]
        let result = unsafe { libc::getrlimit(libc::RLIMIT_CORE, &mut rlim) };
        assert_eq!(result, 0);
        assert_eq!(rlim.rlim_cur, 0);
    }
}
