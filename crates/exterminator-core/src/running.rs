use std::thread;
use std::time::{Duration, Instant};

use sysinfo::{Process, ProcessStatus, ProcessesToUpdate, Signal, System};
use tracing::{debug, info, warn};

use crate::identity::ApplicationIdentity;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

fn refreshed() -> System {
    let mut sys = System::new();
    sys.refresh_processes(ProcessesToUpdate::All, true);
    sys
}

/// Live processes whose executable lies inside the application's bundle.
fn bundle_processes<'a>(sys: &'a System, identity: &ApplicationIdentity) -> Vec<&'a Process> {
    sys.processes()
        .values()
        .filter(|process| process.status() != ProcessStatus::Zombie)
        .filter(|process| {
            process
                .exe()
                .map(|exe| exe.starts_with(&identity.install_path))
                .unwrap_or(false)
        })
        .collect()
}

/// Whether any live process was launched from inside the application's bundle.
pub fn is_running(identity: &ApplicationIdentity) -> bool {
    let sys = refreshed();
    match bundle_processes(&sys, identity).first() {
        Some(process) => {
            debug!(
                "{} is running as pid {}",
                identity.display_name,
                process.pid()
            );
            true
        }
        None => false,
    }
}

/// Ask every process of the application to quit.
///
/// Sends SIGTERM, or SIGKILL when `force` is set. Returns `false` if any
/// process could not be signalled. Nothing running counts as success.
pub fn terminate(identity: &ApplicationIdentity, force: bool) -> bool {
    let sys = refreshed();
    let mut all_signalled = true;

    for process in bundle_processes(&sys, identity) {
        let signalled = if force {
            process.kill()
        } else {
            process.kill_with(Signal::Term).unwrap_or(false)
        };
        if signalled {
            info!("Sent {} to pid {}", if force { "SIGKILL" } else { "SIGTERM" }, process.pid());
        } else {
            warn!("Could not signal pid {} of {}", process.pid(), identity.display_name);
            all_signalled = false;
        }
    }
    all_signalled
}

/// [`terminate`], then wait up to `timeout` for the application to exit.
///
/// Returns `true` once no process of the application is left.
pub fn terminate_and_wait(identity: &ApplicationIdentity, force: bool, timeout: Duration) -> bool {
    if !terminate(identity, force) {
        return false;
    }

    let deadline = Instant::now() + timeout;
    loop {
        if !is_running(identity) {
            return true;
        }
        if Instant::now() >= deadline {
            warn!(
                "{} still running after {:.1}s",
                identity.display_name,
                timeout.as_secs_f64()
            );
            return false;
        }
        thread::sleep(POLL_INTERVAL);
    }
}
