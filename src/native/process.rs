use std::process::ExitStatus;

use tokio::process::Command;

/// Upper bound on stop rounds while freezing a process tree.
#[cfg(target_os = "linux")]
const FREEZE_ROUNDS: usize = 8;

/// Puts the command into a fresh process group led by the child itself, so
/// the child and everything it forks can be signalled at once.
pub fn isolate_group(cmd: &mut Command) {
    #[cfg(unix)]
    cmd.process_group(0);
    cmd.kill_on_drop(true);
}

/// Kills a whole process group when dropped.
///
/// Armed right after spawn, so the group is killed on every exit path: normal
/// completion (stray background children), timeout, and the owning future
/// being dropped mid-wait.
#[derive(Debug)]
pub struct ProcessGroupGuard {
    pgid: Option<u32>,
}

impl ProcessGroupGuard {
    pub fn new(pgid: Option<u32>) -> Self {
        Self { pgid }
    }

    /// Sends SIGKILL to every process of the group. Failures (most often the
    /// group being empty already) are ignored.
    pub fn kill(&self) {
        let Some(pgid) = self.pgid else {
            return;
        };
        kill_group(pgid);
    }
}

impl Drop for ProcessGroupGuard {
    fn drop(&mut self) {
        self.kill();
    }
}

#[cfg(unix)]
fn kill_group(pgid: u32) {
    let ret = unsafe { libc::killpg(pgid as libc::pid_t, libc::SIGKILL) };
    if ret == -1 {
        let err = std::io::Error::last_os_error();
        if err.raw_os_error() != Some(libc::ESRCH) {
            tracing::warn!(pgid, error = %err, "Failed to kill process group");
        }
    }
}

#[cfg(not(unix))]
fn kill_group(_pgid: u32) {}

/// Kills `root` and all of its descendants, including those that left the
/// process group with `setsid` or `setpgid`.
///
/// `root` must be an unreaped child of this process; once reaped its pid may
/// belong to something else.
#[cfg(target_os = "linux")]
pub fn kill_tree(root: u32) {
    for pid in freeze_tree(root).into_iter().rev() {
        signal(pid, libc::SIGKILL);
    }
}

#[cfg(not(target_os = "linux"))]
pub fn kill_tree(root: u32) {
    kill_group(root);
}

/// Stops `root` and then its descendants round by round until no new process
/// shows up, so nothing forks away while the tree is killed. Returns the
/// stopped pids, parents first.
#[cfg(target_os = "linux")]
fn freeze_tree(root: u32) -> Vec<u32> {
    let mut frozen = vec![root];
    signal(root, libc::SIGSTOP);

    for _ in 0..FREEZE_ROUNDS {
        let fresh: Vec<u32> = descendants(root)
            .into_iter()
            .filter(|pid| !frozen.contains(pid))
            .collect();
        if fresh.is_empty() {
            break;
        }
        for pid in fresh {
            signal(pid, libc::SIGSTOP);
            frozen.push(pid);
        }
    }

    frozen
}

/// Live descendants of `root` found through the parent links in `/proc`,
/// breadth first.
#[cfg(target_os = "linux")]
pub fn descendants(root: u32) -> Vec<u32> {
    use std::collections::{HashMap, VecDeque};

    let Ok(entries) = std::fs::read_dir("/proc") else {
        return Vec::new();
    };

    let mut children: HashMap<u32, Vec<u32>> = HashMap::new();
    for entry in entries.flatten() {
        let Some(pid) = entry.file_name().to_str().and_then(|name| name.parse().ok()) else {
            continue;
        };
        if let Some(ppid) = parent_of(pid) {
            children.entry(ppid).or_default().push(pid);
        }
    }

    let mut found = Vec::new();
    let mut queue = VecDeque::from([root]);
    while let Some(pid) = queue.pop_front() {
        for &child in children.get(&pid).into_iter().flatten() {
            found.push(child);
            queue.push_back(child);
        }
    }

    found
}

#[cfg(target_os = "linux")]
fn parent_of(pid: u32) -> Option<u32> {
    let stat = std::fs::read_to_string(format!("/proc/{}/stat", pid)).ok()?;
    // comm may contain spaces and parentheses; the fields after it do not.
    let (_, rest) = stat.rsplit_once(')')?;
    rest.split_whitespace().nth(1)?.parse().ok()
}

#[cfg(target_os = "linux")]
fn signal(pid: u32, sig: libc::c_int) {
    let ret = unsafe { libc::kill(pid as libc::pid_t, sig) };
    if ret == -1 {
        let err = std::io::Error::last_os_error();
        if err.raw_os_error() != Some(libc::ESRCH) {
            tracing::warn!(pid, sig, error = %err, "Failed to signal process");
        }
    }
}

/// Exit code of a finished process. Signal deaths map to `128 + signal`, the
/// shell convention.
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    -1
}
