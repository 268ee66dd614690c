//! wsadmin process runner
//!
//! Each payload is written to its own temporary file and handed to
//! `wsadmin.sh -lang jython -f <file>`. Output goes to temporary files as
//! well, which lets the runner poll for exit without a reader thread per
//! pipe.

use crate::error::{Error, Result};
use crate::layout::ProfileLayout;
use declarative::{CommandOutput, ScriptRunner};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Runs Jython payloads through a profile's wsadmin launcher
#[derive(Debug, Clone)]
pub struct WsadminRunner {
    wsadmin: PathBuf,
    credentials: Option<(String, String)>,
    timeout: Option<Duration>,
}

impl WsadminRunner {
    /// Runner for the launcher of a deployment manager profile.
    ///
    /// Fails if the launcher does not exist.
    pub fn new(layout: &ProfileLayout) -> Result<Self> {
        Self::with_launcher(layout.wsadmin())
    }

    /// Runner for an explicit launcher path
    pub fn with_launcher(wsadmin: PathBuf) -> Result<Self> {
        if !wsadmin.is_file() {
            return Err(Error::WsadminNotFound(wsadmin));
        }
        Ok(Self {
            wsadmin,
            credentials: None,
            timeout: None,
        })
    }

    /// Pass `-user`/`-password` to wsadmin
    pub fn credentials(mut self, user: &str, password: &str) -> Self {
        self.credentials = Some((user.to_string(), password.to_string()));
        self
    }

    /// Kill the interpreter after `timeout`; `None` waits forever
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn command(&self, script: &Path, run_as: Option<&str>) -> Command {
        let mut cmd = match run_as.filter(|user| !is_current_user(user)) {
            Some(user) => {
                let mut cmd = Command::new("sudo");
                cmd.args(["-n", "-u", user]).arg(&self.wsadmin);
                cmd
            }
            None => Command::new(&self.wsadmin),
        };

        cmd.args(["-lang", "jython"]);
        if let Some((user, password)) = &self.credentials {
            cmd.args(["-user", user, "-password", password]);
        }
        cmd.arg("-f").arg(script);
        cmd
    }

    fn wait(&self, child: &mut Child) -> Result<ExitStatus> {
        let Some(limit) = self.timeout else {
            return Ok(child.wait()?);
        };

        let started = Instant::now();
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(status);
            }
            if started.elapsed() >= limit {
                log::warn!("wsadmin exceeded {}s, killing it", limit.as_secs());
                // The process may have exited between the poll and the kill
                let _ = child.kill();
                let _ = child.wait();
                return Err(Error::Timeout { after: limit });
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    fn execute(&self, script: &str, run_as: Option<&str>) -> Result<CommandOutput> {
        let mut payload = tempfile::Builder::new()
            .prefix("wasconf-")
            .suffix(".py")
            .tempfile()?;
        payload.write_all(script.as_bytes())?;
        payload.flush()?;
        share_with_other_users(payload.path())?;

        let mut stdout = tempfile::tempfile()?;
        let mut stderr = tempfile::tempfile()?;

        let mut cmd = self.command(payload.path(), run_as);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::from(stdout.try_clone()?))
            .stderr(Stdio::from(stderr.try_clone()?));

        log::info!(
            "running {}{} -lang jython -f {}",
            run_as.map(|u| format!("(as {u}) ")).unwrap_or_default(),
            self.wsadmin.display(),
            payload.path().display()
        );

        let mut child = cmd.spawn().map_err(|source| Error::Spawn {
            program: self.wsadmin.display().to_string(),
            source,
        })?;
        let status = self.wait(&mut child)?;

        Ok(CommandOutput {
            stdout: read_back(&mut stdout)?,
            stderr: read_back(&mut stderr)?,
            success: status.success(),
            code: status.code(),
        })
    }
}

impl ScriptRunner for WsadminRunner {
    fn run(&self, script: &str, run_as: Option<&str>) -> declarative::Result<CommandOutput> {
        Ok(self.execute(script, run_as)?)
    }
}

fn read_back(file: &mut File) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    file.seek(SeekFrom::Start(0))?;
    file.read_to_end(&mut buf)?;
    Ok(buf)
}

fn is_current_user(user: &str) -> bool {
    std::env::var("USER")
        .or_else(|_| std::env::var("LOGNAME"))
        .is_ok_and(|current| current == user)
}

/// Payload files are created private; wsadmin may run as someone else
#[cfg(unix)]
fn share_with_other_users(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o644))?;
    Ok(())
}

#[cfg(not(unix))]
fn share_with_other_users(_path: &Path) -> Result<()> {
    Ok(())
}
