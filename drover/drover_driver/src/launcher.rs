//! Starting and stopping driver processes.
//!
//! The [`Launcher`] trait is the seam between the factory and the operating
//! system. [`ProcessLauncher`] spawns real driver executables; tests plug in
//! their own implementation.

use std::env;
use std::ffi::OsString;
use std::io;
use std::net::{Ipv4Addr, TcpListener};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use drover_core::FactoryError;
use tracing::{debug, info, warn};

use crate::backend::Backend;
use crate::capabilities::Capabilities;

/// Everything needed to bring up one session.
#[derive(Debug, Clone)]
pub struct LaunchSpec {
    pub backend: Backend,

    /// Explicitly configured driver executable, if any
    pub driver_path: Option<PathBuf>,

    pub capabilities: Capabilities,
}

/// A running (or attached) driver.
#[derive(Debug)]
pub struct LaunchedDriver {
    /// WebDriver endpoint the session talks to
    pub endpoint: String,

    /// Child process, for local drivers
    pub child: Option<Child>,
}

impl LaunchedDriver {
    /// A driver that is not owned by this process.
    pub fn attached(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            child: None,
        }
    }

    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().map(Child::id)
    }
}

/// Starts and stops drivers.
pub trait Launcher: Send + Sync + 'static {
    /// Bring up a driver for `spec`.
    fn launch(&self, spec: &LaunchSpec) -> Result<LaunchedDriver, FactoryError>;

    /// Stop a driver returned by `launch`.
    fn terminate(&self, driver: LaunchedDriver) -> Result<(), FactoryError>;
}

/// Launches driver executables as child processes.
#[derive(Debug, Clone, Default)]
pub struct ProcessLauncher {
    search_path: Option<OsString>,
}

impl ProcessLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look executables up in `search_path` instead of `PATH`.
    pub fn with_search_path(search_path: impl Into<OsString>) -> Self {
        Self {
            search_path: Some(search_path.into()),
        }
    }

    /// Locate the executable for `spec`.
    pub fn locate(&self, spec: &LaunchSpec) -> Result<PathBuf, FactoryError> {
        let configured = match &spec.backend {
            Backend::PhantomJs => spec
                .capabilities
                .phantomjs_exec_path
                .clone()
                .or_else(|| spec.driver_path.clone()),
            _ => spec.driver_path.clone(),
        };

        if let Some(path) = configured {
            return if path.is_file() {
                Ok(path)
            } else {
                Err(FactoryError::DriverNotFound(path.display().to_string()))
            };
        }

        let name = spec
            .backend
            .driver_binary()
            .ok_or_else(|| FactoryError::DriverNotFound(spec.backend.to_string()))?;
        let search_path = self.search_path.clone().or_else(|| env::var_os("PATH"));
        find_executable(name, search_path.as_deref())
            .ok_or_else(|| FactoryError::DriverNotFound(name.to_string()))
    }

    fn command(program: &Path, spec: &LaunchSpec, port: u16) -> Command {
        let mut command = Command::new(program);
        match spec.backend {
            Backend::PhantomJs => {
                command.args(&spec.capabilities.phantomjs_cli_args);
                match &spec.capabilities.ghostdriver_path {
                    Some(ghostdriver) => {
                        command.arg(ghostdriver).arg(format!("--port={}", port));
                        command.args(&spec.capabilities.ghostdriver_cli_args);
                    }
                    None => {
                        command.arg(format!("--webdriver={}", port));
                        command.args(
                            spec.capabilities
                                .ghostdriver_cli_args
                                .iter()
                                .map(|a| a.replacen("--logLevel", "--webdriver-loglevel", 1)),
                        );
                    }
                }
            }
            Backend::Firefox => {
                command.arg("--port").arg(port.to_string());
            }
            _ => {
                command.arg(format!("--port={}", port));
            }
        }
        command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        command
    }
}

impl Launcher for ProcessLauncher {
    fn launch(&self, spec: &LaunchSpec) -> Result<LaunchedDriver, FactoryError> {
        if let Backend::Remote(uri) = &spec.backend {
            debug!("Attaching to remote WebDriver at {}", uri);
            return Ok(LaunchedDriver::attached(uri.to_string()));
        }

        let program = self.locate(spec)?;
        let port = free_port()?;
        let child = Self::command(&program, spec, port).spawn().map_err(|e| {
            FactoryError::LaunchFailed(format!("{}: {}", program.display(), e))
        })?;

        info!(
            "Started {} (pid {}) on port {}",
            program.display(),
            child.id(),
            port
        );

        Ok(LaunchedDriver {
            endpoint: format!("http://127.0.0.1:{}", port),
            child: Some(child),
        })
    }

    fn terminate(&self, driver: LaunchedDriver) -> Result<(), FactoryError> {
        let Some(mut child) = driver.child else {
            debug!("Detaching from {}", driver.endpoint);
            return Ok(());
        };

        let pid = child.id();
        match child.kill() {
            Ok(()) => {}
            // Already exited
            Err(e) if e.kind() == io::ErrorKind::InvalidInput => {}
            Err(e) => {
                warn!("Failed to kill driver pid {}: {}", pid, e);
                return Err(FactoryError::TeardownFailed(format!("kill pid {}: {}", pid, e)));
            }
        }

        child
            .wait()
            .map_err(|e| FactoryError::TeardownFailed(format!("wait pid {}: {}", pid, e)))?;
        debug!("Driver pid {} stopped", pid);
        Ok(())
    }
}

/// Search `search_path` for an executable file called `name`.
pub fn find_executable(name: &str, search_path: Option<&std::ffi::OsStr>) -> Option<PathBuf> {
    let search_path = search_path?;
    env::split_paths(search_path)
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Ask the OS for a currently unused local port.
fn free_port() -> Result<u16, FactoryError> {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))?;
    Ok(listener.local_addr()?.port())
}
