//! The browser session factory plugged into the pool.

use std::time::{Duration, Instant};

use drover_core::{FactoryError, HandleFactory, SessionId};
use tracing::{debug, info, warn};

use crate::backend::Backend;
use crate::capabilities::Capabilities;
use crate::config::DriverConfig;
use crate::launcher::{LaunchSpec, LaunchedDriver, Launcher, ProcessLauncher};
use crate::slots::SlotAllocator;

/// One live automation session.
#[derive(Debug)]
pub struct DriverSession {
    id: SessionId,
    backend: Backend,
    capabilities: Capabilities,
    user_data_slot: Option<usize>,
    created_at: Instant,
    driver: LaunchedDriver,
}

impl DriverSession {
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    /// WebDriver endpoint of this session.
    pub fn endpoint(&self) -> &str {
        &self.driver.endpoint
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Chrome profile directory index, for chrome sessions.
    pub fn user_data_slot(&self) -> Option<usize> {
        self.user_data_slot
    }

    /// Process id of the local driver, if one was spawned.
    pub fn pid(&self) -> Option<u32> {
        self.driver.pid()
    }

    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }
}

/// Builds [`DriverSession`]s from a [`DriverConfig`].
///
/// Configuration problems (unknown backend, missing executable path) are
/// reported by `create`, so they surface from the pool's `acquire`.
#[derive(Debug)]
pub struct DriverFactory<L: Launcher = ProcessLauncher> {
    config: DriverConfig,
    launcher: L,
    slots: SlotAllocator,
}

impl DriverFactory<ProcessLauncher> {
    /// Create a factory that spawns real driver processes.
    pub fn new(config: DriverConfig) -> Self {
        Self::with_launcher(config, ProcessLauncher::new())
    }
}

impl<L: Launcher> DriverFactory<L> {
    pub fn with_launcher(config: DriverConfig, launcher: L) -> Self {
        Self {
            config,
            launcher,
            slots: SlotAllocator::new(),
        }
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    /// Number of Chrome profile directories currently in use.
    pub fn profiles_in_use(&self) -> usize {
        self.slots.in_use()
    }

    /// Resolve the backend and base capabilities without starting anything.
    pub fn resolve(&self) -> Result<(Backend, Capabilities), FactoryError> {
        let backend = Backend::select(&self.config.driver)?;
        let capabilities = Capabilities::resolve(&self.config, &backend)?;
        Ok((backend, capabilities))
    }

    fn driver_path(&self, backend: &Backend) -> Option<std::path::PathBuf> {
        match backend {
            Backend::Chrome => self.config.chrome.driver_path.clone(),
            Backend::Firefox => self.config.firefox.driver_path.clone(),
            Backend::PhantomJs => self.config.phantomjs.exec_path.clone(),
            Backend::Remote(_) => None,
        }
    }
}

impl<L: Launcher> HandleFactory for DriverFactory<L> {
    type Handle = DriverSession;

    fn create(&self) -> Result<DriverSession, FactoryError> {
        let (backend, base) = self.resolve()?;

        let (capabilities, user_data_slot) = match backend {
            Backend::Chrome => {
                let slot = self.slots.allocate();
                debug!("Using Chrome profile slot {}", slot);
                (
                    base.with_user_data_dir(&self.config.sessions_path_prefix, slot),
                    Some(slot),
                )
            }
            _ => (base, None),
        };

        let spec = LaunchSpec {
            driver_path: self.driver_path(&backend),
            backend,
            capabilities,
        };

        let driver = match self.launcher.launch(&spec) {
            Ok(driver) => driver,
            Err(e) => {
                if let Some(slot) = user_data_slot {
                    self.slots.release(slot);
                }
                warn!("Failed to start {} session: {}", spec.backend, e);
                return Err(e);
            }
        };

        let session = DriverSession {
            id: SessionId::new(),
            backend: spec.backend,
            capabilities: spec.capabilities,
            user_data_slot,
            created_at: Instant::now(),
            driver,
        };

        info!(
            "Created {} session {} at {}",
            session.backend,
            session.id,
            session.endpoint()
        );
        Ok(session)
    }

    fn destroy(&self, session: DriverSession) -> Result<(), FactoryError> {
        let DriverSession {
            id,
            user_data_slot,
            driver,
            ..
        } = session;

        let result = self.launcher.terminate(driver);
        if let Some(slot) = user_data_slot {
            self.slots.release(slot);
        }

        match &result {
            Ok(()) => debug!("Destroyed session {}", id),
            Err(e) => warn!("Session {} did not shut down cleanly: {}", id, e),
        }
        result
    }

    fn describe(&self) -> String {
        format!("DriverFactory({})", self.config.driver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeLauncher {
        launched: AtomicUsize,
        terminated: AtomicUsize,
    }

    impl Launcher for FakeLauncher {
        fn launch(&self, spec: &LaunchSpec) -> Result<LaunchedDriver, FactoryError> {
            let n = self.launched.fetch_add(1, Ordering::SeqCst);
            Ok(LaunchedDriver::attached(format!("fake://{}/{}", spec.backend, n)))
        }

        fn terminate(&self, _driver: LaunchedDriver) -> Result<(), FactoryError> {
            self.terminated.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn factory(driver: &str) -> DriverFactory<FakeLauncher> {
        let mut config = DriverConfig::default();
        config.driver = driver.to_string();
        config.phantomjs.exec_path = Some(PathBuf::from("/usr/bin/phantomjs"));
        DriverFactory::with_launcher(config, FakeLauncher::default())
    }

    #[test]
    fn test_unknown_backend_fails_create() {
        let factory = factory("opera");
        assert!(matches!(
            factory.create(),
            Err(FactoryError::UnknownBackend(name)) if name == "opera"
        ));
        assert_eq!(factory.launcher().launched.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_chrome_profiles_are_distinct_and_reused() {
        let factory = factory("chrome");

        let a = factory.create().unwrap();
        let b = factory.create().unwrap();
        assert_eq!(a.user_data_slot(), Some(0));
        assert_eq!(b.user_data_slot(), Some(1));
        assert!(b
            .capabilities()
            .chrome_args
            .contains(&"user-data-dir=/tmp/selenium1".to_string()));

        factory.destroy(a).unwrap();
        assert_eq!(factory.profiles_in_use(), 1);

        let c = factory.create().unwrap();
        assert_eq!(c.user_data_slot(), Some(0));
    }

    #[test]
    fn test_phantomjs_session() {
        let factory = factory("phantomjs");
        let session = factory.create().unwrap();

        assert_eq!(session.backend(), &Backend::PhantomJs);
        assert_eq!(session.user_data_slot(), None);
        assert_eq!(session.endpoint(), "fake://phantomjs/0");

        factory.destroy(session).unwrap();
        assert_eq!(factory.launcher().terminated.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_describe_names_driver() {
        assert_eq!(factory("firefox").describe(), "DriverFactory(firefox)");
    }
}
