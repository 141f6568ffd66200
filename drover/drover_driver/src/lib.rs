//! # Drover Driver
//!
//! Browser automation sessions for the drover pool: configuration loading,
//! backend selection, WebDriver capabilities and the [`DriverFactory`] that
//! starts and stops driver processes.
//!
//! ```no_run
//! use drover_driver::{session_pool, DriverConfig};
//!
//! let config = DriverConfig::load(None)?;
//! let pool = session_pool(config)?;
//!
//! let session = pool.acquire()?;
//! println!("talking to {}", session.endpoint());
//! drop(session);
//!
//! pool.shutdown()?.into_result()?;
//! # Ok::<(), drover_core::Error>(())
//! ```

pub mod backend;
pub mod capabilities;
pub mod config;
pub mod factory;
pub mod launcher;
pub mod slots;

use std::sync::Arc;

use drover_core::ConfigError;
use drover_pool::ResourcePool;

pub use backend::Backend;
pub use capabilities::Capabilities;
pub use config::{DriverConfig, CONFIG_ENV_VAR, DEFAULT_CONFIG_PATH};
pub use factory::{DriverFactory, DriverSession};
pub use launcher::{LaunchSpec, LaunchedDriver, Launcher, ProcessLauncher};
pub use slots::SlotAllocator;

/// A pool of browser sessions.
pub type SessionPool<L = ProcessLauncher> = ResourcePool<DriverFactory<L>>;

/// Build a pool of sessions that spawns real driver processes.
pub fn session_pool(config: DriverConfig) -> Result<Arc<SessionPool>, ConfigError> {
    session_pool_with(config, ProcessLauncher::new())
}

/// Build a pool of sessions using `launcher`.
pub fn session_pool_with<L: Launcher>(
    config: DriverConfig,
    launcher: L,
) -> Result<Arc<SessionPool<L>>, ConfigError> {
    config.validate()?;
    let pool_config = config.pool.clone();
    ResourcePool::new(DriverFactory::with_launcher(config, launcher), pool_config)
}
