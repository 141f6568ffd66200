//! Handle factory trait.
//!
//! A factory turns configuration into live handles and tears them down
//! again. It knows nothing about pooling: the pool decides when a handle is
//! needed and when it must go, the factory only performs the (possibly slow)
//! I/O involved.

use crate::error::FactoryError;

/// Builds and destroys the handles a pool manages.
///
/// Implementations must be safe to call from several threads, although a
/// pool only runs one `create` at a time. A factory must not keep hidden
/// state that limits how many handles can exist at once below the pool's
/// capacity.
///
/// # Examples
///
/// ```
/// use drover_core::error::FactoryError;
/// use drover_core::traits::HandleFactory;
///
/// struct Counter;
///
/// impl HandleFactory for Counter {
///     type Handle = u32;
///
///     fn create(&self) -> Result<u32, FactoryError> {
///         Ok(7)
///     }
/// }
///
/// let factory = Counter;
/// let handle = factory.create().unwrap();
/// assert!(factory.destroy(handle).is_ok());
/// ```
pub trait HandleFactory: Send + Sync + 'static {
    /// The handle type produced by this factory.
    type Handle: Send + 'static;

    /// Build one live handle.
    ///
    /// # Returns
    ///
    /// * `Ok(Handle)` - A fresh handle, owned by the caller.
    /// * `Err(FactoryError)` - If the configuration is unusable or the
    ///   backend could not be started.
    fn create(&self) -> Result<Self::Handle, FactoryError>;

    /// Tear down a handle previously produced by `create`.
    ///
    /// The default implementation drops the handle.
    fn destroy(&self, handle: Self::Handle) -> Result<(), FactoryError> {
        drop(handle);
        Ok(())
    }

    /// Short human-readable description used in log lines.
    fn describe(&self) -> String {
        std::any::type_name::<Self>().to_string()
    }
}
