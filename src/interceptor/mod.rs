//! Configuration interceptors
//!
//! An interceptor transforms a value into a value of the same type. Agents use
//! them to post-process a finalized `Configuration` before the runtime handle
//! is built, which is how tests and integrations override options without
//! touching the code that assembled the configuration.

mod composite;

pub use composite::{composite, identity, Composite};

use crate::error::AgentError;
use std::sync::Arc;

/// A transformation from `T` to `T`
///
/// Implementations return a (possibly new) value rather than mutating shared
/// state. Any closure `Fn(T) -> Result<T, AgentError>` is an interceptor.
///
/// # Example
///
/// ```
/// use telemetry_agent::{AgentError, Interceptor};
///
/// let double = |v: u32| -> Result<u32, AgentError> { Ok(v * 2) };
/// let plus_one = |v: u32| -> Result<u32, AgentError> { Ok(v + 1) };
///
/// assert_eq!(double.then(plus_one).intercept(5), Ok(11));
/// ```
pub trait Interceptor<T>: Send + Sync {
    /// Transform `value`, or fail and abort the surrounding chain
    fn intercept(&self, value: T) -> Result<T, AgentError>;

    /// Compose `self` with `next`, applying `self` first
    fn then<I>(self, next: I) -> Composite<T>
    where
        Self: Sized + 'static,
        I: Interceptor<T> + 'static,
        T: 'static,
    {
        Composite::new(vec![
            Arc::new(self) as Arc<dyn Interceptor<T>>,
            Arc::new(next),
        ])
    }
}

impl<T, F> Interceptor<T> for F
where
    F: Fn(T) -> Result<T, AgentError> + Send + Sync,
{
    fn intercept(&self, value: T) -> Result<T, AgentError> {
        self(value)
    }
}
