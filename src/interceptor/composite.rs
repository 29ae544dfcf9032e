//! Ordered composition of interceptors

use super::Interceptor;
use crate::error::AgentError;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// An interceptor that applies a sequence of interceptors in order
///
/// Each interceptor's output is the next one's input. The first failure stops
/// the chain and is returned unchanged; later interceptors never run.
/// An empty composite is the identity.
pub struct Composite<T> {
    interceptors: Vec<Arc<dyn Interceptor<T>>>,
}

impl<T> Composite<T> {
    /// Create a composite from an ordered sequence
    pub fn new(interceptors: Vec<Arc<dyn Interceptor<T>>>) -> Self {
        Self { interceptors }
    }

    /// Append an interceptor to the end of the chain
    pub fn push(&mut self, interceptor: Arc<dyn Interceptor<T>>) {
        self.interceptors.push(interceptor);
    }

    /// Number of interceptors in the chain
    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    /// Returns true if the chain is the identity
    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }
}

impl<T> Clone for Composite<T> {
    fn clone(&self) -> Self {
        Self {
            interceptors: self.interceptors.clone(),
        }
    }
}

impl<T> Default for Composite<T> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<T> fmt::Debug for Composite<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Composite")
            .field("len", &self.interceptors.len())
            .finish()
    }
}

impl<T> Interceptor<T> for Composite<T> {
    fn intercept(&self, value: T) -> Result<T, AgentError> {
        let mut current = value;
        for (index, interceptor) in self.interceptors.iter().enumerate() {
            current = interceptor.intercept(current).inspect_err(|e| {
                debug!(index, error = %e, "Interceptor chain aborted");
            })?;
        }
        Ok(current)
    }
}

impl<T> FromIterator<Arc<dyn Interceptor<T>>> for Composite<T> {
    fn from_iter<I: IntoIterator<Item = Arc<dyn Interceptor<T>>>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Compose an ordered sequence of interceptors into one
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use telemetry_agent::interceptor::{composite, Interceptor};
/// use telemetry_agent::AgentError;
///
/// let add_one: Arc<dyn Interceptor<i32>> = Arc::new(|v: i32| -> Result<i32, AgentError> { Ok(v + 1) });
/// let triple: Arc<dyn Interceptor<i32>> = Arc::new(|v: i32| -> Result<i32, AgentError> { Ok(v * 3) });
///
/// assert_eq!(composite(vec![add_one, triple]).intercept(1), Ok(6));
/// ```
pub fn composite<T>(interceptors: impl IntoIterator<Item = Arc<dyn Interceptor<T>>>) -> Composite<T> {
    interceptors.into_iter().collect()
}

/// The interceptor that returns its input unchanged
pub fn identity<T>() -> Composite<T> {
    Composite::default()
}
