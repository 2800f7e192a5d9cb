//! Method routing.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use quadrpc_common::{Outcome, Pattern};
use quadrpc_core::CallHandle;

pub type HandlerFuture = BoxFuture<'static, Outcome>;

/// Serves one call from its responder end.
///
/// The returned outcome ends the call unless the handler already ended it
/// (for example by closing its side of a server stream).
pub trait Handler: Send + Sync + 'static {
    fn call(&self, call: CallHandle) -> HandlerFuture;
}

impl<F, Fut> Handler for F
where
    F: Fn(CallHandle) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Outcome> + Send + 'static,
{
    fn call(&self, call: CallHandle) -> HandlerFuture {
        Box::pin((self)(call))
    }
}

/// A registered method.
#[derive(Clone)]
pub struct Route {
    pattern: Pattern,
    handler: Arc<dyn Handler>,
}

impl Route {
    pub fn pattern(&self) -> Pattern {
        self.pattern
    }

    pub fn handler(&self) -> Arc<dyn Handler> {
        Arc::clone(&self.handler)
    }
}

/// Maps method names to handlers and their call patterns.
///
/// # Example
///
/// ```
/// use quadrpc_common::{CallError, Outcome, Pattern, Payload};
/// use quadrpc_core::CallHandle;
/// use quadrpc_server::Router;
///
/// async fn echo(call: CallHandle) -> Outcome {
///     let request = call.recv().await.map_err(CallError::into_status)?;
///     Ok(request.unwrap_or(Payload::Null))
/// }
///
/// let router = Router::new().route("echo.once", Pattern::Unary, echo);
/// assert!(router.get("echo.once").is_some());
/// ```
#[derive(Clone, Default)]
pub struct Router {
    routes: HashMap<String, Route>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `method`. A later registration of the same
    /// method replaces the earlier one.
    pub fn route<H>(mut self, method: impl Into<String>, pattern: Pattern, handler: H) -> Self
    where
        H: Handler,
    {
        let method = method.into();
        tracing::debug!(%method, %pattern, "registered method");
        self.routes.insert(
            method,
            Route {
                pattern,
                handler: Arc::new(handler),
            },
        );
        self
    }

    /// Adds every route of `other`.
    pub fn merge(mut self, other: Router) -> Self {
        self.routes.extend(other.routes);
        self
    }

    pub fn get(&self, method: &str) -> Option<&Route> {
        self.routes.get(method)
    }

    /// Registered method names with their pattern names, sorted.
    pub fn methods(&self) -> BTreeMap<String, String> {
        self.routes
            .iter()
            .map(|(name, route)| (name.clone(), route.pattern.to_string()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quadrpc_common::Status;

    async fn unimplemented(_call: CallHandle) -> Outcome {
        Err(Status::unimplemented("not yet"))
    }

    #[test]
    fn test_route_and_lookup() {
        let router = Router::new()
            .route("a.one", Pattern::Unary, unimplemented)
            .route("a.many", Pattern::ServerStream, unimplemented);

        assert_eq!(router.len(), 2);
        assert_eq!(router.get("a.many").map(Route::pattern), Some(Pattern::ServerStream));
        assert!(router.get("a.none").is_none());
    }

    #[test]
    fn test_merge_and_methods() {
        let left = Router::new().route("x.sum", Pattern::Unary, unimplemented);
        let right = Router::new().route("y.chat", Pattern::BidiStream, unimplemented);
        let merged = left.merge(right);

        let methods: Vec<_> = merged.methods().into_iter().collect();
        assert_eq!(
            methods,
            vec![
                ("x.sum".to_string(), "unary".to_string()),
                ("y.chat".to_string(), "bidi_stream".to_string()),
            ]
        );
    }

    #[test]
    fn test_reregistering_replaces() {
        let router = Router::new()
            .route("m", Pattern::Unary, unimplemented)
            .route("m", Pattern::ClientStream, unimplemented);
        assert_eq!(router.len(), 1);
        assert_eq!(router.get("m").map(Route::pattern), Some(Pattern::ClientStream));
    }
}
