use std::cmp::Reverse;
use std::sync::Arc;

use super::{Action, Middleware, Priority};

struct Registration {
    uid: Option<String>,
    action: Option<Action>,
    priority: Priority,
    middleware: Arc<dyn Middleware>,
}

impl Registration {
    fn applies_to(&self, uid: &str, action: Action) -> bool {
        self.uid.as_deref().map_or(true, |scoped| scoped == uid)
            && self.action.map_or(true, |scoped| scoped == action)
    }
}

/// Bootstrap-time collection of interceptors.
///
/// Populated by collaborators before the document manager is built, then
/// moved into it; it is never mutated while requests are served.
#[derive(Default)]
pub struct MiddlewareRegistry {
    registrations: Vec<Registration>,
}

impl MiddlewareRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an interceptor. `None` for `uid` or `action` widens the scope.
    pub fn use_middleware(
        &mut self,
        uid: Option<&str>,
        action: Option<Action>,
        middleware: impl Middleware + 'static,
        priority: Priority,
    ) -> &mut Self {
        let middleware: Arc<dyn Middleware> = Arc::new(middleware);
        tracing::debug!(
            middleware = middleware.name(),
            uid = uid.unwrap_or("*"),
            action = action.map(|a| a.as_str()).unwrap_or("*"),
            ?priority,
            "Registered document middleware"
        );
        self.registrations.push(Registration {
            uid: uid.map(str::to_string),
            action,
            priority,
            middleware,
        });
        self
    }

    /// Register at the default priority ([`Priority::Normal`]).
    pub fn register(
        &mut self,
        uid: Option<&str>,
        action: Option<Action>,
        middleware: impl Middleware + 'static,
    ) -> &mut Self {
        self.use_middleware(uid, action, middleware, Priority::default())
    }

    pub fn use_global(&mut self, middleware: impl Middleware + 'static, priority: Priority) -> &mut Self {
        self.use_middleware(None, None, middleware, priority)
    }

    pub fn use_for_uid(
        &mut self,
        uid: &str,
        middleware: impl Middleware + 'static,
        priority: Priority,
    ) -> &mut Self {
        self.use_middleware(Some(uid), None, middleware, priority)
    }

    pub fn use_for_action(
        &mut self,
        action: Action,
        middleware: impl Middleware + 'static,
        priority: Priority,
    ) -> &mut Self {
        self.use_middleware(None, Some(action), middleware, priority)
    }

    /// Interceptors applicable to one (uid, action), outermost first.
    pub fn chain_for(&self, uid: &str, action: Action) -> Vec<Arc<dyn Middleware>> {
        let mut matching: Vec<&Registration> = self
            .registrations
            .iter()
            .filter(|r| r.applies_to(uid, action))
            .collect();
        // Stable: equal priorities keep registration order.
        matching.sort_by_key(|r| Reverse(r.priority));
        matching.into_iter().map(|r| Arc::clone(&r.middleware)).collect()
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}
