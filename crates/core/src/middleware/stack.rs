//! Chain composition and execution.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::Instrument;

use super::{Action, Context, Endpoint, Middleware, MiddlewareRegistry, Outcome};
use crate::error::{DocumentError, DocumentResult};

/// Continuation handed to each interceptor: the rest of the chain plus the
/// operation body.
pub struct Next<'a> {
    action: Action,
    chain: &'a [Arc<dyn Middleware>],
    endpoint: &'a dyn Endpoint,
}

impl<'a> Next<'a> {
    /// `action` is the operation the chain was entered for; it is fixed for
    /// the whole run.
    pub fn new(action: Action, chain: &'a [Arc<dyn Middleware>], endpoint: &'a dyn Endpoint) -> Self {
        Self {
            action,
            chain,
            endpoint,
        }
    }

    /// Run the remaining interceptors and then the operation.
    ///
    /// Interceptors may rewrite `ctx.params` only; a context whose action no
    /// longer matches is rejected before the operation runs.
    pub async fn run(self, ctx: Context) -> DocumentResult<Outcome> {
        match self.chain.split_first() {
            Some((first, rest)) => {
                let next = Next::new(self.action, rest, self.endpoint);
                first.handle(ctx, next).await
            }
            None if ctx.action != self.action => Err(DocumentError::middleware(
                self.action,
                format!("interceptors may not change the action (got {})", ctx.action),
            )),
            None => self.endpoint.call(ctx).await,
        }
    }

    /// Number of interceptors still ahead of the operation.
    pub fn remaining(&self) -> usize {
        self.chain.len()
    }
}

/// Chains for one content type, composed once at facade construction.
pub struct Pipeline {
    uid: String,
    chains: BTreeMap<Action, Vec<Arc<dyn Middleware>>>,
}

impl Pipeline {
    pub fn compose(uid: &str, registry: &MiddlewareRegistry) -> Self {
        let chains = Action::ALL
            .iter()
            .map(|action| (*action, registry.chain_for(uid, *action)))
            .collect();
        Self {
            uid: uid.to_string(),
            chains,
        }
    }

    pub fn chain(&self, action: Action) -> &[Arc<dyn Middleware>] {
        self.chains.get(&action).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn middleware_names(&self, action: Action) -> Vec<String> {
        self.chain(action).iter().map(|m| m.name().to_string()).collect()
    }

    /// Execute one call through its chain.
    pub async fn run(&self, ctx: Context, endpoint: &dyn Endpoint) -> DocumentResult<Outcome> {
        let action = ctx.action;
        let chain = self.chain(action);
        let span = tracing::debug_span!(
            "document_operation",
            uid = %self.uid,
            action = %action,
            middleware = chain.len()
        );
        let result = Next::new(action, chain, endpoint).run(ctx).instrument(span).await;
        if let Err(err) = &result {
            tracing::debug!(uid = %self.uid, action = %action, error = %err, "Document operation failed");
        }
        result
    }
}
