// router.rs - command dispatch and middleware chains
//
// stonechat-ircd - single-server IRC daemon
// Copyright (C) 2024  The stonechat-ircd authors
//
// This library is free software; you can redistribute it and/or
// modify it under the terms of the GNU Lesser General Public
// License as published by the Free Software Foundation; either
// version 2.1 of the License, or (at your option) any later version.
//
// This library is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU
// Lesser General Public License for more details.
//
// You should have received a copy of the GNU Lesser General Public
// License along with this library; if not, write to the Free Software
// Foundation, Inc., 51 Franklin Street, Fifth Floor, Boston, MA  02110-1301  USA

use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::*;

use crate::client::Client;
use crate::message::Message;
use crate::reply::Reply::*;
use crate::server::Server;

/// Everything one handler invocation may touch.
pub(crate) struct Context<'a> {
    pub(crate) server: &'a Server,
    pub(crate) client: &'a Arc<Client>,
    pub(crate) msg: &'a Message<'a>,
}

impl<'a> Context<'a> {
    /// Queues a server-sourced reply to the issuing client.
    pub(crate) fn reply<T: fmt::Display>(&self, t: T) {
        self.client.send_msg(&self.server.config.name, t);
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum DispatchError {
    UnknownCommand(String),
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::UnknownCommand(command) => {
                write!(f, "Unknown command {}", command)
            }
        }
    }
}

impl Error for DispatchError {}

pub(crate) type HandlerResult = Result<(), DispatchError>;

#[async_trait]
pub(crate) trait Handler: Send + Sync {
    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult;
}

/// A middleware wraps the next step of a chain into a new handler. The
/// wrapper decides per message whether to call through; refusing means
/// sending a numeric itself and returning Ok.
pub(crate) trait Middleware: Send + Sync {
    fn wrap(&self, next: Arc<dyn Handler>) -> Arc<dyn Handler>;
}

/// Name-keyed command table. Chains are composed once at registration,
/// so registration order decides execution order: per-command middleware
/// runs last-registered first, and global middleware wraps everything
/// registered after it.
pub(crate) struct Router {
    globals: Vec<Arc<dyn Middleware>>,
    routes: HashMap<&'static str, Arc<dyn Handler>>,
}

impl Router {
    pub(crate) fn new() -> Router {
        Router {
            globals: Vec::new(),
            routes: HashMap::new(),
        }
    }

    /// Global middleware only applies to commands registered after this
    /// call.
    pub(crate) fn register_global(&mut self, middleware: Arc<dyn Middleware>) {
        self.globals.push(middleware);
    }

    pub(crate) fn register(
        &mut self,
        name: &'static str,
        handler: Arc<dyn Handler>,
        middleware: &[Arc<dyn Middleware>],
    ) {
        let mut chain = handler;
        for mw in middleware {
            chain = mw.wrap(chain);
        }
        for mw in &self.globals {
            chain = mw.wrap(chain);
        }
        self.routes.insert(name, chain);
    }

    pub(crate) async fn dispatch(&self, ctx: &Context<'_>) -> HandlerResult {
        match self.routes.get(ctx.msg.command.as_str()) {
            Some(chain) => chain.handle(ctx).await,
            None => Err(DispatchError::UnknownCommand(ctx.msg.command.clone())),
        }
    }
}

/// Logs every dispatched command. Registered globally.
pub(crate) struct TraceCommand;

struct TraceCommandChain {
    next: Arc<dyn Handler>,
}

impl Middleware for TraceCommand {
    fn wrap(&self, next: Arc<dyn Handler>) -> Arc<dyn Handler> {
        Arc::new(TraceCommandChain { next })
    }
}

#[async_trait]
impl Handler for TraceCommandChain {
    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        debug!(
            "{}: {} {:?}",
            ctx.client.source(),
            ctx.msg.command,
            ctx.msg.params
        );
        self.next.handle(ctx).await
    }
}

/// Refuses commands from unregistered connections with 451.
pub(crate) struct NeedRegistered;

struct NeedRegisteredChain {
    next: Arc<dyn Handler>,
}

impl Middleware for NeedRegistered {
    fn wrap(&self, next: Arc<dyn Handler>) -> Arc<dyn Handler> {
        Arc::new(NeedRegisteredChain { next })
    }
}

#[async_trait]
impl Handler for NeedRegisteredChain {
    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        if !ctx.client.is_registered() {
            ctx.reply(ErrNotRegistered451 {
                client: &ctx.client.display_name(),
            });
            return Ok(());
        }
        self.next.handle(ctx).await
    }
}

/// Refuses commands with fewer than N parameters with 461.
pub(crate) struct MinParams(pub(crate) usize);

struct MinParamsChain {
    min: usize,
    next: Arc<dyn Handler>,
}

impl Middleware for MinParams {
    fn wrap(&self, next: Arc<dyn Handler>) -> Arc<dyn Handler> {
        Arc::new(MinParamsChain { min: self.0, next })
    }
}

#[async_trait]
impl Handler for MinParamsChain {
    async fn handle(&self, ctx: &Context<'_>) -> HandlerResult {
        if ctx.msg.params.len() < self.min {
            ctx.reply(ErrNeedMoreParams461 {
                client: &ctx.client.display_name(),
                command: &ctx.msg.command,
            });
            return Ok(());
        }
        self.next.handle(ctx).await
    }
}
