//! Name → definition tables, the active client and the observer bus.
//!
//! Definitions are looked up by name at every dispatch, so they can be
//! redefined between ticks. Last writer wins.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::SchedulerConfig;

use super::callbacks::CallbackBus;
use super::parser::ParserFn;
use super::{
    AppResult, Blackboard, ErrorKind, LlmClient, ParseError, Prompt, RequesterId, RequesterState,
    Tick,
};

/// Context builder signature: render the user text for one requester.
pub type ContextFn<W> = Box<dyn Fn(&W, RequesterId) -> String + Send + Sync>;

/// Central registry for prompt fragments, context builders, parsers and the client.
///
/// `W` is the host's world type, handed to context builders.
pub struct Registry<W> {
    config: SchedulerConfig,
    roles: HashMap<String, String>,
    personalities: HashMap<String, String>,
    contexts: HashMap<String, ContextFn<W>>,
    parsers: HashMap<String, ParserFn>,
    client: Option<Arc<dyn LlmClient>>,
    callbacks: CallbackBus,
}

impl<W> Default for Registry<W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W> Registry<W> {
    /// Create a registry with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(SchedulerConfig::default())
    }

    /// Create a registry with an explicit configuration.
    #[must_use]
    pub fn with_config(config: SchedulerConfig) -> Self {
        Self {
            config,
            roles: HashMap::new(),
            personalities: HashMap::new(),
            contexts: HashMap::new(),
            parsers: HashMap::new(),
            client: None,
            callbacks: CallbackBus::new(),
        }
    }

    /// Scheduler configuration.
    #[must_use]
    pub const fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Replace the configuration before a scheduler is built from this registry.
    pub(crate) fn set_config(&mut self, config: SchedulerConfig) {
        self.config = config;
    }

    /// Register a role prompt fragment.
    pub fn define_role(&mut self, name: impl Into<String>, text: impl Into<String>) {
        self.roles.insert(name.into(), text.into());
    }

    /// Register a personality prompt fragment.
    pub fn define_personality(&mut self, name: impl Into<String>, text: impl Into<String>) {
        self.personalities.insert(name.into(), text.into());
    }

    /// Register a context builder.
    pub fn define_context<F>(&mut self, name: impl Into<String>, build: F)
    where
        F: Fn(&W, RequesterId) -> String + Send + Sync + 'static,
    {
        self.contexts.insert(name.into(), Box::new(build));
    }

    /// Register a response parser.
    pub fn define_parser<F>(&mut self, name: impl Into<String>, parse: F)
    where
        F: Fn(&str, &mut Blackboard) -> Result<(), ParseError> + Send + Sync + 'static,
    {
        self.parsers.insert(name.into(), Box::new(parse));
    }

    /// Remove a role. Requesters naming it report `missing_definition` until it is redefined.
    pub fn remove_role(&mut self, name: &str) -> bool {
        self.roles.remove(name).is_some()
    }

    /// Remove a personality.
    pub fn remove_personality(&mut self, name: &str) -> bool {
        self.personalities.remove(name).is_some()
    }

    /// Remove a context builder.
    pub fn remove_context(&mut self, name: &str) -> bool {
        self.contexts.remove(name).is_some()
    }

    /// Remove a parser. Responses already in flight for it are discarded at harvest.
    pub fn remove_parser(&mut self, name: &str) -> bool {
        self.parsers.remove(name).is_some()
    }

    /// Set the active client, replacing any previous one.
    pub fn register_client(&mut self, client: impl LlmClient) {
        self.client = Some(Arc::new(client));
    }

    /// Set the active client from a shared handle.
    pub fn register_shared_client(&mut self, client: Arc<dyn LlmClient>) {
        self.client = Some(client);
    }

    /// Remove the active client.
    pub fn clear_client(&mut self) -> Option<Arc<dyn LlmClient>> {
        self.client.take()
    }

    /// The active client, if any.
    #[must_use]
    pub const fn client(&self) -> Option<&Arc<dyn LlmClient>> {
        self.client.as_ref()
    }

    /// Look up a role.
    #[must_use]
    pub fn role(&self, name: &str) -> Option<&str> {
        self.roles.get(name).map(String::as_str)
    }

    /// Look up a personality.
    #[must_use]
    pub fn personality(&self, name: &str) -> Option<&str> {
        self.personalities.get(name).map(String::as_str)
    }

    /// Look up a context builder.
    #[must_use]
    pub fn context(&self, name: &str) -> Option<&ContextFn<W>> {
        self.contexts.get(name)
    }

    /// Look up a parser.
    #[must_use]
    pub fn parser(&self, name: &str) -> Option<&ParserFn> {
        self.parsers.get(name)
    }

    /// Names referenced by `state` that do not resolve, formatted for the
    /// `missing_definition` message. The parser is only checked when named.
    #[must_use]
    pub fn missing_definitions(&self, state: &RequesterState) -> Vec<String> {
        let mut missing = Vec::new();
        if self.role(&state.role).is_none() {
            missing.push(format!("role '{}'", state.role));
        }
        if self.personality(&state.personality).is_none() {
            missing.push(format!("personality '{}'", state.personality));
        }
        if self.context(&state.context).is_none() {
            missing.push(format!("context '{}'", state.context));
        }
        if let Some(parser) = state.parser_name() {
            if self.parser(parser).is_none() {
                missing.push(format!("parser '{parser}'"));
            }
        }
        missing
    }

    /// Build the prompt for one requester.
    ///
    /// Returns `None` if the role, personality or context does not resolve.
    pub fn assemble_prompt(
        &self,
        world: &W,
        requester: RequesterId,
        state: &RequesterState,
    ) -> Option<Prompt> {
        let role = self.role(&state.role)?;
        let personality = self.personality(&state.personality)?;
        let context = self.context(&state.context)?;
        Some(Prompt {
            system: format!("{role}\n\n{personality}"),
            user: context(world, requester),
        })
    }

    /// Observer bus.
    #[must_use]
    pub const fn callbacks(&self) -> &CallbackBus {
        &self.callbacks
    }

    /// Register a dispatch observer: `(requester, prompt_size, tick)`.
    pub fn on_query<F>(&mut self, observer: F)
    where
        F: Fn(RequesterId, usize, Tick) -> AppResult<()> + Send + Sync + 'static,
    {
        self.callbacks.on_query(observer);
    }

    /// Register a response observer: `(requester, latency_seconds, response_size, tick)`.
    pub fn on_response<F>(&mut self, observer: F)
    where
        F: Fn(RequesterId, f64, usize, Tick) -> AppResult<()> + Send + Sync + 'static,
    {
        self.callbacks.on_response(observer);
    }

    /// Register an error observer: `(requester, kind, message, tick)`.
    pub fn on_error<F>(&mut self, observer: F)
    where
        F: Fn(RequesterId, ErrorKind, &str, Tick) -> AppResult<()> + Send + Sync + 'static,
    {
        self.callbacks.on_error(observer);
    }
}

impl<W> std::fmt::Debug for Registry<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("config", &self.config)
            .field("roles", &self.roles.len())
            .field("personalities", &self.personalities.len())
            .field("contexts", &self.contexts.len())
            .field("parsers", &self.parsers.len())
            .field("client", &self.client.is_some())
            .field("callbacks", &self.callbacks)
            .finish()
    }
}
