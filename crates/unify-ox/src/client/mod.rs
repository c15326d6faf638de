//! Chat clients. [`Unify`] blocks the calling thread, [`AsyncUnify`] is driven by an executor.
//!
//! Both wrap a [`ClientCore`], which owns everything that does not touch the
//! network: endpoint identity, defaults, parameter resolution and the cache.

mod async_unify;
mod unify;

pub use async_unify::{AsyncUnify, ChunkStream};
pub use unify::{TextStream, Unify};

use unify_ox_common::{ChatCompletion, ChatCompletionChunk, ChatMessage};

use crate::{
    ChatPayload, EndpointIdentity, GenerateParams, PlatformArgs, Query, ResponseCache, UnifyError,
};

/// What a `generate` call returns.
#[derive(Debug)]
pub enum Generation<S> {
    /// Content-only mode: the first choice's text
    Text(String),
    /// Full completion, returned when content-only mode is off or tools are set
    Completion(Box<ChatCompletion>),
    /// Streaming call: a lazy sequence of [`StreamItem`]s
    Stream(S),
}

impl<S> Generation<S> {
    pub fn into_text(self) -> Option<String> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn into_completion(self) -> Option<ChatCompletion> {
        match self {
            Self::Completion(completion) => Some(*completion),
            _ => None,
        }
    }

    pub fn into_stream(self) -> Option<S> {
        match self {
            Self::Stream(stream) => Some(stream),
            _ => None,
        }
    }
}

/// One element of a streamed generation.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamItem {
    /// Content-only mode: a text fragment
    Text(String),
    Chunk(Box<ChatCompletionChunk>),
}

impl StreamItem {
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Chunk(chunk) => chunk.content(),
        }
    }
}

/// A resolved `generate` call, ready to dispatch.
#[derive(Debug, Clone)]
pub(crate) struct PreparedCall {
    pub payload: ChatPayload,
    pub stream: bool,
    pub content_only: bool,
    pub cache: bool,
}

#[derive(Debug, Clone)]
pub struct ClientCore {
    identity: EndpointIdentity,
    defaults: GenerateParams,
    cache: ResponseCache,
}

impl ClientCore {
    pub(crate) fn new(defaults: GenerateParams, cache: ResponseCache) -> Self {
        Self {
            identity: EndpointIdentity::default(),
            defaults,
            cache,
        }
    }

    pub(crate) fn identity_mut(&mut self) -> &mut EndpointIdentity {
        &mut self.identity
    }

    /// Resolve `overrides` over the client defaults and fallbacks and build the request.
    pub(crate) fn prepare(
        &self,
        user_prompt: Option<&str>,
        overrides: GenerateParams,
    ) -> Result<PreparedCall, UnifyError> {
        let params = overrides
            .or(&self.defaults)
            .or(&GenerateParams::fallback());
        let endpoint = self.identity.endpoint().ok_or_else(|| {
            UnifyError::usage("no endpoint configured: set an endpoint, or both a model and a provider")
        })?;

        let messages = conversation(user_prompt, &params)?;
        let stream = params.stream.unwrap_or(false);
        let platform = PlatformArgs {
            use_custom_keys: params.use_custom_keys.unwrap_or(false),
            tags: params.tags.clone(),
        };
        let payload = Query::from_params(messages, &params).into_payload(
            endpoint,
            &platform,
            stream.then_some(params.stream_options.as_ref()),
        )?;

        log::debug!("prepared {endpoint} call (stream: {stream})");
        Ok(PreparedCall {
            payload,
            stream,
            content_only: params.content_only(),
            cache: params.cache.unwrap_or(false) && !stream,
        })
    }

    /// Look the call up in the response cache, when caching applies to it.
    pub(crate) fn cached(&self, call: &PreparedCall) -> Result<Option<ChatCompletion>, UnifyError> {
        if !call.cache {
            return Ok(None);
        }
        let hit = self.cache.get(&call.payload.cache_key()?)?;
        log::debug!(
            "response cache {} at {}",
            if hit.is_some() { "hit" } else { "miss" },
            self.cache.path().display()
        );
        Ok(hit)
    }

    pub(crate) fn remember(
        &self,
        call: &PreparedCall,
        completion: &ChatCompletion,
    ) -> Result<(), UnifyError> {
        if call.cache {
            self.cache.put(&call.payload.cache_key()?, completion)?;
        }
        Ok(())
    }

    /// Record the serving provider and shape the completion for the caller.
    pub(crate) fn finish<S>(&mut self, call: &PreparedCall, completion: ChatCompletion) -> Generation<S> {
        self.identity.record_served_by(&completion.model);
        if call.content_only {
            let text = completion.content().unwrap_or_default().trim_matches(' ');
            Generation::Text(text.to_string())
        } else {
            Generation::Completion(Box::new(completion))
        }
    }

    /// Turn a streamed chunk into the item handed to the caller, if any.
    pub(crate) fn on_chunk(
        &mut self,
        content_only: bool,
        chunk: ChatCompletionChunk,
    ) -> Option<StreamItem> {
        if chunk.choices.is_empty() && chunk.usage.is_none() {
            log::warn!("skipping stream chunk {} with no choices", chunk.id);
            return None;
        }
        self.identity.record_served_by(&chunk.model);
        if content_only {
            chunk.content().map(|text| StreamItem::Text(text.to_string()))
        } else {
            Some(StreamItem::Chunk(Box::new(chunk)))
        }
    }
}

/// Build the message list: optional system prompt, then exactly one of
/// the user prompt or the conversation history.
fn conversation(
    user_prompt: Option<&str>,
    params: &GenerateParams,
) -> Result<Vec<ChatMessage>, UnifyError> {
    let history = params.messages.as_deref().filter(|m| !m.is_empty());
    let mut messages: Vec<ChatMessage> = params
        .system_prompt
        .iter()
        .map(ChatMessage::system)
        .collect();

    match (user_prompt, history) {
        (Some(prompt), None) => messages.push(ChatMessage::user(prompt)),
        (None, Some(history)) => messages.extend_from_slice(history),
        (Some(_), Some(_)) => {
            return Err(UnifyError::usage(
                "provide either the user_prompt or messages, not both",
            ));
        }
        (None, None) => {
            return Err(UnifyError::usage(
                "You must provide either the user_prompt or messages!",
            ));
        }
    }
    Ok(messages)
}

/// Accessors shared by the blocking and async clients.
pub trait Client {
    #[doc(hidden)]
    fn core(&self) -> &ClientCore;
    #[doc(hidden)]
    fn core_mut(&mut self) -> &mut ClientCore;

    fn endpoint(&self) -> Option<&str> {
        self.core().identity.endpoint()
    }

    fn model(&self) -> Option<&str> {
        self.core().identity.model()
    }

    fn provider(&self) -> Option<&str> {
        self.core().identity.provider()
    }

    fn defaults(&self) -> &GenerateParams {
        &self.core().defaults
    }

    /// Mutable access to the client-level defaults, e.g. to append to `messages`.
    fn defaults_mut(&mut self) -> &mut GenerateParams {
        &mut self.core_mut().defaults
    }

    fn set_defaults(&mut self, defaults: GenerateParams) {
        self.core_mut().defaults = defaults;
    }

    fn cache(&self) -> &ResponseCache {
        &self.core().cache
    }
}
