use async_stream::try_stream;
use bon::bon;
use futures_util::stream::BoxStream;
use unify_ox_common::ChatCompletionChunk;

use super::{Client, ClientCore, Generation, StreamItem};
use crate::{
    ApiConfig, EndpointIdentity, GenerateParams, ResponseCache, UnifyError,
    api::{Metrics, UnifyApi},
    endpoint::is_router,
};

/// Streamed generation of an [`AsyncUnify`] client.
pub type ChunkStream<'a> = BoxStream<'a, Result<StreamItem, UnifyError>>;

/// Async chat client, the executor-driven twin of [`super::Unify`].
#[derive(Debug, Clone)]
pub struct AsyncUnify {
    core: ClientCore,
    api: UnifyApi,
}

#[bon]
impl AsyncUnify {
    #[builder]
    pub async fn new(
        #[builder(into)] endpoint: Option<String>,
        #[builder(into)] model: Option<String>,
        #[builder(into)] provider: Option<String>,
        #[builder(default)] defaults: GenerateParams,
        config: Option<ApiConfig>,
    ) -> Result<Self, UnifyError> {
        EndpointIdentity::check_exclusive(
            endpoint.as_deref(),
            model.as_deref(),
            provider.as_deref(),
        )?;
        let config = match config {
            Some(config) => config,
            None => ApiConfig::from_env()?,
        };

        let mut client = Self {
            core: ClientCore::new(defaults, ResponseCache::new(config.cache_path())),
            api: UnifyApi::new(&config),
        };
        if let Some(endpoint) = endpoint {
            client.set_endpoint(&endpoint).await?;
        }
        if let Some(provider) = provider {
            client.set_provider(&provider).await?;
        }
        if let Some(model) = model {
            client.set_model(&model).await?;
        }
        Ok(client)
    }
}

impl AsyncUnify {
    pub fn api(&self) -> &UnifyApi {
        &self.api
    }

    pub async fn set_endpoint(&mut self, endpoint: &str) -> Result<(), UnifyError> {
        if is_router(endpoint) {
            return self.core.identity_mut().apply_endpoint(endpoint, None);
        }
        let valid = self.api.list_endpoints(None, None).await?;
        self.core.identity_mut().apply_endpoint(endpoint, Some(&valid))
    }

    pub async fn set_model(&mut self, model: &str) -> Result<(), UnifyError> {
        let valid = self.api.list_models(self.provider()).await?;
        self.core.identity_mut().apply_model(model, &valid)
    }

    pub async fn set_provider(&mut self, provider: &str) -> Result<(), UnifyError> {
        let valid = self.api.list_providers(self.model()).await?;
        self.core.identity_mut().apply_provider(provider, &valid)
    }

    pub async fn get_credit_balance(&self) -> Result<f64, UnifyError> {
        self.api.get_credit_balance().await
    }

    pub async fn get_endpoint_metrics(&self) -> Result<Metrics, UnifyError> {
        let endpoint = self
            .endpoint()
            .ok_or_else(|| UnifyError::usage("no endpoint configured"))?;
        self.api.get_endpoint_metrics(endpoint).await
    }

    /// Generate a completion for `user_prompt`, or for the default messages when `None`.
    ///
    /// The streaming request is sent before this returns, so status errors
    /// surface here; chunks are decoded as the stream is polled. The result
    /// borrows the client until dropped, whatever the variant.
    pub async fn generate(
        &mut self,
        user_prompt: Option<&str>,
        overrides: GenerateParams,
    ) -> Result<Generation<ChunkStream<'_>>, UnifyError> {
        let call = self.core.prepare(user_prompt, overrides)?;

        if call.stream {
            let mut parser = self.api.open_chat_stream(&call.payload).await?;
            let core = &mut self.core;
            let content_only = call.content_only;

            let stream = try_stream! {
                while let Some(chunk) = parser
                    .next_event::<ChatCompletionChunk>()
                    .await
                    .map_err(UnifyError::from)?
                {
                    if let Some(item) = core.on_chunk(content_only, chunk) {
                        yield item;
                    }
                }
            };
            return Ok(Generation::Stream(Box::pin(stream)));
        }

        let completion = if let Some(hit) = self.core.cached(&call)? {
            hit
        } else {
            let completion = self.api.chat_completion(&call.payload).await?;
            self.core.remember(&call, &completion)?;
            completion
        };
        Ok(self.core.finish(&call, completion))
    }
}

impl Client for AsyncUnify {
    fn core(&self) -> &ClientCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ClientCore {
        &mut self.core
    }
}
