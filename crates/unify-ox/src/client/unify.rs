use bon::bon;

use super::{Client, ClientCore, Generation, StreamItem};
use crate::{
    ApiConfig, EndpointIdentity, GenerateParams, ResponseCache, UnifyError,
    api::{BlockingUnifyApi, Metrics, blocking::ChunkLines},
    endpoint::is_router,
};

/// Blocking chat client.
///
/// ```no_run
/// use unify_ox::{GenerateParams, Unify};
///
/// let mut client = Unify::builder().endpoint("gpt-4o@openai").build()?;
/// let reply = client.generate(Some("Hello!"), GenerateParams::default())?;
/// println!("{:?}", reply.into_text());
/// # Ok::<(), unify_ox::UnifyError>(())
/// ```
#[derive(Debug)]
pub struct Unify {
    core: ClientCore,
    api: BlockingUnifyApi,
}

#[bon]
impl Unify {
    /// Fails when `endpoint` is combined with `model` or `provider`, when no
    /// API key can be found, or when a value is not offered by the platform.
    #[builder]
    pub fn new(
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
            api: BlockingUnifyApi::new(&config),
        };
        if let Some(endpoint) = endpoint {
            client.set_endpoint(&endpoint)?;
        }
        if let Some(provider) = provider {
            client.set_provider(&provider)?;
        }
        if let Some(model) = model {
            client.set_model(&model)?;
        }
        Ok(client)
    }
}

impl Unify {
    pub fn api(&self) -> &BlockingUnifyApi {
        &self.api
    }

    pub fn set_endpoint(&mut self, endpoint: &str) -> Result<(), UnifyError> {
        if is_router(endpoint) {
            return self.core.identity_mut().apply_endpoint(endpoint, None);
        }
        let valid = self.api.list_endpoints(None, None)?;
        self.core.identity_mut().apply_endpoint(endpoint, Some(&valid))
    }

    pub fn set_model(&mut self, model: &str) -> Result<(), UnifyError> {
        let valid = self.api.list_models(self.provider())?;
        self.core.identity_mut().apply_model(model, &valid)
    }

    pub fn set_provider(&mut self, provider: &str) -> Result<(), UnifyError> {
        let valid = self.api.list_providers(self.model())?;
        self.core.identity_mut().apply_provider(provider, &valid)
    }

    pub fn get_credit_balance(&self) -> Result<f64, UnifyError> {
        self.api.get_credit_balance()
    }

    /// Metrics for the current endpoint.
    pub fn get_endpoint_metrics(&self) -> Result<Metrics, UnifyError> {
        let endpoint = self
            .endpoint()
            .ok_or_else(|| UnifyError::usage("no endpoint configured"))?;
        self.api.get_endpoint_metrics(endpoint)
    }

    /// Generate a completion for `user_prompt`, or for the default messages when `None`.
    ///
    /// The result borrows the client until dropped, whatever the variant.
    pub fn generate(
        &mut self,
        user_prompt: Option<&str>,
        overrides: GenerateParams,
    ) -> Result<Generation<TextStream<'_>>, UnifyError> {
        let call = self.core.prepare(user_prompt, overrides)?;

        if call.stream {
            let chunks = self.api.open_chat_stream(&call.payload)?;
            return Ok(Generation::Stream(TextStream {
                core: &mut self.core,
                chunks,
                content_only: call.content_only,
            }));
        }

        let completion = if let Some(hit) = self.core.cached(&call)? {
            hit
        } else {
            let completion = self.api.chat_completion(&call.payload)?;
            self.core.remember(&call, &completion)?;
            completion
        };
        Ok(self.core.finish(&call, completion))
    }
}

impl Client for Unify {
    fn core(&self) -> &ClientCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ClientCore {
        &mut self.core
    }
}

/// Streamed generation of a [`Unify`] client.
pub struct TextStream<'a> {
    core: &'a mut ClientCore,
    chunks: ChunkLines,
    content_only: bool,
}

impl Iterator for TextStream<'_> {
    type Item = Result<StreamItem, UnifyError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.chunks.next()? {
                Ok(chunk) => {
                    if let Some(item) = self.core.on_chunk(self.content_only, chunk) {
                        return Some(Ok(item));
                    }
                }
                Err(e) => return Some(Err(e.into())),
            }
        }
    }
}

impl std::fmt::Debug for TextStream<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextStream")
            .field("content_only", &self.content_only)
            .finish_non_exhaustive()
    }
}
