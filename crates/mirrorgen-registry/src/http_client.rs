//! Process-wide HTTP agent used for registry requests.

use std::{
    sync::{LazyLock, RwLock},
    time::Duration,
};

use ureq::{
    http::{self, HeaderMap, Uri},
    typestate::WithoutBody,
    Agent, Proxy, RequestBuilder,
};

/// Settings the shared agent is built from.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub user_agent: Option<String>,
    /// Sent with every request on top of the per-request headers.
    pub headers: Option<HeaderMap>,
    pub proxy: Option<Proxy>,
    /// Bound on a whole request, body download included.
    pub timeout: Option<Duration>,
}

impl Default for ClientConfig {
    /// A `mirrorgen/<version>` user agent and nothing else.
    ///
    /// ```
    /// use mirrorgen_registry::http_client::ClientConfig;
    ///
    /// let cfg = ClientConfig::default();
    /// assert!(cfg.user_agent.unwrap().starts_with("mirrorgen/"));
    /// assert!(cfg.timeout.is_none());
    /// ```
    fn default() -> Self {
        Self {
            user_agent: Some(concat!("mirrorgen/", env!("CARGO_PKG_VERSION")).into()),
            headers: None,
            proxy: None,
            timeout: None,
        }
    }
}

impl ClientConfig {
    fn agent(&self) -> Agent {
        let builder = Agent::config_builder()
            .proxy(self.proxy.clone())
            .timeout_global(self.timeout);

        match &self.user_agent {
            Some(user_agent) => builder.user_agent(user_agent).build().into(),
            None => builder.build().into(),
        }
    }
}

struct HttpClient {
    config: ClientConfig,
    agent: Agent,
}

impl HttpClient {
    fn new(config: ClientConfig) -> Self {
        let agent = config.agent();
        Self {
            config,
            agent,
        }
    }
}

static CLIENT: LazyLock<RwLock<HttpClient>> =
    LazyLock::new(|| RwLock::new(HttpClient::new(ClientConfig::default())));

/// Starts a GET request on the shared agent with the global headers applied.
///
/// ```no_run
/// use mirrorgen_registry::http_client;
///
/// let response = http_client::get("https://registry.example/_all_docs").call();
/// ```
pub fn get<T>(uri: T) -> RequestBuilder<WithoutBody>
where
    Uri: TryFrom<T>,
    <Uri as TryFrom<T>>::Error: Into<http::Error>,
{
    let client = CLIENT.read().unwrap();
    let mut request = client.agent.get(uri);
    if let Some(headers) = &client.config.headers {
        for (name, value) in headers {
            request = request.header(name, value);
        }
    }
    request
}

/// Changes the shared client settings; the agent is rebuilt right away.
///
/// ```
/// use std::time::Duration;
/// use mirrorgen_registry::http_client::configure_http_client;
///
/// configure_http_client(|cfg| {
///     cfg.timeout = Some(Duration::from_secs(600));
/// });
/// ```
pub fn configure_http_client<F>(update: F)
where
    F: FnOnce(&mut ClientConfig),
{
    let mut client = CLIENT.write().unwrap();
    let mut config = client.config.clone();
    update(&mut config);
    *client = HttpClient::new(config);
}
