//! Server bootstrap and runtime.
//!
//! [`WebInit::new`] performs all setup synchronously (Initializing);
//! [`WebInit::start_server`] binds the socket and serves (Serving).

use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, PoisonError, RwLock};

use axum::Router;
use axum::http::Method;
use axum::routing::MethodRouter;

use crate::api::handlers::ping::PING_PATTERN;
use crate::api::routes::app_router;
use crate::api_manager::ApiManager;
use crate::config::Config;
use crate::error::InitError;
use crate::permission::{PermissionDelegate, Rule, RuleTable};
use crate::state::AppState;

/// Everything [`WebInit::new`] needs apart from the init callback.
pub struct InitArgs {
    pub config: Config,
    /// Permission component; a [`RuleTable`] built from the configuration when `None`.
    pub permissions: Option<Arc<dyn PermissionDelegate>>,
    /// Registry that receives the `listPaths` diagnostic.
    pub api_manager: Option<Arc<ApiManager>>,
}

impl InitArgs {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            permissions: None,
            api_manager: None,
        }
    }

    pub fn with_permissions(mut self, permissions: Arc<dyn PermissionDelegate>) -> Self {
        self.permissions = Some(permissions);
        self
    }

    pub fn with_api_manager(mut self, api_manager: Arc<ApiManager>) -> Self {
        self.api_manager = Some(api_manager);
        self
    }
}

/// Mounted route patterns, in mount order.
type PathList = Arc<RwLock<Vec<String>>>;

/// The bootstrapped server.
pub struct WebInit {
    config: Config,
    state: AppState,
    routes: Router<AppState>,
    paths: PathList,
}

impl WebInit {
    /// Sets the server up and hands it to `init_callback`.
    ///
    /// In order:
    /// 1. validates the configuration
    /// 2. builds the permission delegate (unless one was supplied)
    /// 3. registers the liveness route with the delegate as [`Rule::All`]
    /// 4. registers `listPaths` on the API manager, if any
    /// 5. calls `init_callback`, which may add application routes
    ///
    /// Nothing touches the network until [`WebInit::start_server`].
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the delegate rejects
    /// the liveness route, or `init_callback` fails.
    pub fn new<F>(args: InitArgs, init_callback: F) -> Result<Self, InitError>
    where
        F: FnOnce(&mut WebInit) -> Result<(), InitError>,
    {
        let InitArgs {
            config,
            permissions,
            api_manager,
        } = args;

        config.validate()?;

        let permissions = permissions
            .unwrap_or_else(|| Arc::new(RuleTable::from_config(&config.permissions)));

        let state = AppState::new(
            config.display_name(),
            permissions.clone(),
            config.web_init.body_limit,
        );

        let paths: PathList = Arc::new(RwLock::new(
            config
                .web_init
                .html_file_path
                .iter()
                .map(|root| format!("static {}", root.display()))
                .collect(),
        ));

        permissions.register_route(Method::GET, PING_PATTERN, Rule::All)?;
        push_path(&paths, format!("GET {PING_PATTERN}"));

        if let Some(api_manager) = api_manager {
            let paths = paths.clone();
            api_manager.register_api("listPaths", move || list_paths(&paths));
        }

        let mut web_init = Self {
            config,
            state,
            routes: Router::new(),
            paths,
        };

        init_callback(&mut web_init)?;

        tracing::debug!(name = %web_init.name(), "web init complete");
        Ok(web_init)
    }

    /// Display name used in logs and the liveness text.
    pub fn name(&self) -> &str {
        &self.state.name
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn permissions(&self) -> &Arc<dyn PermissionDelegate> {
        &self.state.permissions
    }

    /// Requests counted so far.
    pub fn transaction_count(&self) -> u64 {
        self.state.transactions.get()
    }

    /// Mounted route patterns, in mount order.
    pub fn paths(&self) -> Vec<String> {
        self.paths
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Adds an application route behind unpacking and the permission check.
    ///
    /// Authorization for the route is up to the delegate; see [`WebInit::permit`].
    pub fn route(&mut self, path: &str, method_router: MethodRouter<AppState>) -> &mut Self {
        self.routes = std::mem::take(&mut self.routes).route(path, method_router);
        push_path(&self.paths, path.to_string());
        self
    }

    /// Registers an authorization rule with the permission delegate.
    ///
    /// `pattern` is a regular expression matched against the request path.
    ///
    /// # Errors
    ///
    /// Returns [`InitError::Permission`] if the delegate rejects the rule.
    pub fn permit(
        &mut self,
        method: Method,
        pattern: &str,
        rule: Rule,
    ) -> Result<&mut Self, InitError> {
        self.state.permissions.register_route(method, pattern, rule)?;
        Ok(self)
    }

    /// The assembled router, ready to serve.
    pub fn into_router(self) -> Router {
        app_router(self.state, &self.config.web_init.html_file_path, self.routes)
    }

    /// Stub kept for callers that expect a shutdown hook.
    ///
    /// Calls `callback(None, message)` straight away; the listening socket
    /// is not released. Use [`WebInit::start_server_with_shutdown`] for a
    /// server that actually stops.
    pub fn shutdown<F>(&self, message: &str, callback: F)
    where
        F: FnOnce(Option<InitError>, &str),
    {
        callback(None, message);
    }

    /// Binds the configured address and serves until the process ends.
    ///
    /// # Errors
    ///
    /// Returns [`InitError::Bind`] if the socket cannot be bound (no retry),
    /// or [`InitError::Serve`] on a server runtime error.
    pub async fn start_server(self) -> Result<(), InitError> {
        self.start_server_with_shutdown(std::future::pending()).await
    }

    /// Like [`WebInit::start_server`], but stops gracefully when `signal` resolves.
    ///
    /// # Errors
    ///
    /// Returns [`InitError::Bind`] if the socket cannot be bound,
    /// or [`InitError::Serve`] on a server runtime error.
    pub async fn start_server_with_shutdown<F>(self, signal: F) -> Result<(), InitError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = bind_addr(&self.config)?;
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|source| InitError::Bind { addr, source })?;
        let local = listener.local_addr().map_err(InitError::Serve)?;

        tracing::info!("{} listening on {}", self.name(), display_url(&local));

        axum::serve(listener, self.into_router())
            .with_graceful_shutdown(signal)
            .await
            .map_err(InitError::Serve)
    }
}

fn push_path(paths: &PathList, path: String) {
    paths
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .push(path);
}

fn list_paths(paths: &PathList) {
    tracing::debug!("route path list =========================");
    for path in paths.read().unwrap_or_else(PoisonError::into_inner).iter() {
        tracing::debug!("{path}");
    }
    tracing::debug!("END route path list =====================");
}

fn bind_addr(config: &Config) -> Result<SocketAddr, InitError> {
    let ip: IpAddr = config.web_init.host.parse().map_err(|_| {
        crate::config::ConfigError::InvalidField {
            field: "webInit.host".to_string(),
            reason: format!("expected an IP address, got '{}'", config.web_init.host),
        }
    })?;
    Ok(SocketAddr::new(ip, config.web_init.port))
}

/// URL shown in the startup log line; the IPv6 wildcard reads as `localhost`.
pub fn display_url(addr: &SocketAddr) -> String {
    let host = match addr.ip() {
        IpAddr::V6(ip) if ip.is_unspecified() => "localhost".to_string(),
        IpAddr::V6(ip) => format!("[{ip}]"),
        IpAddr::V4(ip) => ip.to_string(),
    };
    format!("http://{host}:{}", addr.port())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permission::MockPermissionDelegate;
    use std::net::{Ipv4Addr, Ipv6Addr};
    use std::path::PathBuf;

    #[test]
    fn test_display_url() {
        assert_eq!(
            display_url(&SocketAddr::new(Ipv6Addr::UNSPECIFIED.into(), 8080)),
            "http://localhost:8080"
        );
        assert_eq!(
            display_url(&SocketAddr::new(Ipv4Addr::new(127, 0, 0, 1).into(), 80)),
            "http://127.0.0.1:80"
        );
        assert_eq!(
            display_url(&SocketAddr::new(Ipv6Addr::LOCALHOST.into(), 3000)),
            "http://[::1]:3000"
        );
    }

    #[test]
    fn test_new_registers_ping_with_delegate() {
        let mut mock = MockPermissionDelegate::new();
        mock.expect_register_route()
            .withf(|method, pattern, rule| {
                *method == Method::GET && pattern.to_string() == "/ping$" && *rule == Rule::All
            })
            .times(1)
            .returning(|_, _, _| Ok(()));

        let args = InitArgs::new(Config::with_port(0)).with_permissions(Arc::new(mock));
        let web_init = WebInit::new(args, |_| Ok(())).unwrap();

        assert_eq!(web_init.paths(), vec!["GET /ping$".to_string()]);
    }

    #[test]
    fn test_init_callback_receives_instance() {
        let mut called = false;
        let web_init = WebInit::new(InitArgs::new(Config::with_port(0)), |web_init| {
            called = true;
            assert_eq!(web_init.name(), "web-init");
            Ok(())
        })
        .unwrap();

        assert!(called);
        assert_eq!(web_init.transaction_count(), 0);
        assert_eq!(web_init.config().web_init.port, 0);
        assert!(
            web_init
                .permissions()
                .register_route(Method::POST, "^/extra$", Rule::Deny)
                .is_ok()
        );
    }

    #[test]
    fn test_init_callback_failure_aborts_startup() {
        let result = WebInit::new(InitArgs::new(Config::with_port(0)), |_| {
            Err(InitError::Callback("no database".to_string()))
        });
        assert!(matches!(result, Err(InitError::Callback(_))));
    }

    #[test]
    fn test_invalid_config_aborts_startup() {
        let mut config = Config::with_port(0);
        config.web_init.body_limit = 0;
        let result = WebInit::new(InitArgs::new(config), |_| Ok(()));
        assert!(matches!(result, Err(InitError::Config(_))));
    }

    #[test]
    fn test_list_paths_registered_only_with_api_manager() {
        let manager = Arc::new(ApiManager::new());
        let mut config = Config::with_port(0);
        config.web_init.html_file_path = vec![PathBuf::from("/srv/html")];

        let web_init = WebInit::new(
            InitArgs::new(config).with_api_manager(manager.clone()),
            |web_init| {
                web_init.route("/orders", axum::routing::get(|| async { "orders" }));
                Ok(())
            },
        )
        .unwrap();

        assert_eq!(manager.names(), vec!["listPaths".to_string()]);
        assert!(manager.call("listPaths"));
        assert_eq!(
            web_init.paths(),
            vec![
                "static /srv/html".to_string(),
                "GET /ping$".to_string(),
                "/orders".to_string(),
            ]
        );
    }

    #[test]
    fn test_shutdown_is_a_stub() {
        let web_init = WebInit::new(InitArgs::new(Config::with_port(0)), |_| Ok(())).unwrap();
        let mut seen = None;
        web_init.shutdown("bye", |err, message| {
            assert!(err.is_none());
            seen = Some(message.to_string());
        });
        assert_eq!(seen.as_deref(), Some("bye"));
    }

    #[tokio::test]
    async fn test_bind_failure_is_reported() {
        let occupied = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = occupied.local_addr().unwrap().port();

        let mut config = Config::with_port(port);
        config.web_init.host = "127.0.0.1".to_string();
        let web_init = WebInit::new(InitArgs::new(config), |_| Ok(())).unwrap();

        let result = web_init.start_server().await;
        assert!(matches!(result, Err(InitError::Bind { .. })));
    }
}
