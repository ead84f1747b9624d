//! Starts a grid server on an ephemeral port in a background thread.

use std::net::TcpListener as StdTcpListener;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use gridlock_api::config::ServerConfig;
use gridlock_api::router::Router;
use gridlock_api::server::Server;
use gridlock_core::backend::HttpBackend;
use gridlock_core::clock::SystemClock;
use gridlock_core::{
    GridBackend, Identity, LockCoordinator, LockOptions, MemoryGrid, Session, StoreId, TableClient,
};

pub struct TestServer {
    pub grid: Arc<MemoryGrid>,
    pub base_url: String,
}

impl TestServer {
    pub fn start() -> Self {
        let grid = Arc::new(MemoryGrid::new());
        let router = Router::new(grid.clone(), Arc::new(ServerConfig::default())).unwrap();

        let listener = StdTcpListener::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();
        let addr = listener.local_addr().unwrap();

        thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(2)
                .enable_all()
                .build()
                .unwrap();
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::from_std(listener).unwrap();
                let _ = Server::new(addr, router).serve_listener(listener).await;
            });
        });

        Self {
            grid,
            base_url: format!("http://{}", addr),
        }
    }

    pub fn backend(&self) -> Arc<HttpBackend> {
        Arc::new(HttpBackend::new(self.base_url.clone(), Duration::from_secs(2)).unwrap())
    }

    /// Creates `store` through the server and returns its id.
    pub fn store(&self, store: &str) -> StoreId {
        let store = StoreId::parse(store).unwrap();
        self.backend().create_store(&store).unwrap();
        store
    }

    /// Short real-time lock timings.
    pub fn locks(&self) -> LockCoordinator {
        LockCoordinator::new(
            self.backend(),
            Arc::new(SystemClock),
            LockOptions {
                timeout: Duration::from_millis(300),
                poll_interval: Duration::from_millis(25),
            },
        )
    }

    pub fn client(&self) -> TableClient {
        TableClient::new(self.backend(), self.locks())
    }
}

pub fn session(store: &StoreId, identity: &str) -> Session {
    Session::new(store.clone(), Identity::new(identity).unwrap())
}

pub fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}
