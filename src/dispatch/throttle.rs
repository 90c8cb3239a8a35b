//! Despachante com limite de concorrência e espaçamento por classe.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Semaphore};
use tokio::time::Instant;

use super::transport::{CallClass, OutboundRequest, Transport};
use crate::types::config::MapsConfig;
use crate::types::errors::LookupError;

/// Parâmetros do despachante.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Máximo de chamadas simultâneas.
    pub max_concurrency: usize,

    /// Espaçamento mínimo entre chamadas de geocodificação.
    pub geocode_interval: Duration,

    /// Espaçamento mínimo entre chamadas de rota.
    pub route_interval: Duration,

    /// Prazo de cada chamada.
    pub timeout: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self::from(&MapsConfig::default())
    }
}

impl From<&MapsConfig> for DispatcherConfig {
    fn from(maps: &MapsConfig) -> Self {
        Self {
            max_concurrency: maps.max_concurrency.max(1),
            geocode_interval: maps.geocode_interval(),
            route_interval: maps.route_interval(),
            timeout: maps.timeout(),
        }
    }
}

/// Estatísticas do despachante.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub issued: u64,
    pub failed: u64,
    pub timed_out: u64,
    pub active: usize,
}

/// Espaçamento mínimo de uma classe.
///
/// O mutex é justo (FIFO) e fica retido durante a espera, então a próxima
/// chamada da mesma classe só mede o intervalo depois desta ser emitida.
struct ClassGate {
    min_interval: Duration,
    last_issued: Mutex<Option<Instant>>,
}

impl ClassGate {
    fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_issued: Mutex::new(None),
        }
    }

    async fn wait_turn(&self) {
        let mut last = self.last_issued.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

struct ActiveGuard<'a>(&'a AtomicUsize);

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Porta única para todas as chamadas de rede.
///
/// - No máximo `max_concurrency` chamadas em andamento (semáforo justo, FIFO)
/// - Intervalo mínimo entre emissões da mesma classe
/// - Prazo por chamada; ao estourar, a operação é cancelada
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    permits: Semaphore,
    geocode: ClassGate,
    route: ClassGate,
    timeout: Duration,
    issued: AtomicU64,
    failed: AtomicU64,
    timed_out: AtomicU64,
    active: AtomicUsize,
}

impl Dispatcher {
    /// Cria um despachante sobre o transporte informado.
    pub fn new(transport: Arc<dyn Transport>, config: DispatcherConfig) -> Self {
        Self {
            transport,
            permits: Semaphore::new(config.max_concurrency.max(1)),
            geocode: ClassGate::new(config.geocode_interval),
            route: ClassGate::new(config.route_interval),
            timeout: config.timeout,
            issued: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            timed_out: AtomicU64::new(0),
            active: AtomicUsize::new(0),
        }
    }

    fn gate(&self, class: CallClass) -> &ClassGate {
        match class {
            CallClass::Geocode => &self.geocode,
            CallClass::Route => &self.route,
        }
    }

    /// Envia uma requisição respeitando concorrência, espaçamento e prazo.
    pub async fn dispatch(&self, request: OutboundRequest) -> Result<serde_json::Value, LookupError> {
        let class = request.class();

        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| LookupError::Unavailable("despachante encerrado".to_string()))?;
        self.active.fetch_add(1, Ordering::SeqCst);
        let _active = ActiveGuard(&self.active);

        self.gate(class).wait_turn().await;
        self.issued.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(class = %class, path = request.url.path(), "dispatching request");

        match tokio::time::timeout(self.timeout, self.transport.send(&request)).await {
            Ok(Ok(body)) => Ok(body),
            Ok(Err(e)) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(class = %class, error = %e, "request failed");
                Err(e)
            }
            Err(_) => {
                self.timed_out.fetch_add(1, Ordering::Relaxed);
                let timeout_ms = self.timeout.as_millis() as u64;
                tracing::warn!(class = %class, timeout_ms, "request timed out");
                Err(LookupError::Timeout(timeout_ms))
            }
        }
    }

    /// Fecha o despachante: chamadas pendentes e futuras falham.
    pub fn close(&self) {
        self.permits.close();
    }

    pub fn stats(&self) -> DispatchStats {
        DispatchStats {
            issued: self.issued.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            timed_out: self.timed_out.load(Ordering::Relaxed),
            active: self.active.load(Ordering::SeqCst),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;
    use url::Url;

    /// Transporte que registra o instante de cada envio.
    struct RecordingTransport {
        delay: Duration,
        sent: StdMutex<Vec<(CallClass, Instant)>>,
        current: AtomicUsize,
        peak: AtomicUsize,
    }

    impl RecordingTransport {
        fn new(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                delay,
                sent: StdMutex::new(Vec::new()),
                current: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            })
        }

        fn instants(&self, class: CallClass) -> Vec<Instant> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .filter(|(c, _)| *c == class)
                .map(|(_, t)| *t)
                .collect()
        }
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn send(&self, request: &OutboundRequest) -> Result<serde_json::Value, LookupError> {
            self.sent.lock().unwrap().push((request.class(), Instant::now()));
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.current.fetch_sub(1, Ordering::SeqCst);
            Ok(serde_json::json!({"ok": true}))
        }
    }

    fn geocode_request() -> OutboundRequest {
        OutboundRequest::get(Url::parse("http://maps.test/geocode/search?text=a").unwrap())
    }

    fn route_request() -> OutboundRequest {
        OutboundRequest::get(Url::parse("http://maps.test/v2/directions/driving-hgv").unwrap())
    }

    fn config(max: usize, geocode_ms: u64, route_ms: u64) -> DispatcherConfig {
        DispatcherConfig {
            max_concurrency: max,
            geocode_interval: Duration::from_millis(geocode_ms),
            route_interval: Duration::from_millis(route_ms),
            timeout: Duration::from_secs(12),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_class_spacing() {
        let transport = RecordingTransport::new(Duration::from_millis(10));
        let dispatcher = Dispatcher::new(transport.clone(), config(4, 250, 750));

        let calls = (0..6).map(|_| dispatcher.dispatch(geocode_request()));
        let results = futures::future::join_all(calls).await;
        assert!(results.iter().all(|r| r.is_ok()));

        let instants = transport.instants(CallClass::Geocode);
        assert_eq!(instants.len(), 6);
        for pair in instants.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(250));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_classes_are_independent() {
        let transport = RecordingTransport::new(Duration::from_millis(1));
        let dispatcher = Dispatcher::new(transport.clone(), config(4, 250, 750));

        let start = Instant::now();
        let (a, b, c) = tokio::join!(
            dispatcher.dispatch(route_request()),
            dispatcher.dispatch(route_request()),
            dispatcher.dispatch(geocode_request()),
        );
        assert!(a.is_ok() && b.is_ok() && c.is_ok());

        let geocode = transport.instants(CallClass::Geocode);
        let route = transport.instants(CallClass::Route);
        // Geocode não espera o intervalo de rota
        assert!(geocode[0] - start < Duration::from_millis(250));
        assert!(route[1] - route[0] >= Duration::from_millis(750));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_ceiling() {
        let transport = RecordingTransport::new(Duration::from_secs(1));
        let dispatcher = Dispatcher::new(transport.clone(), config(4, 0, 0));

        let calls = (0..12).map(|i| {
            let request = if i % 2 == 0 { geocode_request() } else { route_request() };
            dispatcher.dispatch(request)
        });
        futures::future::join_all(calls).await;

        assert_eq!(transport.peak.load(Ordering::SeqCst), 4);
        let stats = dispatcher.stats();
        assert_eq!(stats.issued, 12);
        assert_eq!(stats.active, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_typed() {
        let transport = RecordingTransport::new(Duration::from_secs(30));
        let dispatcher = Dispatcher::new(transport.clone(), config(4, 0, 0));

        let result = dispatcher.dispatch(route_request()).await;

        assert_eq!(result, Err(LookupError::Timeout(12_000)));
        assert_eq!(dispatcher.stats().timed_out, 1);
        assert_eq!(dispatcher.stats().active, 0);
        // A operação foi abandonada
        assert_eq!(transport.current.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_closed_dispatcher_rejects() {
        let transport = RecordingTransport::new(Duration::ZERO);
        let dispatcher = Dispatcher::new(transport, config(1, 0, 0));
        dispatcher.close();

        let result = dispatcher.dispatch(geocode_request()).await;
        assert!(matches!(result, Err(LookupError::Unavailable(_))));
    }
}
