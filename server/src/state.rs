use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use osiris_shared::PointOfInterest;
use sqlx::SqlitePool;
use tokio::sync::RwLock;

/// Points of interest plus the pre-serialized payload served by the API.
#[derive(Debug, Clone)]
pub struct PoiSnapshot {
    pub points: Vec<PointOfInterest>,
    pub json: Arc<Bytes>,
}

impl PoiSnapshot {
    pub fn new(points: Vec<PointOfInterest>) -> Self {
        let json = serde_json::to_vec(&points)
            .map(Bytes::from)
            .unwrap_or_else(|_| Bytes::from_static(b"[]"));
        Self {
            points,
            json: Arc::new(json),
        }
    }
}

impl Default for PoiSnapshot {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

/// Client addresses with administrator rights on the roster.
#[derive(Debug, Clone, Default)]
pub struct AdminList {
    ips: HashSet<String>,
}

impl AdminList {
    pub fn new<I, S>(ips: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ips: ips.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_admin(&self, client_ip: &str) -> bool {
        !client_ip.is_empty() && self.ips.contains(client_ip)
    }

    pub fn len(&self) -> usize {
        self.ips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ips.is_empty()
    }
}

/// Reverse proxies whose `X-Forwarded-For` header is believed.
#[derive(Debug, Clone, Default)]
pub struct TrustedProxies {
    ips: HashSet<String>,
}

impl TrustedProxies {
    pub fn new<I, S>(ips: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ips: ips.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, peer_ip: &str) -> bool {
        !peer_ip.is_empty() && self.ips.contains(peer_ip)
    }

    pub fn is_empty(&self) -> bool {
        self.ips.is_empty()
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub admins: Arc<AdminList>,
    pub trusted_proxies: Arc<TrustedProxies>,
    pub points_of_interest: Arc<RwLock<PoiSnapshot>>,
    pub observability: Arc<ObservabilityCounters>,
}

#[derive(Debug, Default)]
pub struct ObservabilityCounters {
    registrations_total: AtomicU64,
    list_requests_total: AtomicU64,
    rejected_requests_total: AtomicU64,
}

#[derive(Debug, Clone, Copy)]
pub struct ObservabilitySnapshot {
    pub registrations_total: u64,
    pub list_requests_total: u64,
    pub rejected_requests_total: u64,
}

impl ObservabilityCounters {
    pub fn snapshot(&self) -> ObservabilitySnapshot {
        ObservabilitySnapshot {
            registrations_total: self.registrations_total.load(Ordering::Relaxed),
            list_requests_total: self.list_requests_total.load(Ordering::Relaxed),
            rejected_requests_total: self.rejected_requests_total.load(Ordering::Relaxed),
        }
    }

    pub fn record_registration(&self) {
        self.registrations_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_list_request(&self) {
        self.list_requests_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected_request(&self) {
        self.rejected_requests_total.fetch_add(1, Ordering::Relaxed);
    }
}

impl AppState {
    pub fn new(db: SqlitePool, admins: AdminList) -> Self {
        Self {
            db,
            admins: Arc::new(admins),
            trusted_proxies: Arc::new(TrustedProxies::default()),
            points_of_interest: Arc::new(RwLock::new(PoiSnapshot::default())),
            observability: Arc::new(ObservabilityCounters::default()),
        }
    }

    pub fn with_trusted_proxies(mut self, proxies: TrustedProxies) -> Self {
        self.trusted_proxies = Arc::new(proxies);
        self
    }
}
