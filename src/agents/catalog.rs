//! Read-only fallback tables
//!
//! Pre-authored chaos events and per-component hint messages used when the
//! oracle is unavailable. Process-wide, never mutated.

use crate::types::{ChaosEvent, Severity};
use std::collections::BTreeSet;

/// Pre-authored chaos event
#[derive(Debug, Clone, Copy)]
pub struct CatalogEvent {
    pub event_id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub severity: Severity,
    pub target_components: &'static [&'static str],
    pub hint: &'static str,
}

impl CatalogEvent {
    /// Number of targets present in `deployed`
    pub fn overlap(&self, deployed: &BTreeSet<String>) -> usize {
        self.target_components
            .iter()
            .filter(|c| deployed.contains(**c))
            .count()
    }

    pub fn to_event(&self) -> ChaosEvent {
        ChaosEvent {
            event_id: self.event_id.to_string(),
            title: self.title.to_string(),
            description: self.description.to_string(),
            severity: self.severity,
            target_components: self.target_components.iter().map(|c| c.to_string()).collect(),
            hint: self.hint.to_string(),
        }
    }
}

pub static CHAOS_CATALOG: &[CatalogEvent] = &[
    CatalogEvent {
        event_id: "db-primary-crash",
        title: "Primary database down",
        description: "The primary database node crashed and writes are failing across the system.",
        severity: Severity::Critical,
        target_components: &["database", "replica"],
        hint: "A replica that can be promoted keeps writes flowing.",
    },
    CatalogEvent {
        event_id: "cache-stampede",
        title: "Cache stampede",
        description: "A hot key expired and thousands of requests hit the database at the same time.",
        severity: Severity::High,
        target_components: &["cache", "database"],
        hint: "Request coalescing or staggered expiry protects the database.",
    },
    CatalogEvent {
        event_id: "traffic-spike",
        title: "Traffic spike",
        description: "A viral post drove ten times the normal traffic to the application servers.",
        severity: Severity::High,
        target_components: &["load_balancer", "server", "cdn"],
        hint: "Spread load across more servers and serve static content from the edge.",
    },
    CatalogEvent {
        event_id: "ddos-attack",
        title: "DDoS attack",
        description: "A flood of malicious requests is saturating the public entry point of the system.",
        severity: Severity::Critical,
        target_components: &["firewall", "api_gateway", "load_balancer"],
        hint: "Filter and rate-limit traffic before it reaches your services.",
    },
    CatalogEvent {
        event_id: "queue-backlog",
        title: "Queue backlog",
        description: "Workers fell behind and the message queue is growing faster than it drains.",
        severity: Severity::Medium,
        target_components: &["queue", "worker"],
        hint: "Scale consumers and add a dead-letter path for poison messages.",
    },
    CatalogEvent {
        event_id: "region-outage",
        title: "Region outage",
        description: "The hosting region went dark, taking servers, databases and storage offline.",
        severity: Severity::Critical,
        target_components: &["server", "database", "storage"],
        hint: "A second region with replicated data limits the blast radius.",
    },
    CatalogEvent {
        event_id: "credential-leak",
        title: "Leaked API credentials",
        description: "An API key was published in a public repository and is being abused by attackers.",
        severity: Severity::High,
        target_components: &["auth", "api_gateway"],
        hint: "Central authentication with short-lived tokens makes revocation fast.",
    },
    CatalogEvent {
        event_id: "storage-latency",
        title: "Object storage slowdown",
        description: "Object storage latency jumped to several seconds for every read request.",
        severity: Severity::Medium,
        target_components: &["storage", "cdn"],
        hint: "Caching objects at the edge hides storage latency from users.",
    },
    CatalogEvent {
        event_id: "dns-failure",
        title: "DNS resolution failure",
        description: "The DNS provider stopped answering and clients cannot resolve the service address.",
        severity: Severity::High,
        target_components: &["dns", "load_balancer"],
        hint: "A secondary DNS provider and sensible TTLs keep the service reachable.",
    },
    CatalogEvent {
        event_id: "memory-leak",
        title: "Memory leak",
        description: "A slow memory leak is making application processes restart every few minutes.",
        severity: Severity::Medium,
        target_components: &["server", "worker"],
        hint: "Health checks behind a load balancer route around restarting instances.",
    },
    CatalogEvent {
        event_id: "silent-failure",
        title: "Silent failure",
        description: "Half of the requests have been failing for an hour and nobody noticed.",
        severity: Severity::Medium,
        target_components: &["monitoring", "server"],
        hint: "Metrics and alerts turn silent failures into pages.",
    },
    CatalogEvent {
        event_id: "search-index-corruption",
        title: "Search index corrupted",
        description: "A bad deploy corrupted the search index and queries return stale or empty results.",
        severity: Severity::Medium,
        target_components: &["search", "database"],
        hint: "Rebuild indexes from the source of truth in the database.",
    },
];

/// Explanation of why a component matters, used for direct hints
pub fn component_hint(component: &str) -> String {
    let text = match component {
        "client" => "Start from the client: every request your system handles begins there.",
        "dns" => "Add DNS so clients can find your service by name and you can fail over between addresses.",
        "cdn" => "A CDN serves static content close to users and takes load off your servers.",
        "load_balancer" => "A load balancer spreads traffic across servers so one instance is never a single point of failure.",
        "api_gateway" => "An API gateway gives you one entry point for routing, rate limiting and authentication.",
        "server" => "You need application servers to run the business logic behind each request.",
        "auth" => "An authentication service verifies who is calling before requests reach your data.",
        "cache" => "A cache keeps hot data in memory so repeated reads do not hit the database.",
        "database" => "A database gives your data a durable home that survives restarts.",
        "replica" => "A database replica takes read traffic and can be promoted if the primary fails.",
        "queue" => "A message queue absorbs bursts and lets slow work happen asynchronously.",
        "worker" => "Background workers process queued jobs without blocking user requests.",
        "storage" => "Object storage holds files and media that do not belong in the database.",
        "search" => "A search index answers full-text queries that a database handles poorly.",
        "monitoring" => "Monitoring tells you something broke before your users do.",
        "firewall" => "A firewall blocks malicious traffic before it reaches your services.",
        other => {
            return format!(
                "Your design still needs a {}. Think about where it fits in the request path.",
                other.replace('_', " ")
            )
        }
    };
    text.to_string()
}
