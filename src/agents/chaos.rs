//! Chaos agent: generate → validate → regenerate loop
//!
//! ```text
//! analyze_vulnerability → generate_event → self_validate ─ ok ──→ finalize
//!                              ↑                  │
//!                              └── regenerate ←── rejected (≤ max_retries)
//! ```
//!
//! Without a usable candidate the event comes from the static catalog,
//! chosen by overlap with the deployed components.

use crate::agents::catalog::{CatalogEvent, CHAOS_CATALOG};
use crate::agents::retry::RetryState;
use crate::config::ChaosConfig;
use crate::game::room::secs_between;
use crate::game::RoomState;
use crate::oracle::{self, OracleRequest, SharedOracle, DEFAULT_ORACLE_TIMEOUT};
use crate::types::{ChaosEvent, Severity};
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Oracle purpose tags
pub const PURPOSE_VULNERABILITY: &str = "chaos.vulnerability";
pub const PURPOSE_EVENT: &str = "chaos.generate";

/// The architectural gap an event will target
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Vulnerability {
    pub kind: String,
    pub description: String,
    #[serde(default)]
    pub target_components: Vec<String>,
}

/// Ordered structural rule; the first match wins
struct VulnerabilityRule {
    kind: &'static str,
    description: &'static str,
    check: fn(&BTreeSet<String>) -> Option<Vec<String>>,
}

fn has(deployed: &BTreeSet<String>, component: &str) -> bool {
    deployed.contains(component)
}

fn present(deployed: &BTreeSet<String>, candidates: &[&str]) -> Vec<String> {
    candidates
        .iter()
        .filter(|c| deployed.contains(**c))
        .map(|c| c.to_string())
        .collect()
}

fn single_database(d: &BTreeSet<String>) -> Option<Vec<String>> {
    (has(d, "database") && !has(d, "replica")).then(|| vec!["database".to_string()])
}

fn no_security_layer(d: &BTreeSet<String>) -> Option<Vec<String>> {
    if ["firewall", "auth", "api_gateway"].iter().any(|c| has(d, c)) {
        return None;
    }
    let entry = present(d, &["load_balancer", "server", "cdn", "storage"]);
    (!entry.is_empty()).then_some(entry)
}

fn no_load_balancer(d: &BTreeSet<String>) -> Option<Vec<String>> {
    (has(d, "server") && !has(d, "load_balancer")).then(|| vec!["server".to_string()])
}

fn uncached_reads(d: &BTreeSet<String>) -> Option<Vec<String>> {
    (has(d, "database") && !has(d, "cache")).then(|| vec!["database".to_string()])
}

fn no_async_buffer(d: &BTreeSet<String>) -> Option<Vec<String>> {
    (has(d, "server") && !has(d, "queue")).then(|| vec!["server".to_string()])
}

fn no_redundancy(d: &BTreeSet<String>) -> Option<Vec<String>> {
    d.iter().next().map(|c| vec![c.clone()])
}

static RULES: &[VulnerabilityRule] = &[
    VulnerabilityRule {
        kind: "single_database",
        description: "The database has no replica, so one crash loses every write.",
        check: single_database,
    },
    VulnerabilityRule {
        kind: "no_security_layer",
        description: "Nothing filters or authenticates traffic before it reaches the services.",
        check: no_security_layer,
    },
    VulnerabilityRule {
        kind: "no_load_balancer",
        description: "Servers receive traffic directly, so one overloaded instance takes requests down.",
        check: no_load_balancer,
    },
    VulnerabilityRule {
        kind: "uncached_reads",
        description: "Every read goes straight to the database with no cache in front of it.",
        check: uncached_reads,
    },
    VulnerabilityRule {
        kind: "no_async_buffer",
        description: "All work happens synchronously with no queue to absorb bursts.",
        check: no_async_buffer,
    },
    VulnerabilityRule {
        kind: "no_redundancy",
        description: "Components run as single instances with nothing watching them.",
        check: no_redundancy,
    },
];

/// Match the rule table against the deployed components
pub fn rule_based_vulnerability(deployed: &BTreeSet<String>) -> Vulnerability {
    for rule in RULES {
        if let Some(targets) = (rule.check)(deployed) {
            return Vulnerability {
                kind: rule.kind.to_string(),
                description: rule.description.to_string(),
                target_components: targets,
            };
        }
    }

    Vulnerability {
        kind: "empty_design".to_string(),
        description: "Nothing has been deployed yet.".to_string(),
        target_components: Vec::new(),
    }
}

/// Why a candidate event was rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationFailure {
    #[error("no components are deployed, chaos cannot target an empty room")]
    NoDeployedComponents,

    #[error("required field `{0}` is empty")]
    MissingField(&'static str),

    #[error("event_id `{0}` was already used this round")]
    DuplicateEventId(String),

    #[error("description is {len} characters, at least {min} required")]
    DescriptionTooShort { len: usize, min: usize },

    #[error("target_components {targets:?} do not overlap deployed components {deployed:?}")]
    NoTargetOverlap {
        targets: Vec<String>,
        deployed: Vec<String>,
    },
}

impl ValidationFailure {
    /// A candidate rejected for this reason may still be used once retries run out
    pub fn usable_as_is(&self) -> bool {
        matches!(
            self,
            ValidationFailure::DescriptionTooShort { .. } | ValidationFailure::NoTargetOverlap { .. }
        )
    }

    /// No regeneration can fix this
    pub fn is_fatal(&self) -> bool {
        matches!(self, ValidationFailure::NoDeployedComponents)
    }
}

/// Check a candidate against the room
pub fn self_validate(
    candidate: &ChaosEvent,
    deployed: &BTreeSet<String>,
    past_event_ids: &BTreeSet<String>,
    min_description_len: usize,
) -> Result<(), ValidationFailure> {
    if deployed.is_empty() {
        return Err(ValidationFailure::NoDeployedComponents);
    }

    let fields = [
        ("event_id", candidate.event_id.trim().is_empty()),
        ("title", candidate.title.trim().is_empty()),
        ("description", candidate.description.trim().is_empty()),
        ("hint", candidate.hint.trim().is_empty()),
        ("target_components", candidate.target_components.is_empty()),
    ];
    if let Some((name, _)) = fields.iter().find(|(_, empty)| *empty) {
        return Err(ValidationFailure::MissingField(*name));
    }

    if past_event_ids.contains(&candidate.event_id) {
        return Err(ValidationFailure::DuplicateEventId(candidate.event_id.clone()));
    }

    let len = candidate.description.trim().chars().count();
    if len < min_description_len {
        return Err(ValidationFailure::DescriptionTooShort {
            len,
            min: min_description_len,
        });
    }

    if !candidate.target_components.iter().any(|c| deployed.contains(c)) {
        return Err(ValidationFailure::NoTargetOverlap {
            targets: candidate.target_components.clone(),
            deployed: deployed.iter().cloned().collect(),
        });
    }

    Ok(())
}

/// Pick the catalog entry overlapping most with `deployed`.
///
/// Entries already used this round are skipped while any remain; ties are
/// broken uniformly at random.
pub fn select_from_catalog<R: Rng + ?Sized>(
    deployed: &BTreeSet<String>,
    past_event_ids: &BTreeSet<String>,
    rng: &mut R,
) -> ChaosEvent {
    let fresh: Vec<&CatalogEvent> = CHAOS_CATALOG
        .iter()
        .filter(|e| !past_event_ids.contains(e.event_id))
        .collect();
    let pool: Vec<&CatalogEvent> = if fresh.is_empty() {
        CHAOS_CATALOG.iter().collect()
    } else {
        fresh
    };

    let best = pool.iter().map(|e| e.overlap(deployed)).max().unwrap_or(0);
    let tied: Vec<&CatalogEvent> = pool
        .into_iter()
        .filter(|e| e.overlap(deployed) == best)
        .collect();

    let mut event = tied
        .choose(rng)
        .map(|e| e.to_event())
        .unwrap_or_else(|| CHAOS_CATALOG[0].to_event());

    if past_event_ids.contains(&event.event_id) {
        event.event_id = unique_event_id(&event.event_id);
    }
    event
}

fn unique_event_id(prefix: &str) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}", prefix, &suffix[..8])
}

/// Where the final event came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventSource {
    /// Oracle candidate that passed validation
    Validated,
    /// Last oracle candidate, used after retries ran out
    Unvalidated,
    /// Static catalog
    Catalog,
}

/// Decision record of one chaos invocation
#[derive(Debug, Clone, PartialEq)]
pub struct ChaosOutcome {
    pub vulnerability: Vulnerability,
    pub event: ChaosEvent,
    pub source: EventSource,
    pub retry_count: u8,
    pub rejections: Vec<ValidationFailure>,
}

#[derive(Debug, Deserialize)]
struct EventReply {
    #[serde(default)]
    event_id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    severity: Severity,
    #[serde(default)]
    target_components: Vec<String>,
    #[serde(default)]
    hint: String,
}

/// Failure-injecting agent
pub struct ChaosAgent {
    config: ChaosConfig,
    oracle: SharedOracle,
    timeout: Duration,
}

impl ChaosAgent {
    pub fn new(config: ChaosConfig, oracle: SharedOracle) -> Self {
        Self {
            config,
            oracle,
            timeout: DEFAULT_ORACLE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The agent's own readiness: warm-up elapsed and cooldown since the last event
    pub fn is_ready(&self, room: &RoomState, now: DateTime<Utc>) -> bool {
        let warmed_up = room.round_elapsed_secs(now) >= self.config.warmup_secs;
        let cooled_down = room
            .chaos_triggered_at()
            .map(|at| secs_between(now, at) >= self.config.cooldown_secs)
            .unwrap_or(true);
        warmed_up && cooled_down
    }

    /// Identify the most exploitable gap
    pub async fn analyze_vulnerability(
        &self,
        deployed: &BTreeSet<String>,
        required: &[String],
    ) -> Vulnerability {
        if deployed.is_empty() {
            return rule_based_vulnerability(deployed);
        }

        let system = "You attack system designs. Pick the single most exploitable architectural gap. \
                      Reply with JSON: {\"kind\": string, \"description\": string, \"target_components\": [string]}.";
        let user = format!(
            "Deployed components: {}\nRequired components: {}",
            join(deployed.iter()),
            required.join(", ")
        );
        let request = OracleRequest::new(PURPOSE_VULNERABILITY, system, user).with_timeout(self.timeout);

        match oracle::consult::<Vulnerability>(&self.oracle, &request).await {
            Ok(found)
                if !found.kind.trim().is_empty()
                    && found.target_components.iter().any(|c| deployed.contains(c)) =>
            {
                found
            }
            _ => rule_based_vulnerability(deployed),
        }
    }

    /// Ask the oracle for a candidate event
    pub async fn generate_event(
        &self,
        vulnerability: &Vulnerability,
        deployed: &BTreeSet<String>,
        past_event_ids: &BTreeSet<String>,
        feedback: Option<&str>,
    ) -> Result<ChaosEvent, crate::errors::OracleError> {
        let system = "You inject realistic failure incidents into a system design game. \
                      Reply with JSON: {\"event_id\": string, \"title\": string, \"description\": string, \
                      \"severity\": \"low\"|\"medium\"|\"high\"|\"critical\", \"target_components\": [string], \"hint\": string}.";
        let mut user = format!(
            "Vulnerability: {} ({})\nTarget: {}\nDeployed components: {}\nEvent ids already used: {}",
            vulnerability.kind,
            vulnerability.description,
            vulnerability.target_components.join(", "),
            join(deployed.iter()),
            join(past_event_ids.iter()),
        );
        if let Some(reason) = feedback {
            user.push_str(&format!("\nYour previous event was rejected: {}. Fix it.", reason));
        }

        let request = OracleRequest::new(PURPOSE_EVENT, system, user).with_timeout(self.timeout);
        let reply: EventReply = oracle::consult(&self.oracle, &request).await?;

        let event_id = if reply.event_id.trim().is_empty() {
            unique_event_id(&vulnerability.kind)
        } else {
            reply.event_id.trim().to_string()
        };

        Ok(ChaosEvent {
            event_id,
            title: reply.title,
            description: reply.description,
            severity: reply.severity,
            target_components: reply.target_components,
            hint: reply.hint,
        })
    }

    /// Full pipeline; always yields an event
    pub async fn run(&self, room: &RoomState) -> ChaosOutcome {
        let deployed = room.deployed_union();
        let past = room.past_event_ids();
        let vulnerability = self.analyze_vulnerability(&deployed, room.mission_required()).await;
        debug!(room_id = %room.room_id, kind = %vulnerability.kind, "vulnerability selected");

        let mut retry = RetryState::new(self.config.max_retries);
        let mut rejections: Vec<ValidationFailure> = Vec::new();
        let mut last_candidate: Option<ChaosEvent> = None;

        loop {
            let feedback = rejections.last().map(|f| f.to_string());
            let candidate = match self
                .generate_event(&vulnerability, &deployed, past, feedback.as_deref())
                .await
            {
                Ok(candidate) => candidate,
                Err(_) => break,
            };

            match self_validate(&candidate, &deployed, past, self.config.min_description_len) {
                Ok(()) => {
                    return ChaosOutcome {
                        vulnerability,
                        event: candidate,
                        source: EventSource::Validated,
                        retry_count: retry.attempt,
                        rejections,
                    };
                }
                Err(failure) => {
                    info!(
                        room_id = %room.room_id,
                        attempt = retry.attempt,
                        reason = %failure,
                        "chaos candidate rejected"
                    );
                    let fatal = failure.is_fatal();
                    rejections.push(failure);
                    last_candidate = Some(candidate);
                    if fatal {
                        break;
                    }
                }
            }

            match retry.next() {
                Some(next) => retry = next,
                None => break,
            }
        }

        self.finalize(vulnerability, last_candidate, rejections, retry.attempt, &deployed, past)
    }

    fn finalize(
        &self,
        vulnerability: Vulnerability,
        last_candidate: Option<ChaosEvent>,
        rejections: Vec<ValidationFailure>,
        retry_count: u8,
        deployed: &BTreeSet<String>,
        past: &BTreeSet<String>,
    ) -> ChaosOutcome {
        let usable = rejections.last().map(|f| f.usable_as_is()).unwrap_or(false);

        let (event, source) = match last_candidate {
            Some(candidate) if usable => (candidate, EventSource::Unvalidated),
            _ => (
                select_from_catalog(deployed, past, &mut rand::thread_rng()),
                EventSource::Catalog,
            ),
        };

        ChaosOutcome {
            vulnerability,
            event,
            source,
            retry_count,
            rejections,
        }
    }
}

fn join<'a>(items: impl Iterator<Item = &'a String>) -> String {
    let joined = items.map(|s| s.as_str()).collect::<Vec<_>>().join(", ");
    if joined.is_empty() {
        "none".to_string()
    } else {
        joined
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::ScriptedOracle;
    use crate::types::CanvasNode;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::Arc;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn room_with(deployed: &[&str]) -> RoomState {
        let now = Utc::now();
        let mut room = RoomState::new("r", now);
        room.begin_round("m", &["server".to_string(), "database".to_string()], now);
        let nodes: Vec<CanvasNode> = deployed
            .iter()
            .enumerate()
            .map(|(i, c)| CanvasNode::new(format!("n{i}"), *c))
            .collect();
        room.update_design("p1", &nodes, &[], now);
        room
    }

    fn event_json(id: &str, description: &str, targets: &[&str]) -> String {
        serde_json::json!({
            "event_id": id,
            "title": "Outage",
            "description": description,
            "severity": "high",
            "target_components": targets,
            "hint": "Add redundancy"
        })
        .to_string()
    }

    fn candidate(id: &str, targets: &[&str]) -> ChaosEvent {
        ChaosEvent {
            event_id: id.to_string(),
            title: "t".to_string(),
            description: "a long enough description here".to_string(),
            severity: Severity::High,
            target_components: targets.iter().map(|s| s.to_string()).collect(),
            hint: "h".to_string(),
        }
    }

    #[test]
    fn test_rule_order_first_match_wins() {
        let v = rule_based_vulnerability(&set(&["server", "database"]));
        assert_eq!(v.kind, "single_database");

        let v = rule_based_vulnerability(&set(&["server", "database", "replica"]));
        assert_eq!(v.kind, "no_security_layer");

        let v = rule_based_vulnerability(&set(&["server", "firewall"]));
        assert_eq!(v.kind, "no_load_balancer");
    }

    #[test]
    fn test_rule_for_empty_design() {
        let v = rule_based_vulnerability(&BTreeSet::new());
        assert_eq!(v.kind, "empty_design");
        assert!(v.target_components.is_empty());
    }

    #[test]
    fn test_validate_rejections() {
        let deployed = set(&["server"]);
        let past = set(&["used"]);

        assert_eq!(
            self_validate(&candidate("x", &["server"]), &BTreeSet::new(), &past, 20),
            Err(ValidationFailure::NoDeployedComponents)
        );
        assert_eq!(
            self_validate(&candidate("used", &["server"]), &deployed, &past, 20),
            Err(ValidationFailure::DuplicateEventId("used".to_string()))
        );
        assert!(matches!(
            self_validate(&candidate("x", &["cdn"]), &deployed, &past, 20),
            Err(ValidationFailure::NoTargetOverlap { .. })
        ));
        assert!(matches!(
            self_validate(&candidate("x", &["server"]), &deployed, &past, 200),
            Err(ValidationFailure::DescriptionTooShort { .. })
        ));

        let mut untitled = candidate("x", &["server"]);
        untitled.title = " ".to_string();
        assert_eq!(
            self_validate(&untitled, &deployed, &past, 20),
            Err(ValidationFailure::MissingField("title"))
        );

        assert!(self_validate(&candidate("x", &["server"]), &deployed, &past, 20).is_ok());
    }

    #[test]
    fn test_catalog_prefers_highest_overlap() {
        let mut rng = StdRng::seed_from_u64(7);
        let event = select_from_catalog(&set(&["queue", "worker"]), &BTreeSet::new(), &mut rng);
        assert_eq!(event.event_id, "queue-backlog");
    }

    #[test]
    fn test_catalog_ties_pick_among_tied() {
        let deployed = set(&["cache"]);
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let event = select_from_catalog(&deployed, &BTreeSet::new(), &mut rng);
            assert_eq!(event.event_id, "cache-stampede");
        }

        let deployed = set(&["dns"]);
        let mut rng = StdRng::seed_from_u64(3);
        let event = select_from_catalog(&deployed, &set(&["dns-failure"]), &mut rng);
        let tied: Vec<&str> = CHAOS_CATALOG
            .iter()
            .filter(|e| e.event_id != "dns-failure")
            .map(|e| e.event_id)
            .collect();
        assert!(tied.contains(&event.event_id.as_str()));
    }

    #[test]
    fn test_catalog_skips_used_ids() {
        let mut rng = StdRng::seed_from_u64(1);
        let past = set(&["queue-backlog"]);
        let event = select_from_catalog(&set(&["queue", "worker"]), &past, &mut rng);
        assert_ne!(event.event_id, "queue-backlog");
    }

    #[test]
    fn test_catalog_exhausted_still_unique() {
        let mut rng = StdRng::seed_from_u64(1);
        let past: BTreeSet<String> = CHAOS_CATALOG.iter().map(|e| e.event_id.to_string()).collect();
        let event = select_from_catalog(&set(&["server"]), &past, &mut rng);
        assert!(!past.contains(&event.event_id));
    }

    #[tokio::test]
    async fn test_valid_candidate_accepted_first_try() {
        let oracle = Arc::new(ScriptedOracle::new().reply(
            PURPOSE_EVENT,
            event_json("db-meltdown", "The database ran out of disk space overnight.", &["database"]),
        ));
        let agent = ChaosAgent::new(ChaosConfig::default(), Some(oracle.clone()));

        let outcome = agent.run(&room_with(&["server", "database"])).await;
        assert_eq!(outcome.source, EventSource::Validated);
        assert_eq!(outcome.event.event_id, "db-meltdown");
        assert_eq!(outcome.retry_count, 0);
        assert_eq!(outcome.vulnerability.kind, "single_database");
    }

    #[tokio::test]
    async fn test_regenerate_with_feedback() {
        let oracle = Arc::new(
            ScriptedOracle::new()
                .reply(PURPOSE_EVENT, event_json("e1", "short", &["database"]))
                .reply(
                    PURPOSE_EVENT,
                    event_json("e2", "The database ran out of disk space overnight.", &["database"]),
                ),
        );
        let agent = ChaosAgent::new(ChaosConfig::default(), Some(oracle.clone()));

        let outcome = agent.run(&room_with(&["database"])).await;
        assert_eq!(outcome.source, EventSource::Validated);
        assert_eq!(outcome.event.event_id, "e2");
        assert_eq!(outcome.retry_count, 1);

        let requests = oracle.requests();
        let second = requests.iter().filter(|r| r.purpose == PURPOSE_EVENT).nth(1).unwrap();
        assert!(second.text().contains("rejected"));
    }

    #[tokio::test]
    async fn test_exhausted_retries_use_last_candidate() {
        let oracle = ScriptedOracle::new();
        for id in ["e1", "e2", "e3", "e4"] {
            oracle.push(PURPOSE_EVENT, Ok(event_json(id, "short", &["database"])));
        }
        let oracle = Arc::new(oracle);
        let agent = ChaosAgent::new(ChaosConfig::default(), Some(oracle.clone()));

        let outcome = agent.run(&room_with(&["database"])).await;
        assert_eq!(outcome.source, EventSource::Unvalidated);
        assert_eq!(outcome.event.event_id, "e3");
        assert_eq!(outcome.retry_count, 2);
        assert_eq!(oracle.calls(PURPOSE_EVENT), 3);
    }

    #[tokio::test]
    async fn test_repeated_duplicates_fall_back_to_catalog() {
        let oracle = ScriptedOracle::new();
        for _ in 0..3 {
            oracle.push(
                PURPOSE_EVENT,
                Ok(event_json("used", "The database ran out of disk space overnight.", &["database"])),
            );
        }
        let agent = ChaosAgent::new(ChaosConfig::default(), Some(Arc::new(oracle)));

        let mut room = room_with(&["database"]);
        room.remember_event_id("used");
        let outcome = agent.run(&room).await;
        assert_eq!(outcome.source, EventSource::Catalog);
        assert_ne!(outcome.event.event_id, "used");
    }

    #[tokio::test]
    async fn test_empty_room_never_uses_oracle_event() {
        let oracle = Arc::new(ScriptedOracle::new().reply(
            PURPOSE_EVENT,
            event_json("e1", "The database ran out of disk space overnight.", &["database"]),
        ));
        let agent = ChaosAgent::new(ChaosConfig::default(), Some(oracle));

        let outcome = agent.run(&room_with(&[])).await;
        assert_eq!(outcome.source, EventSource::Catalog);
        assert_eq!(outcome.rejections, vec![ValidationFailure::NoDeployedComponents]);
    }

    #[tokio::test]
    async fn test_no_oracle_uses_catalog() {
        let agent = ChaosAgent::new(ChaosConfig::default(), None);
        let outcome = agent.run(&room_with(&["cache", "database"])).await;
        assert_eq!(outcome.source, EventSource::Catalog);
        assert_eq!(outcome.event.event_id, "cache-stampede");
    }

    #[test]
    fn test_readiness_needs_warmup_and_cooldown() {
        let agent = ChaosAgent::new(ChaosConfig::default(), None);
        let start = Utc::now();
        let mut room = RoomState::new("r", start);
        room.begin_round("m", &[], start);

        assert!(!agent.is_ready(&room, start + chrono::Duration::seconds(10)));
        assert!(agent.is_ready(&room, start + chrono::Duration::seconds(30)));

        room.mark_chaos_fired(start + chrono::Duration::seconds(30));
        assert!(!agent.is_ready(&room, start + chrono::Duration::seconds(40)));
    }
}
