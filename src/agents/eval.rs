//! Evaluation agent: evaluate → critique → revise loop
//!
//! A draft comparison is critiqued deterministically and revised at most
//! `max_revisions` times. Each revision replaces the previous draft. Without
//! any draft the result is a templated comparison built from the designs.

use crate::agents::retry::RetryState;
use crate::config::EvalConfig;
use crate::errors::OracleError;
use crate::oracle::{self, OracleRequest, SharedOracle, DEFAULT_ORACLE_TIMEOUT};
use crate::types::{Comparison, PlayerResult, PlayerVerdict};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info};

/// Oracle purpose tags
pub const PURPOSE_EVALUATE: &str = "eval.evaluate";
pub const PURPOSE_REVISE: &str = "eval.revise";

const PRAISE_WORDS: &[&str] = &[
    "strong", "good", "great", "excellent", "solid", "robust", "effective", "well", "clear",
    "scalable", "resilient", "smart",
];

const CRITICISM_WORDS: &[&str] = &[
    "missing", "lacks", "lacking", "weak", "without", "fails", "risk", "bottleneck", "however",
    "but", "should", "no",
];

/// Multi-word criticism, matched on the normalized token stream
const CRITICISM_PHRASES: &[&str] = &["single point", "could improve"];

/// One scoring criterion supplied by the surrounding system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RubricCriterion {
    pub name: String,
    pub weight: f64,
    pub description: String,
}

/// Rubric the evaluation is conditioned on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringRubric {
    pub criteria: Vec<RubricCriterion>,
}

impl Default for ScoringRubric {
    fn default() -> Self {
        let criterion = |name: &str, weight: f64, description: &str| RubricCriterion {
            name: name.to_string(),
            weight,
            description: description.to_string(),
        };

        Self {
            criteria: vec![
                criterion("coverage", 0.4, "Required components are present"),
                criterion("connectivity", 0.3, "Components are wired into a coherent request path"),
                criterion("resilience", 0.3, "The design survives the failure injected this round"),
            ],
        }
    }
}

impl ScoringRubric {
    fn describe(&self) -> String {
        self.criteria
            .iter()
            .map(|c| format!("- {} (weight {:.2}): {}", c.name, c.weight, c.description))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Everything the evaluation looks at, detached from the room
#[derive(Debug, Clone, PartialEq)]
pub struct EvalContext {
    pub mission_title: String,
    pub required: Vec<String>,
    pub player1: PlayerResult,
    pub player2: PlayerResult,
}

impl EvalContext {
    fn missing(&self, result: &PlayerResult) -> Vec<String> {
        let deployed = result.deployed_components();
        self.required
            .iter()
            .filter(|c| !deployed.contains(c))
            .cloned()
            .collect()
    }
}

/// Verdict of `self_critique`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Critique {
    Pass,
    Revise(Vec<String>),
}

impl Critique {
    pub fn is_pass(&self) -> bool {
        matches!(self, Critique::Pass)
    }
}

impl fmt::Display for Critique {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Critique::Pass => f.write_str("PASS"),
            Critique::Revise(reasons) => write!(f, "REVISE: {}", reasons.join("; ")),
        }
    }
}

/// Result of one evaluation
#[derive(Debug, Clone, PartialEq)]
pub struct EvalOutcome {
    pub comparison: Comparison,
    pub revisions: u8,
    pub templated: bool,
    pub critiques: Vec<Critique>,
}

/// Comparative evaluation agent
pub struct EvalAgent {
    config: EvalConfig,
    oracle: SharedOracle,
    rubric: ScoringRubric,
    timeout: Duration,
}

impl EvalAgent {
    pub fn new(config: EvalConfig, oracle: SharedOracle, rubric: ScoringRubric) -> Self {
        Self {
            config,
            oracle,
            rubric,
            timeout: DEFAULT_ORACLE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_rubric(mut self, rubric: ScoringRubric) -> Self {
        self.rubric = rubric;
        self
    }

    pub fn rubric(&self) -> &ScoringRubric {
        &self.rubric
    }

    /// First draft
    pub async fn evaluate(&self, ctx: &EvalContext) -> Result<Comparison, OracleError> {
        let request = OracleRequest::new(PURPOSE_EVALUATE, self.system_prompt(), self.describe_designs(ctx))
            .with_timeout(self.timeout);
        oracle::consult(&self.oracle, &request).await
    }

    /// Inspect a draft for balance, concreteness and one-sidedness
    pub fn self_critique(&self, comparison: &Comparison, ctx: &EvalContext) -> Critique {
        let mut reasons = Vec::new();

        let len1 = comparison.player1.analysis.trim().chars().count();
        let len2 = comparison.player2.analysis.trim().chars().count();
        let (short, long) = (len1.min(len2), len1.max(len2));
        if short == 0 || long as f64 / short as f64 > self.config.imbalance_ratio {
            reasons.push(format!(
                "analysis length is unbalanced ({} vs {} characters)",
                len1, len2
            ));
        }

        let tone1 = Tone::of(&comparison.player1.analysis);
        let tone2 = Tone::of(&comparison.player2.analysis);
        if (tone1.praise_only() && tone2.criticism_only()) || (tone1.criticism_only() && tone2.praise_only()) {
            reasons.push("one side only receives praise and the other only criticism".to_string());
        }

        let sides = [
            ("player1", &comparison.player1, &ctx.player1),
            ("player2", &comparison.player2, &ctx.player2),
        ];
        let all_components: Vec<String> = ctx
            .player1
            .deployed_components()
            .into_iter()
            .chain(ctx.player2.deployed_components())
            .collect();

        for (label, verdict, result) in sides {
            let deployed = result.deployed_components();
            if !deployed.is_empty() && !mentions_any(&verdict.analysis, &deployed) {
                reasons.push(format!("{label} analysis names none of the deployed components"));
            }

            let concrete = mentions_any(&verdict.versus, &all_components);
            if !concrete || verdict.versus.trim().chars().count() < self.config.min_versus_len {
                reasons.push(format!("{label} versus is abstract, compare concrete components"));
            }
        }

        if reasons.is_empty() {
            Critique::Pass
        } else {
            Critique::Revise(reasons)
        }
    }

    /// New draft conditioned on the critique; replaces the previous one
    pub async fn revise(
        &self,
        ctx: &EvalContext,
        draft: &Comparison,
        critique: &Critique,
    ) -> Result<Comparison, OracleError> {
        let previous = serde_json::to_string(draft).map_err(|e| OracleError::Malformed(e.to_string()))?;
        let user = format!(
            "{}\n\nPrevious draft:\n{}\n\nReviewer feedback: {}\nWrite a new comparison that fixes every point.",
            self.describe_designs(ctx),
            previous,
            critique
        );
        let request = OracleRequest::new(PURPOSE_REVISE, self.system_prompt(), user).with_timeout(self.timeout);
        oracle::consult(&self.oracle, &request).await
    }

    /// Latest draft, or the templated comparison when there is none
    pub fn finalize(&self, draft: Option<Comparison>, ctx: &EvalContext) -> (Comparison, bool) {
        match draft {
            Some(comparison) => (comparison, false),
            None => (templated_comparison(ctx), true),
        }
    }

    /// Full pipeline; always yields a comparison
    pub async fn run(&self, ctx: &EvalContext) -> EvalOutcome {
        let mut draft = self.evaluate(ctx).await.ok();
        let mut retry = RetryState::new(self.config.max_revisions);
        let mut critiques = Vec::new();

        loop {
            let Some(current) = draft.as_ref() else {
                break;
            };

            let critique = self.self_critique(current, ctx);
            debug!(attempt = retry.attempt, %critique, "evaluation critique");
            critiques.push(critique.clone());

            if critique.is_pass() {
                break;
            }
            let Some(next) = retry.next() else {
                info!(revisions = retry.attempt, "revision bound reached, accepting latest draft");
                break;
            };

            match self.revise(ctx, current, &critique).await {
                Ok(revised) => {
                    draft = Some(revised);
                    retry = next;
                }
                Err(_) => break,
            }
        }

        let (comparison, templated) = self.finalize(draft, ctx);
        EvalOutcome {
            comparison,
            revisions: retry.attempt,
            templated,
            critiques,
        }
    }

    fn system_prompt(&self) -> String {
        format!(
            "You judge a two-player system design duel. Be fair and concrete: name the components \
             each player used, give both strengths and weaknesses for both sides.\nRubric:\n{}\n\
             Reply with JSON: {{\"player1\": {{\"analysis\": string, \"versus\": string}}, \
             \"player2\": {{\"analysis\": string, \"versus\": string}}}}.",
            self.rubric.describe()
        )
    }

    fn describe_designs(&self, ctx: &EvalContext) -> String {
        let describe = |label: &str, result: &PlayerResult| {
            format!(
                "{label} ({}): components [{}], {} connections, missing required [{}]",
                result.player_id,
                result.deployed_components().join(", "),
                result.arrows.len(),
                ctx.missing(result).join(", ")
            )
        };

        format!(
            "Mission: {}\nRequired: {}\n{}\n{}",
            ctx.mission_title,
            ctx.required.join(", "),
            describe("player1", &ctx.player1),
            describe("player2", &ctx.player2)
        )
    }
}

#[derive(Debug, Clone, Copy)]
struct Tone {
    praise: bool,
    criticism: bool,
}

impl Tone {
    fn of(text: &str) -> Self {
        let lower = text.to_lowercase();
        let words: Vec<&str> = lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();
        let joined = format!(" {} ", words.join(" "));

        // "as well" is a connective, not praise
        let praise = words
            .iter()
            .enumerate()
            .any(|(i, w)| PRAISE_WORDS.contains(w) && !(*w == "well" && i > 0 && words[i - 1] == "as"));
        let criticism = words.iter().any(|w| CRITICISM_WORDS.contains(w))
            || CRITICISM_PHRASES
                .iter()
                .any(|p| joined.contains(&format!(" {p} ")));

        Self { praise, criticism }
    }

    fn praise_only(&self) -> bool {
        self.praise && !self.criticism
    }

    fn criticism_only(&self) -> bool {
        self.criticism && !self.praise
    }
}

fn mentions_any(text: &str, components: &[String]) -> bool {
    let lower = text.to_lowercase();
    components.iter().any(|c| {
        let c = c.to_lowercase();
        lower.contains(&c) || lower.contains(&c.replace('_', " "))
    })
}

/// Deterministic comparison built only from the submitted designs
pub fn templated_comparison(ctx: &EvalContext) -> Comparison {
    let covered = |r: &PlayerResult| ctx.required.len() - ctx.missing(r).len();

    let analysis = |r: &PlayerResult| {
        let deployed = r.deployed_components();
        let mut text = format!(
            "{} deployed {} component(s) ({}) with {} connection(s) and covered {}/{} required components.",
            r.player_id,
            deployed.len(),
            if deployed.is_empty() { "none".to_string() } else { deployed.join(", ") },
            r.arrows.len(),
            covered(r),
            ctx.required.len()
        );
        let missing = ctx.missing(r);
        if !missing.is_empty() {
            text.push_str(&format!(" Missing: {}.", missing.join(", ")));
        }
        if let Some(score) = r.score {
            text.push_str(&format!(" Rubric score: {:.1}.", score));
        }
        text
    };

    let versus = |me: &PlayerResult, other: &PlayerResult| {
        format!(
            "Compared with {}, {} covered {} vs {} required components and drew {} vs {} connections.",
            other.player_id,
            me.player_id,
            covered(me),
            covered(other),
            me.arrows.len(),
            other.arrows.len()
        )
    };

    Comparison {
        player1: PlayerVerdict {
            analysis: analysis(&ctx.player1),
            versus: versus(&ctx.player1, &ctx.player2),
        },
        player2: PlayerVerdict {
            analysis: analysis(&ctx.player2),
            versus: versus(&ctx.player2, &ctx.player1),
        },
    }
}
