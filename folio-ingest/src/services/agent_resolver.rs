//! Agent resolution
//!
//! Decides whether an observed person or organization is an agent already in
//! the catalog. Resolution order, first match wins:
//! 1. Authority match: exact VIAF or LCNAF code
//! 2. Fuzzy match: exactly one stored name similar enough to the cleaned name
//!
//! More than one authority match is resolved to the first stored agent and
//! logged. More than one fuzzy candidate means the name is too generic to
//! merge, so the agent is created as new.

use crate::config::MatchingConfig;
use crate::db::agents::{self, Agent};
use crate::db::dates::upsert_date;
use crate::db::OwnerKind;
use crate::error::IngestResult;
use crate::models::date_range::{DateRange, DateType};
use crate::models::record::{non_blank, AgentRecord};
use crate::services::authority_client::AuthorityLookup;
use crate::services::date_normalizer::DateNormalizer;
use crate::services::name_cleaner::{clean_agent_name, split_roles, CleanedName};
use crate::services::similarity::{name_similarity, trigram_similarity};
use sqlx::SqliteConnection;
use std::collections::BTreeSet;
use tracing::{debug, warn};
use uuid::Uuid;

/// Role recorded when a source names an agent without any role
pub const DEFAULT_ROLE: &str = "contributor";

/// Outcome of resolving one agent observation
#[derive(Debug, Clone)]
pub struct AgentResolution {
    pub agent: Agent,
    pub is_new: bool,
    /// Every role the agent now holds on the owner (previous and new)
    pub roles: BTreeSet<String>,
}

/// Fuzzy match candidate
#[derive(Debug, Clone)]
struct Candidate {
    agent: Agent,
    score: f64,
}

/// Agent resolver
///
/// Holds no state of its own; the authority lookup and thresholds are passed
/// in at construction.
pub struct AgentResolver<'a> {
    authority: &'a dyn AuthorityLookup,
    matching: &'a MatchingConfig,
}

impl<'a> AgentResolver<'a> {
    pub fn new(authority: &'a dyn AuthorityLookup, matching: &'a MatchingConfig) -> Self {
        Self {
            authority,
            matching,
        }
    }

    /// Resolve an agent observation and link it to `owner` when given
    ///
    /// # Errors
    /// `EmptyAgentName` when the name is empty after cleaning; storage errors.
    pub async fn resolve(
        &self,
        conn: &mut SqliteConnection,
        raw: &AgentRecord,
        owner: Option<(OwnerKind, Uuid)>,
    ) -> IngestResult<AgentResolution> {
        let cleaned = clean_agent_name(&raw.name)?;

        let mut viaf = non_blank(&raw.viaf).map(str::to_string);
        let mut lcnaf = non_blank(&raw.lcnaf).map(str::to_string);

        if viaf.is_none() && lcnaf.is_none() {
            if let Some(found) = self.authority.lookup(&cleaned.name).await {
                debug!(agent = %cleaned.name, viaf = ?found.viaf, lcnaf = ?found.lcnaf, "Authority enrichment");
                viaf = found.viaf.filter(|v| !v.trim().is_empty());
                lcnaf = found.lcnaf.filter(|v| !v.trim().is_empty());
            }
        }

        let existing = match self
            .authority_match(conn, &cleaned, viaf.as_deref(), lcnaf.as_deref())
            .await?
        {
            Some(agent) => Some(agent),
            None => {
                self.fuzzy_match(conn, &cleaned, viaf.as_deref(), lcnaf.as_deref())
                    .await?
            }
        };

        let is_new = existing.is_none();
        let agent = match existing {
            Some(stored) => {
                let merged = merge_agent(stored.clone(), &cleaned, viaf, lcnaf, raw);
                if merged != stored {
                    agents::update_agent(conn, &merged).await?;
                }
                if stored.name != merged.name {
                    agents::add_alias(conn, merged.guid, &stored.name).await?;
                }
                debug!(agent = %merged.name, guid = %merged.guid, "Matched existing agent");
                merged
            }
            None => {
                let mut agent = Agent::new(cleaned.name.clone());
                agent.viaf = viaf;
                agent.lcnaf = lcnaf;
                agent.biography = non_blank(&raw.biography).map(str::to_string);
                agents::insert_agent(conn, &agent).await?;
                debug!(agent = %agent.name, guid = %agent.guid, "Created new agent");
                agent
            }
        };

        for alias in raw.aliases.iter().map(|a| a.trim()) {
            if !alias.is_empty() && alias != agent.name {
                agents::add_alias(conn, agent.guid, alias).await?;
            }
        }

        for date in lifespan_dates(&cleaned, raw) {
            upsert_date(conn, OwnerKind::Agent, agent.guid, &date).await?;
        }

        let mut roles: BTreeSet<String> = cleaned.roles.clone();
        if let Some(role) = raw.role.as_deref() {
            roles.extend(split_roles(role));
        }

        if let Some((kind, owner_id)) = owner {
            let previous = agents::roles_for(conn, kind, owner_id, agent.guid).await?;
            if roles.is_empty() && previous.is_empty() {
                roles.insert(DEFAULT_ROLE.to_string());
            }
            for role in roles.difference(&previous) {
                agents::link_agent(conn, kind, owner_id, agent.guid, role).await?;
            }
            roles.extend(previous);
        }

        Ok(AgentResolution {
            agent,
            is_new,
            roles,
        })
    }

    async fn authority_match(
        &self,
        conn: &mut SqliteConnection,
        cleaned: &CleanedName,
        viaf: Option<&str>,
        lcnaf: Option<&str>,
    ) -> IngestResult<Option<Agent>> {
        let matches = agents::find_by_authority(conn, viaf, lcnaf).await?;

        if matches.len() > 1 {
            warn!(
                agent = %cleaned.name,
                viaf = ?viaf,
                lcnaf = ?lcnaf,
                matches = matches.len(),
                "Multiple agents share an authority code, using the first stored"
            );
        }

        Ok(matches.into_iter().next())
    }

    async fn fuzzy_match(
        &self,
        conn: &mut SqliteConnection,
        cleaned: &CleanedName,
        viaf: Option<&str>,
        lcnaf: Option<&str>,
    ) -> IngestResult<Option<Agent>> {
        let stored = agents::list_agents(conn).await?;
        let mut candidates = self.fuzzy_candidates(&cleaned.name, stored, viaf, lcnaf);

        match candidates.len() {
            0 => Ok(None),
            1 => {
                let candidate = candidates.remove(0);
                debug!(
                    agent = %cleaned.name,
                    matched = %candidate.agent.name,
                    score = candidate.score,
                    "Fuzzy agent match"
                );
                Ok(Some(candidate.agent))
            }
            n => {
                warn!(
                    agent = %cleaned.name,
                    candidates = n,
                    best = %candidates[0].agent.name,
                    "Ambiguous fuzzy agent match, treating as new"
                );
                Ok(None)
            }
        }
    }

    /// Stored agents similar to `name`, best first
    ///
    /// An agent whose authority code contradicts the incoming code is a
    /// different identity and is never a candidate.
    fn fuzzy_candidates(
        &self,
        name: &str,
        stored: Vec<Agent>,
        viaf: Option<&str>,
        lcnaf: Option<&str>,
    ) -> Vec<Candidate> {
        let mut candidates: Vec<Candidate> = stored
            .into_iter()
            .filter(|agent| !conflicts(agent.viaf.as_deref(), viaf) && !conflicts(agent.lcnaf.as_deref(), lcnaf))
            .filter(|agent| trigram_similarity(name, &agent.name) >= self.matching.trigram_threshold)
            .filter_map(|agent| {
                let score = name_similarity(name, &agent.name);
                (score >= self.matching.jaro_winkler_threshold).then_some(Candidate { agent, score })
            })
            .collect();

        // Stable sort keeps storage order among equal scores
        candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
        candidates
    }
}

fn conflicts(stored: Option<&str>, incoming: Option<&str>) -> bool {
    matches!((stored, incoming), (Some(s), Some(i)) if s != i)
}

/// Overwrite stored fields with the non-null incoming ones
fn merge_agent(
    mut agent: Agent,
    cleaned: &CleanedName,
    viaf: Option<String>,
    lcnaf: Option<String>,
    raw: &AgentRecord,
) -> Agent {
    agent.name = cleaned.name.clone();
    agent.sort_name = cleaned.sort_name.clone();
    if viaf.is_some() {
        agent.viaf = viaf;
    }
    if lcnaf.is_some() {
        agent.lcnaf = lcnaf;
    }
    if let Some(biography) = non_blank(&raw.biography) {
        agent.biography = Some(biography.to_string());
    }
    agent
}

/// Birth and death dates; explicit record fields win over an embedded lifespan
fn lifespan_dates(cleaned: &CleanedName, raw: &AgentRecord) -> Vec<DateRange> {
    let birth = non_blank(&raw.birth_date)
        .map(|d| DateNormalizer::parse(d, DateType::Birth))
        .or_else(|| cleaned.birth.clone());
    let death = non_blank(&raw.death_date)
        .map(|d| DateNormalizer::parse(d, DateType::Death))
        .or_else(|| cleaned.death.clone());

    birth.into_iter().chain(death).collect()
}
