//! Work ingestion pipeline
//!
//! Resolves one incoming [`WorkRecord`] against the catalog inside a single
//! transaction:
//! 1. Find the work by identifier overlap (work identifiers first, then
//!    instance identifiers), else create it
//! 2. Attach work identifiers, subjects and dates
//! 3. Resolve and link work agents
//! 4. Match each instance by identifier overlap, merge or create, then attach
//!    its identifiers, dates, agents and rights
//!
//! Each instance runs under its own savepoint: a failure rolls back and skips
//! that instance only. An empty agent name skips that agent only.

use crate::config::EngineConfig;
use crate::db::identifiers::{link_identifier, owners_with_identifier, works_with_instance_identifier};
use crate::db::instances::{insert_instance, update_instance, Instance};
use crate::db::rights::link_rights;
use crate::db::subjects::link_subject;
use crate::db::works::{insert_work, load_work, update_work, Work};
use crate::db::{dates::upsert_date, OwnerKind};
use crate::error::{IngestError, IngestResult};
use crate::models::record::{non_blank, AgentRecord, IdentifierRecord, WorkRecord};
use crate::models::staging::{StagedInstance, StagedWork};
use crate::services::agent_resolver::AgentResolver;
use crate::services::authority_client::AuthorityLookup;
use crate::services::instance_matcher::{merge_fields, pick_by_votes, InstanceMatcher};
use serde::Serialize;
use sqlx::{Connection, SqliteConnection, SqlitePool};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Outcome of ingesting one work record
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IngestReport {
    pub work_id: Uuid,
    pub work_created: bool,
    pub agents_created: usize,
    pub agents_matched: usize,
    pub agents_skipped: usize,
    pub instances_created: usize,
    pub instances_merged: usize,
    pub instances_failed: usize,
}

#[derive(Debug, Default)]
struct AgentTally {
    created: usize,
    matched: usize,
    skipped: usize,
}

impl IngestReport {
    fn absorb(&mut self, tally: &AgentTally) {
        self.agents_created += tally.created;
        self.agents_matched += tally.matched;
        self.agents_skipped += tally.skipped;
    }
}

/// Work ingester
pub struct WorkIngester {
    pool: SqlitePool,
    authority: Arc<dyn AuthorityLookup>,
    config: EngineConfig,
}

impl WorkIngester {
    pub fn new(pool: SqlitePool, authority: Arc<dyn AuthorityLookup>, config: EngineConfig) -> Self {
        Self {
            pool,
            authority,
            config,
        }
    }

    /// Ingest one work record
    ///
    /// # Errors
    /// `MissingTitle` for a record without a title; storage errors outside
    /// the per-instance savepoints abort the whole record.
    pub async fn ingest(&self, record: WorkRecord) -> IngestResult<IngestReport> {
        if record.title.trim().is_empty() {
            return Err(IngestError::MissingTitle);
        }

        let staged = StagedWork::from_record(record);
        let resolver = AgentResolver::new(self.authority.as_ref(), &self.config.matching);
        let mut tx = self.pool.begin().await?;

        let (work, created) = self.resolve_work(&mut tx, &staged).await?;
        let mut report = IngestReport {
            work_id: work.guid,
            work_created: created,
            ..Default::default()
        };

        for identifier in &staged.identifiers {
            link_identifier(&mut tx, OwnerKind::Work, work.guid, identifier).await?;
        }
        for subject in &staged.subjects {
            link_subject(&mut tx, work.guid, subject).await?;
        }
        for date in &staged.dates {
            upsert_date(&mut tx, OwnerKind::Work, work.guid, date).await?;
        }

        let tally = resolve_agents(&mut tx, &resolver, &staged.agents, (OwnerKind::Work, work.guid)).await?;
        report.absorb(&tally);

        let mut matcher = InstanceMatcher::load(
            &mut tx,
            work.guid,
            &self.config.matching.excluded_identifier_types,
        )
        .await?;

        for (position, staged_instance) in staged.instances.iter().enumerate() {
            let mut savepoint = Connection::begin(&mut *tx).await?;

            match ingest_instance(&mut savepoint, &resolver, &matcher, work.guid, staged_instance).await {
                Ok((instance, merged, tally)) => {
                    savepoint.commit().await?;
                    report.absorb(&tally);
                    if merged {
                        report.instances_merged += 1;
                    } else {
                        report.instances_created += 1;
                    }
                    // Later candidates in this record can match the fresh identifiers
                    matcher.register(instance, &staged_instance.identifiers);
                }
                Err(e) => {
                    savepoint.rollback().await?;
                    report.instances_failed += 1;
                    warn!(
                        work_id = %work.guid,
                        instance = position,
                        error = %e,
                        "Instance merge failed, skipping instance"
                    );
                }
            }
        }

        tx.commit().await?;

        info!(
            work_id = %report.work_id,
            created = report.work_created,
            agents_created = report.agents_created,
            agents_matched = report.agents_matched,
            agents_skipped = report.agents_skipped,
            instances_created = report.instances_created,
            instances_merged = report.instances_merged,
            instances_failed = report.instances_failed,
            "Work ingested"
        );

        Ok(report)
    }

    /// Existing work sharing the most identifiers, else a new one
    async fn resolve_work(&self, conn: &mut SqliteConnection, staged: &StagedWork) -> IngestResult<(Work, bool)> {
        let excluded: HashSet<String> = self
            .config
            .matching
            .excluded_identifier_types
            .iter()
            .map(|t| t.trim().to_lowercase())
            .collect();

        let usable = |identifier: &&IdentifierRecord, seen: &mut HashSet<String>| {
            !excluded.contains(&identifier.id_type.trim().to_lowercase()) && seen.insert(identifier.key())
        };

        let mut seen = HashSet::new();
        let mut votes = Vec::new();
        for identifier in staged.identifiers.iter().filter(|i| usable(i, &mut seen)) {
            votes.extend(owners_with_identifier(conn, OwnerKind::Work, identifier).await?);
        }

        // Records without work-level identifiers are found through their instances
        if votes.is_empty() {
            let mut seen = HashSet::new();
            for identifier in staged
                .instances
                .iter()
                .flat_map(|i| i.identifiers.iter())
                .filter(|i| usable(i, &mut seen))
            {
                votes.extend(works_with_instance_identifier(conn, identifier).await?);
            }
        }

        if let Some(work_id) = pick_by_votes(votes) {
            if let Some(stored) = load_work(conn, work_id).await? {
                let merged = merge_work(stored.clone(), staged);
                if merged != stored {
                    update_work(conn, &merged).await?;
                }
                debug!(work_id = %merged.guid, title = %merged.title, "Matched existing work");
                return Ok((merged, false));
            }
        }

        let mut work = Work::new(staged.title.clone());
        work.sub_title = non_blank(&staged.sub_title).map(str::to_string);
        work.language = non_blank(&staged.language).map(str::to_string);
        work.medium = non_blank(&staged.medium).map(str::to_string);
        work.summary = non_blank(&staged.summary).map(str::to_string);
        insert_work(conn, &work).await?;
        debug!(work_id = %work.guid, title = %work.title, "Created new work");

        Ok((work, true))
    }
}

/// Non-null incoming fields overwrite; the first-seen title is kept
fn merge_work(mut work: Work, staged: &StagedWork) -> Work {
    for (stored, incoming) in [
        (&mut work.sub_title, &staged.sub_title),
        (&mut work.language, &staged.language),
        (&mut work.medium, &staged.medium),
        (&mut work.summary, &staged.summary),
    ] {
        if let Some(value) = non_blank(incoming) {
            *stored = Some(value.to_string());
        }
    }
    work
}

async fn resolve_agents(
    conn: &mut SqliteConnection,
    resolver: &AgentResolver<'_>,
    agents: &[AgentRecord],
    owner: (OwnerKind, Uuid),
) -> IngestResult<AgentTally> {
    let mut tally = AgentTally::default();

    for agent in agents {
        match resolver.resolve(conn, agent, Some(owner)).await {
            Ok(resolution) if resolution.is_new => tally.created += 1,
            Ok(_) => tally.matched += 1,
            Err(IngestError::EmptyAgentName(raw)) => {
                warn!(raw = %raw, owner = owner.0.as_str(), "Skipping agent with empty name");
                tally.skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }

    Ok(tally)
}

/// Merge or create one instance and attach its relations
async fn ingest_instance(
    conn: &mut SqliteConnection,
    resolver: &AgentResolver<'_>,
    matcher: &InstanceMatcher,
    work_id: Uuid,
    staged: &StagedInstance,
) -> IngestResult<(Instance, bool, AgentTally)> {
    let (instance, merged) = match matcher.find_match(&staged.identifiers) {
        Some(slot) => {
            let existing = matcher.instance(slot);
            let instance = match merge_fields(existing, &staged.fields) {
                Some(updated) => {
                    update_instance(conn, &updated).await?;
                    updated
                }
                None => existing.clone(),
            };
            debug!(instance_id = %instance.guid, "Matched existing instance");
            (instance, true)
        }
        None => {
            let instance = Instance::from_record(work_id, &staged.fields);
            insert_instance(conn, &instance).await?;
            debug!(instance_id = %instance.guid, "Created new instance");
            (instance, false)
        }
    };

    for identifier in &staged.identifiers {
        link_identifier(conn, OwnerKind::Instance, instance.guid, identifier).await?;
    }
    for date in &staged.dates {
        upsert_date(conn, OwnerKind::Instance, instance.guid, date).await?;
    }
    let tally = resolve_agents(conn, resolver, &staged.agents, (OwnerKind::Instance, instance.guid)).await?;
    for rights in &staged.rights {
        link_rights(conn, instance.guid, rights).await?;
    }

    Ok((instance, merged, tally))
}
