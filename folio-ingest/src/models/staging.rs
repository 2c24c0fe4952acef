//! Short-lived staging state for one incoming work record
//!
//! Relation lists (identifiers, agents, normalized dates) travel beside the
//! persisted entity while a record is resolved and are dropped afterwards;
//! the entity structs in `db` never carry them.

use crate::models::date_range::{DateRange, DateType};
use crate::models::record::{
    AgentRecord, IdentifierRecord, InstanceRecord, RightsRecord, SubjectRecord, WorkRecord,
};
use crate::services::date_normalizer::DateNormalizer;

/// Work record with its relations pulled apart and dates normalized
#[derive(Debug, Clone)]
pub struct StagedWork {
    pub title: String,
    pub sub_title: Option<String>,
    pub language: Option<String>,
    pub medium: Option<String>,
    pub summary: Option<String>,
    pub identifiers: Vec<IdentifierRecord>,
    pub agents: Vec<AgentRecord>,
    pub subjects: Vec<SubjectRecord>,
    pub dates: Vec<DateRange>,
    pub instances: Vec<StagedInstance>,
}

/// Instance record with its relations pulled apart
#[derive(Debug, Clone)]
pub struct StagedInstance {
    /// Scalar fields only; relation lists are moved into the fields below
    pub fields: InstanceRecord,
    pub identifiers: Vec<IdentifierRecord>,
    pub agents: Vec<AgentRecord>,
    pub rights: Vec<RightsRecord>,
    pub dates: Vec<DateRange>,
}

impl StagedWork {
    pub fn from_record(record: WorkRecord) -> Self {
        let dates = record
            .dates
            .iter()
            .map(|d| DateNormalizer::parse(&d.display_date, DateType::parse(&d.date_type)))
            .collect();

        Self {
            title: record.title.trim().to_string(),
            sub_title: record.sub_title,
            language: record.language,
            medium: record.medium,
            summary: record.summary,
            identifiers: record.identifiers,
            agents: record.agents,
            subjects: record.subjects,
            dates,
            instances: record
                .instances
                .into_iter()
                .map(StagedInstance::from_record)
                .collect(),
        }
    }
}

impl StagedInstance {
    pub fn from_record(mut record: InstanceRecord) -> Self {
        let identifiers = std::mem::take(&mut record.identifiers);
        let agents = std::mem::take(&mut record.agents);
        let rights = std::mem::take(&mut record.rights);

        let mut dates: Vec<DateRange> = std::mem::take(&mut record.dates)
            .iter()
            .map(|d| DateNormalizer::parse(&d.display_date, DateType::parse(&d.date_type)))
            .collect();

        // The printed publication date wins over a typed pub_date entry
        if let Some(pub_date) = record.pub_date.as_deref().filter(|d| !d.trim().is_empty()) {
            dates.retain(|d| d.date_type != DateType::Publication);
            dates.push(DateNormalizer::parse(pub_date, DateType::Publication));
        }

        Self {
            fields: record,
            identifiers,
            agents,
            rights,
            dates,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::record::DateRecord;

    #[test]
    fn staging_moves_relations_out_of_instance() {
        let record = InstanceRecord {
            pub_date: Some("1851".to_string()),
            identifiers: vec![IdentifierRecord::new("oclc", "1")],
            agents: vec![AgentRecord::named("Harper & Brothers").with_role("publisher")],
            dates: vec![DateRecord {
                date_type: "pub_date".to_string(),
                display_date: "1850".to_string(),
            }],
            ..Default::default()
        };

        let staged = StagedInstance::from_record(record);

        assert!(staged.fields.identifiers.is_empty());
        assert!(staged.fields.agents.is_empty());
        assert_eq!(staged.identifiers.len(), 1);
        assert_eq!(staged.dates.len(), 1);
        let publication = staged
            .dates
            .iter()
            .find(|d| d.date_type == DateType::Publication)
            .unwrap();
        assert_eq!(publication.display, "1851");
    }
}
