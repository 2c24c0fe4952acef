//! Work record fixtures

use folio_ingest::models::{AgentRecord, IdentifierRecord, InstanceRecord, WorkRecord};

pub fn agent(name: &str, role: &str) -> AgentRecord {
    AgentRecord::named(name).with_role(role)
}

pub fn instance(place: &str, publisher: &str, date: &str, identifiers: &[(&str, &str)]) -> InstanceRecord {
    InstanceRecord {
        pub_place: Some(place.to_string()),
        pub_date: Some(date.to_string()),
        agents: vec![agent(publisher, "publisher")],
        identifiers: identifiers
            .iter()
            .map(|(t, v)| IdentifierRecord::new(*t, *v))
            .collect(),
        ..Default::default()
    }
}

/// Two 1851 printings of Moby-Dick as a harvested source would describe them
pub fn moby_dick() -> WorkRecord {
    let mut author = agent("Melville, Herman, 1819-1891.", "author");
    author.viaf = Some("27068555".to_string());

    WorkRecord {
        title: "Moby-Dick".to_string(),
        sub_title: Some("or, The Whale".to_string()),
        identifiers: vec![
            IdentifierRecord::new("oclc", "work-10001"),
            IdentifierRecord::new("ddc", "813.3"),
        ],
        agents: vec![author],
        instances: vec![
            instance("New York", "Harper & Brothers", "1851", &[("oclc", "1111"), ("lccn", "2222")]),
            instance("London", "Richard Bentley", "1851", &[("oclc", "3333"), ("ddc", "813.3")]),
        ],
        ..Default::default()
    }
}
