//! Shared reference data that scenario rows point at.
//!
//! Projects, people, roles, and phase kinds are not scenario-scoped: every
//! scenario refers to the same rows. Scenarios change a project's attributes
//! through [`ScenarioProjectOverride`](crate::ScenarioProjectOverride) rather
//! than by editing the catalog.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::ids::{PersonId, PhaseId, ProjectId, RoleId};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub aspiration_start: Option<NaiveDate>,
    #[serde(default)]
    pub aspiration_finish: Option<NaiveDate>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
}

/// A phase kind such as "Discovery" or "Development".
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phase {
    pub id: PhaseId,
    pub name: String,
}

/// A single catalog row, used when registering reference data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CatalogEntry {
    Project(Project),
    Person(Person),
    Role(Role),
    Phase(Phase),
}

impl CatalogEntry {
    /// Kind and id, for messages.
    pub fn label(&self) -> String {
        match self {
            Self::Project(p) => format!("project {}", p.id),
            Self::Person(p) => format!("person {}", p.id),
            Self::Role(r) => format!("role {}", r.id),
            Self::Phase(p) => format!("phase {}", p.id),
        }
    }
}

/// Flat, file-friendly form of the catalog (e.g. a TOML seed file).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSeed {
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub people: Vec<Person>,
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(default)]
    pub phases: Vec<Phase>,
}

/// Indexed reference data.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Catalog {
    pub projects: BTreeMap<ProjectId, Project>,
    pub people: BTreeMap<PersonId, Person>,
    pub roles: BTreeMap<RoleId, Role>,
    pub phases: BTreeMap<PhaseId, Phase>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a catalog row.
    pub fn insert(&mut self, entry: CatalogEntry) {
        match entry {
            CatalogEntry::Project(p) => {
                self.projects.insert(p.id, p);
            }
            CatalogEntry::Person(p) => {
                self.people.insert(p.id, p);
            }
            CatalogEntry::Role(r) => {
                self.roles.insert(r.id, r);
            }
            CatalogEntry::Phase(p) => {
                self.phases.insert(p.id, p);
            }
        }
    }

    /// Returns `true` if a row with the entry's kind and id is present.
    pub fn contains(&self, entry: &CatalogEntry) -> bool {
        match entry {
            CatalogEntry::Project(p) => self.projects.contains_key(&p.id),
            CatalogEntry::Person(p) => self.people.contains_key(&p.id),
            CatalogEntry::Role(r) => self.roles.contains_key(&r.id),
            CatalogEntry::Phase(p) => self.phases.contains_key(&p.id),
        }
    }

    pub fn from_seed(seed: CatalogSeed) -> Self {
        let mut catalog = Self::new();
        seed.projects
            .into_iter()
            .map(CatalogEntry::Project)
            .chain(seed.people.into_iter().map(CatalogEntry::Person))
            .chain(seed.roles.into_iter().map(CatalogEntry::Role))
            .chain(seed.phases.into_iter().map(CatalogEntry::Phase))
            .for_each(|entry| catalog.insert(entry));
        catalog
    }

    pub fn project(&self, id: &ProjectId) -> Option<&Project> {
        self.projects.get(id)
    }

    /// Display name of a project, falling back to its short id.
    pub fn project_name(&self, id: &ProjectId) -> String {
        self.projects
            .get(id)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| id.short_id())
    }

    pub fn person_name(&self, id: &PersonId) -> String {
        self.people
            .get(id)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| id.short_id())
    }

    pub fn role_name(&self, id: &RoleId) -> String {
        self.roles
            .get(id)
            .map(|r| r.name.clone())
            .unwrap_or_else(|| id.short_id())
    }

    pub fn phase_name(&self, id: &PhaseId) -> String {
        self.phases
            .get(id)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| id.short_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_builds_indexed_catalog() {
        let project = Project {
            id: ProjectId::new(),
            name: "Apollo".into(),
            priority: 1,
            aspiration_start: None,
            aspiration_finish: None,
        };
        let person = Person {
            id: PersonId::new(),
            name: "Alice".into(),
        };
        let seed = CatalogSeed {
            projects: vec![project.clone()],
            people: vec![person.clone()],
            ..Default::default()
        };

        let catalog = Catalog::from_seed(seed);
        assert_eq!(catalog.project(&project.id), Some(&project));
        assert_eq!(catalog.person_name(&person.id), "Alice");
        assert!(catalog.roles.is_empty());
    }

    #[test]
    fn unknown_names_fall_back_to_short_id() {
        let catalog = Catalog::new();
        let id = RoleId::new();
        assert_eq!(catalog.role_name(&id), id.short_id());
    }

    #[test]
    fn contains_matches_kind_and_id() {
        let role = Role {
            id: RoleId::new(),
            name: "Engineer".into(),
        };
        let mut catalog = Catalog::new();
        assert!(!catalog.contains(&CatalogEntry::Role(role.clone())));
        catalog.insert(CatalogEntry::Role(role.clone()));
        assert!(catalog.contains(&CatalogEntry::Role(role.clone())));
        let person = Person {
            id: PersonId::from_uuid(*role.id.as_uuid()),
            name: "Engineer".into(),
        };
        assert!(!catalog.contains(&CatalogEntry::Person(person)));
    }

    #[test]
    fn catalog_entry_is_tagged() {
        let entry = CatalogEntry::Role(Role {
            id: RoleId::new(),
            name: "Engineer".into(),
        });
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["kind"], "role");
        assert_eq!(json["name"], "Engineer");
    }
}
