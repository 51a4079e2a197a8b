//! A small seeded planning world for tests.

use std::sync::Arc;

use chrono::NaiveDate;

use scn_types::{
    AssignmentDraft, AssignmentKey, AssignmentValue, CatalogEntry, NewScenario, Person, PersonId,
    Phase, PhaseDraft, PhaseId, PhaseKey, PhaseValue, Project, ProjectId, Role, RoleId, Scenario,
    ScenarioAssignment, ScenarioId, ScenarioPhaseTimeline,
};

use crate::error::StoreResult;
use crate::memory::InMemoryScenarioStore;
use crate::traits::ScenarioStore;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid fixture date")
}

/// An in-memory store with two projects, two people, two roles, two phase
/// kinds, and a baseline scenario.
pub struct Fixture {
    pub store: Arc<InMemoryScenarioStore>,
    pub baseline: Scenario,
    pub apollo: ProjectId,
    pub zeus: ProjectId,
    pub alice: PersonId,
    pub bob: PersonId,
    pub engineer: RoleId,
    pub designer: RoleId,
    pub discovery: PhaseId,
    pub build: PhaseId,
}

impl Fixture {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryScenarioStore::new());
        let apollo = Project {
            id: ProjectId::new(),
            name: "Apollo".into(),
            priority: 1,
            aspiration_start: Some(date(2025, 1, 1)),
            aspiration_finish: Some(date(2025, 6, 30)),
        };
        let zeus = Project {
            id: ProjectId::new(),
            name: "Zeus".into(),
            priority: 2,
            aspiration_start: Some(date(2025, 3, 1)),
            aspiration_finish: Some(date(2025, 12, 31)),
        };
        let alice = Person { id: PersonId::new(), name: "Alice".into() };
        let bob = Person { id: PersonId::new(), name: "Bob".into() };
        let engineer = Role { id: RoleId::new(), name: "Engineer".into() };
        let designer = Role { id: RoleId::new(), name: "Designer".into() };
        let discovery = Phase { id: PhaseId::new(), name: "Discovery".into() };
        let build = Phase { id: PhaseId::new(), name: "Build".into() };

        let ids = (
            apollo.id, zeus.id, alice.id, bob.id, engineer.id, designer.id, discovery.id,
            build.id,
        );
        for entry in [
            CatalogEntry::Project(apollo),
            CatalogEntry::Project(zeus),
            CatalogEntry::Person(alice),
            CatalogEntry::Person(bob),
            CatalogEntry::Role(engineer),
            CatalogEntry::Role(designer),
            CatalogEntry::Phase(discovery),
            CatalogEntry::Phase(build),
        ] {
            store.register(entry).expect("register fixture catalog");
        }
        let baseline = store
            .create_scenario(NewScenario::baseline("Plan of Record"))
            .expect("create baseline");

        Self {
            store,
            baseline,
            apollo: ids.0,
            zeus: ids.1,
            alice: ids.2,
            bob: ids.3,
            engineer: ids.4,
            designer: ids.5,
            discovery: ids.6,
            build: ids.7,
        }
    }

    /// Branch off `parent`.
    pub fn branch(&self, name: &str, parent: ScenarioId) -> Scenario {
        self.store
            .create_scenario(NewScenario::branch(name, parent))
            .expect("create branch")
    }

    pub fn key(&self, project: ProjectId, person: PersonId, role: RoleId) -> AssignmentKey {
        AssignmentKey {
            project_id: project,
            person_id: person,
            role_id: role,
        }
    }

    /// Alice as an engineer on Apollo.
    pub fn alice_on_apollo(&self) -> AssignmentKey {
        self.key(self.apollo, self.alice, self.engineer)
    }

    /// Bob as a designer on Zeus.
    pub fn bob_on_zeus(&self) -> AssignmentKey {
        self.key(self.zeus, self.bob, self.designer)
    }

    /// Upsert a fixed-date assignment for the first quarter of 2025.
    pub fn assign(
        &self,
        scenario: ScenarioId,
        key: AssignmentKey,
        pct: f64,
    ) -> StoreResult<ScenarioAssignment> {
        self.store.upsert_assignment(
            &scenario,
            AssignmentDraft {
                key,
                value: AssignmentValue::fixed(pct, date(2025, 1, 1), date(2025, 3, 31)),
            },
        )
    }

    /// Upsert a phase timeline on Apollo.
    pub fn timeline(
        &self,
        scenario: ScenarioId,
        phase: PhaseId,
        value: PhaseValue,
    ) -> StoreResult<ScenarioPhaseTimeline> {
        self.store.upsert_phase_timeline(
            &scenario,
            PhaseDraft {
                key: PhaseKey {
                    project_id: self.apollo,
                    phase_id: phase,
                },
                value,
            },
        )
    }

    /// Allocation of `key` in `scenario`, if assigned.
    pub fn allocation(&self, scenario: ScenarioId, key: &AssignmentKey) -> Option<f64> {
        self.store
            .snapshot(&scenario)
            .ok()?
            .assignment(key)
            .map(|a| a.allocation_percentage)
    }
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}
