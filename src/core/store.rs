//! Entity Store
//!
//! Owns the Problems and Components of one decomposition session. The store
//! only knows about existence: it refuses duplicate identifiers, dangling
//! parents and dangling dependencies. Acyclicity is the graph engine's job.
//!
//! Nothing is ever removed. Insertion order is recorded so listings are
//! stable across calls.

use super::error::{EngineError, EntityKind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::SystemTime;

/// Lowest allowed complexity rating
pub const MIN_COMPLEXITY: u8 = 1;
/// Highest allowed complexity rating
pub const MAX_COMPLEXITY: u8 = 10;

/// Open-ended metadata bag attached to a component
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Check that a complexity rating lies in 1..=10
pub fn validate_complexity(complexity: u8) -> Result<(), EngineError> {
    if (MIN_COMPLEXITY..=MAX_COMPLEXITY).contains(&complexity) {
        Ok(())
    } else {
        Err(EngineError::validation(
            "complexity",
            format!(
                "must be between {} and {}, got {}",
                MIN_COMPLEXITY, MAX_COMPLEXITY, complexity
            ),
        ))
    }
}

/// A problem under decomposition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Problem {
    pub id: String,
    pub statement: String,
    pub complexity: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default)]
    pub constraints: Vec<String>,
    #[serde(with = "super::rfc3339")]
    pub created_at: SystemTime,
}

/// Progress of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComponentStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl ComponentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentStatus::Pending => "pending",
            ComponentStatus::InProgress => "in-progress",
            ComponentStatus::Completed => "completed",
        }
    }
}

impl std::str::FromStr for ComponentStatus {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ComponentStatus::Pending),
            "in-progress" => Ok(ComponentStatus::InProgress),
            "completed" => Ok(ComponentStatus::Completed),
            other => Err(EngineError::validation(
                "status",
                format!(
                    "must be one of pending, in-progress, completed, got '{}'",
                    other
                ),
            )),
        }
    }
}

impl std::fmt::Display for ComponentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit of a decomposed problem
///
/// `dependencies` lists the components this one cannot complete before.
/// Each entry appears once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    pub id: String,
    pub parent_problem_id: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub status: ComponentStatus,
    pub complexity: u8,
    #[serde(with = "super::rfc3339")]
    pub created_at: SystemTime,
    #[serde(with = "super::rfc3339")]
    pub updated_at: SystemTime,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Component {
    /// Whether this component lists `id` as a dependency
    pub fn depends_on(&self, id: &str) -> bool {
        self.dependencies.iter().any(|d| d == id)
    }
}

/// Caller-supplied fields for creating or replacing a problem
#[derive(Debug, Clone, PartialEq)]
pub struct ProblemDraft {
    pub id: String,
    pub statement: String,
    pub complexity: u8,
    pub domain: Option<String>,
    pub constraints: Vec<String>,
}

impl ProblemDraft {
    /// Create a draft with the default complexity of 5
    pub fn new(id: impl Into<String>, statement: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            statement: statement.into(),
            complexity: 5,
            domain: None,
            constraints: Vec::new(),
        }
    }

    pub fn with_complexity(mut self, complexity: u8) -> Self {
        self.complexity = complexity;
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn with_constraint(mut self, constraint: impl Into<String>) -> Self {
        self.constraints.push(constraint.into());
        self
    }

    fn validate(&self) -> Result<(), EngineError> {
        require_non_empty("problemId", &self.id)?;
        require_non_empty("problemStatement", &self.statement)?;
        validate_complexity(self.complexity)
    }
}

/// Caller-supplied fields for creating or replacing a component
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentDraft {
    pub id: String,
    pub parent_problem_id: String,
    pub name: String,
    pub description: String,
    /// `None` on update keeps the stored dependency set
    pub dependencies: Option<Vec<String>>,
    pub status: ComponentStatus,
    pub complexity: u8,
    pub metadata: Metadata,
}

impl ComponentDraft {
    pub fn new(
        id: impl Into<String>,
        parent_problem_id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            parent_problem_id: parent_problem_id.into(),
            name: name.into(),
            description: description.into(),
            dependencies: None,
            status: ComponentStatus::Pending,
            complexity: 5,
            metadata: Metadata::new(),
        }
    }

    pub fn with_dependency(mut self, id: impl Into<String>) -> Self {
        self.dependencies
            .get_or_insert_with(Vec::new)
            .push(id.into());
        self
    }

    pub fn with_status(mut self, status: ComponentStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_complexity(mut self, complexity: u8) -> Self {
        self.complexity = complexity;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    fn validate(&self) -> Result<(), EngineError> {
        require_non_empty("componentId", &self.id)?;
        require_non_empty("parentProblemId", &self.parent_problem_id)?;
        require_non_empty("name", &self.name)?;
        validate_complexity(self.complexity)
    }

    /// Dependency ids with repeats removed, first occurrence wins
    fn unique_dependencies(&self) -> Option<Vec<String>> {
        let dependencies = self.dependencies.as_ref()?;
        let mut unique: Vec<String> = Vec::with_capacity(dependencies.len());
        for dep in dependencies {
            if !unique.contains(dep) {
                unique.push(dep.clone());
            }
        }
        Some(unique)
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<(), EngineError> {
    if value.trim().is_empty() {
        Err(EngineError::validation(field, "must not be empty"))
    } else {
        Ok(())
    }
}

/// Repository of problems and components for one session
#[derive(Debug, Clone, Default)]
pub struct EntityStore {
    problems: HashMap<String, Problem>,
    problem_order: Vec<String>,
    components: HashMap<String, Component>,
    component_order: Vec<String>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Problems
    // ------------------------------------------------------------------

    /// Insert a new problem. Fails if the identifier is taken.
    pub fn create_problem(&mut self, draft: ProblemDraft) -> Result<&Problem, EngineError> {
        draft.validate()?;
        if self.problems.contains_key(&draft.id) {
            return Err(EngineError::already_exists(EntityKind::Problem, draft.id));
        }

        let id = draft.id.clone();
        let problem = Problem {
            id: draft.id,
            statement: draft.statement,
            complexity: draft.complexity,
            domain: draft.domain,
            constraints: draft.constraints,
            created_at: SystemTime::now(),
        };
        self.problem_order.push(id.clone());
        Ok(&*self.problems.entry(id).or_insert(problem))
    }

    /// Replace every mutable field of an existing problem, keeping `created_at`
    pub fn update_problem(&mut self, draft: ProblemDraft) -> Result<&Problem, EngineError> {
        draft.validate()?;
        let problem = self
            .problems
            .get_mut(&draft.id)
            .ok_or_else(|| EngineError::not_found(EntityKind::Problem, draft.id.clone()))?;

        problem.statement = draft.statement;
        problem.complexity = draft.complexity;
        problem.domain = draft.domain;
        problem.constraints = draft.constraints;
        Ok(&*problem)
    }

    pub fn problem(&self, id: &str) -> Option<&Problem> {
        self.problems.get(id)
    }

    pub fn has_problem(&self, id: &str) -> bool {
        self.problems.contains_key(id)
    }

    /// Look up a problem or fail with `NotFound`
    pub fn require_problem(&self, id: &str) -> Result<&Problem, EngineError> {
        self.problem(id)
            .ok_or_else(|| EngineError::not_found(EntityKind::Problem, id))
    }

    /// All problems in creation order
    pub fn problems(&self) -> impl Iterator<Item = &Problem> {
        self.problem_order
            .iter()
            .filter_map(move |id| self.problems.get(id))
    }

    pub fn problem_count(&self) -> usize {
        self.problems.len()
    }

    // ------------------------------------------------------------------
    // Components
    // ------------------------------------------------------------------

    /// Insert a new component.
    ///
    /// The parent problem and every dependency must already exist.
    pub fn create_component(&mut self, draft: ComponentDraft) -> Result<&Component, EngineError> {
        draft.validate()?;
        if self.components.contains_key(&draft.id) {
            return Err(EngineError::already_exists(EntityKind::Component, draft.id));
        }
        self.check_references(&draft)?;

        let now = SystemTime::now();
        let id = draft.id.clone();
        let component = Component {
            dependencies: draft.unique_dependencies().unwrap_or_default(),
            id: draft.id,
            parent_problem_id: draft.parent_problem_id,
            name: draft.name,
            description: draft.description,
            status: draft.status,
            complexity: draft.complexity,
            created_at: now,
            updated_at: now,
            metadata: draft.metadata,
        };
        self.component_order.push(id.clone());
        Ok(&*self.components.entry(id).or_insert(component))
    }

    /// Check everything `update_component` would check, without writing
    pub fn check_component_update(&self, draft: &ComponentDraft) -> Result<(), EngineError> {
        draft.validate()?;
        if !self.components.contains_key(&draft.id) {
            return Err(EngineError::not_found(
                EntityKind::Component,
                draft.id.clone(),
            ));
        }
        self.check_references(draft)
    }

    /// Replace the mutable fields of an existing component.
    ///
    /// Keeps `created_at` and refreshes `updated_at`. The dependency set is
    /// replaced only when the draft carries one. The caller is responsible
    /// for running the cycle guard on the new dependency set.
    pub fn update_component(&mut self, draft: ComponentDraft) -> Result<&Component, EngineError> {
        self.check_component_update(&draft)?;
        let dependencies = draft.unique_dependencies();
        let component = self
            .components
            .get_mut(&draft.id)
            .ok_or_else(|| EngineError::not_found(EntityKind::Component, draft.id.clone()))?;

        component.parent_problem_id = draft.parent_problem_id;
        component.name = draft.name;
        component.description = draft.description;
        if let Some(dependencies) = dependencies {
            component.dependencies = dependencies;
        }
        component.status = draft.status;
        component.complexity = draft.complexity;
        component.metadata = draft.metadata;
        component.updated_at = SystemTime::now();
        Ok(&*component)
    }

    /// Append `target` to `source`'s dependency set.
    ///
    /// Returns `false` without touching the component when the edge exists.
    pub fn add_dependency(&mut self, source: &str, target: &str) -> Result<bool, EngineError> {
        if !self.components.contains_key(target) {
            return Err(EngineError::not_found(EntityKind::Component, target));
        }
        let component = self
            .components
            .get_mut(source)
            .ok_or_else(|| EngineError::not_found(EntityKind::Component, source))?;

        if component.depends_on(target) {
            return Ok(false);
        }
        component.dependencies.push(target.to_string());
        component.updated_at = SystemTime::now();
        Ok(true)
    }

    pub fn component(&self, id: &str) -> Option<&Component> {
        self.components.get(id)
    }

    pub fn has_component(&self, id: &str) -> bool {
        self.components.contains_key(id)
    }

    /// Look up a component or fail with `NotFound`
    pub fn require_component(&self, id: &str) -> Result<&Component, EngineError> {
        self.component(id)
            .ok_or_else(|| EngineError::not_found(EntityKind::Component, id))
    }

    /// All components in creation order
    pub fn components(&self) -> impl Iterator<Item = &Component> {
        self.component_order
            .iter()
            .filter_map(move |id| self.components.get(id))
    }

    /// Components owned by `problem_id`, in creation order
    pub fn components_of<'a>(&'a self, problem_id: &'a str) -> impl Iterator<Item = &'a Component> {
        self.components()
            .filter(move |c| c.parent_problem_id == problem_id)
    }

    /// Ids of components that list `id` as a dependency, in creation order
    pub fn dependents_of(&self, id: &str) -> Vec<String> {
        self.components()
            .filter(|c| c.depends_on(id))
            .map(|c| c.id.clone())
            .collect()
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    fn check_references(&self, draft: &ComponentDraft) -> Result<(), EngineError> {
        if !self.has_problem(&draft.parent_problem_id) {
            return Err(EngineError::not_found(
                EntityKind::Problem,
                draft.parent_problem_id.clone(),
            ));
        }
        if let Some(missing) = draft
            .dependencies
            .iter()
            .flatten()
            .find(|dep| !self.components.contains_key(dep.as_str()))
        {
            return Err(EngineError::not_found(
                EntityKind::Dependency,
                missing.clone(),
            ));
        }
        Ok(())
    }
}
