//! decomposer/decompose Tool Implementation
//!
//! The request dispatcher. One flat request carries an `action` name plus
//! whichever fields that action needs; the dispatcher validates the shape,
//! routes to the engine, and wraps the outcome in a uniform envelope:
//!
//! ```text
//! {"status": "success", "message": "...", <payload fields>}
//! {"status": "failed", "error": "..."}
//! ```
//!
//! Requests are turned into a [`Command`] before the engine is touched, so
//! every validation failure happens with the engine untouched. Commands are
//! split into mutations and queries so a shared engine can be locked
//! exclusively only when needed.

use crate::core::{
    ComponentDraft, ComponentStatus, DecompositionEngine, DecompositionMetrics, EngineError,
    Metadata, ProblemDraft,
    MAX_COMPLEXITY, MIN_COMPLEXITY,
};
use crate::mcp::server::ServerConfig;
use rmcp::schemars::{self, JsonSchema};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Request for decomposer/decompose tool
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DecomposeRequest {
    /// Action to perform (createProblem, updateProblem, createComponent,
    /// updateComponent, linkComponents, startPhase, completePhase,
    /// calculateMetrics, getDecomposition, getComponentDetails,
    /// getProblemDetails, getPhaseHistory)
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub problem_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub problem_statement: Option<String>,
    /// Complexity rating 1-10 (defaults to the configured default)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complexity: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_problem_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Ids of components this one depends on; each must already exist.
    /// Omitted on updateComponent, the stored set is kept.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<Vec<String>>,
    /// pending, in-progress or completed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
    /// Component that gains the dependency
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    /// Component being depended upon
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase_name: Option<String>,
}

/// Recognized dispatcher actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    CreateProblem,
    UpdateProblem,
    CreateComponent,
    UpdateComponent,
    LinkComponents,
    StartPhase,
    CompletePhase,
    CalculateMetrics,
    GetDecomposition,
    GetComponentDetails,
    GetProblemDetails,
    GetPhaseHistory,
}

impl Action {
    pub const ALL: [Action; 12] = [
        Action::CreateProblem,
        Action::UpdateProblem,
        Action::CreateComponent,
        Action::UpdateComponent,
        Action::LinkComponents,
        Action::StartPhase,
        Action::CompletePhase,
        Action::CalculateMetrics,
        Action::GetDecomposition,
        Action::GetComponentDetails,
        Action::GetProblemDetails,
        Action::GetPhaseHistory,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::CreateProblem => "createProblem",
            Action::UpdateProblem => "updateProblem",
            Action::CreateComponent => "createComponent",
            Action::UpdateComponent => "updateComponent",
            Action::LinkComponents => "linkComponents",
            Action::StartPhase => "startPhase",
            Action::CompletePhase => "completePhase",
            Action::CalculateMetrics => "calculateMetrics",
            Action::GetDecomposition => "getDecomposition",
            Action::GetComponentDetails => "getComponentDetails",
            Action::GetProblemDetails => "getProblemDetails",
            Action::GetPhaseHistory => "getPhaseHistory",
        }
    }
}

impl std::str::FromStr for Action {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .iter()
            .copied()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| EngineError::validation("action", format!("unknown action '{}'", s)))
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated state change
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    CreateProblem(ProblemDraft),
    UpdateProblem(ProblemDraft),
    CreateComponent(ComponentDraft),
    UpdateComponent(ComponentDraft),
    LinkComponents {
        source_id: String,
        target_id: String,
    },
    StartPhase {
        phase_id: String,
        name: String,
        description: String,
    },
    CompletePhase {
        phase_id: String,
        problem_id: String,
    },
}

/// A validated read
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    CalculateMetrics { problem_id: String },
    GetDecomposition { problem_id: String },
    GetComponentDetails { component_id: String },
    GetProblemDetails { problem_id: String },
    GetPhaseHistory,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Mutate(Mutation),
    Query(Query),
}

impl DecomposeRequest {
    /// Create a request for `action` with every other field unset
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            ..Default::default()
        }
    }

    /// Validate the request shape against the configured limits and turn it
    /// into a command. Never looks at engine state.
    pub fn into_command(self, config: &ServerConfig) -> Result<Command, EngineError> {
        let action: Action = self.action.parse()?;
        let limits = Limits::from(config);

        let command = match action {
            Action::CreateProblem => Command::Mutate(Mutation::CreateProblem(
                self.problem_draft(&limits, config)?,
            )),
            Action::UpdateProblem => Command::Mutate(Mutation::UpdateProblem(
                self.problem_draft(&limits, config)?,
            )),
            Action::CreateComponent => Command::Mutate(Mutation::CreateComponent(
                self.component_draft(&limits, config)?,
            )),
            Action::UpdateComponent => Command::Mutate(Mutation::UpdateComponent(
                self.component_draft(&limits, config)?,
            )),
            Action::LinkComponents => Command::Mutate(Mutation::LinkComponents {
                source_id: limits.identifier("sourceId", self.source_id)?,
                target_id: limits.identifier("targetId", self.target_id)?,
            }),
            Action::StartPhase => Command::Mutate(Mutation::StartPhase {
                phase_id: limits.identifier("phaseId", self.phase_id)?,
                name: limits.text("phaseName", self.phase_name)?,
                description: limits.text("description", self.description)?,
            }),
            Action::CompletePhase => Command::Mutate(Mutation::CompletePhase {
                phase_id: limits.identifier("phaseId", self.phase_id)?,
                problem_id: limits.identifier("problemId", self.problem_id)?,
            }),
            Action::CalculateMetrics => Command::Query(Query::CalculateMetrics {
                problem_id: limits.identifier("problemId", self.problem_id)?,
            }),
            Action::GetDecomposition => Command::Query(Query::GetDecomposition {
                problem_id: limits.identifier("problemId", self.problem_id)?,
            }),
            Action::GetComponentDetails => Command::Query(Query::GetComponentDetails {
                component_id: limits.identifier("componentId", self.component_id)?,
            }),
            Action::GetProblemDetails => Command::Query(Query::GetProblemDetails {
                problem_id: limits.identifier("problemId", self.problem_id)?,
            }),
            Action::GetPhaseHistory => Command::Query(Query::GetPhaseHistory),
        };
        Ok(command)
    }

    fn problem_draft(
        self,
        limits: &Limits,
        config: &ServerConfig,
    ) -> Result<ProblemDraft, EngineError> {
        let id = limits.identifier("problemId", self.problem_id)?;
        let statement = limits.text("problemStatement", self.problem_statement)?;
        let complexity = complexity(self.complexity, config.default_complexity)?;
        let constraints = limits.list("constraints", self.constraints.unwrap_or_default())?;
        for constraint in &constraints {
            limits.check_text("constraints", constraint)?;
        }

        let mut draft = ProblemDraft::new(id, statement).with_complexity(complexity);
        if let Some(domain) = self.domain {
            limits.check_text("domain", &domain)?;
            draft = draft.with_domain(domain);
        }
        draft.constraints = constraints;
        Ok(draft)
    }

    fn component_draft(
        self,
        limits: &Limits,
        config: &ServerConfig,
    ) -> Result<ComponentDraft, EngineError> {
        let id = limits.identifier("componentId", self.component_id)?;
        let parent = limits.identifier("parentProblemId", self.parent_problem_id)?;
        let name = limits.text("name", self.name)?;
        let description = limits.text("description", self.description)?;
        let complexity = complexity(self.complexity, config.default_complexity)?;
        let dependencies = self
            .dependencies
            .map(|deps| limits.list("dependencies", deps))
            .transpose()?;
        for dep in dependencies.iter().flatten() {
            limits.check_identifier("dependencies", dep)?;
        }
        let status = match self.status {
            Some(raw) => raw.parse::<ComponentStatus>()?,
            None => ComponentStatus::Pending,
        };

        let mut draft = ComponentDraft::new(id, parent, name, description)
            .with_status(status)
            .with_complexity(complexity);
        draft.dependencies = dependencies;
        draft.metadata = self.metadata.unwrap_or_default();
        Ok(draft)
    }
}

/// Size limits applied during request validation
#[derive(Debug, Clone, Copy)]
struct Limits {
    identifier: usize,
    text: usize,
    list: usize,
}

impl From<&ServerConfig> for Limits {
    fn from(config: &ServerConfig) -> Self {
        Self {
            identifier: config.max_identifier_length,
            text: config.max_text_length,
            list: config.max_list_length,
        }
    }
}

impl Limits {
    /// Required, non-blank identifier within the length limit
    fn identifier(&self, field: &str, value: Option<String>) -> Result<String, EngineError> {
        let value = required(field, value)?;
        if value.trim().is_empty() {
            return Err(EngineError::validation(field, "must not be empty"));
        }
        self.check_identifier(field, &value)?;
        Ok(value)
    }

    /// Required text within the length limit; may be empty
    fn text(&self, field: &str, value: Option<String>) -> Result<String, EngineError> {
        let value = required(field, value)?;
        self.check_text(field, &value)?;
        Ok(value)
    }

    fn list(&self, field: &str, values: Vec<String>) -> Result<Vec<String>, EngineError> {
        if values.len() > self.list {
            return Err(EngineError::validation(
                field,
                format!("at most {} entries allowed, got {}", self.list, values.len()),
            ));
        }
        Ok(values)
    }

    fn check_identifier(&self, field: &str, value: &str) -> Result<(), EngineError> {
        check_length(field, value, self.identifier)
    }

    fn check_text(&self, field: &str, value: &str) -> Result<(), EngineError> {
        check_length(field, value, self.text)
    }
}

fn required(field: &str, value: Option<String>) -> Result<String, EngineError> {
    value.ok_or_else(|| EngineError::validation(field, "is required"))
}

fn check_length(field: &str, value: &str, max: usize) -> Result<(), EngineError> {
    let len = value.chars().count();
    if len > max {
        Err(EngineError::validation(
            field,
            format!("exceeds maximum length of {} characters (got {})", max, len),
        ))
    } else {
        Ok(())
    }
}

fn complexity(value: Option<i64>, default: u8) -> Result<u8, EngineError> {
    let Some(raw) = value else {
        return Ok(default);
    };
    match u8::try_from(raw) {
        Ok(c) if (MIN_COMPLEXITY..=MAX_COMPLEXITY).contains(&c) => Ok(c),
        _ => Err(EngineError::validation(
            "complexity",
            format!(
                "must be between {} and {}, got {}",
                MIN_COMPLEXITY, MAX_COMPLEXITY, raw
            ),
        )),
    }
}

/// Uniform response envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ToolEnvelope {
    Success {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        #[serde(flatten)]
        payload: Map<String, Value>,
    },
    Failed {
        error: String,
    },
}

impl ToolEnvelope {
    pub fn failed(error: &EngineError) -> Self {
        ToolEnvelope::Failed {
            error: error.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ToolEnvelope::Success { .. })
    }

    /// Failure message, if any
    pub fn error(&self) -> Option<&str> {
        match self {
            ToolEnvelope::Failed { error } => Some(error),
            ToolEnvelope::Success { .. } => None,
        }
    }

    /// Payload field of a success envelope
    pub fn get(&self, field: &str) -> Option<&Value> {
        match self {
            ToolEnvelope::Success { payload, .. } => payload.get(field),
            ToolEnvelope::Failed { .. } => None,
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, DecomposeToolError> {
        serde_json::to_string_pretty(self).map_err(DecomposeToolError::from)
    }
}

/// Errors that can occur during decompose tool execution
#[derive(Debug, Clone, PartialEq)]
pub enum DecomposeToolError {
    /// The engine refused the action; reported in a `failed` envelope
    Engine(EngineError),
    /// A result could not be rendered as JSON
    Serialization { message: String },
}

impl std::fmt::Display for DecomposeToolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Engine(err) => write!(f, "{}", err),
            Self::Serialization { message } => {
                write!(f, "failed to serialize response: {}", message)
            }
        }
    }
}

impl std::error::Error for DecomposeToolError {}

impl From<EngineError> for DecomposeToolError {
    fn from(err: EngineError) -> Self {
        Self::Engine(err)
    }
}

impl From<serde_json::Error> for DecomposeToolError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: err.to_string(),
        }
    }
}

fn success<T: Serialize>(
    message: Option<String>,
    payload: &T,
) -> Result<ToolEnvelope, DecomposeToolError> {
    match serde_json::to_value(payload)? {
        Value::Object(payload) => Ok(ToolEnvelope::Success { message, payload }),
        other => Err(DecomposeToolError::Serialization {
            message: format!("payload is not an object: {}", other),
        }),
    }
}

/// calculateMetrics payload: the metric fields next to `problemId`
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MetricsReport<'a> {
    problem_id: &'a str,
    #[serde(flatten)]
    metrics: DecompositionMetrics,
}

/// Single-field payload helper
fn field<T: Serialize>(name: &str, value: &T) -> Result<Map<String, Value>, DecomposeToolError> {
    let mut map = Map::new();
    map.insert(name.to_string(), serde_json::to_value(value)?);
    Ok(map)
}

/// Apply a mutation to the engine
pub fn execute_mutation(
    engine: &mut DecompositionEngine,
    mutation: Mutation,
) -> Result<ToolEnvelope, DecomposeToolError> {
    match mutation {
        Mutation::CreateProblem(draft) => {
            let problem = engine.create_problem(draft)?;
            let message = format!("Problem '{}' created", problem.id);
            success(Some(message), &field("problem", &problem)?)
        }
        Mutation::UpdateProblem(draft) => {
            let problem = engine.update_problem(draft)?;
            let message = format!("Problem '{}' updated", problem.id);
            success(Some(message), &field("problem", &problem)?)
        }
        Mutation::CreateComponent(draft) => {
            let component = engine.create_component(draft)?;
            let message = format!("Component '{}' created", component.id);
            success(Some(message), &field("component", &component)?)
        }
        Mutation::UpdateComponent(draft) => {
            let component = engine.update_component(draft)?;
            let message = format!("Component '{}' updated", component.id);
            success(Some(message), &field("component", &component)?)
        }
        Mutation::LinkComponents {
            source_id,
            target_id,
        } => {
            let outcome = engine.link_components(&source_id, &target_id)?;
            let message = if outcome.created {
                format!("Linked '{}' -> '{}'", source_id, target_id)
            } else {
                format!("'{}' already depends on '{}'", source_id, target_id)
            };
            success(Some(message), &outcome)
        }
        Mutation::StartPhase {
            phase_id,
            name,
            description,
        } => {
            let phase = engine.start_phase(&phase_id, &name, &description)?;
            let message = format!("Phase '{}' started", phase.id);
            success(Some(message), &field("phase", &phase)?)
        }
        Mutation::CompletePhase {
            phase_id,
            problem_id,
        } => {
            let phase = engine.complete_phase(&phase_id, &problem_id)?;
            let message = format!("Phase '{}' completed", phase.id);
            success(Some(message), &field("phase", &phase)?)
        }
    }
}

/// Run a read-only query against the engine
pub fn execute_query(
    engine: &DecompositionEngine,
    query: Query,
) -> Result<ToolEnvelope, DecomposeToolError> {
    match query {
        Query::CalculateMetrics { problem_id } => {
            let metrics = engine.calculate_metrics(&problem_id)?;
            success(
                None,
                &MetricsReport {
                    problem_id: &problem_id,
                    metrics,
                },
            )
        }
        Query::GetDecomposition { problem_id } => {
            success(None, &engine.decomposition(&problem_id)?)
        }
        Query::GetComponentDetails { component_id } => {
            success(None, &engine.component_details(&component_id)?)
        }
        Query::GetProblemDetails { problem_id } => {
            success(None, &engine.problem_details(&problem_id)?)
        }
        Query::GetPhaseHistory => success(None, &engine.phase_history()),
    }
}

/// Run a command against an exclusively held engine
pub fn execute_command(
    engine: &mut DecompositionEngine,
    command: Command,
) -> Result<ToolEnvelope, DecomposeToolError> {
    match command {
        Command::Mutate(mutation) => execute_mutation(engine, mutation),
        Command::Query(query) => execute_query(engine, query),
    }
}

/// Fold engine errors into a `failed` envelope; only serialization errors
/// remain as `Err`.
fn settle(
    action: &str,
    result: Result<ToolEnvelope, DecomposeToolError>,
    config: &ServerConfig,
) -> Result<ToolEnvelope, DecomposeToolError> {
    let envelope = match result {
        Ok(envelope) => envelope,
        Err(DecomposeToolError::Engine(err)) => {
            debug!(action, error_type = err.error_type(), error = %err, "Action failed");
            ToolEnvelope::failed(&err)
        }
        Err(err) => return Err(err),
    };
    if config.log_summaries {
        log_summary(action, &envelope);
    }
    Ok(envelope)
}

fn log_summary(action: &str, envelope: &ToolEnvelope) {
    match envelope {
        ToolEnvelope::Success { message, .. } => {
            info!(
                action,
                status = "success",
                message = message.as_deref().unwrap_or(""),
                "Action summary"
            );
        }
        ToolEnvelope::Failed { error } => {
            info!(action, status = "failed", error = %error, "Action summary");
        }
    }
}

/// Dispatch a request against an engine owned by the caller
pub fn dispatch(
    engine: &mut DecompositionEngine,
    request: DecomposeRequest,
    config: &ServerConfig,
) -> Result<ToolEnvelope, DecomposeToolError> {
    let action = request.action.clone();
    let result = request
        .into_command(config)
        .map_err(DecomposeToolError::from)
        .and_then(|command| execute_command(engine, command));
    settle(&action, result, config)
}

/// Dispatch a request against a shared engine.
///
/// Mutations hold the write lock for the whole action; queries share the
/// read lock.
pub async fn dispatch_shared(
    engine: &RwLock<DecompositionEngine>,
    request: DecomposeRequest,
    config: &ServerConfig,
) -> Result<ToolEnvelope, DecomposeToolError> {
    let action = request.action.clone();
    let result = match request.into_command(config) {
        Err(err) => Err(err.into()),
        Ok(Command::Mutate(mutation)) => {
            let mut engine = engine.write().await;
            execute_mutation(&mut engine, mutation)
        }
        Ok(Command::Query(query)) => {
            let engine = engine.read().await;
            execute_query(&engine, query)
        }
    };
    settle(&action, result, config)
}

/// Build a request from an action name and a JSON argument object
pub fn request_from_value(action: &str, args: Value) -> Result<DecomposeRequest, EngineError> {
    let mut object = match args {
        Value::Object(object) => object,
        Value::Null => Map::new(),
        other => {
            return Err(EngineError::validation(
                "arguments",
                format!("expected a JSON object, got {}", other),
            ))
        }
    };
    object.insert("action".to_string(), Value::String(action.to_string()));
    serde_json::from_value(Value::Object(object))
        .map_err(|e| EngineError::validation("arguments", e.to_string()))
}

/// Transport-agnostic entry point: an action name and a JSON payload in,
/// an envelope out. Uses the default configuration.
pub fn dispatch_value(
    engine: &mut DecompositionEngine,
    action: &str,
    args: Value,
) -> Result<ToolEnvelope, DecomposeToolError> {
    dispatch_value_with_config(engine, action, args, &ServerConfig::default())
}

pub fn dispatch_value_with_config(
    engine: &mut DecompositionEngine,
    action: &str,
    args: Value,
    config: &ServerConfig,
) -> Result<ToolEnvelope, DecomposeToolError> {
    match request_from_value(action, args) {
        Ok(request) => dispatch(engine, request, config),
        Err(err) => settle(action, Err(err.into()), config),
    }
}
