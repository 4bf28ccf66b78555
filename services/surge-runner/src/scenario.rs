//! Scenario file loading and translation into a load test.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use surge_core::{
    LoadConfig, Method, Step, StepChain, StepError, StepRequest, StepResponse, SurgeError,
    SurgeResult,
};

/// Scenario loaded from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioFile {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub users: u32,
    pub duration_secs: u64,
    #[serde(default = "default_think_time_ms")]
    pub think_time_ms: u64,
    #[serde(default = "default_think_time_ms")]
    pub think_jitter_ms: u64,
    #[serde(default)]
    pub seed: Option<u64>, // Optional RNG seed for reproducible pacing
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    pub steps: Vec<StepDefinition>,
}

/// One step as written in the scenario file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepDefinition {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub bearer: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub body_from_previous: BodySource,
}

/// Where a step's body comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodySource {
    /// Static `body`, if any
    #[default]
    None,
    /// The previous response body, unchanged
    Raw,
    /// The previous response body, sent as JSON
    Json,
}

fn default_think_time_ms() -> u64 {
    1000
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_method() -> String {
    "GET".to_string()
}

impl ScenarioFile {
    /// Load scenario from YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Validate scenario, including every step definition.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.duration_secs == 0 {
            anyhow::bail!("duration_secs must be > 0");
        }
        if self.request_timeout_secs == 0 {
            anyhow::bail!("request_timeout_secs must be > 0");
        }
        self.load_config().validate()?;
        self.chain()?;
        Ok(())
    }

    pub fn load_config(&self) -> LoadConfig {
        LoadConfig {
            users: self.users,
            duration: Duration::from_secs(self.duration_secs),
            think_time: Duration::from_millis(self.think_time_ms),
            think_jitter: Duration::from_millis(self.think_jitter_ms),
            seed: self.seed,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Build the step chain described by the file.
    pub fn chain(&self) -> SurgeResult<StepChain> {
        let steps = self
            .steps
            .iter()
            .enumerate()
            .map(|(index, def)| def.to_step(index))
            .collect::<SurgeResult<Vec<_>>>()?;
        StepChain::new(steps)
    }
}

impl StepDefinition {
    /// Display name, `step-<n>` (one-based) when unnamed.
    pub fn display_name(&self, index: usize) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("step-{}", index + 1))
    }

    fn to_step(&self, index: usize) -> SurgeResult<Step> {
        let name = self.display_name(index);
        let url = self
            .url
            .clone()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| SurgeError::MissingRequest { step: name.clone() })?;
        let method = Method::from_bytes(self.method.to_uppercase().as_bytes()).map_err(|e| {
            SurgeError::InvalidConfig {
                field: format!("steps[{}].method", index),
                message: e.to_string(),
            }
        })?;

        let template = RequestTemplate {
            method,
            url,
            headers: self.headers.clone(),
            bearer: self.bearer.clone(),
            body: self.body.clone(),
            body_from_previous: self.body_from_previous,
        };
        Ok(Step::new(name, move |prev| template.render(prev)))
    }
}

/// Resolved step definition, rendered into a request on every execution.
struct RequestTemplate {
    method: Method,
    url: String,
    headers: BTreeMap<String, String>,
    bearer: Option<String>,
    body: Option<String>,
    body_from_previous: BodySource,
}

impl RequestTemplate {
    fn render(&self, previous: Option<&StepResponse>) -> Result<StepRequest, StepError> {
        let mut request = StepRequest::new(self.method.clone(), self.url.clone());
        for (name, value) in &self.headers {
            request = request.with_header(name.as_str(), value.as_str());
        }
        if let Some(token) = &self.bearer {
            request = request.with_bearer(token);
        }

        let request = match self.body_from_previous {
            BodySource::None => match &self.body {
                Some(body) => request.with_body(body.clone()),
                None => request,
            },
            BodySource::Raw => request.with_body_from(require_previous(previous)?),
            BodySource::Json => request.with_json_body_from(require_previous(previous)?),
        };
        Ok(request)
    }
}

fn require_previous(previous: Option<&StepResponse>) -> Result<&StepResponse, StepError> {
    previous.ok_or_else(|| StepError::build("step expects the previous step's response"))
}
