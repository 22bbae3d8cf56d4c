//! Story-session data model and derivation helpers for the viewer.
//!
//! This crate is UI-framework agnostic so client crates can consume it
//! directly for rendering session/plan/judge views. It owns the shape of the
//! exported `data.json` document and every pure formatting rule the viewer
//! applies to it: seed reports, plan tab visibility, judge classification,
//! and the pretty-print-or-raw fallback for embedded JSON.

use chrono::{DateTime, NaiveDateTime};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Error produced while loading the exported story document.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The request for the document failed or returned a non-success status.
    #[error("data request failed: {0}")]
    Http(String),
    /// The document body could not be decoded as story data.
    #[error("malformed story data: {0}")]
    Parse(#[from] serde_json::Error),
}

/// The whole exported document: `{ "sessions": [...], "total": n }`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoryData {
    /// All exported sessions in export order.
    pub sessions: Vec<Session>,
    /// Session count as written by the exporter. Informational; the viewer
    /// derives its own counts from `sessions`.
    #[serde(default)]
    pub total: Option<u64>,
}

impl StoryData {
    /// Decode an exported document from raw JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Parse`] when the text is not valid JSON or does
    /// not carry a `sessions` array of session records.
    pub fn from_json(raw: &str) -> Result<Self, LoadError> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// One story-generation run: narrative output, generation metadata,
/// planning artifacts, and judge evaluations.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Unique, stable identifier used as the selection key. The exporter
    /// writes strings but older documents carry bare numbers; both decode.
    #[serde(deserialize_with = "deserialize_session_id")]
    pub id: String,
    /// Display name; the exporter defaults this to "Untitled Story".
    #[serde(default)]
    pub title: Option<String>,
    /// Full narrative text; the exporter writes `""` when no story exists.
    #[serde(default)]
    pub story: Option<String>,
    /// Generation metadata record (all fields optional).
    #[serde(default)]
    pub seed: Seed,
    /// Planning-pipeline artifacts, each optional.
    #[serde(default)]
    pub plans: PlanSet,
    /// Judge-name to opaque evaluation payload, in document order.
    #[serde(default)]
    pub judges: Map<String, Value>,
}

impl Session {
    /// Display title with the exporter's fallback for absent/empty titles.
    #[must_use]
    pub fn display_title(&self) -> String {
        text_or_fallback(self.title.as_deref(), "Untitled Story")
    }

    /// Story text, treating the exporter's empty-string placeholder as
    /// absent. The returned text is the document's bytes, untouched.
    #[must_use]
    pub fn story_text(&self) -> Option<&str> {
        self.story.as_deref().filter(|s| !s.is_empty())
    }

    /// Number of judge evaluations attached to this session.
    #[must_use]
    pub fn judge_count(&self) -> usize {
        self.judges.len()
    }
}

/// Generation metadata for one run. Every field is optional; missing
/// scalars render as `Unknown` in the seed report. Unrecognized keys are
/// retained so they still count toward seed-tab visibility.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Seed {
    #[serde(default)]
    pub topic: Option<String>,
    /// Short length label, e.g. `"short"` / `"medium"` / `"long"`.
    #[serde(default)]
    pub length_preset: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    /// ISO 8601 timestamp as written by the exporter.
    #[serde(default)]
    pub generated_at: Option<String>,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub word_count: Option<u64>,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub scene_count: Option<u64>,
    #[serde(default)]
    pub generation_time_seconds: Option<f64>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Seed {
    /// `true` when the seed record carried no keys at all. An unrecognized
    /// key still makes the record non-empty (its fields just all render as
    /// `Unknown`).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.topic.is_none()
            && self.length_preset.is_none()
            && self.model.is_none()
            && self.generated_at.is_none()
            && self.word_count.is_none()
            && self.scene_count.is_none()
            && self.generation_time_seconds.is_none()
            && self.version.is_none()
            && self.extra.is_empty()
    }

    /// Formatted seed report: a generation-metadata section and a stats
    /// section, each field falling back to the literal `Unknown` when
    /// missing. `version` defaults to `1.0`. Empty seeds report
    /// `No seed data available`.
    #[must_use]
    pub fn report(&self) -> String {
        if self.is_empty() {
            return "No seed data available".to_owned();
        }

        let rule = "═".repeat(50);
        let topic = text_or_fallback(self.topic.as_deref(), "Unknown");
        let preset = text_or_fallback(self.length_preset.as_deref(), "Unknown");
        let model = text_or_fallback(self.model.as_deref(), "Unknown");
        let generated = match self.generated_at.as_deref() {
            Some(raw) if !raw.is_empty() => format_generated_at(raw),
            _ => "Unknown".to_owned(),
        };
        let words = count_or_unknown(self.word_count);
        let scenes = count_or_unknown(self.scene_count);
        let time = self
            .generation_time_seconds
            .map_or_else(|| "Unknown".to_owned(), |secs| format!("{secs}s"));
        let version = text_or_fallback(self.version.as_deref(), "1.0");

        format!(
            "📋 GENERATION METADATA\n{rule}\n\n\
             Topic: {topic}\n\
             Length Preset: {preset}\n\
             Model: {model}\n\
             Generated: {generated}\n\n\
             📊 STATS\n{rule}\n\n\
             Word Count: {words}\n\
             Scene Count: {scenes}\n\
             Generation Time: {time}\n\n\
             Version: {version}"
        )
    }
}

/// The five planning-pipeline artifacts. Keys outside this set are ignored.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanSet {
    /// Stage 1 output, free text.
    #[serde(default)]
    pub initial_book_spec: Option<String>,
    /// Stage 2 output, free text.
    #[serde(default)]
    pub enhanced_book_spec: Option<String>,
    /// Stage 3 output, structured.
    #[serde(default)]
    pub initial_plot: Option<Value>,
    /// Stage 4 output, structured.
    #[serde(default)]
    pub enhanced_plot: Option<Value>,
    /// Stage 5 output, structured.
    #[serde(default)]
    pub scene_plan: Option<Value>,
}

impl PlanSet {
    /// Number of artifacts present (under the field-presence rule).
    #[must_use]
    pub fn present_count(&self) -> usize {
        usize::from(text_present(self.initial_book_spec.as_deref()))
            + usize::from(text_present(self.enhanced_book_spec.as_deref()))
            + usize::from(value_present(self.initial_plot.as_ref()))
            + usize::from(value_present(self.enhanced_plot.as_ref()))
            + usize::from(value_present(self.scene_plan.as_ref()))
    }
}

/// One tab in the plan panel's fixed pipeline order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PlanTab {
    #[default]
    Seed,
    InitialSpec,
    EnhancedSpec,
    InitialPlot,
    EnhancedPlot,
    ScenePlan,
}

impl PlanTab {
    /// Fixed display order: seed first, then the pipeline stages.
    pub const ALL: [Self; 6] = [
        Self::Seed,
        Self::InitialSpec,
        Self::EnhancedSpec,
        Self::InitialPlot,
        Self::EnhancedPlot,
        Self::ScenePlan,
    ];

    /// Tab strip label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Seed => "Seed",
            Self::InitialSpec => "1. Initial Spec",
            Self::EnhancedSpec => "2. Enhanced Spec",
            Self::InitialPlot => "3. Initial Plot",
            Self::EnhancedPlot => "4. Enhanced Plot",
            Self::ScenePlan => "5. Scene Plan",
        }
    }

    /// Whether this tab is shown for `session`: the seed tab iff the seed
    /// record has at least one key, artifact tabs iff their artifact is
    /// present.
    #[must_use]
    pub fn is_visible(self, session: &Session) -> bool {
        match self {
            Self::Seed => !session.seed.is_empty(),
            Self::InitialSpec => text_present(session.plans.initial_book_spec.as_deref()),
            Self::EnhancedSpec => text_present(session.plans.enhanced_book_spec.as_deref()),
            Self::InitialPlot => value_present(session.plans.initial_plot.as_ref()),
            Self::EnhancedPlot => value_present(session.plans.enhanced_plot.as_ref()),
            Self::ScenePlan => value_present(session.plans.scene_plan.as_ref()),
        }
    }

    /// Content pane body for this tab. Defined for hidden tabs too — the
    /// active tab survives session switches, so a newly selected session
    /// without the artifact shows the tab's placeholder text.
    #[must_use]
    pub fn body(self, session: &Session) -> String {
        match self {
            Self::Seed => session.seed.report(),
            Self::InitialSpec => text_or_fallback(
                session.plans.initial_book_spec.as_deref(),
                "No initial book spec available",
            ),
            Self::EnhancedSpec => text_or_fallback(
                session.plans.enhanced_book_spec.as_deref(),
                "No enhanced book spec available",
            ),
            Self::InitialPlot => plot_body(session.plans.initial_plot.as_ref()),
            Self::EnhancedPlot => plot_body(session.plans.enhanced_plot.as_ref()),
            Self::ScenePlan => plot_body(session.plans.scene_plan.as_ref()),
        }
    }
}

/// Tabs visible for `session`, in the fixed pipeline order. Empty exactly
/// when the session has no planning data at all.
#[must_use]
pub fn visible_tabs(session: &Session) -> Vec<PlanTab> {
    PlanTab::ALL
        .into_iter()
        .filter(|tab| tab.is_visible(session))
        .collect()
}

/// Field-presence rule shared by every key check in the viewer: a key is
/// present iff it exists and its value is neither `null` nor `""`.
#[must_use]
pub fn present_field<'a>(data: &'a Value, key: &str) -> Option<&'a Value> {
    let value = data.get(key)?;
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        _ => Some(value),
    }
}

/// Short classifier label for a judge card, derived from payload keys.
/// A `goal` key wins over the structure keys; unrecognized payloads read
/// `Evaluated`.
#[must_use]
pub fn judge_label(data: &Value) -> &'static str {
    if present_field(data, "goal").is_some() {
        return "GPA Judge";
    }
    if present_field(data, "structure_analysis").is_some()
        || present_field(data, "structure_analysis_simple").is_some()
    {
        return "Structure";
    }
    "Evaluated"
}

/// A judge payload classified into one of the recognized shapes.
///
/// Classification is by key presence in a fixed precedence order — a payload
/// carrying both `structure_analysis` and `goal` is a [`Self::Structure`]
/// report, never a GPA one.
#[derive(Clone, Debug, PartialEq)]
pub enum JudgeReport {
    /// Pre-formatted structural analysis, rendered as-is.
    Structure(String),
    /// Goal / plan / action evaluation, any subset of the three present.
    GoalPlanAction {
        goal: Option<Value>,
        plan: Option<Value>,
        action: Option<Value>,
    },
    /// Free-form analysis text (string payloads pass through unparsed).
    Analysis(String),
    /// Unrecognized payload, shown whole as pretty-printed JSON.
    Opaque(String),
}

impl JudgeReport {
    /// Classify a judge payload. First match wins:
    /// `structure_analysis`, `structure_analysis_simple`, any of
    /// `goal`/`plan`/`action`, `analysis`/`character_analysis`, opaque.
    #[must_use]
    pub fn classify(data: &Value) -> Self {
        if let Some(value) = present_field(data, "structure_analysis") {
            return Self::Structure(text_or_pretty(value));
        }
        if let Some(value) = present_field(data, "structure_analysis_simple") {
            return Self::Structure(text_or_pretty(value));
        }

        let goal = present_field(data, "goal").cloned();
        let plan = present_field(data, "plan").cloned();
        let action = present_field(data, "action").cloned();
        if goal.is_some() || plan.is_some() || action.is_some() {
            return Self::GoalPlanAction { goal, plan, action };
        }

        if let Some(value) =
            present_field(data, "analysis").or_else(|| present_field(data, "character_analysis"))
        {
            return Self::Analysis(text_or_pretty(value));
        }

        Self::Opaque(pretty_json(data))
    }

    /// Rendered report body shown in the detail modal.
    #[must_use]
    pub fn body(&self) -> String {
        match self {
            Self::Structure(text) | Self::Analysis(text) | Self::Opaque(text) => text.clone(),
            Self::GoalPlanAction { goal, plan, action } => {
                let mut out = String::new();
                if let Some(value) = goal {
                    out.push_str(&section_heading("📋 GOAL EVALUATION"));
                    out.push_str(&pretty_or_raw(value));
                    out.push_str("\n\n");
                }
                if let Some(value) = plan {
                    out.push_str(&section_heading("🗺️  PLAN EVALUATION"));
                    out.push_str(&pretty_or_raw(value));
                    out.push_str("\n\n");
                }
                if let Some(value) = action {
                    out.push_str(&section_heading("⚡ ACTION EVALUATION"));
                    out.push_str(&pretty_or_raw(value));
                }
                out
            }
        }
    }

    /// `true` for the opaque fallback, which the modal styles as raw JSON
    /// instead of formatted text.
    #[must_use]
    pub fn is_opaque(&self) -> bool {
        matches!(self, Self::Opaque(_))
    }
}

/// Pretty-print a JSON value with two-space indentation.
#[must_use]
pub fn pretty_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// The shared display fallback: strings are attempted as embedded JSON and
/// pretty-printed on success, returned unchanged on failure; everything else
/// is pretty-printed directly. Never fails.
#[must_use]
pub fn pretty_or_raw(value: &Value) -> String {
    match value {
        Value::String(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(parsed) => pretty_json(&parsed),
            Err(_) => raw.clone(),
        },
        other => pretty_json(other),
    }
}

/// String payloads pass through untouched (no embedded-JSON attempt);
/// structured payloads are pretty-printed.
#[must_use]
pub fn text_or_pretty(value: &Value) -> String {
    match value {
        Value::String(raw) => raw.clone(),
        other => pretty_json(other),
    }
}

/// Render an exporter timestamp for display. Accepts RFC 3339 and the
/// exporter's naive `datetime.now().isoformat()` output; anything else is
/// returned raw rather than as an "invalid date" artifact.
#[must_use]
pub fn format_generated_at(raw: &str) -> String {
    const DISPLAY: &str = "%b %-d, %Y %H:%M:%S";

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return parsed.format(DISPLAY).to_string();
    }
    for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, pattern) {
            return parsed.format(DISPLAY).to_string();
        }
    }
    raw.to_owned()
}

fn section_heading(label: &str) -> String {
    let rule = "═".repeat(39);
    format!("{rule}\n{label}\n{rule}\n\n")
}

fn text_or_fallback(value: Option<&str>, fallback: &str) -> String {
    match value {
        Some(text) if !text.is_empty() => text.to_owned(),
        _ => fallback.to_owned(),
    }
}

fn text_present(value: Option<&str>) -> bool {
    value.is_some_and(|s| !s.is_empty())
}

fn value_present(value: Option<&Value>) -> bool {
    value.is_some_and(|v| !v.is_null())
}

fn count_or_unknown(value: Option<u64>) -> String {
    value.map_or_else(|| "Unknown".to_owned(), |n| n.to_string())
}

fn plot_body(value: Option<&Value>) -> String {
    match value {
        Some(v) if !v.is_null() => pretty_json(v),
        _ => "No data available".to_owned(),
    }
}

fn deserialize_session_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::String(id) => Ok(id),
        Value::Number(id) => Ok(id.to_string()),
        _ => Err(D::Error::custom("expected string or number session id")),
    }
}

// Exporters disagree on whether counts are ints or floats; accept whole
// non-negative floats like `523.0` alongside plain integers.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_sign_loss,
    clippy::cast_possible_truncation,
    clippy::float_cmp
)]
fn deserialize_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(number)) => {
            if let Some(int) = number.as_u64() {
                return Ok(Some(int));
            }
            if let Some(float) = number.as_f64()
                && float.is_finite()
                && float.fract() == 0.0
                && float >= 0.0
                && float <= u64::MAX as f64
            {
                return Ok(Some(float as u64));
            }
            Err(D::Error::custom("expected non-negative integer count"))
        }
        Some(_) => Err(D::Error::custom("expected number")),
    }
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
