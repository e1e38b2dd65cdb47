//! Transactional edit forms for features and experiments.
//!
//! A form copies an entity's state when opened. Edits only touch the form;
//! [`FeatureEditForm::save`] / [`ExperimentEditForm::save`] validate and then
//! apply everything through the [`DebugController`], finishing with
//! [`DebugController::cache_all`].

use serde_json::Value;
use tracing::debug;

use crate::config::CohortCatalog;
use crate::controller::DebugController;
use crate::entity::Values;
use crate::experiment::{Experiment, ExperimentState};
use crate::feature::Feature;
use crate::keys;
use crate::settings::{DebugSetting, EditAction, SettingsSection};

pub const INVALID_JSON_MESSAGE: &str =
    "Could not parse values string into a JSON dictionary. Make sure it's valid JSON.";
pub const MISSING_COHORT_MESSAGE: &str = "Experiments must have a cohort assigned in their values JSON dictionary in order to be considered an 'experiment'.";
pub const UNEXPECTED_COHORT_MESSAGE: &str = "Features cannot have a cohort assigned in their values JSON dictionary in order to be considered a 'feature'.";
pub const NO_EXPERIMENT_MESSAGE: &str = "No experiment available to save to.";
pub const NO_FEATURE_MESSAGE: &str = "No feature available to save to.";
pub const STATE_CHANGE_FAILED_MESSAGE: &str =
    "Saved, but the experiment's state could not be changed. Check its gates and dependencies.";

/// Result of saving a form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOutcome {
    pub saved: bool,
    pub error_message: Option<String>,
}

impl SaveOutcome {
    pub fn saved() -> Self {
        Self {
            saved: true,
            error_message: None,
        }
    }

    /// Edits were applied but part of the save did not take effect.
    pub fn partial(message: impl Into<String>) -> Self {
        Self {
            saved: true,
            error_message: Some(message.into()),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            saved: false,
            error_message: Some(message.into()),
        }
    }
}

fn parse_values(text: &str) -> Option<Values> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(values)) => Some(values),
        _ => None,
    }
}

fn values_text(values: Option<&Values>) -> String {
    values
        .and_then(|v| serde_json::to_string_pretty(v).ok())
        .unwrap_or_else(|| "{}".to_string())
}

// ============================================================================
// Feature form
// ============================================================================

/// Edit form for a single feature.
#[derive(Debug, Clone)]
pub struct FeatureEditForm {
    name: String,
    values_text: String,
    enabled: bool,
    desired_enabled: Option<bool>,
}

impl FeatureEditForm {
    /// Open a form for the named feature, active or inactive.
    pub fn open(controller: &DebugController<'_>, name: &str) -> Option<Self> {
        let (feature, active) = controller.find::<Feature>(name)?;
        Some(Self {
            name: feature.name().to_string(),
            values_text: values_text(feature.values()),
            enabled: active,
            desired_enabled: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values_text(&self) -> &str {
        &self.values_text
    }

    pub fn set_values_text(&mut self, text: impl Into<String>) {
        self.values_text = text.into();
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.desired_enabled = Some(enabled);
    }

    pub fn is_enabled(&self) -> bool {
        self.desired_enabled.unwrap_or(self.enabled)
    }

    /// Apply a row action. Returns `false` for actions a feature ignores.
    pub fn apply(&mut self, action: EditAction) -> bool {
        match action {
            EditAction::SetEnabled(enabled) => self.set_enabled(enabled),
            EditAction::SetValues(text) => self.set_values_text(text),
            _ => return false,
        }
        true
    }

    pub fn rows(&self) -> Vec<SettingsSection> {
        vec![
            SettingsSection::new("Name", vec![name_row("Feature Name", &self.name)]),
            SettingsSection::new(
                "Enabled",
                vec![DebugSetting::Toggle {
                    title: "Enabled".to_string(),
                    on: self.is_enabled(),
                }],
            ),
            SettingsSection::new(
                "Values JSON String",
                vec![DebugSetting::TextView {
                    text: self.values_text.clone(),
                }],
            ),
        ]
    }

    /// Validate and apply the form.
    pub fn save(&self, controller: &mut DebugController<'_>) -> SaveOutcome {
        let Some(values) = parse_values(&self.values_text) else {
            return SaveOutcome::failed(INVALID_JSON_MESSAGE);
        };
        if values.contains_key(keys::COHORT) {
            return SaveOutcome::failed(UNEXPECTED_COHORT_MESSAGE);
        }
        if controller.find_feature(&self.name).is_none() {
            return SaveOutcome::failed(NO_FEATURE_MESSAGE);
        }

        controller.change_values::<Feature>(&self.name, values);
        if let Some(desired) = self.desired_enabled {
            toggle_if_needed::<Feature>(controller, &self.name, desired);
        }
        controller.cache_all();
        debug!(feature = %self.name, "Saved feature form");
        SaveOutcome::saved()
    }
}

// ============================================================================
// Experiment form
// ============================================================================

/// Lifecycle change requested from an experiment form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateChange {
    Start,
    Complete,
    Reset,
}

impl StateChange {
    fn resulting_state(self) -> ExperimentState {
        match self {
            Self::Start => ExperimentState::Active,
            Self::Complete => ExperimentState::Completed,
            Self::Reset => ExperimentState::Entitled,
        }
    }
}

/// Edit form for a single experiment.
#[derive(Debug, Clone)]
pub struct ExperimentEditForm {
    name: String,
    values_text: String,
    enabled: bool,
    desired_enabled: Option<bool>,
    state: ExperimentState,
    pending: Vec<StateChange>,
    cohorts: Vec<String>,
    selected: Option<String>,
}

impl ExperimentEditForm {
    /// Open a form for the named experiment, active or inactive.
    ///
    /// Cohort options are the catalog's cohorts for this name, then the
    /// experiment's available cohorts, then its current cohort, without
    /// duplicates. The current cohort starts selected.
    pub fn open(
        controller: &DebugController<'_>,
        catalog: &CohortCatalog,
        name: &str,
    ) -> Option<Self> {
        let (experiment, active) = controller.find::<Experiment>(name)?;
        let mut form = Self {
            name: experiment.name().to_string(),
            values_text: values_text(Some(experiment.values())),
            enabled: active,
            desired_enabled: None,
            state: experiment.state(),
            pending: Vec::new(),
            cohorts: Vec::new(),
            selected: None,
        };

        let options = catalog
            .cohorts(name)
            .iter()
            .chain(experiment.available_cohorts())
            .map(String::as_str)
            .chain(std::iter::once(experiment.cohort()));
        for cohort in options {
            if !form.cohorts.iter().any(|c| c == cohort) {
                form.cohorts.push(cohort.to_string());
            }
        }
        form.selected = Some(experiment.cohort().to_string());
        Some(form)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values_text(&self) -> &str {
        &self.values_text
    }

    pub fn set_values_text(&mut self, text: impl Into<String>) {
        self.values_text = text.into();
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.desired_enabled = Some(enabled);
    }

    pub fn is_enabled(&self) -> bool {
        self.desired_enabled.unwrap_or(self.enabled)
    }

    pub fn cohorts(&self) -> &[String] {
        &self.cohorts
    }

    pub fn selected_cohort(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// State the experiment will be in after saving.
    pub fn effective_state(&self) -> ExperimentState {
        self.pending
            .last()
            .map(|change| change.resulting_state())
            .unwrap_or(self.state)
    }

    /// Most recently queued lifecycle change.
    pub fn pending_state_change(&self) -> Option<StateChange> {
        self.pending.last().copied()
    }

    /// Line shown in the state row, e.g. `Current State: Started`.
    pub fn state_text(&self) -> String {
        let prefix = if !self.pending.is_empty() { "New" } else { "Current" };
        format!("{} State: {}", prefix, self.effective_state().title())
    }

    /// Queue a lifecycle change. Start needs an entitled experiment and
    /// complete a started one; reset is always allowed. Changes run in
    /// order on save.
    pub fn request_state_change(&mut self, change: StateChange) -> bool {
        let allowed = match change {
            StateChange::Start => self.effective_state() == ExperimentState::Entitled,
            StateChange::Complete => self.effective_state() == ExperimentState::Active,
            StateChange::Reset => true,
        };
        if allowed {
            self.pending.push(change);
        }
        allowed
    }

    /// Add a cohort option and select it. Surrounding whitespace and double
    /// quotes are dropped; empty names and duplicates are refused.
    pub fn add_cohort(&mut self, name: &str) -> bool {
        let cohort = name.trim().replace('"', "");
        if cohort.is_empty() || self.cohorts.contains(&cohort) {
            return false;
        }
        self.cohorts.push(cohort.clone());
        self.select_cohort(&cohort);
        true
    }

    /// Remove a cohort option. The last option cannot be removed. Removing
    /// the selected cohort selects the first remaining one.
    pub fn remove_cohort(&mut self, name: &str) -> bool {
        if self.cohorts.len() <= 1 {
            return false;
        }
        let Some(index) = self.cohorts.iter().position(|c| c == name) else {
            return false;
        };
        self.cohorts.remove(index);

        if self.selected.as_deref() == Some(name) {
            self.selected = None;
            if let Some(first) = self.cohorts.first().cloned() {
                self.select_cohort(&first);
            }
        }
        true
    }

    /// Select a cohort and write it into the values text.
    pub fn select_cohort(&mut self, name: &str) -> bool {
        if !self.cohorts.iter().any(|c| c == name) {
            return false;
        }
        self.selected = Some(name.to_string());
        if let Some(mut values) = parse_values(&self.values_text) {
            values.insert(keys::COHORT.to_string(), Value::String(name.to_string()));
            self.values_text = values_text(Some(&values));
        }
        true
    }

    pub fn apply(&mut self, action: EditAction) -> bool {
        match action {
            EditAction::SetEnabled(enabled) => {
                self.set_enabled(enabled);
                true
            }
            EditAction::SetValues(text) => {
                self.set_values_text(text);
                true
            }
            EditAction::StartExperiment => self.request_state_change(StateChange::Start),
            EditAction::CompleteExperiment => self.request_state_change(StateChange::Complete),
            EditAction::ResetExperiment => self.request_state_change(StateChange::Reset),
            EditAction::AddCohort(name) => self.add_cohort(&name),
            EditAction::RemoveCohort(name) => self.remove_cohort(&name),
            EditAction::SelectCohort(name) => self.select_cohort(&name),
            EditAction::PromptNewCohort => false,
        }
    }

    pub fn rows(&self) -> Vec<SettingsSection> {
        let state = self.effective_state();
        let mut cohort_rows = vec![DebugSetting::Button {
            title: "Add cohort".to_string(),
            enabled: true,
            action: EditAction::PromptNewCohort,
        }];
        cohort_rows.extend(self.cohorts.iter().map(|cohort| DebugSetting::Tappable {
            title: cohort.clone(),
            selected: self.selected.as_ref() == Some(cohort),
            action: EditAction::SelectCohort(cohort.clone()),
        }));

        vec![
            SettingsSection::new("Name", vec![name_row("Experiment Name", &self.name)]),
            SettingsSection::new(
                "Enabled",
                vec![DebugSetting::Toggle {
                    title: "Enabled".to_string(),
                    on: self.is_enabled(),
                }],
            ),
            SettingsSection::new(
                "State",
                vec![
                    DebugSetting::TextField {
                        placeholder: "State".to_string(),
                        text: Some(self.state_text()),
                        editable: false,
                    },
                    DebugSetting::Button {
                        title: "Start experiment".to_string(),
                        enabled: state == ExperimentState::Entitled,
                        action: EditAction::StartExperiment,
                    },
                    DebugSetting::Button {
                        title: "Complete experiment".to_string(),
                        enabled: state == ExperimentState::Active,
                        action: EditAction::CompleteExperiment,
                    },
                    DebugSetting::Button {
                        title: "Reset experiment".to_string(),
                        enabled: true,
                        action: EditAction::ResetExperiment,
                    },
                ],
            ),
            SettingsSection::new("Cohort", cohort_rows),
            SettingsSection::new(
                "Values JSON String",
                vec![DebugSetting::TextView {
                    text: self.values_text.clone(),
                }],
            ),
        ]
    }

    /// Validate and apply the form.
    pub fn save(&self, controller: &mut DebugController<'_>) -> SaveOutcome {
        let Some(values) = parse_values(&self.values_text) else {
            return SaveOutcome::failed(INVALID_JSON_MESSAGE);
        };
        if !values.get(keys::COHORT).is_some_and(Value::is_string) {
            return SaveOutcome::failed(MISSING_COHORT_MESSAGE);
        }
        if controller.find_experiment(&self.name).is_none() {
            return SaveOutcome::failed(NO_EXPERIMENT_MESSAGE);
        }

        controller.update_available_cohorts(&self.name, self.cohorts.clone());
        controller.change_values::<Experiment>(&self.name, values);
        if let Some(desired) = self.desired_enabled {
            toggle_if_needed::<Experiment>(controller, &self.name, desired);
        }

        let mut state_applied = true;
        if let Some(experiment) = controller.find_experiment(&self.name) {
            for change in &self.pending {
                let applied = match change {
                    StateChange::Start => experiment.start(),
                    StateChange::Complete => experiment.complete(),
                    StateChange::Reset => {
                        experiment.clear_state();
                        true
                    }
                };
                if !applied {
                    state_applied = false;
                    break;
                }
            }
        }

        controller.cache_all();
        debug!(experiment = %self.name, state_applied, "Saved experiment form");
        if state_applied {
            SaveOutcome::saved()
        } else {
            SaveOutcome::partial(STATE_CHANGE_FAILED_MESSAGE)
        }
    }
}

fn name_row(placeholder: &str, name: &str) -> DebugSetting {
    DebugSetting::TextField {
        placeholder: placeholder.to_string(),
        text: Some(name.to_string()),
        editable: false,
    }
}

fn toggle_if_needed<E: crate::entity::Entity>(
    controller: &mut DebugController<'_>,
    name: &str,
    desired: bool,
) {
    let Some((entity, active)) = controller.find::<E>(name) else {
        return;
    };
    if active != desired {
        let entity = entity.clone();
        controller.toggle(entity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{MemorySnapshotCache, SnapshotCache};
    use crate::registry::Switchboard;
    use serde_json::json;

    fn switchboard_with(json: Value) -> Switchboard {
        let mut switchboard = Switchboard::default();
        switchboard.load_configuration(&json);
        switchboard
    }

    #[test]
    fn test_feature_form_rejects_cohort() {
        let cache = MemorySnapshotCache::new();
        let mut switchboard = switchboard_with(json!({"f": {"values": {}, "isActive": true}}));
        let mut controller = DebugController::new(&mut switchboard, &cache);
        let mut form = FeatureEditForm::open(&controller, "f").unwrap();

        form.set_values_text("not json");
        assert_eq!(form.save(&mut controller), SaveOutcome::failed(INVALID_JSON_MESSAGE));

        form.set_values_text(r#"{"cohort": "a"}"#);
        assert_eq!(
            form.save(&mut controller),
            SaveOutcome::failed(UNEXPECTED_COHORT_MESSAGE)
        );
    }

    #[test]
    fn test_feature_form_saves_and_toggles() {
        let cache = MemorySnapshotCache::new();
        let mut switchboard = switchboard_with(json!({"f": {"values": {}, "isActive": true}}));
        let mut controller = DebugController::new(&mut switchboard, &cache);
        let mut form = FeatureEditForm::open(&controller, "f").unwrap();

        form.set_values_text(r#"{"color": "blue"}"#);
        assert!(form.apply(EditAction::SetEnabled(false)));
        assert!(form.save(&mut controller).saved);

        let switchboard = controller.switchboard();
        assert!(switchboard.is_debugging());
        let feature = switchboard.inactive_features().get("f").unwrap();
        assert_eq!(feature.value("color"), Some(&json!("blue")));
    }

    #[test]
    fn test_feature_form_unchanged_toggle_keeps_state() {
        let cache = MemorySnapshotCache::new();
        let mut switchboard = switchboard_with(json!({"f": {"values": {}, "isActive": true}}));
        let mut controller = DebugController::new(&mut switchboard, &cache);
        let mut form = FeatureEditForm::open(&controller, "f").unwrap();

        form.set_enabled(true);
        assert!(form.save(&mut controller).saved);
        assert!(controller.switchboard().is_enabled("f", false));
    }

    #[test]
    fn test_experiment_form_cohort_options() {
        let cache = MemorySnapshotCache::new();
        let mut switchboard = switchboard_with(json!({
            "exp": {"values": {"cohort": "b"}, "isActive": true, "availableCohorts": ["a", "b"]}
        }));
        let controller = DebugController::new(&mut switchboard, &cache);
        let mut catalog = CohortCatalog::default();
        catalog.insert("exp", vec!["control".to_string(), "a".to_string()]);

        let mut form = ExperimentEditForm::open(&controller, &catalog, "exp").unwrap();
        assert_eq!(form.cohorts(), ["control", "a", "b"]);
        assert_eq!(form.selected_cohort(), Some("b"));

        assert!(!form.add_cohort("  "));
        assert!(!form.add_cohort("a"));
        assert!(form.add_cohort(" \"new\" "));
        assert_eq!(form.selected_cohort(), Some("new"));
        assert_eq!(parse_values(form.values_text()).unwrap()["cohort"], "new");

        assert!(form.remove_cohort("new"));
        assert_eq!(form.selected_cohort(), Some("control"));
    }

    #[test]
    fn test_last_cohort_cannot_be_removed() {
        let cache = MemorySnapshotCache::new();
        let mut switchboard =
            switchboard_with(json!({"exp": {"values": {"cohort": "only"}, "isActive": true}}));
        let controller = DebugController::new(&mut switchboard, &cache);
        let mut form =
            ExperimentEditForm::open(&controller, &CohortCatalog::default(), "exp").unwrap();

        assert!(!form.remove_cohort("only"));
        assert_eq!(form.cohorts(), ["only"]);
    }

    #[test]
    fn test_state_change_rules() {
        let cache = MemorySnapshotCache::new();
        let mut switchboard =
            switchboard_with(json!({"exp": {"values": {"cohort": "a"}, "isActive": true}}));
        let controller = DebugController::new(&mut switchboard, &cache);
        let mut form =
            ExperimentEditForm::open(&controller, &CohortCatalog::default(), "exp").unwrap();

        assert_eq!(form.state_text(), "Current State: Entitled to start");
        assert!(!form.request_state_change(StateChange::Complete));
        assert!(form.request_state_change(StateChange::Start));
        assert_eq!(form.state_text(), "New State: Started");
        assert!(!form.request_state_change(StateChange::Start));
        assert!(form.request_state_change(StateChange::Complete));
        assert!(form.request_state_change(StateChange::Reset));
        assert_eq!(form.effective_state(), ExperimentState::Entitled);
    }

    #[test]
    fn test_experiment_form_save_applies_everything() {
        let cache = MemorySnapshotCache::new();
        let mut switchboard =
            switchboard_with(json!({"exp": {"values": {"cohort": "a"}, "isActive": false}}));
        let mut controller = DebugController::new(&mut switchboard, &cache);
        let mut form =
            ExperimentEditForm::open(&controller, &CohortCatalog::default(), "exp").unwrap();

        assert!(form.add_cohort("b"));
        assert!(form.apply(EditAction::SetEnabled(true)));
        assert!(form.apply(EditAction::StartExperiment));
        assert_eq!(form.save(&mut controller), SaveOutcome::saved());

        let experiment = controller.switchboard().experiment("exp").unwrap();
        assert_eq!(experiment.cohort(), "b");
        assert_eq!(experiment.available_cohorts(), ["a", "b"]);
        assert!(experiment.is_active());
        assert_eq!(cache.restore(Some(crate::cache::ACTIVE_NAMESPACE)).0.unwrap().len(), 1);
    }

    #[test]
    fn test_queued_start_then_complete_both_run() {
        let cache = MemorySnapshotCache::new();
        let mut switchboard =
            switchboard_with(json!({"exp": {"values": {"cohort": "a"}, "isActive": true}}));
        let mut controller = DebugController::new(&mut switchboard, &cache);
        let mut form =
            ExperimentEditForm::open(&controller, &CohortCatalog::default(), "exp").unwrap();

        assert!(form.request_state_change(StateChange::Start));
        assert!(form.request_state_change(StateChange::Complete));
        assert_eq!(form.pending_state_change(), Some(StateChange::Complete));
        assert_eq!(form.save(&mut controller), SaveOutcome::saved());

        let experiment = controller.find_experiment("exp").unwrap();
        assert_eq!(experiment.state(), ExperimentState::Completed);
    }

    #[test]
    fn test_refused_state_change_is_reported() {
        let cache = MemorySnapshotCache::new();
        let mut switchboard =
            switchboard_with(json!({"exp": {"values": {"cohort": "a"}, "isActive": true}}));
        switchboard.prevent_experiments(|name| name == "exp");
        let mut controller = DebugController::new(&mut switchboard, &cache);
        let mut form =
            ExperimentEditForm::open(&controller, &CohortCatalog::default(), "exp").unwrap();

        form.set_values_text(r#"{"cohort": "a", "color": "red"}"#);
        assert!(form.request_state_change(StateChange::Start));
        assert!(form.request_state_change(StateChange::Complete));
        assert_eq!(
            form.save(&mut controller),
            SaveOutcome::partial(STATE_CHANGE_FAILED_MESSAGE)
        );

        let experiment = controller.find_experiment("exp").unwrap();
        assert_eq!(experiment.state(), ExperimentState::Entitled);
        assert_eq!(experiment.value("color"), Some(&json!("red")));
    }

    #[test]
    fn test_experiment_form_requires_cohort() {
        let cache = MemorySnapshotCache::new();
        let mut switchboard =
            switchboard_with(json!({"exp": {"values": {"cohort": "a"}, "isActive": true}}));
        let mut controller = DebugController::new(&mut switchboard, &cache);
        let mut form =
            ExperimentEditForm::open(&controller, &CohortCatalog::default(), "exp").unwrap();

        form.set_values_text("{}");
        assert_eq!(form.save(&mut controller), SaveOutcome::failed(MISSING_COHORT_MESSAGE));
    }

    #[test]
    fn test_missing_entity_reported() {
        let cache = MemorySnapshotCache::new();
        let mut switchboard =
            switchboard_with(json!({"exp": {"values": {"cohort": "a"}, "isActive": true}}));
        let mut controller = DebugController::new(&mut switchboard, &cache);
        let form =
            ExperimentEditForm::open(&controller, &CohortCatalog::default(), "exp").unwrap();

        let exp = controller.find_experiment("exp").unwrap().clone();
        controller.delete(&exp);
        assert_eq!(form.save(&mut controller), SaveOutcome::failed(NO_EXPERIMENT_MESSAGE));
    }

    #[test]
    fn test_rows_reflect_form() {
        let cache = MemorySnapshotCache::new();
        let mut switchboard =
            switchboard_with(json!({"exp": {"values": {"cohort": "a"}, "isActive": true}}));
        let controller = DebugController::new(&mut switchboard, &cache);
        let form =
            ExperimentEditForm::open(&controller, &CohortCatalog::default(), "exp").unwrap();

        let sections = form.rows();
        let titles: Vec<_> = sections.iter().map(|s| s.title).collect();
        assert_eq!(titles, ["Name", "Enabled", "State", "Cohort", "Values JSON String"]);
        assert!(sections[3].rows.contains(&DebugSetting::Tappable {
            title: "a".to_string(),
            selected: true,
            action: EditAction::SelectCohort("a".to_string()),
        }));
    }
}
