//! Renderer-agnostic rows describing an edit form.
//!
//! A renderer matches on [`DebugSetting`] to draw each row and feeds the
//! row's [`EditAction`] back into the form when the person interacts with it.

/// Input a form understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditAction {
    SetEnabled(bool),
    SetValues(String),
    StartExperiment,
    CompleteExperiment,
    ResetExperiment,
    /// Ask the person for a cohort name, then send [`EditAction::AddCohort`].
    PromptNewCohort,
    AddCohort(String),
    RemoveCohort(String),
    SelectCohort(String),
}

/// One row of an edit form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebugSetting {
    /// On/off switch. Flipping it sends `SetEnabled(!on)`.
    Toggle { title: String, on: bool },
    /// Single-line text, read-only unless `editable`.
    TextField {
        placeholder: String,
        text: Option<String>,
        editable: bool,
    },
    /// Multi-line text. Edits send `SetValues`.
    TextView { text: String },
    Button {
        title: String,
        enabled: bool,
        action: EditAction,
    },
    Tappable {
        title: String,
        selected: bool,
        action: EditAction,
    },
}

impl DebugSetting {
    /// Action sent when the row is tapped or flipped, if any.
    pub fn action(&self) -> Option<EditAction> {
        match self {
            Self::Toggle { on, .. } => Some(EditAction::SetEnabled(!on)),
            Self::Button {
                enabled: true,
                action,
                ..
            } => Some(action.clone()),
            Self::Tappable { action, .. } => Some(action.clone()),
            Self::Button { .. } | Self::TextField { .. } | Self::TextView { .. } => None,
        }
    }
}

/// Titled group of rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsSection {
    pub title: &'static str,
    pub rows: Vec<DebugSetting>,
}

impl SettingsSection {
    pub fn new(title: &'static str, rows: Vec<DebugSetting>) -> Self {
        Self { title, rows }
    }
}
