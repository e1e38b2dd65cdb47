//! Plain-text rendering of registry listings and edit rows.

use std::fmt::Write;

use switchboard_core::{DebugSetting, Entity, EntitySet, Experiment, SettingsSection, Switchboard};

/// Listing of the four sets, one entity per line.
pub fn listing(switchboard: &Switchboard) -> String {
    let mut out = String::new();
    section(&mut out, "Enabled experiments", switchboard.experiments(), experiment_line);
    section(
        &mut out,
        "Disabled experiments",
        switchboard.inactive_experiments(),
        experiment_line,
    );
    section(&mut out, "Enabled features", switchboard.features(), |f| {
        f.name().to_string()
    });
    section(
        &mut out,
        "Disabled features",
        switchboard.inactive_features(),
        |f| f.name().to_string(),
    );
    out
}

fn experiment_line(experiment: &Experiment) -> String {
    format!(
        "{} (cohort: {}, {})",
        experiment.name(),
        experiment.cohort(),
        experiment.state()
    )
}

fn section<E: Entity>(
    out: &mut String,
    title: &str,
    set: &EntitySet<E>,
    line: impl Fn(&E) -> String,
) {
    let _ = writeln!(out, "{} ({})", title, set.len());
    for entity in set {
        let _ = writeln!(out, "  {}", line(entity));
    }
}

/// Edit form rows as text. Selected and on rows are marked with `*`,
/// disabled buttons are bracketed.
pub fn sections(sections: &[SettingsSection]) -> String {
    let mut out = String::new();
    for section in sections {
        let _ = writeln!(out, "{}", section.title);
        for row in &section.rows {
            let _ = writeln!(out, "  {}", setting(row));
        }
    }
    out
}

fn setting(row: &DebugSetting) -> String {
    match row {
        DebugSetting::Toggle { title, on } => {
            format!("{}: {}", title, if *on { "on" } else { "off" })
        }
        DebugSetting::TextField {
            placeholder, text, ..
        } => text.clone().unwrap_or_else(|| placeholder.clone()),
        DebugSetting::TextView { text } => text.replace('\n', "\n  "),
        DebugSetting::Button { title, enabled, .. } => {
            if *enabled {
                format!("<{}>", title)
            } else {
                format!("[{}]", title)
            }
        }
        DebugSetting::Tappable {
            title, selected, ..
        } => {
            if *selected {
                format!("* {}", title)
            } else {
                format!("  {}", title)
            }
        }
    }
}
