//! Command dispatch and execution handlers.
//!
//! Every handler runs against an opened [`Session`]. Commands that change the
//! registry end by caching it, so the next invocation restores the overrides.

use anyhow::{Context, Result, bail};
use serde_json::Value;

use switchboard_core::{
    AppInfo, Entity, EntityKind, Experiment, ExperimentEditForm, Feature, FeatureEditForm,
    SaveOutcome, StateChange, Values, default_properties, keys,
};

use super::args::*;
use crate::client::FileClient;
use crate::render;
use crate::session::Session;
use crate::styled_output::{print_info, print_success, print_warning};

/// Dispatch a CLI command to its handler.
pub fn dispatch_command(cli: Cli) -> Result<()> {
    let mut session = Session::open(cli.config.as_deref(), cli.data_dir.as_deref())?;

    match cli.command {
        Commands::Import(args) => run_import(&mut session, args),
        Commands::List(args) => run_list(&session, args),
        Commands::Export => print_json(&session.switchboard.to_configuration()),
        Commands::Check(args) => run_check(&session, args),
        Commands::Show(args) => run_show(&mut session, args),
        Commands::Add(command) => run_add(&mut session, command),
        Commands::Toggle(args) => run_toggle(&mut session, args),
        Commands::Delete(args) => run_delete(&mut session, args),
        Commands::Edit(command) => run_edit(&mut session, command),
        Commands::Start(args) => run_lifecycle(&mut session, &args.name, StateChange::Start),
        Commands::Complete(args) => run_lifecycle(&mut session, &args.name, StateChange::Complete),
        Commands::Reset(args) => run_lifecycle(&mut session, &args.name, StateChange::Reset),
        Commands::Prefill(command) => run_prefill(&mut session, command),
        Commands::Clear => {
            session.controller().clear_cache_and_switchboard();
            print_success("Cleared debug cache and switchboard");
            Ok(())
        }
        Commands::Properties(args) => run_properties(&session, args),
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_values(text: &str) -> Result<Values> {
    match serde_json::from_str::<Value>(text).context("Values must be valid JSON")? {
        Value::Object(values) => Ok(values),
        _ => bail!("Values must be a JSON object"),
    }
}

fn app_info() -> AppInfo {
    AppInfo::new(
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        option_env!("SWITCHBOARD_BUILD").unwrap_or("0"),
    )
}

fn finish_save(outcome: SaveOutcome, name: &str) -> Result<()> {
    match outcome.error_message {
        Some(message) if !outcome.saved => bail!(message),
        Some(message) => {
            print_warning(&message);
            Ok(())
        }
        None => {
            print_success(&format!("Saved '{}'", name));
            Ok(())
        }
    }
}

/// Fail when an entity of the other kind already uses `name`.
fn ensure_name_free<E: Entity>(session: &Session, name: &str) -> Result<()> {
    if session.switchboard.held_by_other_kind::<E>(name) {
        bail!("'{}' is already used by an entity that is not a {}", name, E::KIND);
    }
    Ok(())
}

fn find_owned<E: Entity>(session: &mut Session, name: &str) -> Result<E> {
    session
        .controller()
        .find::<E>(name)
        .map(|(entity, _)| entity.clone())
        .with_context(|| format!("No {} named '{}'", E::KIND, name))
}

// ============================================================================
// Handlers
// ============================================================================

fn run_import(session: &mut Session, args: ImportArgs) -> Result<()> {
    let install_id = session.install_id()?;
    let uuid = args.uuid.unwrap_or_else(|| install_id.clone());
    let properties = default_properties(&uuid, &install_id, &app_info());

    let client = FileClient::new(&args.file);
    session
        .switchboard
        .activate(&client, &uuid, Some(&properties))
        .with_context(|| format!("Could not import {}", args.file.display()))?;
    session.controller().cache_all();

    let switchboard = &session.switchboard;
    print_success(&format!(
        "Imported {} experiments and {} features",
        switchboard.experiments().len() + switchboard.inactive_experiments().len(),
        switchboard.features().len() + switchboard.inactive_features().len()
    ));
    Ok(())
}

fn run_list(session: &Session, args: ListArgs) -> Result<()> {
    if args.json {
        return print_json(&session.switchboard.to_configuration());
    }
    print!("{}", render::listing(&session.switchboard));
    Ok(())
}

fn run_check(session: &Session, args: CheckArgs) -> Result<()> {
    let switchboard = &session.switchboard;
    let result = match EntityKind::from(args.kind) {
        EntityKind::Experiment => switchboard.is_in(&args.name, args.default),
        EntityKind::Feature => switchboard.is_enabled(&args.name, args.default),
    };
    println!("{}", result);
    Ok(())
}

fn run_show(session: &mut Session, args: EntityArgs) -> Result<()> {
    let catalog = session.catalog.clone();
    let controller = session.controller();
    let rows = match EntityKind::from(args.kind) {
        EntityKind::Experiment => ExperimentEditForm::open(&controller, &catalog, &args.name)
            .map(|form| form.rows()),
        EntityKind::Feature => {
            FeatureEditForm::open(&controller, &args.name).map(|form| form.rows())
        }
    };
    let rows = rows.with_context(|| {
        format!("No {} named '{}'", EntityKind::from(args.kind), args.name)
    })?;
    print!("{}", render::sections(&rows));
    Ok(())
}

fn run_add(session: &mut Session, command: AddCommand) -> Result<()> {
    let context = session.switchboard.context().clone();
    let name = match command {
        AddCommand::Feature { name, values } => {
            let values = values.as_deref().map(parse_values).transpose()?;
            let feature = Feature::new(name.clone(), values, &context)?;
            ensure_name_free::<Feature>(session, &name)?;
            session.switchboard.add(feature);
            name
        }
        AddCommand::Experiment {
            name,
            cohort,
            values,
            cohorts,
        } => {
            let mut values = match values.as_deref() {
                Some(text) => parse_values(text)?,
                None => Values::new(),
            };
            values.insert(keys::COHORT.to_string(), Value::String(cohort));
            let available = if cohorts.is_empty() { None } else { Some(cohorts) };
            let experiment = Experiment::new(name.clone(), values, available, &context)?;
            ensure_name_free::<Experiment>(session, &name)?;
            session.switchboard.add(experiment);
            name
        }
    };
    session.controller().cache_all();
    print_success(&format!("Added '{}'", name));
    Ok(())
}

fn run_toggle(session: &mut Session, args: EntityArgs) -> Result<()> {
    let active = match EntityKind::from(args.kind) {
        EntityKind::Experiment => {
            let experiment = find_owned::<Experiment>(session, &args.name)?;
            session.controller().toggle(experiment)
        }
        EntityKind::Feature => {
            let feature = find_owned::<Feature>(session, &args.name)?;
            session.controller().toggle(feature)
        }
    };
    session.controller().cache_all();
    let state = if active { "enabled" } else { "disabled" };
    print_success(&format!("'{}' is now {}", args.name, state));
    Ok(())
}

fn run_delete(session: &mut Session, args: EntityArgs) -> Result<()> {
    match EntityKind::from(args.kind) {
        EntityKind::Experiment => {
            let experiment = find_owned::<Experiment>(session, &args.name)?;
            session.controller().delete(&experiment);
        }
        EntityKind::Feature => {
            let feature = find_owned::<Feature>(session, &args.name)?;
            session.controller().delete(&feature);
        }
    }
    session.controller().cache_all();
    print_success(&format!("Deleted '{}'", args.name));
    Ok(())
}

fn run_edit(session: &mut Session, command: EditCommand) -> Result<()> {
    match command {
        EditCommand::Feature {
            name,
            values,
            enabled,
        } => {
            let mut controller = session.controller();
            let mut form = FeatureEditForm::open(&controller, &name)
                .with_context(|| format!("No feature named '{}'", name))?;
            if let Some(values) = values {
                form.set_values_text(values);
            }
            if let Some(enabled) = enabled.desired() {
                form.set_enabled(enabled);
            }
            finish_save(form.save(&mut controller), &name)
        }
        EditCommand::Experiment {
            name,
            values,
            cohort,
            add_cohorts,
            remove_cohorts,
            state,
            enabled,
        } => {
            let catalog = session.catalog.clone();
            let mut controller = session.controller();
            let mut form = ExperimentEditForm::open(&controller, &catalog, &name)
                .with_context(|| format!("No experiment named '{}'", name))?;

            if let Some(values) = values {
                form.set_values_text(values);
            }
            for cohort in &add_cohorts {
                if !form.add_cohort(cohort) {
                    print_warning(&format!("Cohort '{}' not added", cohort));
                }
            }
            for cohort in &remove_cohorts {
                if !form.remove_cohort(cohort) {
                    print_warning(&format!("Cohort '{}' not removed", cohort));
                }
            }
            if let Some(cohort) = cohort {
                if !form.select_cohort(&cohort) && !form.add_cohort(&cohort) {
                    bail!("Cohort '{}' cannot be selected", cohort);
                }
            }
            if let Some(change) = state.change() {
                if !form.request_state_change(change) {
                    bail!(
                        "Cannot {} '{}' from state '{}'",
                        change_verb(change),
                        name,
                        form.effective_state()
                    );
                }
            }
            if let Some(enabled) = enabled.desired() {
                form.set_enabled(enabled);
            }
            finish_save(form.save(&mut controller), &name)
        }
    }
}

fn change_verb(change: StateChange) -> &'static str {
    match change {
        StateChange::Start => "start",
        StateChange::Complete => "complete",
        StateChange::Reset => "reset",
    }
}

fn run_lifecycle(session: &mut Session, name: &str, change: StateChange) -> Result<()> {
    let experiment = find_owned::<Experiment>(session, name)?;
    let changed = match change {
        StateChange::Start => experiment.start(),
        StateChange::Complete => experiment.complete(),
        StateChange::Reset => {
            experiment.clear_state();
            true
        }
    };
    if !changed {
        bail!(
            "Cannot {} '{}' from state '{}'",
            change_verb(change),
            name,
            experiment.state()
        );
    }
    session.controller().cache_all();
    print_success(&format!("'{}' is now {}", name, experiment.state()));
    Ok(())
}

fn run_prefill(session: &mut Session, command: PrefillCommand) -> Result<()> {
    match command {
        PrefillCommand::List => {
            let switchboard = &session.switchboard;
            let experiment_names: Vec<&str> = switchboard
                .experiments()
                .names()
                .chain(switchboard.inactive_experiments().names())
                .collect();
            let feature_names: Vec<&str> = switchboard
                .features()
                .names()
                .chain(switchboard.inactive_features().names())
                .collect();

            let experiments = session.prefill.experiments_unique(experiment_names);
            let features = session.prefill.features_unique(feature_names);
            if experiments.is_empty() && features.is_empty() {
                print_info("Nothing to prefill");
                return Ok(());
            }
            for experiment in experiments {
                println!("experiment {}", experiment.name);
            }
            for feature in features {
                println!("feature {}", feature.name);
            }
            Ok(())
        }
        PrefillCommand::Clear => {
            session.prefill.clear_cache();
            print_success("Cleared prefill history");
            Ok(())
        }
        PrefillCommand::Restore { name } => {
            let context = session.switchboard.context().clone();
            if let Some(snapshot) = session.prefill.experiment(&name) {
                ensure_name_free::<Experiment>(session, &name)?;
                let experiment = snapshot.restore(&context)?;
                session.controller().activate(experiment);
            } else if let Some(snapshot) = session.prefill.feature(&name) {
                ensure_name_free::<Feature>(session, &name)?;
                let feature = snapshot.restore(&context)?;
                session.controller().activate(feature);
            } else {
                bail!("Nothing named '{}' in the prefill history", name);
            }
            session.controller().cache_all();
            print_success(&format!("Restored '{}'", name));
            Ok(())
        }
    }
}

fn run_properties(session: &Session, args: PropertiesArgs) -> Result<()> {
    let install_id = session.install_id()?;
    let properties = default_properties(&args.uuid, &install_id, &app_info());
    print_json(&Value::Object(properties))
}
