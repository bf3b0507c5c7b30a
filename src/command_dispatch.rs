//! Purpose: Hold top-level CLI command dispatch for `spycats`.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: Commands reach the service only through `Dashboard`, `Session`, or `BreedCache`.
//! Invariants: stdout is JSON unless it is a terminal; diagnostics go to stderr.

use super::*;
use spycats::api::{SpyCat, SpyCatGateway};
use spycats::config::{ConsoleConfig, parse_duration};
use spycats::console::{
    Dashboard, DeleteOutcome, Field, ListState, SaveOutcome, Session, SubmitOutcome, filter_breeds,
};

pub(super) fn dispatch_command(
    command: Command,
    globals: GlobalArgs,
    color_mode: ColorMode,
) -> Result<RunOutcome, Error> {
    match command {
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "spycats", &mut io::stdout());
            Ok(RunOutcome::ok())
        }
        Command::Serve {
            bind,
            allow_non_loopback,
            any_breed,
        } => {
            let config = serve::ServeConfig {
                bind: parse_bind(&bind)?,
                allow_non_loopback,
                check_breeds: !any_breed,
            };
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .map_err(|err| {
                    Error::new(ErrorKind::Internal)
                        .with_message("failed to start runtime")
                        .with_source(err)
                })?;
            runtime.block_on(serve::serve(config))?;
            Ok(RunOutcome::ok())
        }
        Command::List => {
            let config = resolve_config(globals)?;
            let mut dashboard = Dashboard::new(config.gateway()?);
            ensure_loaded(&mut dashboard)?;
            emit_roster(&dashboard, None, color_mode);
            Ok(RunOutcome::ok())
        }
        Command::Create {
            name,
            experience,
            breed,
            salary,
        } => {
            let config = resolve_config(globals)?;
            let mut session = Session::new(config.gateway()?, config.breed_cache()?)
                .with_suggest_debounce(config.suggest_debounce);
            session.open();
            if let Some(notice) = session.form().breed_notice() {
                emit_notice(&notice, color_mode);
            }
            let form = session.form_mut();
            form.set_name(name);
            form.set_experience(experience);
            form.set_breed(breed);
            form.set_salary(salary);

            match session.submit() {
                SubmitOutcome::Created(cat) => {
                    let dashboard = session.dashboard();
                    if let Some(message) = dashboard.error() {
                        emit_notice(message, color_mode);
                    }
                    emit_roster(dashboard, Some(("created", &cat)), color_mode);
                    Ok(RunOutcome::ok())
                }
                SubmitOutcome::Blocked(err) => Err(err),
                SubmitOutcome::Rejected => Err(rejection_error(session.form().field_errors())),
                SubmitOutcome::Failed(err) => Err(err),
                SubmitOutcome::Stale => Err(Error::new(ErrorKind::Internal)
                    .with_message("create result arrived for a discarded draft")),
            }
        }
        Command::Salary { id, amount } => {
            let config = resolve_config(globals)?;
            let mut dashboard = Dashboard::new(config.gateway()?);
            ensure_loaded(&mut dashboard)?;
            if !dashboard.begin_edit(id) {
                return Err(missing_cat(id));
            }
            dashboard.set_row_salary(id, amount);
            match dashboard.on_update_salary(id) {
                SaveOutcome::Saved(cat) => {
                    emit_roster(&dashboard, Some(("updated", &cat)), color_mode);
                    Ok(RunOutcome::ok())
                }
                SaveOutcome::Skipped => Err(Error::new(ErrorKind::Usage)
                    .with_message("Salary must be a non-negative number.")
                    .with_hint("Pass a plain number like 52000 or 1250.50.")),
                SaveOutcome::Failed(err) => match dashboard.error() {
                    Some(message) => Err(err.with_message(message)),
                    None => Err(err),
                },
            }
        }
        Command::Delete { id } => {
            let config = resolve_config(globals)?;
            let mut dashboard = Dashboard::new(config.gateway()?);
            match dashboard.on_delete(id) {
                DeleteOutcome::Deleted => {
                    emit_deleted(&dashboard, id, color_mode);
                    Ok(RunOutcome::ok())
                }
                DeleteOutcome::AlreadyGone => Err(Error::new(ErrorKind::NotFound)
                    .with_message(dashboard.error().unwrap_or("Not found.").to_string())
                    .with_hint(format!("Spy cat {id} was already deleted."))),
                DeleteOutcome::Failed(err) => Err(err),
            }
        }
        Command::Breeds { query } => {
            let config = resolve_config(globals)?;
            let cache = config.breed_cache()?;
            let breeds = cache.get_breeds()?;
            let matches = filter_breeds(&breeds, query.as_deref().unwrap_or(""));
            if io::stdout().is_terminal() {
                for breed in &matches {
                    println!("{}", breed.name);
                }
            } else {
                emit_json(json!({ "breeds": matches, "count": matches.len() }), color_mode);
            }
            Ok(RunOutcome::ok())
        }
    }
}

fn resolve_config(globals: GlobalArgs) -> Result<ConsoleConfig, Error> {
    let timeout = globals
        .timeout
        .as_deref()
        .map(parse_duration)
        .transpose()?;
    Ok(ConsoleConfig::from_env()?
        .with_api_base_url(globals.api_url)
        .with_breeds_url(globals.breeds_url)
        .with_timeout(timeout))
}

fn ensure_loaded<G: SpyCatGateway>(dashboard: &mut Dashboard<G>) -> Result<(), Error> {
    match dashboard.mount() {
        ListState::ReadyWithError => Err(Error::new(ErrorKind::RequestFailed)
            .with_message(dashboard.error().unwrap_or("Failed to load Spy Cats.").to_string())),
        ListState::Ready | ListState::Loading => Ok(()),
    }
}

fn missing_cat(id: u64) -> Error {
    Error::new(ErrorKind::NotFound)
        .with_message(format!("no spy cat with id {id}"))
        .with_hint("Run `spycats list` to see current ids.")
}

fn rejection_error(fields: &spycats::api::FieldErrors) -> Error {
    let hint = [Field::Name, Field::Experience, Field::Breed, Field::Salary]
        .into_iter()
        .find(|field| fields.contains(field.as_str()))
        .map(|field| format!("Fix --{} and try again.", field.as_str()))
        .unwrap_or_else(|| "Fix the listed fields and try again.".to_string());
    Error::validation(fields.clone())
        .with_message("The service rejected this spy cat.")
        .with_hint(hint)
}

fn emit_roster<G: SpyCatGateway>(
    dashboard: &Dashboard<G>,
    changed: Option<(&str, &SpyCat)>,
    color_mode: ColorMode,
) {
    if !io::stdout().is_terminal() {
        let mut out = Map::new();
        if let Some((label, cat)) = changed {
            out.insert(label.to_string(), json!(cat));
        }
        out.insert("cats".to_string(), json!(dashboard.cats()));
        out.insert("count".to_string(), json!(dashboard.count()));
        out.insert("total_salary".to_string(), json!(dashboard.total_salary()));
        emit_json(Value::Object(out), color_mode);
        return;
    }

    if let Some((label, cat)) = changed {
        println!("{label} spy cat {} ({})", cat.id, cat.name);
    }
    if let Some(message) = dashboard.empty_message() {
        println!("{message}");
        return;
    }
    let rows: Vec<Vec<String>> = dashboard
        .cats()
        .iter()
        .map(|cat| {
            vec![
                cat.id.to_string(),
                cat.name.clone(),
                cat.experience.to_string(),
                cat.breed.clone(),
                format!("{:.2}", cat.salary),
            ]
        })
        .collect();
    emit_table(&["ID", "NAME", "EXPERIENCE", "BREED", "SALARY"], &rows);
    println!(
        "\n{} spy cats, total salary {:.2}",
        dashboard.count(),
        dashboard.total_salary()
    );
}

fn emit_deleted<G: SpyCatGateway>(dashboard: &Dashboard<G>, id: u64, color_mode: ColorMode) {
    if let Some(message) = dashboard.error() {
        emit_notice(message, color_mode);
    }
    if io::stdout().is_terminal() {
        println!("deleted spy cat {id}; {} remaining", dashboard.count());
    } else {
        emit_json(
            json!({ "deleted": id, "count": dashboard.count(), "total_salary": dashboard.total_salary() }),
            color_mode,
        );
    }
}
