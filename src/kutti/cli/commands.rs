use super::render::{
    emit, print_messages, render_detail, render_listing, render_text_list, route_lines,
    session_lines,
};
use super::setup::{
    print_grouped_help, print_help_for_command, print_subcommand_help, Cli, Commands, FilterArgs,
    MiscCommands, RecordCommands, SessionCommands,
};
use clap::Parser;
use kutti::api::{parse_assignments, parse_number_assignments, ConfigAction, KuttiApi, ListQuery};
use kutti::client::http::HttpTransport;
use kutti::error::{KuttiError, Result};
use kutti::init::{data_dir, initialize};
use kutti::model::{EntityKind, RecordId};
use kutti::store::fs::FileSessionStore;
use std::io::{BufRead, IsTerminal};
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

type Api = KuttiApi<HttpTransport, FileSessionStore>;

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    // Handle help flag - at top level use grouped help, for subcommands use clap's default
    if cli.help {
        if cli.command.is_none() {
            print_grouped_help();
        } else {
            print_subcommand_help(&cli.command);
        }
        return Ok(());
    }

    // Help and config work without the API or a session
    match &cli.command {
        Some(Commands::Misc(MiscCommands::Help { command })) => {
            return handle_help(command.clone());
        }
        Some(Commands::Misc(MiscCommands::Config { key, value })) => {
            return handle_config(&data_dir()?, key.clone(), value.clone());
        }
        None => {
            print_grouped_help();
            return Ok(());
        }
        _ => {}
    }

    let mut api = initialize(cli.api.as_deref())?.api;
    debug!(signed_in = api.session().current().is_some(), "session loaded");

    match cli.command {
        Some(Commands::Session(cmd)) => match cmd {
            SessionCommands::Login { username, password } => {
                handle_login(&mut api, &username, password)
            }
            SessionCommands::Logout => handle_logout(&mut api),
            SessionCommands::Whoami => handle_whoami(&api),
        },
        Some(Commands::Records(cmd)) => match cmd {
            RecordCommands::List {
                entity,
                filter,
                page,
                page_size,
                cards,
            } => handle_list(&api, entity, &filter, page, page_size, cards),
            RecordCommands::View { entity, id, lang } => {
                handle_view(&api, entity, id, lang.as_deref())
            }
            RecordCommands::Create {
                entity,
                values,
                media,
            } => handle_create(&api, entity, &values, media),
            RecordCommands::Edit {
                entity,
                id,
                values,
                media,
            } => handle_edit(&api, entity, id, &values, media),
            RecordCommands::Delete { entity, id, yes } => handle_delete(&api, entity, id, yes),
            RecordCommands::Export {
                entity,
                filter,
                out,
            } => handle_export(&api, entity, &filter, &out),
        },
        Some(Commands::Misc(cmd)) => match cmd {
            MiscCommands::Route { path } => handle_route(&api, &path),
            MiscCommands::Config { .. } | MiscCommands::Help { .. } => Ok(()),
        },
        None => Ok(()),
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "kutti=debug" } else { "kutti=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}

/// Turns the shared grid flags into a query for the API.
fn list_query(
    filter: &FilterArgs,
    page: Option<usize>,
    page_size: Option<usize>,
    cards: bool,
) -> Result<ListQuery> {
    Ok(ListQuery {
        search: filter.search.clone(),
        filters: parse_assignments(&filter.filters)?,
        from: parse_assignments(&filter.from)?,
        to: parse_assignments(&filter.to)?,
        min: parse_number_assignments(&filter.min)?,
        max: parse_number_assignments(&filter.max)?,
        select: parse_assignments(&filter.selects)?,
        sort: filter.sort.clone(),
        descending: filter.desc,
        page,
        page_size,
        cards,
    })
}

fn read_password(username: &str) -> Result<String> {
    if std::io::stdin().is_terminal() {
        let term = console::Term::stderr();
        term.write_str(&format!("Password for {}: ", username))?;
        return Ok(term.read_secure_line()?);
    }
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn handle_login(api: &mut Api, username: &str, password: Option<String>) -> Result<()> {
    let password = match password {
        Some(p) => p,
        None => read_password(username)?,
    };
    let result = api.login(username, &password)?;
    print_messages(&result.messages);
    Ok(())
}

fn handle_logout(api: &mut Api) -> Result<()> {
    let result = api.logout()?;
    print_messages(&result.messages);
    Ok(())
}

fn handle_whoami(api: &Api) -> Result<()> {
    let result = api.whoami()?;
    if let Some(session) = &result.session {
        emit(&render_text_list(&session_lines(session), ""));
    }
    print_messages(&result.messages);
    Ok(())
}

fn handle_list(
    api: &Api,
    entity: EntityKind,
    filter: &FilterArgs,
    page: Option<usize>,
    page_size: Option<usize>,
    cards: bool,
) -> Result<()> {
    let query = list_query(filter, page, page_size, cards)?;
    let result = api.list(entity, &query)?;
    if let Some(listing) = result.listing.as_ref().filter(|l| l.total_count > 0) {
        emit(&render_listing(listing));
    }
    print_messages(&result.messages);
    Ok(())
}

fn handle_view(api: &Api, entity: EntityKind, id: RecordId, lang: Option<&str>) -> Result<()> {
    let result = api.view(entity, id, lang)?;
    if let Some(detail) = &result.detail {
        emit(&render_detail(detail));
    }
    print_messages(&result.messages);
    Ok(())
}

fn handle_create(
    api: &Api,
    entity: EntityKind,
    values: &[String],
    media: Vec<PathBuf>,
) -> Result<()> {
    let result = api.create(entity, values, media)?;
    print_messages(&result.messages);
    Ok(())
}

fn handle_edit(
    api: &Api,
    entity: EntityKind,
    id: RecordId,
    values: &[String],
    media: Vec<PathBuf>,
) -> Result<()> {
    if values.is_empty() && media.is_empty() {
        return Err(KuttiError::Validation(
            "Nothing to change (use --set field=value or --media)".to_string(),
        ));
    }
    let result = api.update(entity, id, values, media)?;
    print_messages(&result.messages);
    Ok(())
}

fn handle_delete(api: &Api, entity: EntityKind, id: RecordId, yes: bool) -> Result<()> {
    let result = api.delete(entity, id, yes)?;
    print_messages(&result.messages);
    Ok(())
}

fn handle_export(api: &Api, entity: EntityKind, filter: &FilterArgs, out: &Path) -> Result<()> {
    let query = list_query(filter, None, None, false)?;
    let result = api.export(entity, &query, out)?;
    print_messages(&result.messages);
    Ok(())
}

fn handle_route(api: &Api, path: &str) -> Result<()> {
    let result = api.route(path)?;
    if let Some(report) = &result.route {
        emit(&render_text_list(&route_lines(report), ""));
    }
    print_messages(&result.messages);
    Ok(())
}

fn handle_config(dir: &Path, key: Option<String>, value: Option<String>) -> Result<()> {
    let action = match (key.clone(), value) {
        (None, _) => ConfigAction::ShowAll,
        (Some(k), None) => ConfigAction::ShowKey(k),
        (Some(k), Some(v)) => ConfigAction::Set(k, v),
    };

    let result = kutti::commands::config::run(dir, action)?;
    let mut lines = Vec::new();
    if let Some(config) = &result.config {
        if key.is_none() {
            for (k, v) in config.list_all() {
                lines.push(format!("{} = {}", k, v));
            }
        }
    }
    if key.is_none() {
        emit(&render_text_list(&lines, "No configuration values."));
    }
    print_messages(&result.messages);
    Ok(())
}

fn handle_help(command: Option<String>) -> Result<()> {
    match command {
        Some(cmd) => print_help_for_command(&cmd),
        None => print_grouped_help(),
    }
    Ok(())
}
