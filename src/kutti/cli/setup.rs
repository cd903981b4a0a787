use clap::{Args, CommandFactory, Parser, Subcommand};
use kutti::model::{EntityKind, RecordId};
use std::path::PathBuf;

/// Returns the version string, including git hash and commit date for non-release builds.
/// Format: "0.3.0" for releases, "0.3.0@abc1234 2025-01-15 14:30" for dev builds
fn get_version() -> &'static str {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    const GIT_HASH: &str = env!("GIT_HASH");
    const GIT_COMMIT_DATE: &str = env!("GIT_COMMIT_DATE");
    const IS_RELEASE: &str = env!("IS_RELEASE");

    use std::sync::OnceLock;
    static VERSION_STRING: OnceLock<String> = OnceLock::new();

    VERSION_STRING.get_or_init(|| {
        if IS_RELEASE == "true" || GIT_HASH.is_empty() {
            VERSION.to_string()
        } else {
            format!("{}@{} {}", VERSION, GIT_HASH, GIT_COMMIT_DATE)
        }
    })
}

#[derive(Parser, Debug)]
#[command(
    name = "kutti",
    bin_name = "kutti",
    version = get_version(),
    disable_help_flag = true,
    disable_help_subcommand = true
)]
#[command(about = "Administrative console for the Kutti sponsorship platform", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// API root for this run (overrides the api-base setting)
    #[arg(long, global = true, env = "KUTTI_API", value_name = "URL", help_heading = "Options")]
    pub api: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true, help_heading = "Options")]
    pub verbose: bool,

    /// Print help
    #[arg(short, long, global = true)]
    pub help: bool,
}

/// Command group definitions for help output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandGroup {
    Session,
    Records,
    Misc,
}

impl CommandGroup {
    pub fn heading(&self) -> &'static str {
        match self {
            CommandGroup::Session => "Session Commands:",
            CommandGroup::Records => "Record Commands:",
            CommandGroup::Misc => "Miscellaneous:",
        }
    }

    pub fn for_command(name: &str) -> Option<Self> {
        match name {
            "login" | "logout" | "whoami" => Some(CommandGroup::Session),
            "list" | "view" | "create" | "edit" | "delete" | "export" => {
                Some(CommandGroup::Records)
            }
            "route" | "config" | "help" => Some(CommandGroup::Misc),
            _ => None,
        }
    }

    pub fn all() -> &'static [CommandGroup] {
        &[
            CommandGroup::Session,
            CommandGroup::Records,
            CommandGroup::Misc,
        ]
    }
}

/// Returns the custom grouped help output as a string
pub fn get_grouped_help() -> String {
    let cmd = Cli::command();
    let version = cmd.get_version().unwrap_or("unknown");

    let mut output = String::new();
    output.push_str(&format!("kutti {version}\n"));
    output.push_str("Administrative console for the Kutti sponsorship platform\n");
    output.push('\n');
    output.push_str("Usage: kutti [OPTIONS] [COMMAND]\n");

    let subcommands: Vec<_> = cmd.get_subcommands().collect();

    for group in CommandGroup::all() {
        let group_cmds: Vec<_> = subcommands
            .iter()
            .filter(|sc| {
                !sc.is_hide_set() && CommandGroup::for_command(sc.get_name()) == Some(*group)
            })
            .collect();

        if !group_cmds.is_empty() {
            output.push('\n');
            output.push_str(&format!("{}\n", group.heading()));
            for sc in group_cmds {
                let name = sc.get_name();
                let about = sc.get_about().map(|s| s.to_string()).unwrap_or_default();
                output.push_str(&format!("  {:<12} {}\n", name, about));
            }
        }
    }

    output.push('\n');
    output.push_str("Entities: children, news, missions, users\n");
    output.push('\n');
    output.push_str("Options:\n");
    output.push_str("      --api <URL>  API root for this run\n");
    output.push_str("  -v, --verbose    Verbose output\n");
    output.push_str("  -h, --help       Print help\n");
    output.push_str("  -V, --version    Print version\n");

    output
}

pub fn print_grouped_help() {
    print!("{}", get_grouped_help());
}

pub fn print_subcommand_help(command: &Option<Commands>) {
    let name = match command {
        Some(Commands::Session(c)) => match c {
            SessionCommands::Login { .. } => "login",
            SessionCommands::Logout => "logout",
            SessionCommands::Whoami => "whoami",
        },
        Some(Commands::Records(c)) => match c {
            RecordCommands::List { .. } => "list",
            RecordCommands::View { .. } => "view",
            RecordCommands::Create { .. } => "create",
            RecordCommands::Edit { .. } => "edit",
            RecordCommands::Delete { .. } => "delete",
            RecordCommands::Export { .. } => "export",
        },
        Some(Commands::Misc(c)) => match c {
            MiscCommands::Route { .. } => "route",
            MiscCommands::Config { .. } => "config",
            MiscCommands::Help { .. } => "help",
        },
        None => {
            print_grouped_help();
            return;
        }
    };

    print_help_for_command(name);
}

/// Prints help for a command by name
pub fn print_help_for_command(name: &str) {
    let mut cmd = Cli::command();

    for subcmd in cmd.get_subcommands_mut() {
        if subcmd.get_name() == name || subcmd.get_all_aliases().any(|a| a == name) {
            let help = subcmd.render_help();
            print!("{}", help);
            return;
        }
    }

    eprintln!("Unknown command: {}", name);
    eprintln!();
    print_grouped_help();
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(flatten)]
    Session(SessionCommands),

    #[command(flatten)]
    Records(RecordCommands),

    #[command(flatten)]
    Misc(MiscCommands),
}

#[derive(Subcommand, Debug)]
pub enum SessionCommands {
    /// Sign in (prompts for the password when not given)
    #[command(display_order = 1)]
    Login {
        username: String,

        /// Password (read from stdin when omitted)
        #[arg(long, env = "KUTTI_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Sign out
    #[command(display_order = 2)]
    Logout,

    /// Show the signed-in user
    #[command(display_order = 3)]
    Whoami,
}

/// Search, filter, sort and paging flags shared by `list` and `export`.
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Text searched across every column
    #[arg(short, long)]
    pub search: Option<String>,

    /// Column contains text (column=text), repeatable
    #[arg(short, long = "filter", value_name = "COLUMN=TEXT")]
    pub filters: Vec<String>,

    /// Earliest date for a date column (column=YYYY-MM-DD)
    #[arg(long, value_name = "COLUMN=DATE")]
    pub from: Vec<String>,

    /// Latest date for a date column (column=YYYY-MM-DD)
    #[arg(long, value_name = "COLUMN=DATE")]
    pub to: Vec<String>,

    /// Minimum for a number column (column=N)
    #[arg(long, value_name = "COLUMN=N")]
    pub min: Vec<String>,

    /// Maximum for a number column (column=N)
    #[arg(long, value_name = "COLUMN=N")]
    pub max: Vec<String>,

    /// Keep rows whose column equals one of the selected values (column=value)
    #[arg(long = "select", value_name = "COLUMN=VALUE")]
    pub selects: Vec<String>,

    /// Sort by column
    #[arg(long, value_name = "COLUMN")]
    pub sort: Option<String>,

    /// Sort descending
    #[arg(long, requires = "sort")]
    pub desc: bool,
}

#[derive(Subcommand, Debug)]
pub enum RecordCommands {
    /// List records with search, filters, sort and paging
    #[command(alias = "ls", display_order = 10)]
    List {
        entity: EntityKind,

        #[command(flatten)]
        filter: FilterArgs,

        /// Page to show
        #[arg(short, long)]
        page: Option<usize>,

        /// Rows per page (5, 10, 25, 50 or 100)
        #[arg(long)]
        page_size: Option<usize>,

        /// Show rows as cards
        #[arg(long)]
        cards: bool,
    },

    /// Show one record
    #[command(alias = "v", display_order = 11)]
    View {
        entity: EntityKind,
        id: RecordId,

        /// Language for translated fields
        #[arg(long)]
        lang: Option<String>,
    },

    /// Create a record from field=value pairs
    #[command(alias = "n", display_order = 12)]
    Create {
        entity: EntityKind,

        /// Field value (field=value), repeatable
        #[arg(long = "set", value_name = "FIELD=VALUE")]
        values: Vec<String>,

        /// Photos or videos to attach
        #[arg(long, value_name = "FILE")]
        media: Vec<PathBuf>,
    },

    /// Change fields of a record
    #[command(alias = "e", display_order = 13)]
    Edit {
        entity: EntityKind,
        id: RecordId,

        /// Field value (field=value), repeatable
        #[arg(long = "set", value_name = "FIELD=VALUE")]
        values: Vec<String>,

        /// Photos or videos to attach
        #[arg(long, value_name = "FILE")]
        media: Vec<PathBuf>,
    },

    /// Delete a record
    #[command(alias = "rm", display_order = 14)]
    Delete {
        entity: EntityKind,
        id: RecordId,

        /// Skip confirmation
        #[arg(long, short = 'y')]
        yes: bool,
    },

    /// Write the filtered rows to a CSV file
    #[command(display_order = 15)]
    Export {
        entity: EntityKind,

        #[command(flatten)]
        filter: FilterArgs,

        /// Directory the CSV is written to
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
pub enum MiscCommands {
    /// Check how a console path resolves for the signed-in user
    #[command(display_order = 30)]
    Route {
        /// Path such as /children or /news/12
        #[arg(default_value = "/")]
        path: String,
    },

    /// Get or set configuration
    #[command(display_order = 31)]
    Config {
        /// Configuration key (api-base, timeout, page-size, language)
        key: Option<String>,

        /// Value to set (if omitted, prints current value)
        value: Option<String>,
    },

    /// Print help for kutti or a subcommand
    #[command(display_order = 32)]
    Help {
        /// Subcommand to get help for
        command: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("kutti").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn parses_list_flags() {
        let cli = parse(&[
            "list", "children", "-f", "mission_name=Kerala", "--sort", "age", "--desc", "-p", "2",
        ]);
        match cli.command {
            Some(Commands::Records(RecordCommands::List {
                entity,
                filter,
                page,
                ..
            })) => {
                assert_eq!(entity, EntityKind::Children);
                assert_eq!(filter.filters, vec!["mission_name=Kerala"]);
                assert!(filter.desc);
                assert_eq!(page, Some(2));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn entity_aliases() {
        let cli = parse(&["view", "child", "4"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Records(RecordCommands::View {
                entity: EntityKind::Children,
                id: 4,
                ..
            }))
        ));
        assert!(Cli::try_parse_from(["kutti", "list", "pets"]).is_err());
    }

    #[test]
    fn desc_requires_sort() {
        assert!(Cli::try_parse_from(["kutti", "list", "news", "--desc"]).is_err());
    }

    #[test]
    fn grouped_help_lists_every_group() {
        let help = get_grouped_help();
        for group in CommandGroup::all() {
            assert!(help.contains(group.heading()));
        }
        assert!(help.contains("export"));
    }
}
