use clap::{ArgAction, Args, Parser, Subcommand};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "alertmap",
    version,
    about = "outbreak alert search and map view client",
    long_about = "alertmap searches an outbreak alert service, groups alerts that share a location into map points, and keeps the map/list selection state a map front end needs.\n\nExamples:\n  alertmap login --url http://localhost:8081 --username me --password secret\n  alertmap search --disease cholera --start 2014-01-01 --limit 0\n  alertmap search --country Nigeria --select 12345abcd -o frame.geojson\n\nTip: Use --config to persist the server URL and viewport settings."
)]
pub struct CliArgs {
    #[arg(
        short = 'v',
        long = "vb",
        visible_alias = "verbose",
        action = ArgAction::Count,
        global = true,
        help_heading = "Output",
        help = "Increase verbosity (-v, -vv)."
    )]
    pub verbose: u8,

    #[arg(
        short = 'c',
        long = "clr",
        visible_alias = "color",
        global = true,
        help_heading = "Output",
        help = "Enable colored output (overrides --no-color)."
    )]
    pub color: bool,

    #[arg(
        short = 'n',
        long = "nc",
        visible_alias = "no-color",
        global = true,
        help_heading = "Output",
        help = "Disable colored output."
    )]
    pub no_color: bool,

    #[arg(
        short = 'C',
        long = "cfg",
        visible_alias = "config",
        value_name = "FILE",
        global = true,
        help_heading = "Input",
        help = "Path to config file (defaults to ~/.alertmap/config.yml)."
    )]
    pub config: Option<String>,

    #[arg(
        long = "sf",
        visible_alias = "session-file",
        value_name = "FILE",
        global = true,
        help_heading = "Input",
        help = "Where the login token is cached (defaults to ~/.alertmap/session.yml)."
    )]
    pub session_file: Option<String>,

    #[arg(
        short = 'u',
        long = "u",
        visible_alias = "url",
        value_name = "URL",
        global = true,
        help_heading = "HTTP",
        help = "Search service base URL, without a trailing slash."
    )]
    pub url: Option<String>,

    #[arg(
        short = 'T',
        long = "to",
        visible_alias = "timeout",
        value_name = "SECONDS",
        global = true,
        help_heading = "HTTP",
        help = "Per-request timeout in seconds."
    )]
    pub timeout: Option<u64>,

    #[arg(
        short = 'p',
        long = "px",
        visible_alias = "proxy",
        value_name = "URL",
        global = true,
        help_heading = "HTTP",
        help = "HTTP proxy URL (e.g. http://127.0.0.1:8080)."
    )]
    pub proxy: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Exchange credentials for a token and cache it.
    Login(LoginArgs),
    /// Forget the cached token.
    Logout,
    /// Run a search and show the results.
    Search(SearchArgs),
}

#[derive(Args, Debug, Clone)]
pub struct LoginArgs {
    #[arg(
        short = 'U',
        long = "user",
        visible_alias = "username",
        value_name = "NAME",
        help = "User name."
    )]
    pub username: String,

    #[arg(
        short = 'P',
        long = "pw",
        visible_alias = "password",
        value_name = "PASSWORD",
        env = "ALERTMAP_PASSWORD",
        hide_env_values = true,
        help = "Password."
    )]
    pub password: String,
}

#[derive(Args, Debug, Clone)]
pub struct SearchArgs {
    #[arg(long, value_name = "YYYY-MM-DD", help_heading = "Query", help = "Start date (inclusive).")]
    pub start: Option<String>,

    #[arg(long, value_name = "YYYY-MM-DD", help_heading = "Query", help = "End date (exclusive).")]
    pub end: Option<String>,

    #[arg(long, help_heading = "Query", help = "Country where the incident occurred.")]
    pub country: Option<String>,

    #[arg(long, help_heading = "Query", help = "Disease name.")]
    pub disease: Option<String>,

    #[arg(long, help_heading = "Query", help = "Species named in the report.")]
    pub species: Option<String>,

    #[arg(long, help_heading = "Query", help = "Feed the report originated from.")]
    pub feed: Option<String>,

    #[arg(long, help_heading = "Query", help = "Words in the incident description.")]
    pub description: Option<String>,

    #[arg(long, help_heading = "Query", help = "Disease names in the differential diagnosis.")]
    pub diagnosis: Option<String>,

    #[arg(long = "id", value_name = "ID", help_heading = "Query", help = "Incident ID.")]
    pub incident_id: Option<String>,

    #[arg(
        long,
        help_heading = "Query",
        help = "Treat country, disease, species, feed and description as regular expressions."
    )]
    pub regex: bool,

    #[arg(
        short = 'l',
        long,
        value_name = "N",
        help_heading = "Query",
        help = "Maximum results (default is the server's 50, 0 for all)."
    )]
    pub limit: Option<u64>,

    #[arg(long, value_name = "N", help_heading = "Query", help = "Offset into the result set.")]
    pub offset: Option<u64>,

    #[arg(
        short = 's',
        long = "sel",
        visible_alias = "select",
        value_name = "ID",
        help_heading = "View",
        help = "Select an alert as if picked from the result list."
    )]
    pub select: Option<String>,

    #[arg(
        long = "pk",
        visible_alias = "pick",
        value_name = "LON,LAT",
        allow_hyphen_values = true,
        help_heading = "View",
        help = "Pick the map point at these coordinates."
    )]
    pub pick: Option<String>,

    #[arg(
        long = "hv",
        visible_alias = "hover",
        value_name = "LON,LAT",
        allow_hyphen_values = true,
        help_heading = "View",
        help = "Hover the map point at these coordinates and print its tooltip."
    )]
    pub hover: Option<String>,

    #[arg(
        long = "vp",
        visible_alias = "viewport",
        value_name = "WxH",
        help_heading = "View",
        help = "Map viewport size in pixels (e.g. 960x540)."
    )]
    pub viewport: Option<String>,

    #[arg(
        long = "rows",
        value_name = "N",
        help_heading = "View",
        help = "Result list rows shown around the selection (0 = all)."
    )]
    pub rows: Option<usize>,

    #[arg(
        short = 'o',
        long = "out",
        visible_alias = "output",
        value_name = "FILE",
        help_heading = "Output",
        help = "Write results to a file."
    )]
    pub output: Option<String>,

    #[arg(
        short = 'A',
        long = "of",
        visible_alias = "output-format",
        value_name = "FORMAT",
        help_heading = "Output",
        help = "Output format (text, json, geojson)."
    )]
    pub output_format: Option<String>,
}
