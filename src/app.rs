use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use clap::{error::ErrorKind, CommandFactory, Parser};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::time::Instant;
use tracing_subscriber::EnvFilter;

use crate::camera::MercatorViewport;
use crate::cli::args::{CliArgs, Command, LoginArgs, SearchArgs};
use crate::cli::validation;
use crate::client::QueryParams;
use crate::config::{self, ConfigFile, Session, DEFAULT_URL};
use crate::model::Coordinates;
use crate::output::{self, OutputFormat};
use crate::render::{FrameRecorder, MapAdapter};
use crate::runner::{self, Runner};
use crate::selection::{Effects, ViewState};
use crate::view;

const DEFAULT_VIEWPORT: (f64, f64) = (960.0, 540.0);
const DEFAULT_ROWS: usize = 12;

fn print_banner() {
    println!(
        "{} {}",
        "alertmap".bold().cyan(),
        format!("v{} - outbreak alert search", env!("CARGO_PKG_VERSION")).white()
    );
    println!();
}

fn format_kv_line(label: &str, value: &str) {
    println!(":: {:<10}: {}", label, value);
}

fn format_opt_value<'a>(v: &'a str, default: &'a str) -> &'a str {
    if v.trim().is_empty() {
        default
    } else {
        v
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("alertmap={level}")));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Subcommand named on the command line, if any, so `--help` can describe it.
fn help_target(argv: &[String]) -> Option<String> {
    let cmd = CliArgs::command();
    argv.iter().skip(1).find_map(|a| {
        cmd.get_subcommands()
            .find(|s| s.get_name() == a.as_str())
            .map(|s| s.get_name().to_string())
    })
}

fn render_custom_help(subcommand: Option<&str>) -> String {
    let root = CliArgs::command();
    let cmd = match subcommand.and_then(|name| root.find_subcommand(name)) {
        Some(sub) => sub.clone(),
        None => root.clone(),
    };
    let mut out = String::new();

    out.push_str(root.get_name());
    if let Some(version) = root.get_version() {
        out.push(' ');
        out.push_str(version);
    }
    out.push('\n');

    if let Some(about) = cmd.get_about() {
        out.push_str(&about.to_string());
        out.push('\n');
    }

    if subcommand.is_none() {
        if let Some(long_about) = cmd.get_long_about() {
            out.push('\n');
            out.push_str(&long_about.to_string());
            out.push('\n');
        }
    }

    out.push('\n');
    out.push_str("Usage: ");
    out.push_str(root.get_name());
    match subcommand {
        Some(name) => {
            out.push(' ');
            out.push_str(name);
            out.push_str(" [OPTIONS]\n\n");
        }
        None => out.push_str(" [OPTIONS] <COMMAND>\n\n"),
    }

    if subcommand.is_none() {
        out.push_str("Commands:\n");
        for sub in root.get_subcommands() {
            let about = sub.get_about().map(|a| a.to_string()).unwrap_or_default();
            out.push_str(&format!("  {:<10}{}\n", sub.get_name(), about));
        }
        out.push('\n');
    }

    let mut sections: Vec<(String, Vec<&clap::Arg>)> = Vec::new();
    let mut section_idx: HashMap<String, usize> = HashMap::new();

    let args = cmd
        .get_arguments()
        .chain(root.get_arguments().filter(|a| subcommand.is_some() && a.is_global_set()));
    for arg in args {
        if arg.is_hide_set() {
            continue;
        }

        let heading = arg.get_help_heading().unwrap_or("Options").to_string();

        let idx = match section_idx.get(&heading).copied() {
            Some(i) => i,
            None => {
                sections.push((heading.clone(), Vec::new()));
                let i = sections.len() - 1;
                section_idx.insert(heading, i);
                i
            }
        };

        sections[idx].1.push(arg);
    }

    for (heading, args) in sections {
        out.push_str(&heading);
        out.push_str(":\n");

        for arg in args {
            let mut parts: Vec<String> = Vec::new();

            if let Some(short) = arg.get_short() {
                parts.push(format!("-{short}"));
            }

            if let Some(long) = arg.get_long() {
                parts.push(format!("--{long}"));
            }

            if let Some(aliases) = arg.get_visible_aliases() {
                for alias in aliases {
                    let rendered = format!("--{alias}");
                    if !parts.iter().any(|p| p == &rendered) {
                        parts.push(rendered);
                    }
                }
            }

            let mut flags = parts.join(", ");

            if arg.get_action().takes_values() {
                let value_name = arg
                    .get_value_names()
                    .and_then(|names| names.first())
                    .map(|name| name.as_str())
                    .unwrap_or("VALUE");
                flags.push_str(&format!(" <{value_name}>"));
            }

            out.push_str("  ");
            out.push_str(&flags);
            out.push('\n');

            if let Some(help) = arg.get_help() {
                let help = help.to_string();
                if !help.trim().is_empty() {
                    out.push_str("          ");
                    out.push_str(help.trim());
                    out.push('\n');
                }
            }

            out.push('\n');
        }
    }

    out
}

#[derive(Clone, Debug)]
struct GlobalConfig {
    url: String,
    timeout: u64,
    proxy: Option<String>,
    no_color: bool,
    session_path: PathBuf,
    session: Session,
}

fn build_global_config(args: &CliArgs, cfg: &ConfigFile) -> Result<GlobalConfig, String> {
    let no_color = if args.color {
        false
    } else {
        args.no_color || cfg.no_color.unwrap_or(false)
    };
    let session_path = match args.session_file.as_deref() {
        Some(p) => config::expand_tilde(p),
        None => config::default_session_path()
            .ok_or_else(|| "could not determine home directory for the session file".to_string())?,
    };
    let session = config::load_session(&session_path)?;
    let url = args
        .url
        .clone()
        .or_else(|| session.url.clone())
        .or_else(|| cfg.url.clone())
        .unwrap_or_else(|| DEFAULT_URL.to_string());
    Ok(GlobalConfig {
        url,
        timeout: args.timeout.or(cfg.timeout).unwrap_or(30),
        proxy: args.proxy.clone().or_else(|| cfg.proxy.clone()),
        no_color,
        session_path,
        session,
    })
}

#[derive(Clone, Debug)]
struct SearchRun {
    options: runner::Options,
    params: QueryParams,
    select: Option<String>,
    pick: Option<Coordinates>,
    hover: Option<Coordinates>,
    viewport: (f64, f64),
    rows: usize,
    output: Option<String>,
    output_format: Option<OutputFormat>,
}

fn build_search_run(
    args: SearchArgs,
    cfg: &ConfigFile,
    global: &GlobalConfig,
) -> Result<SearchRun, String> {
    validation::validate(&args)?;

    let token = global
        .session
        .token
        .clone()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| "not logged in (run `alertmap login` first)".to_string())?;

    let viewport = match args.viewport.as_deref() {
        Some(raw) => crate::utils::parse_viewport(raw)?,
        None => (
            cfg.viewport_width.unwrap_or(DEFAULT_VIEWPORT.0),
            cfg.viewport_height.unwrap_or(DEFAULT_VIEWPORT.1),
        ),
    };
    let output_format = args
        .output_format
        .as_deref()
        .or(cfg.output_format.as_deref())
        .map(|raw| {
            OutputFormat::parse(raw).ok_or_else(|| format!("invalid output format '{raw}'"))
        })
        .transpose()?;

    Ok(SearchRun {
        options: runner::Options {
            url: global.url.clone(),
            token: Some(token),
            timeout_seconds: global.timeout,
            proxy: global.proxy.clone(),
        },
        params: QueryParams {
            start: args.start,
            end: args.end,
            country: args.country,
            disease: args.disease,
            species: args.species,
            feed: args.feed,
            description: args.description,
            diagnosis: args.diagnosis,
            id: args.incident_id,
            regex: args.regex,
            limit: args.limit,
            offset: args.offset,
        },
        select: args.select,
        pick: args
            .pick
            .as_deref()
            .map(crate::utils::parse_coordinates)
            .transpose()?,
        hover: args
            .hover
            .as_deref()
            .map(crate::utils::parse_coordinates)
            .transpose()?,
        viewport,
        rows: args.rows.or(cfg.list_rows).unwrap_or(DEFAULT_ROWS),
        output: args.output.or_else(|| cfg.output.clone()),
        output_format,
    })
}

fn summarize_query(params: &QueryParams) -> String {
    let filters = params
        .filters()
        .into_iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(" ");
    let limit = match params.limit {
        None => "server".to_string(),
        Some(0) => "all".to_string(),
        Some(n) => n.to_string(),
    };
    format!(
        "{} limit={} offset={}",
        format_opt_value(&filters, "(no filters)"),
        limit,
        params.offset.unwrap_or(0)
    )
}

fn apply_effects(
    effects: Effects,
    state: &ViewState,
    adapter: &mut MapAdapter<FrameRecorder>,
    viewport: &mut MercatorViewport,
    notes: &mut Vec<(String, String)>,
) {
    if effects.redraw {
        adapter.refresh(state.points(), std::time::Instant::now());
    }
    if let Some(camera) = effects.camera.as_ref() {
        viewport.apply(camera);
        notes.push((
            "Camera".to_string(),
            format!(
                "center={:.4},{:.4} zoom={} ({}ms)",
                camera.center[0],
                camera.center[1],
                camera.zoom,
                camera.duration.as_millis()
            ),
        ));
    }
    if !effects.scroll_to.is_empty() {
        notes.push((
            "Scroll".to_string(),
            view::selector_for(&effects.scroll_to),
        ));
    }
    if effects.tooltip_changed {
        if let Some(tt) = state.tooltip() {
            let mut lines = vec![format!("{} [{}]", tt.title, tt.style())];
            for a in &tt.alerts {
                match a.date.as_deref() {
                    Some(date) => lines.push(format!("{date} {}", a.description)),
                    None => lines.push(a.description.clone()),
                }
            }
            notes.push(("Tooltip".to_string(), lines.join("\n              ")));
        }
    }
}

/// Replays the requested map and list interactions against the fresh state.
fn apply_view_actions(
    run: &SearchRun,
    state: &mut ViewState,
    adapter: &mut MapAdapter<FrameRecorder>,
    viewport: &mut MercatorViewport,
) -> Result<Vec<(String, String)>, String> {
    let mut notes: Vec<(String, String)> = Vec::new();
    adapter.show(state.points());

    if let Some(id) = run.select.as_deref() {
        let index = state
            .record_index(id)
            .ok_or_else(|| format!("alert '{id}' is not in the results"))?;
        let fx = state.select_record(index, &*viewport);
        apply_effects(fx, state, adapter, viewport, &mut notes);
    }
    if let Some(c) = run.pick {
        let point = state
            .point_at(c)
            .ok_or_else(|| format!("no map point at {}", crate::model::format_coordinates(c)))?;
        let fx = state.click(point, 0, &*viewport);
        apply_effects(fx, state, adapter, viewport, &mut notes);
    }
    if let Some(c) = run.hover {
        let point = state
            .point_at(c)
            .ok_or_else(|| format!("no map point at {}", crate::model::format_coordinates(c)))?;
        let fx = state.hover_add(point, &*viewport);
        apply_effects(fx, state, adapter, viewport, &mut notes);
    }
    adapter.flush();
    Ok(notes)
}

fn build_progress_bar() -> Result<ProgressBar, String> {
    let pb = ProgressBar::new_spinner();
    pb.set_draw_target(ProgressDrawTarget::stderr());
    pb.enable_steady_tick(Duration::from_millis(200));
    pb.set_style(
        ProgressStyle::with_template(
            ":: Fetching: {spinner} pages={pos} :: Duration: [{elapsed_precise}] :: {msg}",
        )
        .map_err(|e| format!("failed to build progress bar style: {e}"))?,
    );
    Ok(pb)
}

async fn run_login(login: LoginArgs, global: GlobalConfig) -> Result<(), String> {
    let mut runner = Runner::new(runner::Options {
        url: global.url.clone(),
        token: None,
        timeout_seconds: global.timeout,
        proxy: global.proxy.clone(),
    })
    .map_err(|e| e.to_string())?;
    let token = runner
        .login(&login.username, &login.password)
        .await
        .map_err(|e| format!("login failed: {e}"))?;
    config::save_session(
        &global.session_path,
        &Session {
            url: Some(runner.options().url.clone()),
            token: Some(token),
        },
    )?;
    format_kv_line(
        "Login",
        &format!("{} @ {}", login.username.green(), runner.options().url),
    );
    Ok(())
}

fn run_logout(global: GlobalConfig) -> Result<(), String> {
    config::clear_session_token(&global.session_path)?;
    format_kv_line("Logout", "token cleared");
    Ok(())
}

async fn run_search(run: SearchRun) -> Result<(), String> {
    format_kv_line("Server", &run.options.url);
    format_kv_line("Query", &summarize_query(&run.params));
    println!();

    let runner = Runner::new(run.options.clone()).map_err(|e| e.to_string())?;
    let pb = build_progress_bar()?;
    let now = Instant::now();
    let result = runner.search_with_progress(&run.params, &pb).await;
    pb.finish_and_clear();
    let mut result = match result {
        Ok(result) => result,
        Err(runner::RunnerError::Fetch(e)) => {
            return Err(format!("{} ({})", "failed to get any results".red(), e.source));
        }
        Err(e) => return Err(e.to_string()),
    };

    let mut viewport = MercatorViewport::new(run.viewport.0, run.viewport.1);
    let mut adapter = MapAdapter::new(FrameRecorder::default());
    let notes = apply_view_actions(&run, &mut result.state, &mut adapter, &mut viewport)?;
    let state = &result.state;

    format_kv_line(
        "Results",
        &format!(
            "alerts={} points={} pages={}",
            state.records().len().to_string().green(),
            state.points().len(),
            result.pages
        ),
    );
    for (label, value) in notes.iter() {
        format_kv_line(label, value);
    }
    println!();

    let window = if run.rows == 0 {
        0..state.records().len()
    } else {
        output::list_window(state, run.rows)
    };
    let format = run
        .output_format
        .or_else(|| run.output.as_deref().and_then(output::infer_format_from_path))
        .unwrap_or(OutputFormat::Text);
    let rendered = match format {
        OutputFormat::Text => output::render_text(state, window.clone()),
        OutputFormat::Json => output::render_json(state),
        OutputFormat::GeoJson => output::render_geojson(adapter.widget().last_frame()),
    };

    match run.output.as_ref() {
        Some(outfile_path) => {
            let mut outfile = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(outfile_path)
                .await
                .map_err(|e| format!("failed to open output file: {e}"))?;
            outfile
                .write_all(&rendered)
                .await
                .map_err(|_| "failed to write output file".to_string())?;
            print!(
                "{}",
                String::from_utf8_lossy(&output::render_text(state, window))
            );
        }
        None => print!("{}", String::from_utf8_lossy(&rendered)),
    }

    println!();
    println!(
        ":: Completed :: search took {}ms ::",
        now.elapsed().as_millis()
    );
    Ok(())
}

fn load_config_for(args: &CliArgs) -> Result<ConfigFile, String> {
    match args.config.as_deref() {
        Some(path) => config::load_config(&config::expand_tilde(path), false),
        None => match config::default_config_path() {
            Some(path) => {
                if let Err(e) = config::ensure_default_config_file(&path) {
                    tracing::warn!("{e}");
                }
                config::load_config(&path, true)
            }
            None => Ok(ConfigFile::default()),
        },
    }
}

pub fn run_cli() -> Result<(), String> {
    let argv: Vec<String> = std::env::args().collect();
    let args = match CliArgs::try_parse_from(&argv) {
        Ok(args) => args,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                print!("{}", render_custom_help(help_target(&argv).as_deref()));
                return Ok(());
            }
            ErrorKind::DisplayVersion => {
                let cmd = CliArgs::command();
                print!("{}", cmd.render_version());
                return Ok(());
            }
            _ => return Err(e.to_string()),
        },
    };

    init_tracing(args.verbose);
    let cfg = load_config_for(&args)?;
    let global = build_global_config(&args, &cfg)?;
    if global.no_color {
        colored::control::set_override(false);
    } else if args.color {
        colored::control::set_override(true);
    }
    print_banner();

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("failed to build runtime: {e}"))?;

    match args.command.clone() {
        Command::Login(login) => rt.block_on(run_login(login, global)),
        Command::Logout => run_logout(global),
        Command::Search(search) => {
            let run = build_search_run(search, &cfg, &global)?;
            rt.block_on(run_search(run))
        }
    }
}
