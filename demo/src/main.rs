//! `webplus-demo` command-line entry point.
//!
//! ```text
//! webplus-demo [--settings FILE] runserver [--addr ADDR]
//! webplus-demo [--settings FILE] render [--lang LANG]
//! ```

use anyhow::Context as _;
use clap::{Arg, ArgMatches, Command};

use webplus_core::logging::setup_logging;
use webplus_core::settings_loader;
use webplus_core::Settings;
use webplus_demo::env::EnvironmentSource;
use webplus_demo::{views, AppState};
use webplus_http::HttpRequest;

fn cli() -> Command {
    Command::new("webplus-demo")
        .about("Demo site for the webplus Mustache backend")
        .subcommand_required(true)
        .arg(
            Arg::new("settings")
                .long("settings")
                .global(true)
                .value_name("FILE")
                .help("Settings file (.toml or .json); WEBPLUS_* variables override it"),
        )
        .subcommand(
            Command::new("runserver").about("Starts the development server").arg(
                Arg::new("addr")
                    .long("addr")
                    .value_name("ADDR")
                    .help("Address to bind to (defaults to the bind_address setting)"),
            ),
        )
        .subcommand(
            Command::new("render").about("Renders the index page to stdout").arg(
                Arg::new("lang")
                    .long("lang")
                    .default_value("en")
                    .help("Value sent as the Accept-Language header"),
            ),
        )
}

fn load_settings(matches: &ArgMatches) -> anyhow::Result<Settings> {
    match matches.get_one::<String>("settings") {
        Some(path) => settings_loader::from_file_with_env(path)
            .with_context(|| format!("failed to load settings from {path}")),
        None => Ok(settings_loader::from_env()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();
    let settings = load_settings(&matches)?;
    setup_logging(&settings);

    let state = AppState::from_settings(settings, EnvironmentSource::Process)
        .context("failed to load the template backend")?;

    match matches.subcommand() {
        Some(("runserver", sub)) => {
            let addr = sub
                .get_one::<String>("addr")
                .cloned()
                .unwrap_or_else(|| state.settings.bind_address.clone());
            webplus_demo::run(state, &addr).await?;
        }
        Some(("render", sub)) => {
            let lang = sub.get_one::<String>("lang").map_or("en", String::as_str);
            let request = HttpRequest::builder()
                .path("/")
                .header("accept-language", lang)
                .build();
            let response = views::index(&state, &request)?;
            println!("{}", response.content());
        }
        _ => anyhow::bail!("a subcommand is required"),
    }

    Ok(())
}
