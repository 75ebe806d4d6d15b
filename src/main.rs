use std::process::ExitCode;

use tracing::{info, warn};

use pamgate::{build_oracle, Backend, Config, LoginPolicyGate};

const DEFAULT_CONFIG: &str = "pamgate.toml";

fn usage() {
    eprintln!("Usage: pamgate [-c <config>] <username>...");
}

fn main() -> ExitCode {
    let mut config_path: Option<String> = None;
    let mut usernames = Vec::new();

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-c" | "--config" => match args.next() {
                Some(path) => config_path = Some(path),
                None => {
                    usage();
                    return ExitCode::from(2);
                }
            },
            "-h" | "--help" => {
                usage();
                return ExitCode::SUCCESS;
            }
            _ => usernames.push(arg),
        }
    }

    if usernames.is_empty() {
        usage();
        return ExitCode::from(2);
    }

    // Load configuration
    let path = config_path.as_deref().unwrap_or(DEFAULT_CONFIG);
    let config = match Config::load_with_env(path) {
        Ok(config) => config,
        Err(e) if config_path.is_some() => {
            eprintln!("Failed to load {path}: {e}");
            return ExitCode::from(2);
        }
        Err(e) => {
            eprintln!("Failed to load {path}: {e}");
            eprintln!("Using default configuration.");
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };

    if let Err(e) = pamgate::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        if let Err(e) = pamgate::logging::init_console_only(&config.logging.level) {
            eprintln!("Failed to initialize console logging: {e}");
        }
    }

    if let Err(e) = config.validate() {
        eprintln!("{e}");
        return ExitCode::from(2);
    }

    let oracle = match build_oracle(&config.policy) {
        Ok(oracle) => oracle,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::from(2);
        }
    };

    if config.policy.backend == Backend::Table && config.policy.accounts.is_empty() {
        warn!(
            "table backend has no accounts; every user gets the default outcome ({})",
            config.policy.default_outcome
        );
    }

    let gate = LoginPolicyGate::with_service(oracle, config.policy.service.clone());
    info!(
        service = gate.service(),
        backend = config.policy.backend.as_str(),
        "checking {} account(s)",
        usernames.len()
    );

    let mut any_denied = false;
    for username in &usernames {
        // Authorization only: no password is collected.
        let disposition = gate.evaluate(username, "");
        if disposition.is_deny() {
            any_denied = true;
            println!("{username}: denied");
        } else {
            println!("{username}: allowed");
        }
    }

    if any_denied {
        warn!("at least one account was denied");
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}
