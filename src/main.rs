use std::env;

use tracing::info;
use visor::config::{load_config, print_schema};
use visor::routing::{build_redirect, RedirectPlanner};
use visor::utils::init_logging;

fn main() {
    if env::args().any(|arg| arg == "--schema") {
        if let Err(e) = print_schema() {
            eprintln!("Error printing schema: {}", e);
            std::process::exit(1);
        }
        return;
    }

    let path = env::var("VISOR_CONFIG").unwrap_or_else(|_| "./config.yaml".to_string());
    let config = match load_config(&path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration from '{}': {}", path, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = init_logging(&config.logging) {
        eprintln!("{}", e);
        std::process::exit(1);
    }

    // Building the planner is what the guard does at setup; any bad route fails here.
    let planner = match RedirectPlanner::new(&config) {
        Ok(planner) => planner,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    info!("Configuration '{}' is valid", path);
    let example = match build_redirect(&config.login_route, "/requested/page", &config) {
        Ok(url) => url,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };
    println!("authenticate_on_startup: {}", config.authenticate_on_startup);
    println!("login redirect:          {}", example);
    println!("access denied redirect:  {}", planner.access_denied_redirect());
}
