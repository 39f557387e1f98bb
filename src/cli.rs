//! Command-line interface.

use std::path::PathBuf;

use clap::Parser;

use crate::config::{read_config, validate_config, ConfigError, ServerConfig};

#[derive(Debug, Parser)]
#[command(name = "dsplay")]
#[command(about = "Serve a directory of Datastar template fragments", long_about = None)]
pub struct Cli {
    /// Playground directory (defaults to the config file value, or ".")
    pub dir: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Port to listen on (all interfaces)
    #[arg(short, long, conflicts_with = "bind")]
    pub port: Option<u16>,

    /// Full bind address, e.g. 127.0.0.1:8080
    #[arg(long)]
    pub bind: Option<String>,

    /// Session signing secret
    #[arg(long, env = "DSPLAY_SECRET")]
    pub secret: Option<String>,

    /// Log at debug level and dump the route table at startup
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// Load the config file (if any), apply flags on top, and validate.
    pub fn resolve_config(&self) -> Result<ServerConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => read_config(path)?,
            None => ServerConfig::default(),
        };
        self.apply(&mut config);
        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }

    fn apply(&self, config: &mut ServerConfig) {
        if let Some(dir) = &self.dir {
            config.playground.root = dir.clone();
        }
        if let Some(port) = self.port {
            config.listener.bind_address = format!("0.0.0.0:{port}");
        }
        if let Some(bind) = &self.bind {
            config.listener.bind_address = bind.clone();
        }
        if let Some(secret) = &self.secret {
            config.session.secret = secret.clone();
        }
        if self.debug {
            config.observability.log_level = "debug".to_string();
            config.observability.dump_routes = true;
        }
    }
}
