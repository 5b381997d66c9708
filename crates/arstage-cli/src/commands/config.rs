//! Configuration management CLI commands.

use clap::{Args, Subcommand};

use crate::output;
use arstage_core::error::AppError;
use arstage_server::CertificateProvisioner;

/// Arguments for config commands
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Config subcommand
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show,
    /// Validate configuration and check the certificate setup
    Validate,
}

/// Execute config commands
pub async fn execute(args: &ConfigArgs, config_path: Option<&str>) -> Result<(), AppError> {
    let source = config_path.unwrap_or("defaults");
    match &args.command {
        ConfigCommand::Show => {
            let config = super::load_config(config_path)?;
            output::print_json(&config);
        }
        ConfigCommand::Validate => {
            let config = super::load_config(config_path)?;
            output::print_success(&format!("Configuration '{}' is valid", source));
            output::print_kv(
                "Server",
                &format!(
                    "{}:{} (fallback {})",
                    config.server.host, config.server.port, config.server.fallback_port
                ),
            );
            output::print_kv("Static dir", &config.server.static_dir);
            output::print_kv("Converter input", &config.converter.input.display().to_string());
            output::print_kv(
                "Converter output",
                &config.converter.output.display().to_string(),
            );

            if !std::path::Path::new(&config.server.static_dir).is_dir() {
                output::print_warning(&format!(
                    "Static directory '{}' does not exist",
                    config.server.static_dir
                ));
            }

            let provisioner = CertificateProvisioner::new(config.server.tls.clone());
            if provisioner.pair_present() {
                output::print_kv("Certificate", "present");
            } else if provisioner.command_available().await {
                output::print_kv("Certificate", "will be generated on startup");
            } else {
                output::print_warning(&format!(
                    "'{}' not found; the server will fall back to HTTP on port {}",
                    config.server.tls.openssl_command, config.server.fallback_port
                ));
            }
        }
    }

    Ok(())
}
