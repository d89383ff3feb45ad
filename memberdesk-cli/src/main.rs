use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use memberdesk_core::config::Config;
use memberdesk_core::logging::{init_logging_with_config, LogConfig};
use memberdesk_core::members::{
    display_role, generate_password, HttpMemberService, Member, MemberRoleManager, ResetState,
    Role, TracingNotifier,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "memberdesk")]
#[command(author, version, about = "Manage workspace member roles and passwords", long_about = None)]
struct Args {
    /// Set the log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Enable JSON formatted logging
    #[arg(long)]
    json_logs: bool,

    /// TOML configuration file (defaults plus MEMBERDESK_* variables otherwise)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Offer the dataset_operator role regardless of configuration
    #[arg(long)]
    dataset_operator: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the roles an operator may assign to a member
    Roles {
        /// Role of the acting operator
        #[arg(long)]
        operator: String,
        /// Current role of the member
        #[arg(long, default_value = "normal")]
        member_role: String,
    },
    /// Print a freshly generated password without applying it
    GeneratePassword,
    /// Change a member's role
    UpdateRole {
        #[arg(long)]
        member: String,
        #[arg(long)]
        operator: String,
        #[arg(long)]
        role: String,
    },
    /// Remove a member or cancel a pending invitation
    Remove {
        #[arg(long)]
        member: String,
        #[arg(long)]
        operator: String,
    },
    /// Reset a member's password and print the new one
    ResetPassword {
        #[arg(long)]
        member: String,
        #[arg(long)]
        operator: String,
        /// Also mail the new password to the member
        #[arg(long)]
        email: bool,
    },
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => Config::default(),
    };
    config.apply_env()?;

    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }
    if args.json_logs {
        config.logging.json_format = true;
    }
    if args.dataset_operator {
        config.features.dataset_operator_enabled = true;
    }

    // Command-line overrides get the same checks as the file.
    config.validate()?;
    Ok(config)
}

fn manager(config: &Config, member: String, operator: &str) -> MemberRoleManager {
    let service = Arc::new(HttpMemberService::from_config(&config.service));
    MemberRoleManager::new(
        Member::new(member, Role::Normal),
        Role::parse(operator),
        config.features.role_policy(),
        service,
    )
    .with_notifier(Arc::new(TracingNotifier))
    .on_operate(Arc::new(|| info!("member list changed")))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    init_logging_with_config(LogConfig::try_from(&config.logging)?)?;

    match args.command {
        Command::Roles {
            operator,
            member_role,
        } => {
            let member = Member::new("-", display_role(&member_role));
            let menu = config.features.role_policy().menu(&member, Role::parse(&operator));
            println!("current: {}", menu.current);
            for entry in menu.entries {
                let mark = if entry.selected { "*" } else { " " };
                println!("{} {}", mark, entry.role);
            }
        }
        Command::GeneratePassword => {
            println!("{}", generate_password().expose());
        }
        Command::UpdateRole {
            member,
            operator,
            role,
        } => {
            let manager = manager(&config, member, &operator);
            let Some(role) = Role::parse(&role) else {
                bail!("unknown role '{}'", role);
            };
            if !manager.assignable_roles().contains(&role) {
                bail!("operator role '{}' cannot assign '{}'", operator, role);
            }
            manager.update_role(role).await;
        }
        Command::Remove { member, operator } => {
            let manager = manager(&config, member, &operator);
            if !Role::parse(&operator).is_some_and(|r| r.can_manage_members()) {
                warn!(%operator, "operator may not manage members; the service will decide");
            }
            manager.delete_or_cancel_invitation().await;
        }
        Command::ResetPassword {
            member,
            operator,
            email,
        } => {
            let manager = manager(&config, member, &operator);
            manager.open_reset_prompt().await;
            manager.reset_password().await;

            let Some(password) = manager.generated_password().await else {
                bail!("password reset failed");
            };
            println!("{}", password.expose());

            if email {
                manager.send_password_by_email().await;
                if manager.state().await == ResetState::ShowingPassword {
                    bail!("password was reset but the email could not be sent");
                }
            }
            manager.close_password_prompt().await;
        }
    }

    Ok(())
}
