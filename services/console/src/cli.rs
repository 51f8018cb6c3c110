use crate::demo::{run_demo, DemoArgs};
use crate::report::{run_quota_report, QuotaArgs};
use clap::{Parser, Subcommand};
use leave_desk::config::AppConfig;
use leave_desk::error::AppError;
use leave_desk::telemetry;

#[derive(Parser, Debug)]
#[command(
    name = "Leave Desk",
    about = "Exercise the leave request and onboarding workflows from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Walk through leave requests, approvals, and invitations (default command)
    Demo(DemoArgs),
    /// Import a leave history export and report PTO consumption per user
    Quota(QuotaArgs),
}

pub(crate) fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let command = cli
        .command
        .unwrap_or_else(|| Command::Demo(DemoArgs::default()));

    match command {
        Command::Demo(args) => run_demo(args, &config),
        Command::Quota(args) => run_quota_report(args, &config),
    }
}
