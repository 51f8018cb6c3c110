mod cli;
mod demo;
mod infra;
mod report;

use leave_desk::error::AppError;

pub fn run() -> Result<(), AppError> {
    cli::run()
}
