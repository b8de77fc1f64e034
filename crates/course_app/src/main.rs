mod platform;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use log::LevelFilter;

use platform::logging::LogDestination;

/// Generate learning courses and follow their progress from the terminal.
#[derive(Parser, Debug)]
#[command(name = "coursegen", version, about)]
pub struct Args {
    /// Directory holding durable state, sessions and coursegen.ron.
    #[arg(long, global = true, env = "COURSEGEN_HOME")]
    pub state_dir: Option<PathBuf>,

    /// Session to join. Without one every invocation is a fresh session.
    #[arg(long, global = true, env = "COURSEGEN_SESSION")]
    pub session: Option<String>,

    /// Where log output goes.
    #[arg(long, global = true, value_enum, default_value_t = LogTarget::File)]
    pub log: LogTarget,

    /// More log detail; repeat for trace.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogTarget {
    File,
    Terminal,
    Both,
}

impl From<LogTarget> for LogDestination {
    fn from(target: LogTarget) -> Self {
        match target {
            LogTarget::File => LogDestination::File,
            LogTarget::Terminal => LogDestination::Terminal,
            LogTarget::Both => LogDestination::Both,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create an account and keep its session token.
    Register {
        #[arg(long)]
        username: String,
        #[arg(long, env = "COURSEGEN_PASSWORD")]
        password: String,
    },
    /// Log in and keep the session token.
    Login {
        #[arg(long)]
        username: String,
        #[arg(long, env = "COURSEGEN_PASSWORD")]
        password: String,
    },
    /// Forget the stored session token.
    Logout,
    /// List your courses.
    Courses,
    /// Print a course with its lessons, quizzes and resource links.
    Show { id: u64 },
    /// Generate a course and follow its progress until it is ready.
    Generate {
        #[arg(long)]
        subject: String,
        #[arg(long)]
        topic: String,
        /// Grade level.
        #[arg(long)]
        standard: String,
    },
    /// Follow the current generation without starting one.
    Watch,
    /// Print the current generation state once.
    Status,
    /// Act on the progress indicator: open the finished course or the form.
    Open,
    /// Clear the generation state to create another course.
    Reset,
    /// Delete one or more courses.
    Delete {
        #[arg(required = true)]
        ids: Vec<u64>,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();
    let level = match args.verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    platform::logging::initialize(args.log.into(), level);

    match platform::run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            course_logging::course_error!("{:#}", err);
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
