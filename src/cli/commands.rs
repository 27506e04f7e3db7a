//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - book: one-shot booking from command-line preferences
//! - run: run configured booking jobs once
//! - slots: list available slots
//! - validate: check every configured account can log in
//! - jobs: show configured jobs

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// slotbook - books recurring leisure-centre activity slots
#[derive(Parser, Debug)]
#[command(name = "slotbook")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log to stderr instead of the log file
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Venue account, read from the environment unless given
#[derive(Args, Debug, Clone)]
pub struct AccountArgs {
    /// Account username
    #[arg(long, env = "BETTER_USERNAME")]
    pub username: String,

    /// Account password
    #[arg(long, env = "BETTER_PASSWORD", hide_env_values = true)]
    pub password: String,
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Book slots once, right now
    Book {
        /// Venue slug, e.g. some-leisure-centre
        #[arg(long)]
        venue: String,

        /// Activity slug, e.g. badminton-40min
        #[arg(long)]
        activity: String,

        /// Date to book (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,

        /// Earliest slot start (HH:MM)
        #[arg(long)]
        min_slot_time: Option<String>,

        /// Latest slot end (HH:MM)
        #[arg(long)]
        max_slot_time: Option<String>,

        /// Number of consecutive slots to book
        #[arg(short, long, default_value_t = 1)]
        n_slots: usize,

        #[command(flatten)]
        account: AccountArgs,
    },

    /// Run configured booking jobs once
    Run {
        /// Only run these jobs (repeatable); all jobs when omitted
        #[arg(short, long = "job")]
        jobs: Vec<String>,

        /// Skip logging in with every account before running
        #[arg(long)]
        skip_validation: bool,
    },

    /// List available slots for an activity
    Slots {
        #[arg(long)]
        venue: String,

        #[arg(long)]
        activity: String,

        /// Date to list (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,

        #[command(flatten)]
        account: AccountArgs,
    },

    /// Check that every configured account can log in
    Validate,

    /// Show configured booking jobs
    Jobs,
}

impl Commands {
    /// Whether the command works from the configured `bookings`
    pub fn uses_bookings(&self) -> bool {
        matches!(self, Commands::Run { .. } | Commands::Validate | Commands::Jobs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["slotbook"]).is_err());
    }

    #[test]
    fn test_cli_global_flags() {
        let cli = Cli::try_parse_from(["slotbook", "jobs", "-v", "-c", "/tmp/slotbook.yml"]).unwrap();
        assert!(cli.is_verbose());
        assert_eq!(cli.config.as_ref(), Some(&PathBuf::from("/tmp/slotbook.yml")));
        assert!(matches!(cli.command, Commands::Jobs));
    }

    #[test]
    fn test_book_command() {
        let cli = Cli::try_parse_from([
            "slotbook",
            "book",
            "--venue",
            "leisure-centre",
            "--activity",
            "badminton-40min",
            "--date",
            "2026-03-10",
            "--min-slot-time",
            "18:00",
            "-n",
            "2",
            "--username",
            "alice",
            "--password",
            "pw",
        ])
        .unwrap();

        match cli.command {
            Commands::Book {
                venue,
                date,
                min_slot_time,
                max_slot_time,
                n_slots,
                account,
                ..
            } => {
                assert_eq!(venue, "leisure-centre");
                assert_eq!(date, NaiveDate::from_ymd_opt(2026, 3, 10).unwrap());
                assert_eq!(min_slot_time.as_deref(), Some("18:00"));
                assert!(max_slot_time.is_none());
                assert_eq!(n_slots, 2);
                assert_eq!(account.username, "alice");
            }
            _ => panic!("Expected book command"),
        }
    }

    #[test]
    fn test_book_rejects_bad_date() {
        let result = Cli::try_parse_from([
            "slotbook",
            "book",
            "--venue",
            "v",
            "--activity",
            "a",
            "--date",
            "10/03/2026",
            "--username",
            "alice",
            "--password",
            "pw",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_run_command() {
        let cli = Cli::try_parse_from(["slotbook", "run"]).unwrap();
        match cli.command {
            Commands::Run { jobs, skip_validation } => {
                assert!(jobs.is_empty());
                assert!(!skip_validation);
            }
            _ => panic!("Expected run command"),
        }
    }

    #[test]
    fn test_run_named_jobs() {
        let cli = Cli::try_parse_from(["slotbook", "run", "--job", "a", "-j", "b", "--skip-validation"]).unwrap();
        match cli.command {
            Commands::Run { jobs, skip_validation } => {
                assert_eq!(jobs, vec!["a".to_string(), "b".to_string()]);
                assert!(skip_validation);
            }
            _ => panic!("Expected run command"),
        }
    }

    #[test]
    fn test_validate_command() {
        let cli = Cli::try_parse_from(["slotbook", "validate"]).unwrap();
        assert!(matches!(cli.command, Commands::Validate));
    }

    #[test]
    fn test_one_shot_commands_do_not_use_bookings() {
        let slots = Cli::try_parse_from([
            "slotbook", "slots", "--venue", "v", "--activity", "a", "--date", "2026-03-10", "--username", "u",
            "--password", "p",
        ])
        .unwrap();
        assert!(!slots.command.uses_bookings());
        assert!(Commands::Jobs.uses_bookings());
        assert!(Commands::Validate.uses_bookings());
        assert!(
            Commands::Run {
                jobs: vec![],
                skip_validation: false
            }
            .uses_bookings()
        );
    }

    #[test]
    fn test_help_works() {
        Cli::command().debug_assert();
    }
}
