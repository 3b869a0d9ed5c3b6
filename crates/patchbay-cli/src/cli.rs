use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "patchbay",
    about = "patchbay - queue, publish and roll back versioned data changes",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Configuration file (defaults to ./patchbay.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the data directory from the configuration
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Inspect or edit the pending-change queue
    Queue(QueueArgs),
    /// Publish the queue as a patch
    Commit(CommitArgs),
    /// Undo a published patch
    Rollback(RollbackArgs),
    /// List published patches, newest first
    Log(LogArgs),
    /// Show a published patch
    Show(ShowArgs),
    /// Structural diff of two JSON documents
    Diff(DiffArgs),
}

#[derive(Args)]
pub struct QueueArgs {
    #[command(subcommand)]
    pub action: Option<QueueAction>,
}

#[derive(Subcommand)]
pub enum QueueAction {
    /// List queued changes
    List,
    /// Show one queued change with its document diff
    Show { index: usize },
    /// Dequeue changes by position and revert them on disk
    Remove {
        #[arg(required = true)]
        indices: Vec<usize>,
    },
    /// Dequeue every change for a target and revert them on disk
    Drop { target: String },
}

#[derive(Args)]
pub struct CommitArgs {
    /// Patch title
    #[arg(short, long)]
    pub message: String,
    #[arg(long)]
    pub version: String,
    #[arg(long = "type", default_value = "patch")]
    pub patch_type: String,
    #[arg(long = "tag")]
    pub tags: Vec<String>,
}

#[derive(Args)]
pub struct RollbackArgs {
    pub patch: String,
}

#[derive(Args)]
pub struct LogArgs {
    #[arg(short = 'n', long, default_value = "20")]
    pub limit: usize,
    #[arg(long)]
    pub oneline: bool,
}

#[derive(Args)]
pub struct ShowArgs {
    pub patch: String,
    /// Include the stored source-control diff
    #[arg(long)]
    pub diff: bool,
}

#[derive(Args)]
pub struct DiffArgs {
    pub old: PathBuf,
    pub new: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_queue_defaults_to_list() {
        let cli = Cli::try_parse_from(["patchbay", "queue"]).unwrap();
        if let Command::Queue(args) = cli.command {
            assert!(args.action.is_none());
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_queue_remove_many() {
        let cli = Cli::try_parse_from(["patchbay", "queue", "remove", "2", "0"]).unwrap();
        if let Command::Queue(QueueArgs { action: Some(QueueAction::Remove { indices }) }) = cli.command {
            assert_eq!(indices, vec![2, 0]);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_queue_remove_requires_index() {
        assert!(Cli::try_parse_from(["patchbay", "queue", "remove"]).is_err());
    }

    #[test]
    fn parse_queue_drop() {
        let cli = Cli::try_parse_from(["patchbay", "queue", "drop", "u1"]).unwrap();
        if let Command::Queue(QueueArgs { action: Some(QueueAction::Drop { target }) }) = cli.command {
            assert_eq!(target, "u1");
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_commit() {
        let cli = Cli::try_parse_from([
            "patchbay", "commit", "-m", "Balance", "--version", "1.0.1", "--type", "hotfix",
            "--tag", "units", "--tag", "balance",
        ])
        .unwrap();
        if let Command::Commit(args) = cli.command {
            assert_eq!(args.message, "Balance");
            assert_eq!(args.version, "1.0.1");
            assert_eq!(args.patch_type, "hotfix");
            assert_eq!(args.tags, vec!["units", "balance"]);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_commit_requires_version() {
        assert!(Cli::try_parse_from(["patchbay", "commit", "-m", "x"]).is_err());
    }

    #[test]
    fn parse_log_oneline() {
        let cli = Cli::try_parse_from(["patchbay", "log", "--oneline", "-n", "5"]).unwrap();
        if let Command::Log(args) = cli.command {
            assert!(args.oneline);
            assert_eq!(args.limit, 5);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_rollback() {
        let cli = Cli::try_parse_from(["patchbay", "rollback", "patch_1"]).unwrap();
        if let Command::Rollback(args) = cli.command {
            assert_eq!(args.patch, "patch_1");
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_global_options() {
        let cli = Cli::try_parse_from([
            "patchbay", "show", "patch_1", "--data-dir", "/srv/data", "--format", "json", "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.format, OutputFormat::Json));
        assert_eq!(cli.data_dir, Some(PathBuf::from("/srv/data")));
    }

    #[test]
    fn parse_diff() {
        let cli = Cli::try_parse_from(["patchbay", "diff", "a.json", "b.json"]).unwrap();
        if let Command::Diff(args) = cli.command {
            assert_eq!(args.old, PathBuf::from("a.json"));
            assert_eq!(args.new, PathBuf::from("b.json"));
        } else { panic!("wrong command"); }
    }
}
