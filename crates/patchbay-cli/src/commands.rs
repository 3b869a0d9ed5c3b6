use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::Context;
use colored::Colorize;
use serde_json::Value;

use patchbay_diff::{compute, diff_documents, DiffLine, DocumentDiff};
use patchbay_sdk::{
    Change, PatchMeta, PatchType, RolloutConfig, RolloutCoordinator, SnapshotChange, CONFIG_FILE,
};
use patchbay_types::{format_path, ArrayItem, DiffEntry};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let json = matches!(cli.format, OutputFormat::Json);
    let open = || -> anyhow::Result<RolloutCoordinator> {
        let config = load_config(cli.config.as_deref(), cli.data_dir.clone())?;
        Ok(RolloutCoordinator::local(config))
    };
    match cli.command {
        Command::Diff(args) => cmd_diff(&args, json),
        Command::Queue(args) => cmd_queue(&open()?, args, json),
        Command::Commit(args) => cmd_commit(&open()?, args, json),
        Command::Rollback(args) => cmd_rollback(&open()?, args, json),
        Command::Log(args) => cmd_log(&open()?, args, json),
        Command::Show(args) => cmd_show(&open()?, args, json),
    }
}

fn load_config(path: Option<&Path>, data_dir: Option<PathBuf>) -> anyhow::Result<RolloutConfig> {
    let mut config = match path {
        Some(path) => RolloutConfig::load(path)?,
        None if Path::new(CONFIG_FILE).exists() => RolloutConfig::load(Path::new(CONFIG_FILE))?,
        None => RolloutConfig::default(),
    };
    if let Some(dir) = data_dir {
        config.data_dir = dir;
    }
    tracing::debug!(data_dir = %config.data_dir.display(), "loaded configuration");
    Ok(config)
}

fn print_json(value: &impl serde::Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// queue
// ---------------------------------------------------------------------------

fn cmd_queue(rollout: &RolloutCoordinator, args: QueueArgs, json: bool) -> anyhow::Result<()> {
    match args.action.unwrap_or(QueueAction::List) {
        QueueAction::List => {
            let items = rollout.queue()?;
            if json {
                return print_json(&items);
            }
            if items.is_empty() {
                println!("Queue is empty.");
            }
            for (i, item) in items.iter().enumerate() {
                print_queued(i, item);
            }
        }
        QueueAction::Show { index } => {
            let items = rollout.queue()?;
            let item = items
                .get(index)
                .with_context(|| format!("no queued change at index {index} (queue has {})", items.len()))?;
            if json {
                return print_json(item);
            }
            print_queued(index, item);
            print_document_diff(&diff_documents(item.old.as_ref(), item.new.as_ref()));
        }
        QueueAction::Remove { indices } => {
            let remaining = rollout.remove_many_queued(&indices)?;
            report_remaining(remaining, json)?;
        }
        QueueAction::Drop { target } => {
            let remaining = rollout.remove_queued_by_target(&target)?;
            report_remaining(remaining, json)?;
        }
    }
    Ok(())
}

fn print_queued(index: usize, item: &SnapshotChange) {
    let kind = compute(item.old.as_ref(), item.new.as_ref()).change_type;
    println!(
        "{:>3}  {:<7} {}/{}  {}  {}",
        index.to_string().dimmed(),
        kind.to_string().cyan(),
        item.category,
        item.target_id.bold(),
        item.field.yellow(),
        item.timestamp.format("%Y-%m-%d %H:%M").to_string().dimmed(),
    );
}

fn report_remaining(remaining: Vec<SnapshotChange>, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(&remaining);
    }
    println!(
        "{} Reverted. {} change(s) still queued.",
        "✓".green().bold(),
        remaining.len()
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// patches
// ---------------------------------------------------------------------------

fn cmd_commit(rollout: &RolloutCoordinator, args: CommitArgs, json: bool) -> anyhow::Result<()> {
    let patch_type: PatchType = args.patch_type.parse()?;
    let meta = PatchMeta {
        title: args.message,
        version: args.version,
        patch_type,
        tags: args.tags.into_iter().collect::<BTreeSet<_>>(),
    };
    let patch = rollout.commit(meta)?;
    if json {
        return print_json(&patch);
    }
    println!("{} Published {}", "✓".green().bold(), patch.id.yellow());
    println!("  Version: {}", patch.version.bold());
    println!("  Changes: {}", patch.len());
    Ok(())
}

fn cmd_rollback(rollout: &RolloutCoordinator, args: RollbackArgs, json: bool) -> anyhow::Result<()> {
    let patch = rollout.rollback(&args.patch)?;
    if json {
        return print_json(&patch);
    }
    println!(
        "{} Rolled back {} as {}",
        "✓".green().bold(),
        args.patch.yellow(),
        patch.id.yellow()
    );
    println!("  Version: {}", patch.version.bold());
    println!("  Reverted changes: {}", patch.len());
    Ok(())
}

fn cmd_log(rollout: &RolloutCoordinator, args: LogArgs, json: bool) -> anyhow::Result<()> {
    let patches: Vec<_> = rollout.patches()?.into_iter().take(args.limit).collect();
    if json {
        return print_json(&patches);
    }
    if patches.is_empty() {
        println!("No patches published.");
    }
    for patch in &patches {
        if args.oneline {
            println!("{} {} {}", patch.id.yellow(), patch.version.dimmed(), patch.title);
            continue;
        }
        println!(
            "{}  {}  ({})",
            patch.id.yellow().bold(),
            patch.version.bold(),
            patch.patch_type.to_string().green()
        );
        println!("  {}", patch.title);
        println!(
            "  {} | {} change(s)",
            patch.date.format("%Y-%m-%d %H:%M:%S").to_string().dimmed(),
            patch.len()
        );
        if !patch.tags.is_empty() {
            let tags: Vec<&str> = patch.tags.iter().map(String::as_str).collect();
            println!("  Tags: {}", tags.join(", ").cyan());
        }
    }
    Ok(())
}

fn cmd_show(rollout: &RolloutCoordinator, args: ShowArgs, json: bool) -> anyhow::Result<()> {
    let patch = rollout.patch(&args.patch)?;
    if json {
        return print_json(&patch);
    }
    println!(
        "Patch {} -- {} {} ({})",
        patch.id.yellow().bold(),
        patch.patch_type,
        patch.version.bold(),
        patch.date.to_rfc3339()
    );
    println!("  {}", patch.title);
    for change in &patch.changes {
        match change {
            Change::Slim(c) => {
                println!(
                    "  {} {}/{} {}",
                    c.change_type.to_string().cyan(),
                    c.category,
                    c.target_id.bold(),
                    c.field.yellow()
                );
                for entry in &c.diffs {
                    print_entry(entry);
                }
            }
            Change::Snapshot(c) => {
                println!(
                    "  {} {}/{} {} {}",
                    "snapshot".cyan(),
                    c.category,
                    c.target_id.bold(),
                    c.field.yellow(),
                    "(legacy)".dimmed()
                );
                print_document_diff(&diff_documents(c.old.as_ref(), c.new.as_ref()));
            }
        }
    }
    if args.diff {
        match &patch.diff {
            Some(diff) => println!("\n{diff}"),
            None => println!("\n{}", "No stored diff.".dimmed()),
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// diff
// ---------------------------------------------------------------------------

fn cmd_diff(args: &DiffArgs, json: bool) -> anyhow::Result<()> {
    let old = read_document(&args.old)?;
    let new = read_document(&args.new)?;
    let computed = compute(old.as_ref(), new.as_ref());
    if json {
        return print_json(&serde_json::json!({
            "change_type": computed.change_type,
            "diffs": computed.diffs,
        }));
    }
    println!("{}", computed.change_type.to_string().cyan().bold());
    for entry in &computed.diffs {
        print_entry(entry);
    }
    let document = diff_documents(old.as_ref(), new.as_ref());
    if !document.is_empty() {
        println!();
        print_document_diff(&document);
    }
    Ok(())
}

/// A missing file is an absent document.
fn read_document(path: &Path) -> anyhow::Result<Option<Value>> {
    if !path.exists() {
        return Ok(None);
    }
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let value = serde_json::from_str(&text)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;
    Ok(Some(value))
}

fn print_entry(entry: &DiffEntry) {
    let path = format_path(entry.path());
    let detail = match entry {
        DiffEntry::Edited { lhs, rhs, .. } => format!("{lhs} -> {rhs}"),
        DiffEntry::NewKey { rhs, .. } => format!("+ {rhs}"),
        DiffEntry::DeletedKey { lhs, .. } => format!("- {lhs}"),
        DiffEntry::ArrayElement { index, item, .. } => match item {
            ArrayItem::Edited { lhs, rhs } => format!("[{index}] {lhs} -> {rhs}"),
            ArrayItem::NewKey { rhs } => format!("[{index}] + {rhs}"),
            ArrayItem::DeletedKey { lhs } => format!("[{index}] - {lhs}"),
        },
    };
    println!("    {:<12} {} {}", entry.kind_label().dimmed(), path.bold(), detail);
}

fn print_document_diff(diff: &DocumentDiff) {
    println!(
        "  {} {}",
        format!("+{}", diff.additions()).green(),
        format!("-{}", diff.deletions()).red()
    );
    for hunk in &diff.hunks {
        println!(
            "{}",
            format!(
                "@@ -{},{} +{},{} @@",
                hunk.old_start, hunk.old_count, hunk.new_start, hunk.new_count
            )
            .cyan()
        );
        for line in &hunk.lines {
            match line {
                DiffLine::Context(t) => println!(" {t}"),
                DiffLine::Added(t) => println!("{}", format!("+{t}").green()),
                DiffLine::Removed(t) => println!("{}", format!("-{t}").red()),
            }
        }
    }
}
