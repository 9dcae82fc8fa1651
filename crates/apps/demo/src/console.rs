//! Text front end for the coordinator.

use std::fmt::Write as _;
use std::str::FromStr;

use session::{DatasetSessionCoordinator, Operation, Outcome, SkipReason};

pub const HELP: &str = "\
commands:
  add       add the next sample dataset to the map
  update    relabel the dataset and give it a random color
  replace   swap the dataset for the other sample
  display   show the dataset with its data (alias: get)
  remove    remove the dataset from the map
  close     close the dataset view
  status    readiness, sample order, map contents and counters
  help      this text
  quit      exit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Op(Operation),
    Status,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let cmd = match s.trim().to_ascii_lowercase().as_str() {
            "add" => Command::Op(Operation::Add),
            "update" => Command::Op(Operation::Update),
            "replace" => Command::Op(Operation::Replace),
            "display" | "get" => Command::Op(Operation::Display),
            "remove" => Command::Op(Operation::Remove),
            "close" => Command::Op(Operation::CloseInspection),
            "status" => Command::Status,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => return Err(format!("unknown command: {other:?} (try `help`)")),
        };
        Ok(cmd)
    }
}

/// Runs one operation and renders what the user should see.
pub fn run_op(coordinator: &mut DatasetSessionCoordinator, op: Operation) -> String {
    match coordinator.execute(op) {
        Ok(Outcome::Applied) => match (op, coordinator.inspected()) {
            (Operation::Display, Some(full)) => match full.to_pretty_json() {
                Ok(json) => json,
                Err(e) => format!("{op}: cannot render dataset: {e}"),
            },
            (Operation::CloseInspection, _) => "Dataset view closed.".to_string(),
            _ => format!("{op}: done. {}", listing(coordinator)),
        },
        Ok(Outcome::Skipped(SkipReason::NotReady(readiness))) => {
            format!("Controls disabled. {readiness}")
        }
        Ok(Outcome::Skipped(reason)) => reason.to_string(),
        Err(e) => format!("Error: {e}"),
    }
}

pub fn listing(coordinator: &DatasetSessionCoordinator) -> String {
    let datasets = coordinator.datasets();
    if datasets.is_empty() {
        return "Map is empty.".to_string();
    }
    let items: Vec<String> = datasets
        .iter()
        .map(|d| format!("{} {:?} {}", d.id, d.label, d.color))
        .collect();
    format!("On map: {}", items.join(", "))
}

pub fn status(coordinator: &DatasetSessionCoordinator) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "readiness: {}", coordinator.readiness());
    if let Some(container) = coordinator.container() {
        let _ = writeln!(out, "map: mounted in {container:?}");
    }
    if let Some(pair) = coordinator.pair() {
        let _ = writeln!(
            out,
            "samples: next {} / alternate {}",
            pair.next().id,
            pair.alternate().id
        );
    }
    let _ = writeln!(out, "{}", listing(coordinator));
    if let Some(full) = coordinator.inspected() {
        let _ = writeln!(out, "displaying: {}", full.id());
    }
    if let Some(last) = coordinator.events().events().last() {
        let _ = writeln!(out, "last event: #{} {}: {}", last.seq, last.kind, last.message);
    }
    let _ = write!(out, "{}", coordinator.metrics().snapshot());
    out
}
