//! Entity extraction
//!
//! Pulls the facts the reference resolver cares about (directory, files,
//! host, process) out of a command line and its output. Purely lexical.

use crate::context::{Entities, EntityClass, EntityValue};
use crate::platform::OsFamily;

/// Upper bound on file names remembered from one listing
const MAX_FILES: usize = 100;

const DIR_VERBS: &[&str] = &["cd", "pushd", "chdir"];
const LIST_VERBS: &[&str] = &["ls", "dir", "find", "tree"];
const FILE_VERBS: &[&str] = &[
    "cat", "rm", "cp", "mv", "touch", "zip", "unzip", "head", "tail", "less", "more", "del",
    "type", "copy", "move", "open", "nano", "vim", "code", "chmod", "stat", "wc",
];
const NETWORK_VERBS: &[&str] = &[
    "ping", "ssh", "curl", "wget", "traceroute", "tracert", "nslookup", "dig", "scp", "telnet",
];
const PROCESS_VERBS: &[&str] = &["kill", "pkill", "killall", "taskkill"];
const PROCESS_LIST_VERBS: &[&str] = &["ps", "top", "htop", "tasklist"];

/// What an executed command was about
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Extraction {
    pub kind: Option<String>,
    pub entities: Entities,
}

/// Derive a kind and entities from `command` and its captured `output`
pub fn extract(command: &str, output: Option<&str>, family: OsFamily) -> Extraction {
    let mut tokens = command.split_whitespace();
    let head = match tokens.next() {
        Some(h) => h.to_lowercase(),
        None => return Extraction::default(),
    };
    let args: Vec<&str> = tokens.collect();
    let operands: Vec<&str> = args.iter().copied().filter(|a| !is_flag(a, family)).collect();

    let mut entities = Entities::new();
    let verb = head.as_str();

    let kind = if DIR_VERBS.contains(&verb) {
        if let Some(dir) = operands.first() {
            entities.insert(EntityClass::Dir, EntityValue::from(*dir));
        }
        Some("directory")
    } else if LIST_VERBS.contains(&verb) {
        if let Some(dir) = operands.iter().find(|o| !o.contains(['*', '?'])) {
            entities.insert(EntityClass::Dir, EntityValue::from(*dir));
        }
        let files = output.map(listed_files).unwrap_or_default();
        if !files.is_empty() {
            entities.insert(EntityClass::Files, EntityValue::List(files));
        }
        Some("files")
    } else if FILE_VERBS.contains(&verb) {
        let files: Vec<String> = operands
            .iter()
            .filter(|o| !looks_like_mode(o))
            .map(|o| o.to_string())
            .collect();
        if !files.is_empty() {
            entities.insert(EntityClass::Files, EntityValue::List(files));
        }
        Some("files")
    } else if NETWORK_VERBS.contains(&verb) {
        if let Some(target) = operands.first() {
            entities.insert(EntityClass::Host, EntityValue::Text(host_of(target)));
        }
        Some("network")
    } else if PROCESS_VERBS.contains(&verb) {
        if let Some(process) = process_operand(verb, &args) {
            entities.insert(EntityClass::Process, EntityValue::Text(process));
        }
        Some("process")
    } else if PROCESS_LIST_VERBS.contains(&verb) {
        Some("process")
    } else {
        None
    };

    Extraction {
        kind: kind.map(str::to_string),
        entities,
    }
}

/// `/x` switches only exist on Windows; on POSIX they are paths
fn is_flag(token: &str, family: OsFamily) -> bool {
    token.starts_with('-')
        || (family == OsFamily::Windows && token.starts_with('/') && (2..=3).contains(&token.len()))
}

fn looks_like_mode(token: &str) -> bool {
    token.chars().all(|c| c.is_ascii_digit()) || token.contains('+') || token.contains('=')
}

/// File names from listing output, skipping `ls -l` totals and headers
fn listed_files(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with("total "))
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() >= 9 && fields[0].len() >= 10 {
                // long listing: permissions links owner group size month day time name...
                Some(fields[8..].join(" "))
            } else if fields.len() == 1 || !line.contains("  ") {
                Some(line.to_string())
            } else {
                None
            }
        })
        .filter(|name| name != "." && name != "..")
        .take(MAX_FILES)
        .collect()
}

/// Strip scheme, credentials, port and path from a network target
fn host_of(target: &str) -> String {
    let without_scheme = target.split("://").last().unwrap_or(target);
    let without_user = without_scheme.rsplit('@').next().unwrap_or(without_scheme);
    let host = without_user
        .split(['/', ':'])
        .next()
        .unwrap_or(without_user);
    host.to_string()
}

fn process_operand(verb: &str, args: &[&str]) -> Option<String> {
    if verb == "taskkill" {
        return args
            .windows(2)
            .find(|w| w[0].eq_ignore_ascii_case("/pid") || w[0].eq_ignore_ascii_case("/im"))
            .map(|w| w[1].to_string());
    }
    args.iter()
        .find(|a| !a.starts_with('-'))
        .map(|a| a.to_string())
}
