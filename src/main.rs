// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tidemark-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tidemark and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Tidemark CLI: inspect and maintain on-disk history stores.
//!
//! Live sessions are driven through the library's coordinator; this binary only reads and
//! trims the per-scope store files.

use std::error::Error;
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};

use tidemark::config::HistoryConfig;
use tidemark::coordinator::CallFilter;
use tidemark::model::{NodeName, Scope, StoreScope};
use tidemark::query::{self, ListRange, RenderOptions, SearchMode, DEFAULT_FUZZY_THRESHOLD};
use tidemark::store::{store_path, DurableStore};

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} [<options>] list [--last <n> | --range <from>:<to>] [--all] [--dates]\n  {program} [<options>] search <term> [-i | --fuzzy | --regex] [--all] [--dates]\n  {program} [<options>] clear [--range <from>:<to> | --keep <n>]\n  {program} [<options>] status\n  {program} schema\n\nOptions:\n  --config <file>      JSON history configuration\n  --store-dir <dir>    override the store directory\n  --scope <scope>      private, shared or pinned:<node>\n  --node <name>        node name (private scope)\n\nIndices are 1-based, oldest first; negative indices count back from the most recent entry.\nSet TIDEMARK_LOG (e.g. `debug`) for diagnostics on stderr."
    );
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CliCommand {
    List,
    Search,
    Clear,
    Status,
    Schema,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CliSearchMode {
    CaseInsensitive,
    Fuzzy,
    Regex,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct CliOptions {
    command: Option<CliCommand>,
    config: Option<String>,
    store_dir: Option<String>,
    scope: Option<Scope>,
    node: Option<String>,
    last: Option<usize>,
    range: Option<(i64, i64)>,
    keep: Option<usize>,
    term: Option<String>,
    search_mode: Option<CliSearchMode>,
    all: bool,
    dates: bool,
}

fn set_once<T>(slot: &mut Option<T>, value: T) -> Result<(), ()> {
    if slot.is_some() {
        return Err(());
    }
    *slot = Some(value);
    Ok(())
}

fn parse_range(raw: &str) -> Result<(i64, i64), ()> {
    let (from, to) = raw.split_once(':').ok_or(())?;
    let from = from.trim().parse().map_err(|_| ())?;
    let to = to.trim().parse().map_err(|_| ())?;
    Ok((from, to))
}

fn parse_options(mut args: impl Iterator<Item = String>) -> Result<CliOptions, ()> {
    let mut options = CliOptions::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => set_once(&mut options.config, args.next().ok_or(())?)?,
            "--store-dir" => set_once(&mut options.store_dir, args.next().ok_or(())?)?,
            "--scope" => {
                let scope = args.next().ok_or(())?.parse().map_err(|_| ())?;
                set_once(&mut options.scope, scope)?;
            }
            "--node" => set_once(&mut options.node, args.next().ok_or(())?)?,
            "--last" => {
                let n = args.next().ok_or(())?.parse().map_err(|_| ())?;
                set_once(&mut options.last, n)?;
            }
            "--range" => set_once(&mut options.range, parse_range(&args.next().ok_or(())?)?)?,
            "--keep" => {
                let n = args.next().ok_or(())?.parse().map_err(|_| ())?;
                set_once(&mut options.keep, n)?;
            }
            "-i" => set_once(&mut options.search_mode, CliSearchMode::CaseInsensitive)?,
            "--fuzzy" => set_once(&mut options.search_mode, CliSearchMode::Fuzzy)?,
            "--regex" => set_once(&mut options.search_mode, CliSearchMode::Regex)?,
            "--all" => {
                if options.all {
                    return Err(());
                }
                options.all = true;
            }
            "--dates" => {
                if options.dates {
                    return Err(());
                }
                options.dates = true;
            }
            // A lone `-` or a negative number is a search term, not a flag.
            _ if arg.starts_with('-') && arg.len() > 1 && arg.parse::<i64>().is_err() => {
                return Err(())
            }
            _ => match options.command {
                None => {
                    let command = match arg.as_str() {
                        "list" => CliCommand::List,
                        "search" => CliCommand::Search,
                        "clear" => CliCommand::Clear,
                        "status" => CliCommand::Status,
                        "schema" => CliCommand::Schema,
                        _ => return Err(()),
                    };
                    options.command = Some(command);
                }
                Some(CliCommand::Search) => set_once(&mut options.term, arg)?,
                Some(_) => return Err(()),
            },
        }
    }

    let command = options.command.ok_or(())?;
    let listing_flags = options.last.is_some() || options.all || options.dates;
    let valid = match command {
        CliCommand::List => options.keep.is_none() && !(options.last.is_some() && options.range.is_some()),
        CliCommand::Search => {
            options.term.is_some()
                && options.last.is_none()
                && options.range.is_none()
                && options.keep.is_none()
        }
        CliCommand::Clear => !listing_flags && !(options.keep.is_some() && options.range.is_some()),
        CliCommand::Status | CliCommand::Schema => {
            !listing_flags && options.range.is_none() && options.keep.is_none()
        }
    };
    if !valid || (command != CliCommand::Search && options.search_mode.is_some()) {
        return Err(());
    }

    Ok(options)
}

fn resolve_store_scope(
    config: &HistoryConfig,
    node: Option<&str>,
) -> Result<StoreScope, Box<dyn Error>> {
    Ok(match &config.scope {
        Scope::Shared => StoreScope::Shared,
        Scope::Pinned { node } => StoreScope::Pinned {
            node: NodeName::new(node)?,
        },
        Scope::Private => {
            let Some(node) = node else {
                return Err("private scope needs --node".into());
            };
            StoreScope::Private {
                node: NodeName::new(node)?,
            }
        }
    })
}

fn load_config(options: &CliOptions) -> Result<HistoryConfig, Box<dyn Error>> {
    let mut config = match &options.config {
        Some(path) => HistoryConfig::load(Path::new(path))?,
        None => HistoryConfig::default(),
    };
    if let Some(scope) = &options.scope {
        config.scope = scope.clone();
    }
    if let Some(dir) = &options.store_dir {
        config.store_dir = Some(PathBuf::from(dir));
    }
    config.validate()?;
    Ok(config)
}

fn color_enabled() -> bool {
    io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none()
}

fn run(options: CliOptions) -> Result<(), Box<dyn Error>> {
    let command = options.command.unwrap_or(CliCommand::List);
    let stdout = io::stdout();
    let mut out = stdout.lock();

    if command == CliCommand::Schema {
        let schema = schemars::schema_for!(HistoryConfig);
        writeln!(out, "{}", serde_json::to_string_pretty(&schema)?)?;
        return Ok(());
    }

    let config = load_config(&options)?;
    let scope = resolve_store_scope(&config, options.node.as_deref())?;
    let path = store_path(&config.resolved_store_dir(), &scope);
    let exists = path.exists();

    if command == CliCommand::Status {
        let size = if exists {
            DurableStore::open(&path, config.durability)?.size()
        } else {
            0
        };
        writeln!(out, "scope:             {}", config.scope)?;
        writeln!(out, "store:             {}", path.display())?;
        writeln!(out, "entries:           {size}")?;
        writeln!(out, "limit:             {}", config.effective_limit())?;
        writeln!(out, "navigation buffer: {}", config.navigation_buffer_size)?;
        writeln!(out, "persists bindings: {}", config.scope.persists_bindings())?;
        return Ok(());
    }

    if !exists {
        tracing::debug!(path = ?path, "no history store yet");
        if command == CliCommand::Clear {
            writeln!(out, "removed 0 entries")?;
        }
        return Ok(());
    }
    let mut store = DurableStore::open(&path, config.durability)?;
    let filter = CallFilter::from_config(&config);

    match command {
        CliCommand::List | CliCommand::Search => {
            let entries = if options.all {
                store.entries()
            } else {
                filter.visible(store.entries(), config.own_calls)
            };
            let listing = if command == CliCommand::List {
                let range = match (options.last, options.range) {
                    (Some(n), _) => ListRange::Last(n),
                    (None, Some((from, to))) => ListRange::Span { from, to },
                    (None, None) => ListRange::All,
                };
                query::list(&entries, range)?
            } else {
                let mode = match options.search_mode {
                    None => SearchMode::Exact,
                    Some(CliSearchMode::CaseInsensitive) => SearchMode::CaseInsensitive,
                    Some(CliSearchMode::Regex) => SearchMode::Regex {
                        case_insensitive: false,
                    },
                    Some(CliSearchMode::Fuzzy) => SearchMode::Fuzzy {
                        threshold: DEFAULT_FUZZY_THRESHOLD,
                    },
                };
                query::search(&entries, options.term.as_deref().unwrap_or_default(), mode)?
            };

            let render = RenderOptions {
                dates: options.dates,
                color: color_enabled(),
            };
            for line in query::render_lines(&listing, render) {
                writeln!(out, "{line}")?;
            }
        }
        CliCommand::Clear => {
            let removed = match (options.keep, options.range) {
                (Some(n), _) => store.evict_oldest(store.size().saturating_sub(n))?,
                (None, Some((from, to))) => {
                    let entries = filter.visible(store.entries(), config.own_calls);
                    let keys: Vec<_> = query::list(&entries, ListRange::Span { from, to })?
                        .into_iter()
                        .map(|listed| listed.entry.key())
                        .collect();
                    let mut removed = 0;
                    for key in keys {
                        if store.delete(key)? {
                            removed += 1;
                        }
                    }
                    removed
                }
                (None, None) => store.delete_all()?,
            };
            tracing::info!(removed, path = ?path, "history trimmed");
            writeln!(out, "removed {removed} entries")?;
        }
        CliCommand::Status | CliCommand::Schema => {}
    }

    store.close()?;
    Ok(())
}

fn main() {
    tidemark::logging::init();

    let result = (|| -> Result<(), Box<dyn Error>> {
        let mut args = std::env::args();
        let program = args.next().unwrap_or_else(|| "tidemark".to_owned());

        let options = match parse_options(args) {
            Ok(options) => options,
            Err(()) => {
                print_usage(&program);
                std::process::exit(2);
            }
        };

        run(options)
    })();

    if let Err(err) = result {
        eprintln!("tidemark: {err}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use tidemark::config::HistoryConfig;
    use tidemark::model::{NodeName, Scope, StoreScope};

    use super::{parse_options, resolve_store_scope, CliCommand, CliOptions, CliSearchMode};

    fn parse(args: &[&str]) -> Result<CliOptions, ()> {
        parse_options(args.iter().map(|arg| (*arg).to_owned()))
    }

    #[test]
    fn requires_a_command() {
        parse(&[]).unwrap_err();
        parse(&["--dates"]).unwrap_err();
        parse(&["frobnicate"]).unwrap_err();
    }

    #[test]
    fn parses_list_with_range() {
        let options = parse(&["--node", "app@host", "list", "--range", "2:-1", "--dates"])
            .expect("parse options");
        assert_eq!(options.command, Some(CliCommand::List));
        assert_eq!(options.node.as_deref(), Some("app@host"));
        assert_eq!(options.range, Some((2, -1)));
        assert!(options.dates);
    }

    #[test]
    fn parses_search_term_and_mode() {
        let options = parse(&["search", "--fuzzy", "Enum.mpa"]).expect("parse options");
        assert_eq!(options.command, Some(CliCommand::Search));
        assert_eq!(options.term.as_deref(), Some("Enum.mpa"));
        assert_eq!(options.search_mode, Some(CliSearchMode::Fuzzy));

        let options = parse(&["search", "-1"]).expect("negative numbers are terms");
        assert_eq!(options.term.as_deref(), Some("-1"));
    }

    #[test]
    fn parses_scope_spellings() {
        let options = parse(&["--scope", "pinned:app@host", "status"]).expect("parse options");
        assert_eq!(
            options.scope,
            Some(Scope::Pinned {
                node: "app@host".to_owned()
            })
        );
        parse(&["--scope", "cluster", "status"]).unwrap_err();
    }

    #[test]
    fn rejects_conflicting_flags() {
        parse(&["list", "--last", "3", "--range", "1:2"]).unwrap_err();
        parse(&["clear", "--keep", "3", "--range", "1:2"]).unwrap_err();
        parse(&["clear", "--dates"]).unwrap_err();
        parse(&["list", "-i"]).unwrap_err();
        parse(&["search"]).unwrap_err();
        parse(&["search", "a", "b"]).unwrap_err();
        parse(&["status", "--keep", "1"]).unwrap_err();
    }

    #[test]
    fn rejects_duplicate_flags() {
        parse(&["--node", "a", "--node", "b", "status"]).unwrap_err();
        parse(&["search", "x", "-i", "--fuzzy"]).unwrap_err();
        parse(&["list", "--all", "--all"]).unwrap_err();
    }

    #[test]
    fn private_scope_resolves_from_node_alone() {
        let config = HistoryConfig::default();
        assert_eq!(
            resolve_store_scope(&config, Some("app@host")).expect("private scope"),
            StoreScope::Private {
                node: NodeName::new("app@host").expect("node name")
            }
        );
        resolve_store_scope(&config, None).unwrap_err();
        parse(&["--session", "<0.1.0>", "status"]).unwrap_err();
    }

    #[test]
    fn rejects_malformed_values() {
        parse(&["list", "--last", "many"]).unwrap_err();
        parse(&["list", "--range", "3"]).unwrap_err();
        parse(&["list", "--last"]).unwrap_err();
    }
}
