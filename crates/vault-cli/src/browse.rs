//! Interactive gallery: one line per command, reading from any async line source.

use std::path::PathBuf;

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use vault_core::{PendingFile, SortDirection};
use vault_sync::{Gallery, QueryStatus};

use crate::{print_add_report, print_page_table, print_pending, print_submit_result};

pub const HELP: &str = "Commands:
  next | prev              move one page
  page N                   jump to page N (1-based)
  sort FIELD [asc|desc]    change sort order
  size N                   change page size
  add PATH...              select files
  remove N                 drop selected file N
  clear                    drop all selected files
  upload                   upload the selection
  refresh                  reload the current page
  help | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowseCommand {
    Next,
    Previous,
    /// Zero-based
    Page(u32),
    Sort {
        field: String,
        direction: SortDirection,
    },
    Size(u32),
    Add(Vec<PathBuf>),
    Remove(usize),
    Clear,
    Upload,
    Refresh,
    Help,
    Quit,
}

fn parse_number<T: std::str::FromStr>(arg: Option<&str>, usage: &str) -> Result<T, String> {
    arg.and_then(|raw| raw.parse().ok())
        .ok_or_else(|| format!("usage: {}", usage))
}

/// Parse one input line. Empty input parses to `None`.
pub fn parse_command(line: &str) -> Result<Option<BrowseCommand>, String> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };

    let command = match verb.to_lowercase().as_str() {
        "next" | "n" => BrowseCommand::Next,
        "prev" | "p" => BrowseCommand::Previous,
        "page" => {
            let number: u32 = parse_number(words.next(), "page N")?;
            if number == 0 {
                return Err("pages are numbered from 1".to_string());
            }
            BrowseCommand::Page(number - 1)
        }
        "sort" => {
            let field = words
                .next()
                .ok_or_else(|| "usage: sort FIELD [asc|desc]".to_string())?;
            let direction: SortDirection = words
                .next()
                .and_then(|d| d.parse().ok())
                .unwrap_or_default();
            BrowseCommand::Sort {
                field: field.to_string(),
                direction,
            }
        }
        "size" => BrowseCommand::Size(parse_number(words.next(), "size N")?),
        "add" => {
            let paths: Vec<PathBuf> = words.map(PathBuf::from).collect();
            if paths.is_empty() {
                return Err("usage: add PATH...".to_string());
            }
            BrowseCommand::Add(paths)
        }
        "remove" | "rm" => BrowseCommand::Remove(parse_number(words.next(), "remove N")?),
        "clear" => BrowseCommand::Clear,
        "upload" | "u" => BrowseCommand::Upload,
        "refresh" | "r" => BrowseCommand::Refresh,
        "help" | "?" => BrowseCommand::Help,
        "quit" | "q" | "exit" => BrowseCommand::Quit,
        other => return Err(format!("unknown command '{}', try 'help'", other)),
    };
    Ok(Some(command))
}

async fn show_page(gallery: &Gallery) {
    let pages = gallery.pages();
    if let Err(err) = pages.load().await {
        println!("Could not load products: {}", err);
    }
    let snapshot = pages.snapshot();
    if let QueryStatus::Error { message } = &snapshot.status {
        println!("{}", message);
    }
    if let Some(page) = &snapshot.page {
        print_page_table(page, &snapshot.key);
    }
}

fn add_paths(gallery: &Gallery, paths: &[PathBuf]) {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        match PendingFile::from_path(path) {
            Ok(file) => files.push(file),
            Err(err) => println!("Skipped {}: {}", path.display(), err),
        }
    }
    let report = gallery.uploads().add_files(files);
    print_add_report(&report);
    print_pending(&gallery.uploads().snapshot());
}

/// Run commands from `input` until `quit` or end of input.
pub async fn run<R>(gallery: &Gallery, input: R) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    show_page(gallery).await;
    println!("{}", HELP);

    while let Some(line) = lines.next_line().await? {
        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(message) => {
                println!("{}", message);
                continue;
            }
        };

        match command {
            BrowseCommand::Next => {
                if gallery.pages().next_page() {
                    show_page(gallery).await;
                } else {
                    println!("Already on the last page");
                }
            }
            BrowseCommand::Previous => {
                if gallery.pages().previous_page() {
                    show_page(gallery).await;
                } else {
                    println!("Already on the first page");
                }
            }
            BrowseCommand::Page(target) => {
                if gallery.pages().change_page(target) {
                    show_page(gallery).await;
                } else {
                    println!("No page {}", target + 1);
                }
            }
            BrowseCommand::Sort { field, direction } => {
                gallery.pages().set_sort(field, direction);
                show_page(gallery).await;
            }
            BrowseCommand::Size(size) => {
                if gallery.pages().set_page_size(size) {
                    show_page(gallery).await;
                } else {
                    println!("Page size must be greater than zero");
                }
            }
            BrowseCommand::Add(paths) => add_paths(gallery, &paths),
            BrowseCommand::Remove(index) => match gallery.uploads().remove_file(index) {
                Some(file) => {
                    println!("Removed {}", file.name());
                    print_pending(&gallery.uploads().snapshot());
                }
                None => println!("No selected file at {}", index),
            },
            BrowseCommand::Clear => {
                gallery.uploads().clear_pending();
                print_pending(&gallery.uploads().snapshot());
            }
            BrowseCommand::Upload => {
                let result = gallery.upload().await;
                print_submit_result(&result, &gallery.uploads().snapshot());
                if let Some(page) = gallery.pages().current_page() {
                    print_page_table(&page, &gallery.pages().key());
                }
            }
            BrowseCommand::Refresh => {
                gallery.pages().invalidate();
                show_page(gallery).await;
            }
            BrowseCommand::Help => println!("{}", HELP),
            BrowseCommand::Quit => break,
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_navigation() {
        assert_eq!(parse_command("next").unwrap(), Some(BrowseCommand::Next));
        assert_eq!(parse_command("  p ").unwrap(), Some(BrowseCommand::Previous));
        assert_eq!(parse_command("page 3").unwrap(), Some(BrowseCommand::Page(2)));
        assert_eq!(parse_command("").unwrap(), None);
        assert!(parse_command("page 0").is_err());
        assert!(parse_command("page two").is_err());
    }

    #[test]
    fn test_parse_sort_defaults_to_desc() {
        assert_eq!(
            parse_command("sort name ASC").unwrap(),
            Some(BrowseCommand::Sort {
                field: "name".to_string(),
                direction: SortDirection::Asc
            })
        );
        assert_eq!(
            parse_command("sort createdAt").unwrap(),
            Some(BrowseCommand::Sort {
                field: "createdAt".to_string(),
                direction: SortDirection::Desc
            })
        );
        assert!(parse_command("sort").is_err());
    }

    #[test]
    fn test_parse_selection_commands() {
        assert_eq!(
            parse_command("add cat.jpg dog.png").unwrap(),
            Some(BrowseCommand::Add(vec![
                PathBuf::from("cat.jpg"),
                PathBuf::from("dog.png")
            ]))
        );
        assert!(parse_command("add").is_err());
        assert_eq!(parse_command("rm 1").unwrap(), Some(BrowseCommand::Remove(1)));
        assert!(parse_command("remove -1").is_err());
        assert_eq!(parse_command("Upload").unwrap(), Some(BrowseCommand::Upload));
    }

    #[test]
    fn test_parse_unknown() {
        let err = parse_command("delete 4").unwrap_err();
        assert!(err.contains("delete"));
    }
}
