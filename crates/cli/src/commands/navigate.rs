//! Navigate Command
//!
//! Interactive session over stdin driving a [`Navigator`].

use std::io::Write;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use tokio::io::{AsyncBufReadExt, BufReader};
use url::Url;

use crate::client::FrameClient;
use crate::history::{GetFrameOptions, HistoryState, Navigator, Transition};
use crate::output::{
    print_error, print_frame, print_info, print_item, print_list, print_warning, HistoryDisplay,
    OutputFormat, RecordDisplay,
};

#[derive(Parser)]
pub struct NavigateArgs {
    /// Frame URL to start the session from
    pub url: String,
}

/// One line of input in a navigation session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavCommand {
    Back,
    Forward,
    Refresh,
    Reset,
    Click { button: u8, text: Option<String> },
    Open(String),
    Show,
    Log,
    Help,
    Quit,
}

impl NavCommand {
    /// Parse a command line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let command = match word {
            "" => return Ok(None),
            "back" | "b" => Self::Back,
            "forward" | "f" => Self::Forward,
            "refresh" | "r" => Self::Refresh,
            "reset" => Self::Reset,
            "show" | "s" => Self::Show,
            "log" | "l" => Self::Log,
            "help" | "?" => Self::Help,
            "quit" | "q" | "exit" => Self::Quit,
            "open" | "o" => {
                if rest.is_empty() {
                    return Err("usage: open <url>".to_string());
                }
                Self::Open(rest.to_string())
            }
            "click" | "c" => {
                let (index, text) = match rest.split_once(char::is_whitespace) {
                    Some((index, text)) => (index, Some(text.trim().to_string())),
                    None => (rest, None),
                };
                let button = index
                    .parse::<u8>()
                    .ok()
                    .filter(|b| *b > 0)
                    .ok_or_else(|| "usage: click <button> [text]".to_string())?;
                Self::Click {
                    button,
                    text: text.filter(|t| !t.is_empty()),
                }
            }
            other => return Err(format!("unknown command {:?}, try `help`", other)),
        };
        Ok(Some(command))
    }
}

/// Absolute URL for `open`: routes are taken relative to the session entry.
fn resolve_open(entry_url: &str, input: &str) -> Result<String> {
    if let Ok(url) = Url::parse(input) {
        return Ok(url.to_string());
    }
    Ok(Url::parse(entry_url)?.join(input)?.to_string())
}

fn show_current(state: &HistoryState, format: OutputFormat) {
    let Some(record) = state.current() else {
        print_warning("current history entry is missing");
        return;
    };
    print_item(&RecordDisplay::from(record.as_ref()), format);
    if matches!(format, OutputFormat::Table | OutputFormat::Plain) {
        print_frame(record);
    }
}

fn prompt(state: &HistoryState) {
    let back = if state.can_go_back() { "<" } else { " " };
    let forward = if state.can_go_forward() { ">" } else { " " };
    print!(
        "{}{} {}/{} {} ",
        back,
        forward,
        state.stack_index() + 1,
        state.stack().len(),
        "framedev>".bold()
    );
    let _ = std::io::stdout().flush();
}

fn print_help() {
    println!("  back | b                 replay the previous entry and move there");
    println!("  forward | f              replay the next entry and move there");
    println!("  refresh | r              replay the current entry in place");
    println!("  reset                    start over from the session entry URL");
    println!("  click | c <n> [text]     press button n, optionally with input text");
    println!("  open | o <url>           resolve a URL or route and push it");
    println!("  show | s                 print the current entry");
    println!("  log | l                  print the navigation stack");
    println!("  quit | q                 leave the session");
}

pub async fn execute(args: NavigateArgs, client: FrameClient, format: OutputFormat) -> Result<()> {
    let navigator = Navigator::open(client, &args.url).await?;
    print_info(&format!(
        "session started at {} (type `help` for commands)",
        args.url
    ));
    show_current(&navigator.snapshot(), format);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt(&navigator.snapshot());
        let Some(line) = lines.next_line().await? else {
            println!();
            break;
        };

        let command = match NavCommand::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                print_error(&e);
                continue;
            }
        };

        let result = match command {
            NavCommand::Back => navigator.back().await,
            NavCommand::Forward => navigator.forward().await,
            NavCommand::Refresh => navigator.refresh().await,
            NavCommand::Reset => navigator.reset().await,
            NavCommand::Click { button, text } => navigator.click(button, text).await,
            NavCommand::Open(input) => match resolve_open(&navigator.entry_url(), &input) {
                Ok(url) => navigator.get_frame(&url, GetFrameOptions::default()).await,
                Err(e) => {
                    print_error(&e.to_string());
                    continue;
                }
            },
            NavCommand::Show => {
                show_current(&navigator.snapshot(), format);
                continue;
            }
            NavCommand::Log => {
                print_list(&HistoryDisplay::rows(&navigator.snapshot()), format);
                continue;
            }
            NavCommand::Help => {
                print_help();
                continue;
            }
            NavCommand::Quit => break,
        };

        match result {
            Ok(Transition::Unchanged) => print_warning("nothing to do"),
            Ok(Transition::Discarded) => print_warning("superseded by a newer request"),
            Ok(_) => show_current(&navigator.snapshot(), format),
            Err(e) => print_error(&e.to_string()),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(NavCommand::parse("back").unwrap(), Some(NavCommand::Back));
        assert_eq!(NavCommand::parse("  f ").unwrap(), Some(NavCommand::Forward));
        assert_eq!(NavCommand::parse("reset").unwrap(), Some(NavCommand::Reset));
        assert_eq!(NavCommand::parse("q").unwrap(), Some(NavCommand::Quit));
        assert_eq!(NavCommand::parse("   ").unwrap(), None);
    }

    #[test]
    fn test_parse_click() {
        assert_eq!(
            NavCommand::parse("click 2").unwrap(),
            Some(NavCommand::Click {
                button: 2,
                text: None
            })
        );
        assert_eq!(
            NavCommand::parse("c 1 hello there").unwrap(),
            Some(NavCommand::Click {
                button: 1,
                text: Some("hello there".to_string())
            })
        );
        assert!(NavCommand::parse("click").is_err());
        assert!(NavCommand::parse("click 0").is_err());
        assert!(NavCommand::parse("click x").is_err());
    }

    #[test]
    fn test_parse_open_and_unknown() {
        assert_eq!(
            NavCommand::parse("open /foo").unwrap(),
            Some(NavCommand::Open("/foo".to_string()))
        );
        assert!(NavCommand::parse("open").is_err());
        assert!(NavCommand::parse("jump 3").is_err());
    }

    #[test]
    fn test_resolve_open() {
        let entry = "http://localhost:3000/";
        assert_eq!(
            resolve_open(entry, "/foo").unwrap(),
            "http://localhost:3000/foo"
        );
        assert_eq!(
            resolve_open(entry, "http://other.test/bar").unwrap(),
            "http://other.test/bar"
        );
    }
}
