//! Interactive read loop.
//!
//! One line is routed to completion before the next is read; a routing
//! error is printed and the loop continues. Only the exit tokens, EOF,
//! or an interrupt end the session.

use crate::router::Router;
use anyhow::Result;
use astrid_common::display;
use owo_colors::OwoColorize;
use std::io::{self, BufRead, Write};

const EXIT_TOKENS: &[&str] = &["exit", "quit", "q"];

fn is_exit_token(input: &str) -> bool {
    EXIT_TOKENS.iter().any(|t| input.eq_ignore_ascii_case(t))
}

/// Run the interactive session until an exit token or EOF.
pub fn run(router: &mut Router) -> Result<()> {
    println!("{}", display::greeting());

    let stdin = io::stdin();
    loop {
        print!("{}", display::prompt(router.mode()));
        io::stdout().flush()?;

        let mut line = String::new();
        let read = stdin.lock().read_line(&mut line)?;
        if read == 0 {
            // EOF or interrupted read
            println!("\ngoodbye");
            break;
        }

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if is_exit_token(line) {
            println!("goodbye");
            break;
        }

        // A tool crash or any other routing error survives the session.
        if let Err(e) = router.route(line) {
            println!("{} {:#}", "✗".red(), e);
        }
    }
    Ok(())
}

/// Route a single command line (CLI invocation with arguments).
pub fn run_once(router: &mut Router, line: &str) {
    if let Err(e) = router.route(line) {
        println!("{} {:#}", "✗".red(), e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_tokens() {
        assert!(is_exit_token("exit"));
        assert!(is_exit_token("QUIT"));
        assert!(is_exit_token("q"));
        assert!(!is_exit_token("quit now"));
        assert!(!is_exit_token(":bash"));
    }
}
