// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Command-line argument definitions

use clap::Parser;

/// AI-assisted UI component generation
#[derive(Parser, Debug)]
#[command(name = "atelier", version, about)]
pub struct Args {
    /// Natural-language description of the component to generate
    pub prompt: Option<String>,

    /// Model selector (matched against the capability table)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Suggest a project title for the prompt instead of generating code
    #[arg(long)]
    pub title: bool,

    /// Print a fun fact about a topic and exit
    #[arg(long, value_name = "TOPIC")]
    pub fun_fact: Option<String>,

    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parse_prompt() {
        let args = Args::parse_from(["atelier", "build a calculator"]);
        assert_eq!(args.prompt.as_deref(), Some("build a calculator"));
        assert!(args.model.is_none());
        assert!(!args.title);
    }

    #[test]
    fn test_args_parse_model() {
        let args = Args::parse_from(["atelier", "-m", "gpt-4o", "build a chart"]);
        assert_eq!(args.model.as_deref(), Some("gpt-4o"));
    }

    #[test]
    fn test_args_parse_fun_fact() {
        let args = Args::parse_from(["atelier", "--fun-fact", "rust"]);
        assert_eq!(args.fun_fact.as_deref(), Some("rust"));
        assert!(args.prompt.is_none());
    }

    #[test]
    fn test_args_parse_verbosity() {
        let args = Args::parse_from(["atelier", "-vv", "x"]);
        assert_eq!(args.verbose, 2);
    }
}
