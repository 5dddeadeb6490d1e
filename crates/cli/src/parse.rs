//! `clap::ArgMatches` -> [`kg_executor::Command`].

use clap::ArgMatches;
use kg_core::{BulletKind, KgError, KgResult};
use kg_executor::Command;

pub fn matches_to_command(matches: &ArgMatches) -> KgResult<Command> {
    let (name, sub) = matches
        .subcommand()
        .ok_or_else(|| KgError::input("no subcommand given"))?;

    match name {
        "context" => Ok(Command::Context {
            query: required_string(sub, "query")?,
            session_id: sub.get_one::<String>("session-id").cloned(),
            rerank_query: sub.get_one::<String>("rerank-query").cloned(),
            k: parse_usize_opt(sub, "k")?,
            char_budget: parse_usize_opt(sub, "char-budget")?,
        }),
        "search" => Ok(Command::Search {
            query: required_string(sub, "query")?,
            limit: parse_usize_opt(sub, "limit")?,
        }),
        "show" => Ok(Command::Show { slug: required_string(sub, "slug")? }),
        "add-bullet" => Ok(Command::AddBullet {
            slug: required_string(sub, "slug")?,
            text: required_string(sub, "text")?,
            kind: match sub.get_one::<String>("kind") {
                Some(s) => Some(
                    BulletKind::parse(s).ok_or_else(|| KgError::input(format!("unknown bullet kind: {s}")))?,
                ),
                None => None,
            },
        }),
        "mark-reviewed" => Ok(Command::MarkReviewed { slug: required_string(sub, "slug")? }),
        "status" => Ok(Command::Status),
        "reindex" => Ok(Command::Reindex),
        "calibrate" => Ok(Command::Calibrate),
        other => Err(KgError::input(format!("unknown subcommand: {other}"))),
    }
}

fn required_string(matches: &ArgMatches, id: &str) -> KgResult<String> {
    matches
        .get_one::<String>(id)
        .cloned()
        .ok_or_else(|| KgError::input(format!("missing required argument: {id}")))
}

fn parse_usize_opt(matches: &ArgMatches, id: &str) -> KgResult<Option<usize>> {
    match matches.get_one::<String>(id) {
        Some(s) => s
            .parse::<usize>()
            .map(Some)
            .map_err(|_| KgError::input(format!("--{id} must be a non-negative integer"))),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::build_cli;

    #[test]
    fn context_parses_optional_flags() {
        let matches = build_cli()
            .try_get_matches_from(["kg", "context", "rust ownership", "--k", "5"])
            .unwrap();
        let command = matches_to_command(&matches).unwrap();
        match command {
            Command::Context { query, k, .. } => {
                assert_eq!(query, "rust ownership");
                assert_eq!(k, Some(5));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn add_bullet_rejects_unknown_kind() {
        let matches = build_cli()
            .try_get_matches_from(["kg", "add-bullet", "t", "text", "--kind", "bogus"])
            .unwrap();
        assert!(matches_to_command(&matches).is_err());
    }

    #[test]
    fn non_numeric_limit_is_an_input_error() {
        let matches = build_cli()
            .try_get_matches_from(["kg", "search", "q", "--limit", "nope"])
            .unwrap();
        assert!(matches_to_command(&matches).is_err());
    }
}
