//! Tests for the map subcommands.

use super::parse;
use crate::cli::{Cli, CliCommand, MapAction};
use clap::Parser;
use std::path::Path;

#[test]
fn cli_parse_map_add() {
    match parse(&["abk", "map", "add", "/home/me", "/mnt/backup/me"]) {
        CliCommand::Map {
            action: MapAction::Add { source, target },
        } => {
            assert_eq!(source, Path::new("/home/me"));
            assert_eq!(target, Path::new("/mnt/backup/me"));
        }
        _ => panic!("expected Map Add"),
    }
}

#[test]
fn cli_parse_map_list() {
    assert!(matches!(
        parse(&["abk", "map", "list"]),
        CliCommand::Map {
            action: MapAction::List
        }
    ));
}

#[test]
fn cli_parse_map_remove() {
    match parse(&["abk", "map", "remove", "3"]) {
        CliCommand::Map {
            action: MapAction::Remove { index },
        } => assert_eq!(index, 3),
        _ => panic!("expected Map Remove"),
    }
}

#[test]
fn cli_parse_map_remove_rejects_non_index() {
    let parsed = Cli::try_parse_from(["abk", "map", "remove", "first"]);
    assert!(parsed.is_err());
}
