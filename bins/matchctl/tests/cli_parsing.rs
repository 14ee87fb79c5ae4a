//! CLI argument parsing tests for matchctl.
//!
//! These tests verify that command-line arguments are correctly parsed
//! without requiring a pipeline daemon or root privileges.

use assert_cmd::Command;
use predicates::prelude::*;

fn matchctl() -> Command {
    Command::new(env!("CARGO_BIN_EXE_matchctl"))
}

mod global_flags {
    use super::*;

    #[test]
    fn test_help() {
        matchctl()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains(
                "Match-action table configuration tool",
            ));
    }

    #[test]
    fn test_version() {
        matchctl()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("matchctl"));
    }

    #[test]
    fn test_invalid_subcommand() {
        matchctl()
            .arg("frobnicate")
            .assert()
            .failure()
            .stderr(predicate::str::contains("error"));
    }

    #[test]
    fn test_missing_subcommand() {
        matchctl().assert().failure();
    }

    #[test]
    fn test_family_requires_value() {
        matchctl().args(["-f"]).assert().failure();
    }

    #[test]
    fn test_family_rejects_non_numeric() {
        matchctl()
            .args(["-f", "net_mat", "get_tables"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("invalid value"));
    }
}

mod subcommands {
    use super::*;

    #[test]
    fn test_set_rule_help() {
        matchctl()
            .args(["set_rule", "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Set a rule"));
    }

    #[test]
    fn test_get_rules_help() {
        matchctl().args(["get_rules", "--help"]).assert().success();
    }

    #[test]
    fn test_create_help() {
        matchctl()
            .args(["create", "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Create a match action table"));
    }

    #[test]
    fn test_destroy_help() {
        matchctl().args(["destroy", "--help"]).assert().success();
    }

    #[test]
    fn test_set_port_help() {
        matchctl()
            .args(["set_port", "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Set port attributes"));
    }

    #[test]
    fn test_snake_case_names_are_canonical() {
        // The keyword grammar commands use snake_case names.
        matchctl().args(["lport_lookup", "--help"]).assert().success();
        matchctl()
            .args(["phys_port_lookup", "--help"])
            .assert()
            .success();
        matchctl()
            .args(["get_header_graph", "--help"])
            .assert()
            .success();
        matchctl().args(["get-tables", "--help"]).assert().failure();
    }
}

mod del_rule {
    use super::*;

    // del_rule is rejected locally; no family resolution, no traffic.
    #[test]
    fn test_del_rule_is_unsupported() {
        matchctl()
            .args(["-f", "24", "del_rule", "handle", "1", "table", "1"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("not supported"));
    }
}
