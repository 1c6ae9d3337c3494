//! Parsing of `/packit`-style commands out of forge comments.

use serde::{Deserialize, Serialize};

/// Prefix used when no other prefix is configured.
pub const DEFAULT_COMMAND_PREFIX: &str = "/packit";

/// Command keywords recognized in comments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKeyword {
    Build,
    Test,
    ProductionBuild,
}

impl CommandKeyword {
    /// Canonical spelling after the prefix.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Build => "build",
            Self::Test => "test",
            Self::ProductionBuild => "production-build",
        }
    }

    /// Parses a command name, accepting the known aliases.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "build" | "copr-build" => Some(Self::Build),
            "test" => Some(Self::Test),
            "production-build" | "production_build" => Some(Self::ProductionBuild),
            _ => None,
        }
    }
}

impl std::fmt::Display for CommandKeyword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One command found in a comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedCommand {
    /// Which command was given.
    pub keyword: CommandKeyword,
    /// Tokens following the command name.
    pub args: Vec<String>,
}

impl ParsedCommand {
    /// The first argument, if any.
    pub fn first_arg(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }
}

/// Extract every command from `comment`, in line order.
///
/// A line qualifies when its first whitespace-separated token is exactly
/// `prefix` and a known command name follows. Further tokens become
/// arguments. Text that is not a command is ignored.
pub fn parse_commands(comment: &str, prefix: &str) -> Vec<ParsedCommand> {
    comment
        .lines()
        .filter_map(|line| parse_line(line, prefix))
        .collect()
}

fn parse_line(line: &str, prefix: &str) -> Option<ParsedCommand> {
    let mut tokens = line.split_whitespace();
    if tokens.next()? != prefix {
        return None;
    }
    let keyword = CommandKeyword::from_str(tokens.next()?)?;
    Some(ParsedCommand {
        keyword,
        args: tokens.map(str::to_string).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keywords(comment: &str) -> Vec<CommandKeyword> {
        parse_commands(comment, DEFAULT_COMMAND_PREFIX)
            .into_iter()
            .map(|c| c.keyword)
            .collect()
    }

    #[test]
    fn test_comments_without_commands() {
        let inputs = [
            "",
            " ",
            "   ",
            "some unrelated",
            "some\nmore\nunrelated\ntext",
            "even\nsome → unicode",
            " stuff",
            " \n ",
            "x ",
            "we should rerun it with /packit build later",
            "\n2nd line\n\n4th line",
            "1st line\n\t\n\t\t\n4th line\n",
        ];
        for input in inputs {
            assert!(keywords(input).is_empty(), "unexpected command in {input:?}");
        }
    }

    #[test]
    fn test_comments_with_single_build_command() {
        let inputs = [
            "/packit build",
            "/packit build ",
            "/packit  build ",
            " /packit build",
            " /packit build ",
            "asd\n/packit build\n",
            "asd\n /packit build \n",
            "Should be fixed now, let's\n /packit build\n it.",
        ];
        for input in inputs {
            assert_eq!(keywords(input), vec![CommandKeyword::Build], "input {input:?}");
        }
    }

    #[test]
    fn test_prefix_alone_or_unknown_command() {
        assert!(keywords("/packit").is_empty());
        assert!(keywords("/packit deploy").is_empty());
        assert!(keywords("/packitbuild").is_empty());
    }

    #[test]
    fn test_arguments_and_multiple_lines() {
        let commands = parse_commands(
            "/packit test fedora-35-x86_64\n/packit production-build\n",
            DEFAULT_COMMAND_PREFIX,
        );
        assert_eq!(commands.len(), 2);
        assert_eq!(commands[0].keyword, CommandKeyword::Test);
        assert_eq!(commands[0].first_arg(), Some("fedora-35-x86_64"));
        assert_eq!(commands[1].keyword, CommandKeyword::ProductionBuild);
        assert!(commands[1].args.is_empty());
    }

    #[test]
    fn test_aliases_and_custom_prefix() {
        assert_eq!(keywords("/packit copr-build"), vec![CommandKeyword::Build]);
        assert_eq!(
            keywords("/packit production_build"),
            vec![CommandKeyword::ProductionBuild]
        );
        let commands = parse_commands("/packit-stg test", "/packit-stg");
        assert_eq!(commands[0].keyword, CommandKeyword::Test);
        assert!(parse_commands("/packit test", "/packit-stg").is_empty());
    }
}
