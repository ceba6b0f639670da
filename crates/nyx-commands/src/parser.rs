//! The input grammar: `<prefix><tag> <command> <args...>`.

/// Structured form of one prefixed message.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedCommandInfo {
    /// First token after the prefix.
    pub tag: String,
    /// Second token; empty when the message has a single token.
    pub command: String,
    /// Tokens after the command, joined with single spaces.
    pub args: String,
    /// Everything after the tag. Bot commands parse their arguments from here.
    pub raw_content: String,
}

/// Parse `text`, returning `None` when it does not start with `prefix`.
///
/// Tokens are separated by whitespace, so runs of spaces collapse. A bare
/// prefix yields empty fields rather than `None`.
///
/// ```
/// use nyx_commands::parse_command;
///
/// let info = parse_command("!music  play   https://x/y", '!').unwrap();
/// assert_eq!(info.tag, "music");
/// assert_eq!(info.command, "play");
/// assert_eq!(info.args, "https://x/y");
/// assert_eq!(info.raw_content, "play https://x/y");
/// assert!(parse_command("hello", '!').is_none());
/// ```
pub fn parse_command(text: &str, prefix: char) -> Option<ParsedCommandInfo> {
    let body = text.strip_prefix(prefix)?;
    let mut tokens = body.split_whitespace();

    let tag = tokens.next().unwrap_or_default().to_string();
    let rest: Vec<&str> = tokens.collect();
    let raw_content = rest.join(" ");
    let command = rest.first().copied().unwrap_or_default().to_string();
    let args = rest.get(1..).map(|r| r.join(" ")).unwrap_or_default();

    Some(ParsedCommandInfo {
        tag,
        command,
        args,
        raw_content,
    })
}
