//! Items shared between the trivia server and the companion client.
//!
//! The wire protocol is line-oriented UTF-8 text: every message is terminated
//! by `\n` and parsing relies solely on line boundaries. This crate holds the
//! default endpoint, the client command set, and the canonical help text so
//! both binaries agree on them.

/// Default address the server binds to and the client connects to.
pub const DEFAULT_HOST: &str = "127.0.0.1";
/// Default TCP port for the trivia protocol.
pub const DEFAULT_PORT: u16 = 12345;

/// Help text sent in response to `/help`.
pub const HELP_TEXT: &str = "Commands:\n\
/join [room] - Join a quiz room\n\
/listrooms - Show available rooms\n\
/leaderboard - Show top scores\n\
/logout - Exit";

/// A parsed client command line.
///
/// Commands are matched on the first whitespace-delimited token. The `/join`
/// argument is everything after that token, trimmed, so room names may
/// contain spaces (e.g. `Operating Systems`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/help`
    Help,
    /// `/join <room>` with a non-empty room argument
    Join(String),
    /// `/join` with the room argument missing
    JoinMissingRoom,
    /// `/listrooms`
    ListRooms,
    /// `/leaderboard`
    Leaderboard,
    /// `/logout`
    Logout,
    /// Anything else
    Unknown,
}

impl Command {
    /// Parses one input line into a command.
    ///
    /// The line is trimmed first; callers are expected to skip blank lines
    /// before calling this.
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let (head, rest) = match line.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (line, ""),
        };

        match head {
            "/help" => Command::Help,
            "/join" => {
                if rest.is_empty() {
                    Command::JoinMissingRoom
                } else {
                    Command::Join(rest.to_string())
                }
            }
            "/listrooms" => Command::ListRooms,
            "/leaderboard" => Command::Leaderboard,
            "/logout" => Command::Logout,
            _ => Command::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(Command::parse("/help"), Command::Help);
        assert_eq!(Command::parse("/listrooms"), Command::ListRooms);
        assert_eq!(Command::parse("/leaderboard"), Command::Leaderboard);
        assert_eq!(Command::parse("/logout"), Command::Logout);
    }

    #[test]
    fn test_parse_join_with_room() {
        assert_eq!(
            Command::parse("/join Algorithms"),
            Command::Join("Algorithms".to_string())
        );
    }

    #[test]
    fn test_parse_join_room_with_spaces() {
        assert_eq!(
            Command::parse("/join Operating Systems"),
            Command::Join("Operating Systems".to_string())
        );
    }

    #[test]
    fn test_parse_join_missing_room() {
        assert_eq!(Command::parse("/join"), Command::JoinMissingRoom);
        assert_eq!(Command::parse("/join   "), Command::JoinMissingRoom);
    }

    #[test]
    fn test_parse_trims_surrounding_whitespace() {
        assert_eq!(Command::parse("  /help  "), Command::Help);
        assert_eq!(
            Command::parse("\t/join  Data Structures \r"),
            Command::Join("Data Structures".to_string())
        );
    }

    #[test]
    fn test_parse_unknown() {
        assert_eq!(Command::parse("/quit"), Command::Unknown);
        assert_eq!(Command::parse("hello"), Command::Unknown);
        assert_eq!(Command::parse("/helpme"), Command::Unknown);
    }
}
