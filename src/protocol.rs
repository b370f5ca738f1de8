//! Line framing, request tokenization and status message formatting. Lines
//! are `\r\n`-terminated ASCII; tokens are whitespace-separated.

use crate::board::Player;
use crate::error::GameError;

/// A parsed client request. `MOVE`'s four arguments and the `LIST SPECTATE`
/// variant are resolved here so the connection handler never re-tokenizes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    New,
    Join(String),
    Spectate(String),
    List { spectate: bool },
    Leave,
    Board,
    Move { src: (i32, i32), dst: (i32, i32) },
    Turn,
    Quit,
    Shutdown,
}

impl Command {
    pub fn parse(line: &str) -> Result<Command, GameError> {
        let mut tokens = line.split_whitespace();
        let cmd = tokens
            .next()
            .ok_or_else(|| GameError::protocol("invalid command"))?;

        match cmd.to_ascii_uppercase().as_str() {
            "NEW" => Ok(Command::New),
            "JOIN" => Ok(Command::Join(arg(&mut tokens, "game id")?.to_string())),
            "SPECTATE" => Ok(Command::Spectate(arg(&mut tokens, "game id")?.to_string())),
            "LIST" => {
                let spectate = matches!(tokens.next(), Some(t) if t.eq_ignore_ascii_case("SPECTATE"));
                Ok(Command::List { spectate })
            }
            "LEAVE" => Ok(Command::Leave),
            "BOARD" => Ok(Command::Board),
            "MOVE" => {
                let sx = int_arg(&mut tokens, "sx")?;
                let sy = int_arg(&mut tokens, "sy")?;
                let dx = int_arg(&mut tokens, "dx")?;
                let dy = int_arg(&mut tokens, "dy")?;
                Ok(Command::Move {
                    src: (sx, sy),
                    dst: (dx, dy),
                })
            }
            "TURN" => Ok(Command::Turn),
            "QUIT" => Ok(Command::Quit),
            "SHUTDOWN" => Ok(Command::Shutdown),
            _ => Err(GameError::protocol("invalid command")),
        }
    }
}

fn arg<'a>(
    tokens: &mut std::str::SplitWhitespace<'a>,
    name: &str,
) -> Result<&'a str, GameError> {
    tokens
        .next()
        .ok_or_else(|| GameError::protocol(format!("missing argument: {name}")))
}

fn int_arg(tokens: &mut std::str::SplitWhitespace<'_>, name: &str) -> Result<i32, GameError> {
    arg(tokens, name)?
        .parse::<i32>()
        .map_err(|_| GameError::protocol(format!("argument {name} must be an integer")))
}

/// `STATUS …` payload builders. Each returns a full line, without the
/// trailing `\r\n` (the transport adds that at the point of writing).
pub mod status {
    use super::Player;

    pub fn game_id(id: &str) -> String {
        format!("STATUS GAME_ID {id}")
    }

    pub fn board(wire: &str) -> String {
        format!("STATUS BOARD {wire}")
    }

    pub fn joined(player: Player) -> String {
        format!("STATUS JOINED {player}")
    }

    pub fn you_are(player: Player) -> String {
        format!("STATUS YOU_ARE {player}")
    }

    pub fn left(player: Player) -> String {
        format!("STATUS LEFT {player}")
    }

    pub fn turn(turn: &str) -> String {
        format!("STATUS TURN {turn}")
    }

    pub fn moved(src: (i32, i32), dst: (i32, i32)) -> String {
        format!("STATUS MOVED {} {} {} {}", src.0, src.1, dst.0, dst.1)
    }

    pub fn captured(loc: (i32, i32)) -> String {
        format!("STATUS CAPTURED {} {}", loc.0, loc.1)
    }

    pub fn king(loc: (i32, i32)) -> String {
        format!("STATUS KING {} {}", loc.0, loc.1)
    }

    pub fn winner(player: Player) -> String {
        format!("STATUS WINNER {player}")
    }

    pub fn list(spectate: bool, ids: &[String]) -> String {
        if spectate {
            format!("STATUS LIST SPECTATE {}", ids.join(" "))
        } else {
            format!("STATUS LIST {}", ids.join(" "))
        }
        .trim_end()
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_move_arguments() {
        let cmd = Command::parse("MOVE 0 2 1 3").unwrap();
        assert_eq!(
            cmd,
            Command::Move {
                src: (0, 2),
                dst: (1, 3)
            }
        );
    }

    #[test]
    fn parses_list_spectate() {
        let cmd = Command::parse("LIST SPECTATE").unwrap();
        assert_eq!(cmd, Command::List { spectate: true });
    }

    #[test]
    fn rejects_unknown_command() {
        assert!(Command::parse("FOO").is_err());
    }

    #[test]
    fn rejects_missing_move_arguments() {
        assert!(Command::parse("MOVE 0 2").is_err());
    }
}
