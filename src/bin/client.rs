use clap::{ArgAction, Parser};
use checkers_core::logger::Logger;
use std::fmt;
use std::io::{self, Write as _};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "client",
    version,
    about = "Checkers server — terminal client",
    long_about = "Connects to a running checkers server and plays interactively.\n\
                  Commands:\n  \
                    new                        — start a new game\n  \
                    join <id> | spectate <id>  — attach to an existing game\n  \
                    list [spectate]            — list joinable/unfinished games\n  \
                    move <sx> <sy> <dx> <dy>   — move when it is your turn\n  \
                    board | turn | leave | quit"
)]
struct Args {
    /// Server address to connect to
    #[arg(default_value = "127.0.0.1:5000")]
    addr: String,

    /// Increase output verbosity (-v verbose, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

// ── CLIENT EVENTS (operational logging to stderr) ─────────────────────────────

enum ClientEvent<'a> {
    Connecting { addr: &'a str },
    Connected { addr: &'a str },
    Sending { cmd: &'a str },
    Received { raw: &'a str },
    Disconnected,
}

impl fmt::Display for ClientEvent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientEvent::Connecting { addr } => write!(f, "Connecting to {addr}…"),
            ClientEvent::Connected { addr } => write!(f, "Connected to {addr}"),
            ClientEvent::Sending { cmd } => write!(f, "→ {cmd}"),
            ClientEvent::Received { raw } => write!(f, "← {raw}"),
            ClientEvent::Disconnected => write!(f, "Connection closed by server"),
        }
    }
}

// ── USER INPUT ────────────────────────────────────────────────────────────────

/// A validated command ready to be sent over the wire.
enum Cmd {
    New,
    Join(String),
    Spectate(String),
    List { spectate: bool },
    Leave,
    Board,
    Move { src: (i32, i32), dst: (i32, i32) },
    Turn,
    Quit,
}

impl Cmd {
    fn parse(raw: &str) -> Result<Self, String> {
        let mut t = raw.split_whitespace();
        match t.next().unwrap_or("").to_ascii_uppercase().as_str() {
            "NEW" => Ok(Self::New),
            "JOIN" => Ok(Self::Join(t.next().ok_or("missing game id")?.to_string())),
            "SPECTATE" => Ok(Self::Spectate(t.next().ok_or("missing game id")?.to_string())),
            "LIST" => {
                let spectate = matches!(t.next(), Some(tok) if tok.eq_ignore_ascii_case("spectate"));
                Ok(Self::List { spectate })
            }
            "LEAVE" => Ok(Self::Leave),
            "BOARD" => Ok(Self::Board),
            "MOVE" => {
                let sx = parse_i32(&mut t, "sx")?;
                let sy = parse_i32(&mut t, "sy")?;
                let dx = parse_i32(&mut t, "dx")?;
                let dy = parse_i32(&mut t, "dy")?;
                Ok(Self::Move {
                    src: (sx, sy),
                    dst: (dx, dy),
                })
            }
            "TURN" => Ok(Self::Turn),
            "QUIT" => Ok(Self::Quit),
            "" => Err("empty input".into()),
            kw => Err(format!("unknown command '{kw}'")),
        }
    }

    /// Serialise to the wire format expected by the server.
    fn to_wire(&self) -> String {
        match self {
            Self::New => "NEW\n".to_string(),
            Self::Join(id) => format!("JOIN {id}\n"),
            Self::Spectate(id) => format!("SPECTATE {id}\n"),
            Self::List { spectate: true } => "LIST SPECTATE\n".to_string(),
            Self::List { spectate: false } => "LIST\n".to_string(),
            Self::Leave => "LEAVE\n".to_string(),
            Self::Board => "BOARD\n".to_string(),
            Self::Move { src, dst } => format!("MOVE {} {} {} {}\n", src.0, src.1, dst.0, dst.1),
            Self::Turn => "TURN\n".to_string(),
            Self::Quit => "QUIT\n".to_string(),
        }
    }
}

fn parse_i32<'a>(t: &mut impl Iterator<Item = &'a str>, name: &str) -> Result<i32, String> {
    t.next()
        .ok_or_else(|| format!("missing {name}"))?
        .parse::<i32>()
        .map_err(|_| format!("{name} must be an integer"))
}

// ── PROMPT ────────────────────────────────────────────────────────────────────

fn print_prompt() {
    print!("\n> ");
    io::stdout().flush().ok();
}

fn print_help() {
    println!("  Commands:");
    println!("    new                        — start a new game");
    println!("    join <id> | spectate <id>  — attach to an existing game");
    println!("    list [spectate]            — list joinable/unfinished games");
    println!("    move <sx> <sy> <dx> <dy>   — move when it is your turn");
    println!("    board | turn | leave | quit");
}

// ── MAIN ──────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let log = Logger::new(args.verbose);

    log.info(ClientEvent::Connecting { addr: &args.addr });

    let stream = match TcpStream::connect(&args.addr).await {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to connect to {}: {e}", args.addr);
            std::process::exit(1);
        }
    };

    log.info(ClientEvent::Connected { addr: &args.addr });
    print_help();

    let (reader, mut writer) = tokio::io::split(stream);
    let mut server_lines = BufReader::new(reader).lines();
    let mut stdin_lines = BufReader::new(tokio::io::stdin()).lines();

    print_prompt();

    loop {
        tokio::select! {
            // ── Server → Client ───────────────────────────────────────────────
            result = server_lines.next_line() => {
                let raw = match result {
                    Ok(Some(l)) => l,
                    _ => {
                        log.info(ClientEvent::Disconnected);
                        println!("\nDisconnected from server.");
                        break;
                    }
                };

                log.trace(ClientEvent::Received { raw: &raw });
                println!("\n{}", raw.trim());
                print_prompt();
            }

            // ── Stdin → Server ─────────────────────────────────────────────────
            result = stdin_lines.next_line() => {
                let raw = match result {
                    Ok(Some(l)) => l,
                    _ => {
                        println!("\nInput closed.");
                        break;
                    }
                };

                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    print_prompt();
                    continue;
                }
                if matches!(trimmed.to_ascii_uppercase().as_str(), "HELP" | "?") {
                    print_help();
                    print_prompt();
                    continue;
                }

                match Cmd::parse(trimmed) {
                    Ok(cmd) => {
                        let wire = cmd.to_wire();
                        log.verbose(ClientEvent::Sending { cmd: wire.trim_end() });
                        if writer.write_all(wire.as_bytes()).await.is_err() {
                            eprintln!("Failed to send command.");
                            break;
                        }
                        if matches!(cmd, Cmd::Quit) {
                            break;
                        }
                    }
                    Err(reason) => {
                        println!("  ? {reason}");
                        print_help();
                        print_prompt();
                    }
                }
            }
        }
    }
}
