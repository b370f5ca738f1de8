fn main() {
    println!("Checkers — multi-game network server");
    println!();
    println!("Usage:");
    println!("  Start the server:   cargo run --bin server");
    println!("  Connect a client:   cargo run --bin client [host:port]");
    println!();
    println!("The server listens on port 5000 by default.");
    println!("Run two clients and have one send NEW, the other JOIN <id>, to start a game.");
}
