pub const DEFAULT_SERVER_PORT: u16 = 9877;
pub const LISTEN_BACKLOG: u32 = 10;
pub const MAX_CHUNK: usize = 1024;
pub const LOG_FILE_NAME: &str = "serverlog.txt";

/// Lines that end a client session when typed verbatim, newline included.
pub const QUIT_COMMANDS: [&str; 6] = [
    "/quit\n",
    "/q\n",
    "/disconnect\n",
    "/dc\n",
    "/exit\n",
    "/ex\n",
];

pub fn is_quit_command(line: &str) -> bool {
    QUIT_COMMANDS.contains(&line)
}

/// Prefixes a typed line with the sender's name, the way it goes on the wire.
pub fn compose_message(username: &str, line: &str) -> String {
    format!("{}: {}", username, line)
}
