//! CLI argument parsing with clap derive macros.

use clap::{Parser, Subcommand};

const WEBDRIVER_HELP: &str = "WebDriver endpoint URL [default: http://localhost:9515]";

/// Browser-session monitor for web chat clients.
///
/// Connects to a WebDriver endpoint, loads the chat page, and either
/// watches the session for state changes (QR codes, login, unread chats)
/// or runs a one-shot query against it. Output is structured JSON for
/// scripting.
#[derive(Debug, Parser)]
#[command(name = "chatprobe", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Watch the session and report events until interrupted
    #[command(after_help = "\
Examples:
  chatprobe watch                           # Watch with defaults
  chatprobe watch --qr-out /tmp/qr.png      # Write each QR code to a file
  chatprobe watch --poll-interval-ms 1000   # Poll once a second
  chatprobe watch --locators my.json        # Override locators at runtime
  chatprobe watch --headed                  # Show the browser window")]
    Watch(WatchArgs),

    /// Search chats and contacts, print results as JSON
    #[command(after_help = "\
Examples:
  chatprobe search alice                    # Entries matching 'alice'
  chatprobe search 'book club' | jq '.[0]'  # First result")]
    Search(SearchArgs),

    /// Print the rendered messages of a chat as JSON
    Messages(MessagesArgs),

    /// Send a message to a chat
    #[command(after_help = "\
Examples:
  chatprobe send alice 'on my way'
  chatprobe send 'book club' 'meeting moved to 7pm'")]
    Send(SendArgs),

    /// Show an end-to-end usage example
    Examples,
}

#[derive(Debug, clap::Args)]
pub struct SessionArgs {
    /// WebDriver endpoint URL
    #[arg(long, default_value = "http://localhost:9515", help = WEBDRIVER_HELP)]
    pub webdriver: String,

    /// Page to load
    #[arg(long, default_value = "https://web.whatsapp.com")]
    pub page: String,

    /// Run the browser with a visible window
    #[arg(long)]
    pub headed: bool,

    /// JSON file of locator overrides ({"name": {"by": "xpath", "value": "..."}})
    #[arg(long, value_name = "FILE")]
    pub locators: Option<String>,
}

#[derive(Debug, clap::Args)]
pub struct WatchArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    /// Delay between poll ticks in milliseconds
    #[arg(long, default_value_t = 250, value_name = "MS")]
    pub poll_interval_ms: u64,

    /// Write the current QR code image to this file on every change
    #[arg(long, value_name = "FILE")]
    pub qr_out: Option<String>,
}

#[derive(Debug, clap::Args)]
pub struct SearchArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    /// Text to search for
    pub query: String,
}

#[derive(Debug, clap::Args)]
pub struct MessagesArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    /// Chat to open (matched by search, top result wins)
    pub chat: String,
}

#[derive(Debug, clap::Args)]
pub struct SendArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    /// Chat to open (matched by search, top result wins)
    pub chat: String,

    /// Message text to send
    pub text: String,
}

/// End-to-end example text for the `examples` command.
pub const EXAMPLES_TEXT: &str = r#"End-to-end example: Pair a device and send a message

This example starts a chromedriver, pairs via QR, and sends a message.

# 1. Start a WebDriver endpoint in another terminal
chromedriver --port=9515

# 2. Watch the session, exporting each QR code to a file
chatprobe watch --qr-out /tmp/qr.png

# 3. Scan /tmp/qr.png with the phone app; watch reports the transitions:
#    {"event":"on_qr"} ... {"event":"on_logged_in"}

# 4. In another terminal, search for the chat
chatprobe search alice

# 5. Read the rendered messages
chatprobe messages alice | jq '.[-3:]'

# 6. Send a message
chatprobe send alice "hello from chatprobe"
"#;

#[cfg(test)]
mod tests {
    use super::{Cli, Commands};
    use clap::Parser;

    #[test]
    fn test_watch_parses_defaults() {
        let cli = Cli::parse_from(["chatprobe", "watch"]);

        match cli.command {
            Commands::Watch(args) => {
                assert_eq!(args.session.webdriver, "http://localhost:9515");
                assert_eq!(args.poll_interval_ms, 250);
                assert!(!args.session.headed);
                assert!(args.qr_out.is_none());
            }
            _ => panic!("Expected watch command"),
        }
    }

    #[test]
    fn test_send_parses_chat_and_text() {
        let cli = Cli::parse_from(["chatprobe", "send", "book club", "moved to 7pm"]);

        match cli.command {
            Commands::Send(args) => {
                assert_eq!(args.chat, "book club");
                assert_eq!(args.text, "moved to 7pm");
            }
            _ => panic!("Expected send command"),
        }
    }
}
