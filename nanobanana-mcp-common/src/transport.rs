//! MCP transport selection.
//!
//! The server speaks MCP over stdio (the default, for clients that spawn it
//! as a subprocess) or over streamable HTTP on a loopback port.

use std::fmt;

use clap::{Args, ValueEnum};

/// Port used by the HTTP transport when neither `--port` nor `PORT` is set.
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Where the MCP server listens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transport {
    /// JSON-RPC over stdin/stdout
    #[default]
    Stdio,
    /// Streamable HTTP at `/mcp` on 127.0.0.1
    Http {
        /// Port to listen on
        port: u16,
    },
}

impl Transport {
    /// Listening port, for the HTTP transport only.
    pub fn port(&self) -> Option<u16> {
        match self {
            Transport::Stdio => None,
            Transport::Http { port } => Some(*port),
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transport::Stdio => f.write_str("stdio"),
            Transport::Http { port } => write!(f, "http://127.0.0.1:{}/mcp", port),
        }
    }
}

/// Value of `--transport`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum TransportMode {
    #[default]
    Stdio,
    Http,
}

/// Transport flags, flattened into the server's CLI.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct TransportArgs {
    /// Transport to serve MCP over
    #[arg(long, value_enum, ignore_case = true, default_value_t = TransportMode::Stdio)]
    pub transport: TransportMode,

    /// Port for the HTTP transport
    #[arg(long, env = "PORT", default_value_t = DEFAULT_HTTP_PORT)]
    pub port: u16,
}

impl From<TransportArgs> for Transport {
    fn from(args: TransportArgs) -> Self {
        match args.transport {
            TransportMode::Stdio => Transport::Stdio,
            TransportMode::Http => Transport::Http { port: args.port },
        }
    }
}

impl TransportArgs {
    /// The transport these flags select. The port is ignored for stdio.
    pub fn into_transport(self) -> Transport {
        self.into()
    }
}
