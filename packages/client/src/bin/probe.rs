//! Diagnostic probe for the Parlor real-time endpoint.
//!
//! Connects with an identity, optionally joins one conversation room, and
//! logs every state action routed out of the inbound event stream until
//! interrupted.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin parlor-probe -- --user-id u-1 --token secret
//! cargo run --bin parlor-probe -- -i u-1 -t secret -c conv-42
//! ```

use std::sync::Arc;

use clap::Parser;

use parlor_client::{
    ConnectionManager, Dispatcher, Identity, RealtimeConfig, StateAction, WsTransport,
};
use parlor_shared::logger::setup_logger;
use parlor_shared::model::ConversationId;

#[derive(Parser, Debug)]
#[command(name = "parlor-probe")]
#[command(about = "Probe the Parlor real-time event stream", long_about = None)]
struct Args {
    /// Id of the authenticated user
    #[arg(short = 'i', long)]
    user_id: String,

    /// Identity credential presented during the handshake
    #[arg(short = 't', long)]
    token: String,

    /// Conversation room to join after connecting
    #[arg(short = 'c', long)]
    conversation: Option<String>,

    /// Real-time endpoint URL
    #[arg(short = 'u', long, default_value = "ws://127.0.0.1:8080/realtime")]
    url: String,
}

/// Logs every routed action instead of feeding a UI store.
struct LogDispatcher;

impl Dispatcher for LogDispatcher {
    fn dispatch(&self, action: StateAction) {
        tracing::info!(?action, "state action");
    }
}

#[tokio::main]
async fn main() {
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();

    let mut manager = ConnectionManager::new(
        Arc::new(WsTransport::new(args.url)),
        Arc::new(LogDispatcher),
        RealtimeConfig::default(),
    );

    let handle = manager.acquire(Identity::new(args.user_id.as_str(), args.token));
    if let Some(conversation) = args.conversation {
        handle.set_active_room(Some(ConversationId::from(conversation)));
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to wait for ctrl-c: {}", e);
    }
    manager.release();
}
