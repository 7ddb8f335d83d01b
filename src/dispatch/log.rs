// src/dispatch/log.rs

use tracing::info;

use super::{DispatchFuture, MessageDispatcher, OutgoingMessage};

/// Dispatcher that only logs. With `echo` set it also prints the full
/// message to stdout, which is what `run --dry-run` uses.
#[derive(Debug, Clone, Default)]
pub struct LogDispatcher {
    echo: bool,
}

impl LogDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn echo() -> Self {
        Self { echo: true }
    }
}

impl MessageDispatcher for LogDispatcher {
    fn send<'a>(&'a self, message: &'a OutgoingMessage) -> DispatchFuture<'a> {
        Box::pin(async move {
            info!(
                run_id = %message.run_id,
                row = message.row_index,
                to = %message.to,
                subject = %message.subject,
                "message dispatched (log only)"
            );
            if self.echo {
                println!("--- row {} ---", message.row_index);
                println!("To: {}", message.to);
                if let Some(cc) = &message.cc {
                    println!("Cc: {cc}");
                }
                if let Some(bcc) = &message.bcc {
                    println!("Bcc: {bcc}");
                }
                println!("Subject: {}", message.subject);
                println!();
                println!("{}", message.body);
            }
            Ok(())
        })
    }
}
