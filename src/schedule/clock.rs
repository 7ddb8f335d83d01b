// src/schedule/clock.rs

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{info, warn};

use crate::engine::RunOptions;
use crate::proxy::RunProxy;
use crate::types::{ConnectionToken, TemplateId};

/// Start a merge run of `template_id` every `period`, first after one full
/// period. Start failures are logged and the loop keeps going; abort the
/// handle to stop it.
pub fn spawn_clock_trigger(
    proxy: Arc<dyn RunProxy>,
    template_id: TemplateId,
    token: Option<ConnectionToken>,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;

            let mut options = RunOptions::new(template_id.clone());
            options.connection_token = token.clone();

            match proxy.start(options).await {
                Ok(run_id) => {
                    info!(run_id = %run_id, template = %template_id, "clock trigger started merge run")
                }
                Err(err) => {
                    warn!(template = %template_id, error = %err, "clock trigger could not start merge run")
                }
            }
        }
    })
}
