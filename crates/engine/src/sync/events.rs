// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event tail: immediate state-cache refresh on runtime events.

use std::sync::Arc;
use std::time::Duration;

use devarch_core::labels::{LABEL_INSTANCE, LABEL_STACK};
use devarch_runtime::{EventAction, EventFilter, RuntimeEvent};
use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;

use super::StatusSync;
use crate::error::EngineError;

const RECONNECT_DELAY: Duration = Duration::from_secs(1);

impl StatusSync {
    /// Tail the runtime's event stream, reconnecting on errors until
    /// canceled.
    pub(super) async fn event_loop(self: Arc<Self>, cancel: CancellationToken) {
        loop {
            if cancel.is_cancelled() {
                break;
            }
            match self.runtime.events(&EventFilter::managed()).await {
                Ok(mut stream) => loop {
                    tokio::select! {
                        _ = cancel.cancelled() => return,
                        item = stream.next() => match item {
                            Some(Ok(event)) => {
                                if let Err(err) = self.handle_event(&event).await {
                                    tracing::warn!(error = %err, "event handling failed");
                                }
                            }
                            Some(Err(err)) => {
                                tracing::warn!(error = %err, "event stream error; reconnecting");
                                break;
                            }
                            None => break,
                        },
                    }
                },
                Err(err) => {
                    tracing::warn!(error = %err, "event stream unavailable");
                }
            }
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(RECONNECT_DELAY) => {}
            }
        }
    }

    pub(super) async fn handle_event(&self, event: &RuntimeEvent) -> Result<(), EngineError> {
        if !matches!(
            event.action,
            EventAction::Start | EventAction::Die | EventAction::HealthStatus(_) | EventAction::Oom
        ) {
            return Ok(());
        }

        // Event actor attributes carry the container's labels.
        let (Some(stack_name), Some(slug)) = (
            event.attributes.get(LABEL_STACK),
            event.attributes.get(LABEL_INSTANCE),
        ) else {
            return Ok(());
        };
        let Some(pk) = self.store.resolve_instance(stack_name, slug).await? else {
            return Ok(());
        };

        match self.runtime.inspect_container(&event.container_id).await {
            Ok(details) => self.refresh_instance(stack_name, slug, pk, &details).await,
            Err(err) if err.is_not_found() => {
                // Container vanished between the event and our inspect;
                // the poll loop or the next apply reconciles the row.
                self.broadcaster.publish(&crate::StatusMessage::changed(
                    stack_name.to_string(),
                    Some(slug.to_string()),
                ));
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }
}
