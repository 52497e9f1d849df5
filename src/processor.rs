//! Processor Tasks - event, API request and auto-connect processing
//!
//! This module contains the tasks that drive the global [`SinkManager`](crate::SinkManager).
//! They run concurrently and serialize on the manager's mutex, so an event, a
//! request and a firing auto-connect never observe each other half-done.
//!
//! # Architecture
//!
//! * **Event Processor**: applies [`SinkEvent`](crate::SinkEvent)s posted through
//!   [`api`](crate::api) and wakes the auto-connect processor when a deadline moves
//! * **Request Processor**: serves API requests and sends back responses
//! * **Auto-connect Processor**: sleeps until the earliest pending deadline, then
//!   fires the due attempts
//!
//! # Example
//!
//! ```rust,ignore
//! use sinkbird::{SinkContext, SinkManagerOptions, processor};
//!
//! async fn bluetooth_audio(adapter: &MyAdapter, store: &MyStore, bus: &MyBus) {
//!     let ctx = SinkContext::new(adapter, store, bus);
//!     if let Err(e) = processor::run(SinkManagerOptions::default(), ctx).await {
//!         // already initialized
//!     }
//! }
//! ```

use embassy_futures::select::{select, select3};
use embassy_time::{Instant, Timer};

use crate::{
    AUTO_CONNECT_SIGNAL, AdapterStack, EVENT_CHANNEL, NotificationSink, PriorityStore,
    REQUEST_CHANNEL, RESPONSE_CHANNEL, Response, SinkContext, SinkError, SinkManagerOptions,
    sink_manager,
};

async fn event_processor<A, P, N>(ctx: SinkContext<'_, A, P, N>) -> !
where
    A: AdapterStack,
    P: PriorityStore,
    N: NotificationSink,
{
    let receiver = EVENT_CHANNEL.receiver();

    loop {
        let event = receiver.receive().await;
        debug!("[PROCESSOR] Event: {:?}", event);
        match sink_manager().await {
            Ok(mut manager) => {
                if manager.process_event(&event, Instant::now(), ctx) {
                    AUTO_CONNECT_SIGNAL.signal(());
                }
            }
            Err(e) => error!("[PROCESSOR] SinkManager not initialized: {}", e),
        }
    }
}

async fn request_processor<A, P, N>(ctx: SinkContext<'_, A, P, N>) -> !
where
    A: AdapterStack,
    P: PriorityStore,
    N: NotificationSink,
{
    let receiver = REQUEST_CHANNEL.receiver();
    let sender = RESPONSE_CHANNEL.sender();

    loop {
        let request = receiver.receive().await;
        let response = match sink_manager().await {
            Ok(mut manager) => manager.process_request(&request, ctx),
            Err(e) => {
                error!("[PROCESSOR] SinkManager not initialized: {}", e);
                Response::Error(e)
            }
        };
        debug!("[PROCESSOR] API response: {:?}", response);
        sender.send(response).await;
    }
}

async fn auto_connect_processor<A, P, N>(ctx: SinkContext<'_, A, P, N>) -> !
where
    A: AdapterStack,
    P: PriorityStore,
    N: NotificationSink,
{
    loop {
        let deadline = match sink_manager().await {
            Ok(manager) => manager.next_auto_connect_deadline(),
            Err(_) => None,
        };

        match deadline {
            Some(deadline) => {
                trace!("[PROCESSOR] Next auto-connect at {} ms", deadline.as_millis());
                select(Timer::at(deadline), AUTO_CONNECT_SIGNAL.wait()).await;
            }
            None => AUTO_CONNECT_SIGNAL.wait().await,
        }

        if let Ok(mut manager) = sink_manager().await {
            if let Some(address) = manager.process_due_auto_connects(Instant::now(), ctx) {
                debug!("[PROCESSOR] Auto-connect issued to {}", address);
            }
        }
    }
}

/// Initialize the global manager and run the processor tasks forever
///
/// If the adapter is already enabled, the sink table is populated before the
/// first event is processed.
///
/// # Errors
///
/// Returns [`SinkError::AlreadyInitialized`] if the global manager was set up
/// before; otherwise this future never completes.
pub async fn run<A, P, N>(
    options: SinkManagerOptions,
    ctx: SinkContext<'_, A, P, N>,
) -> Result<(), SinkError>
where
    A: AdapterStack,
    P: PriorityStore,
    N: NotificationSink,
{
    crate::init_sink_manager(options).await?;
    info!("[PROCESSOR] SinkManager initialized");

    if ctx.adapter.is_enabled() {
        sink_manager().await?.on_adapter_enabled(ctx);
    }

    select3(
        event_processor(ctx),
        request_processor(ctx),
        auto_connect_processor(ctx),
    )
    .await;
    Ok(())
}
