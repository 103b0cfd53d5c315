//! Bridge event loop
//!
//! Multiplexes the two event kinds the bridge reacts to on a single task:
//! serial chunks and termination events. Chunks are ingested in arrival
//! order; a termination event can land between any two chunks. Once the
//! link is lost only termination events are awaited, and the last reading
//! stays cached until then.

use log::warn;

use crate::reader::SerialTemperatureReader;
use crate::shutdown::{
    ProcessExit, ShutdownCoordinator, ShutdownState, TerminationEvent, TerminationSource,
};
use crate::SerialChannel;

/// Run until a termination event has been handled
///
/// Returns the exit code passed to the coordinator's exit handler. With
/// `StdProcessExit` this never returns, because the process is gone.
pub async fn run<C, T, X>(
    reader: &mut SerialTemperatureReader<C>,
    termination: &mut T,
    coordinator: &mut ShutdownCoordinator<X>,
) -> i32
where
    C: SerialChannel,
    T: TerminationSource + ?Sized,
    X: ProcessExit,
{
    loop {
        tokio::select! {
            event = termination.next_event() => {
                let event = event.unwrap_or_else(|| {
                    TerminationEvent::Error("termination source ended".to_owned())
                });

                match coordinator.shutdown(&event, reader.channel_mut()).await {
                    Some(code) => return code,
                    None => {
                        if let ShutdownState::Exited(code) = coordinator.state() {
                            return code;
                        }
                    }
                }
            }
            result = reader.poll_chunk(), if !reader.is_link_lost() => {
                match result {
                    Ok(0) => warn!(
                        "Serial link {} closed; keeping last reading {}",
                        reader.channel().path(),
                        reader.current()
                    ),
                    Ok(_) => {}
                    Err(e) => warn!(
                        "Serial link {} failed: {}; keeping last reading {}",
                        reader.channel().path(),
                        e,
                        reader.current()
                    ),
                }
            }
        }
    }
}
