use super::parser;
use super::source::LineSource;
use super::UpdateMessage;
use async_broadcast::Receiver;
use async_channel::Sender;
use futures_lite::future;
use smol::Task;
use smol_macros::Executor;
use tracing::{debug, error};

/// Dedicated task that owns the device for one cycle and feeds parsed
/// readings to the controller in arrival order.
pub(crate) struct Reader<S> {
    source: S,
    sender: Sender<UpdateMessage>,
    stop_receiver: Receiver<()>,
}

impl<S> Reader<S>
where
    S: LineSource + Send + 'static,
{
    pub(crate) fn spawn(
        ex: &Executor<'_>,
        source: S,
        sender: Sender<UpdateMessage>,
        stop_receiver: Receiver<()>,
    ) -> Task<()> {
        let reader = Self {
            source,
            sender,
            stop_receiver,
        };
        ex.spawn(reader.run())
    }

    async fn run(self) {
        let Self {
            mut source,
            sender,
            mut stop_receiver,
        } = self;

        loop {
            // `None` means stop: either requested or the controller is gone.
            let next = future::or(async { Some(source.next_line().await) }, async {
                let _ = stop_receiver.recv().await;
                None
            })
            .await;

            let message = match next {
                None => {
                    debug!("Reader: stop received");
                    break;
                }
                Some(Ok(line)) => {
                    let reading = parser::parse(&line);
                    debug!("[{:?}] {:?} <- {:?}", line.received_at, reading, line.text.trim_end());
                    UpdateMessage::Reading {
                        timestamp: line.received_at,
                        reading,
                    }
                }
                Some(Err(err)) => {
                    error!("Reader: {err}");
                    let failed = UpdateMessage::DeviceFailed { error: err };
                    future::or(
                        async {
                            let _ = sender.send(failed).await;
                        },
                        async {
                            let _ = stop_receiver.recv().await;
                        },
                    )
                    .await;
                    break;
                }
            };

            let delivered = future::or(async { sender.send(message).await.is_ok() }, async {
                let _ = stop_receiver.recv().await;
                false
            })
            .await;
            if !delivered {
                break;
            }
        }

        source.release();
    }
}
