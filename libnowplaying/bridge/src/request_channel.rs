use flume::{Receiver, RecvError, SendError, Sender};
use tokio::sync::oneshot;

type Envelope<TIn, TOut> = (TIn, Responder<TOut>);

pub(crate) fn request_channel<TIn, TOut>() -> (RequestSender<TIn, TOut>, RequestReceiver<TIn, TOut>)
{
    let (main_tx, main_rx) = flume::unbounded();
    (RequestSender { main_tx }, RequestReceiver { main_rx })
}

#[derive(Debug)]
pub(crate) struct RequestSender<TIn, TOut> {
    main_tx: Sender<Envelope<TIn, TOut>>,
}

// Derived Clone would require TIn: Clone
impl<TIn, TOut> Clone for RequestSender<TIn, TOut> {
    fn clone(&self) -> Self {
        Self {
            main_tx: self.main_tx.clone(),
        }
    }
}

#[derive(Debug)]
pub(crate) struct RequestReceiver<TIn, TOut> {
    main_rx: Receiver<Envelope<TIn, TOut>>,
}

/// Replies to a single request. Fire-and-forget requests carry an empty responder.
#[derive(Debug)]
pub(crate) struct Responder<TOut>(Option<oneshot::Sender<TOut>>);

impl<TOut> Responder<TOut> {
    pub(crate) fn respond(self, response: TOut) -> Result<(), TOut> {
        match self.0 {
            Some(reply_tx) => reply_tx.send(response),
            None => Ok(()),
        }
    }
}

impl<TIn, TOut> RequestSender<TIn, TOut> {
    /// Never blocks, so it's safe to call from OS callbacks.
    pub(crate) fn send(&self, message: TIn) -> Result<(), SendError<TIn>> {
        self.main_tx
            .send((message, Responder(None)))
            .map_err(|SendError((message, _))| SendError(message))
    }

    pub(crate) async fn get_response(&self, message: TIn) -> Result<TOut, String> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.main_tx
            .send_async((message, Responder(Some(reply_tx))))
            .await
            .map_err(|_| "Error sending request: receiver closed".to_owned())?;
        reply_rx
            .await
            .map_err(|e| format!("Error receiving response: {e:?}"))
    }
}

impl<TIn, TOut> RequestReceiver<TIn, TOut> {
    pub(crate) async fn recv_async(&self) -> Result<Envelope<TIn, TOut>, RecvError> {
        self.main_rx.recv_async().await
    }
}
