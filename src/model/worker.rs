use std::thread;

use crossbeam_channel::{Receiver, Sender, TrySendError};

use crate::model::{LatentModel, LatentVector, ModelError, Result};
use crate::pipeline::pattern::{CornerSet, Pattern};

const QUEUE_DEPTH: usize = 1024;

/// What a request was issued for. Comes back on the reply so the engine can
/// tell whether the result is still wanted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ticket {
    /// Corner encodings after a corner change.
    Encodings(u64),
    /// A direct pad blend (drag mode).
    Blend(u64),
    /// One step of a path cache build.
    PathStep { version: u64, step: usize },
    /// Encodings for a full pad interpolation.
    GridEncode(u64),
    /// One cell of a full pad interpolation.
    GridCell { job: u64, index: usize },
}

/// Commands sent from the engine to the model thread.
pub enum ModelRequest {
    Encode {
        ticket: Ticket,
        corners: CornerSet<Pattern>,
    },
    Decode {
        ticket: Ticket,
        latent: LatentVector,
        temperature: f32,
    },
    /// Shut down the thread.
    Shutdown,
}

#[derive(Debug)]
pub enum ModelReply {
    Encoded {
        ticket: Ticket,
        result: Result<CornerSet<LatentVector>>,
    },
    Decoded {
        ticket: Ticket,
        result: Result<Pattern>,
    },
}

impl ModelReply {
    pub fn ticket(&self) -> Ticket {
        match self {
            ModelReply::Encoded { ticket, .. } | ModelReply::Decoded { ticket, .. } => *ticket,
        }
    }
}

/// Engine-side end of the model channels.
///
/// Submitting never blocks. Replies are collected with [`ModelClient::drain`]
/// from the engine's own thread.
pub struct ModelClient {
    tx: Sender<ModelRequest>,
    rx: Receiver<ModelReply>,
}

impl ModelClient {
    /// Wrap an existing channel pair. Whoever holds the other ends plays the
    /// model; tests use this to answer requests in any order they like.
    pub fn from_channels(tx: Sender<ModelRequest>, rx: Receiver<ModelReply>) -> Self {
        Self { tx, rx }
    }

    pub fn submit(&self, request: ModelRequest) -> Result<()> {
        match self.tx.try_send(request) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                log::warn!("model queue full, request dropped");
                Err(ModelError::QueueFull)
            }
            Err(TrySendError::Disconnected(_)) => Err(ModelError::Disconnected),
        }
    }

    pub fn drain(&self) -> Vec<ModelReply> {
        self.rx.try_iter().collect()
    }
}

pub struct ModelWorker {
    tx: Sender<ModelRequest>,
    handle: Option<thread::JoinHandle<()>>,
}

impl ModelWorker {
    /// Start the model thread and return it with the client the engine uses.
    pub fn spawn(model: Box<dyn LatentModel>) -> std::io::Result<(Self, ModelClient)> {
        let (req_tx, req_rx) = crossbeam_channel::bounded::<ModelRequest>(QUEUE_DEPTH);
        let (reply_tx, reply_rx) = crossbeam_channel::bounded::<ModelReply>(QUEUE_DEPTH);

        let handle = thread::Builder::new()
            .name("blend-model".to_string())
            .spawn(move || model_loop(model, req_rx, reply_tx))?;

        let worker = Self {
            tx: req_tx.clone(),
            handle: Some(handle),
        };
        Ok((worker, ModelClient::from_channels(req_tx, reply_rx)))
    }

    pub fn join(&mut self) {
        let _ = self.tx.send(ModelRequest::Shutdown);
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
    }
}

impl Drop for ModelWorker {
    fn drop(&mut self) {
        self.join();
    }
}

fn model_loop(mut model: Box<dyn LatentModel>, rx: Receiver<ModelRequest>, tx: Sender<ModelReply>) {
    log::info!("model worker started");
    loop {
        let request = match rx.recv() {
            Ok(request) => request,
            Err(_) => break, // every sender dropped → shutdown
        };

        let reply = match request {
            ModelRequest::Encode { ticket, corners } => ModelReply::Encoded {
                ticket,
                result: model.encode(&corners),
            },
            ModelRequest::Decode {
                ticket,
                latent,
                temperature,
            } => ModelReply::Decoded {
                ticket,
                result: model.decode(&latent, temperature),
            },
            ModelRequest::Shutdown => break,
        };

        if tx.send(reply).is_err() {
            break; // engine is gone
        }
    }
    log::info!("model worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GridModel;
    use crate::pipeline::presets::preset;
    use std::time::Duration;

    #[test]
    fn worker_answers_with_the_request_ticket() {
        let (mut worker, client) = ModelWorker::spawn(Box::new(GridModel::with_seed(16, 3))).unwrap();
        let rock = preset("Rock 1", 16).unwrap();
        client
            .submit(ModelRequest::Encode {
                ticket: Ticket::Encodings(7),
                corners: CornerSet::from_fn(|_| rock.clone()),
            })
            .unwrap();
        client
            .submit(ModelRequest::Decode {
                ticket: Ticket::Blend(2),
                latent: vec![0.0; 3],
                temperature: 0.5,
            })
            .unwrap();

        let mut replies = Vec::new();
        while replies.len() < 2 {
            replies.extend(client.drain());
            std::thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(replies[0].ticket(), Ticket::Encodings(7));
        assert!(matches!(&replies[0], ModelReply::Encoded { result: Ok(_), .. }));
        // bad latent comes back as an error, the thread keeps running
        assert_eq!(replies[1].ticket(), Ticket::Blend(2));
        assert!(matches!(&replies[1], ModelReply::Decoded { result: Err(ModelError::Shape(_)), .. }));

        worker.join();
    }

    #[test]
    fn submitting_after_shutdown_reports_disconnect() {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let (_reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        let client = ModelClient::from_channels(tx, reply_rx);
        drop(rx);
        let err = client
            .submit(ModelRequest::Shutdown)
            .unwrap_err();
        assert_eq!(err, ModelError::Disconnected);
    }

    #[test]
    fn full_queue_is_reported_as_such_for_any_request() {
        let (tx, _rx) = crossbeam_channel::bounded(1);
        let (_reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        let client = ModelClient::from_channels(tx, reply_rx);
        let rock = preset("Rock 1", 16).unwrap();
        client
            .submit(ModelRequest::Decode {
                ticket: Ticket::Blend(1),
                latent: vec![0.0; 3],
                temperature: 0.5,
            })
            .unwrap();
        let err = client
            .submit(ModelRequest::Encode {
                ticket: Ticket::Encodings(1),
                corners: CornerSet::from_fn(|_| rock.clone()),
            })
            .unwrap_err();
        assert_eq!(err, ModelError::QueueFull);
    }
}
