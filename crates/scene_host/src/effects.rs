use std::sync::Arc;
use std::time::Duration;

use scene_core::{Effect, Msg, PromptId};
use scene_engine::{fetchable_by_host, DownloadRequest, Downloader, Outbound, WireSubmission};
use scene_logging::{scene_debug, scene_info, scene_warn};
use tokio::sync::mpsc;
use tokio::task::AbortHandle;

use crate::bridge::ExtensionPort;
use crate::coordinator::HostEvent;
use crate::wire::{event_to_outbound, settings_to_wire};

/// Carries out the IO side of effects. Results come back to the coordinator
/// as `HostEvent::Signal` messages; nothing here touches workflow state.
pub struct EffectRunner {
    port: Arc<dyn ExtensionPort>,
    downloader: Arc<dyn Downloader>,
    events: mpsc::UnboundedSender<HostEvent>,
    ack_timeout: Duration,
    ack_timer: Option<(PromptId, AbortHandle)>,
}

impl EffectRunner {
    pub fn new(
        port: Arc<dyn ExtensionPort>,
        downloader: Arc<dyn Downloader>,
        events: mpsc::UnboundedSender<HostEvent>,
        ack_timeout: Duration,
    ) -> Self {
        Self {
            port,
            downloader,
            events,
            ack_timeout,
            ack_timer: None,
        }
    }

    /// Runs one effect. Timer effects belong to the coordinator loop and are
    /// ignored here.
    pub async fn run(&mut self, effect: Effect) {
        match effect {
            Effect::ArmTimer { .. } | Effect::DisarmTimer => {}
            Effect::SubmitPrompt {
                prompt_id,
                text,
                index,
                settings,
            } => {
                scene_info!(
                    "SubmitPrompt prompt_id={} index={} text_len={}",
                    prompt_id,
                    index,
                    text.len()
                );
                let message = Outbound::SubmitPrompt {
                    prompt: WireSubmission {
                        id: prompt_id,
                        text,
                    },
                    index,
                    settings: settings_to_wire(&settings),
                };
                match self.port.send(message).await {
                    Ok(()) => self.arm_ack_timer(prompt_id),
                    Err(err) => {
                        scene_warn!("Could not deliver prompt {}: {}", prompt_id, err);
                        self.signal(Msg::SubmitRejected {
                            prompt_id,
                            reason: format!("extension unreachable: {err}"),
                        });
                    }
                }
            }
            Effect::DownloadOutput {
                prompt_id,
                image_index,
                url,
                filename,
            } => {
                let request = DownloadRequest {
                    prompt_id,
                    image_index,
                    url,
                    filename,
                };
                if fetchable_by_host(&request.url) {
                    self.spawn_download(request);
                } else {
                    self.forward_download(request).await;
                }
            }
            Effect::Notify(event) => {
                let message = event_to_outbound(event);
                if let Err(err) = self.port.send(message).await {
                    scene_warn!("Dropping notification: {}", err);
                }
            }
        }
    }

    /// Stops waiting for an acknowledgement once the submission settled.
    pub fn settle_ack(&mut self, in_flight: Option<PromptId>) {
        let settled = match (&self.ack_timer, in_flight) {
            (Some((waiting, _)), Some(current)) => *waiting != current,
            (Some(_), None) => true,
            (None, _) => false,
        };
        if settled {
            if let Some((prompt_id, handle)) = self.ack_timer.take() {
                scene_debug!("Ack timer for prompt {} cancelled", prompt_id);
                handle.abort();
            }
        }
    }

    fn arm_ack_timer(&mut self, prompt_id: PromptId) {
        if let Some((_, previous)) = self.ack_timer.take() {
            previous.abort();
        }
        let events = self.events.clone();
        let wait = self.ack_timeout;
        let task = tokio::spawn(async move {
            tokio::time::sleep(wait).await;
            let _ = events.send(HostEvent::Signal(Msg::SubmitTimedOut { prompt_id }));
        });
        self.ack_timer = Some((prompt_id, task.abort_handle()));
    }

    fn spawn_download(&self, request: DownloadRequest) {
        let downloader = Arc::clone(&self.downloader);
        let events = self.events.clone();
        tokio::spawn(async move {
            let msg = match downloader.download(&request).await {
                Ok(saved) => {
                    scene_info!(
                        "Saved output {} of prompt {} to {:?} ({} bytes)",
                        request.image_index,
                        request.prompt_id,
                        saved.path,
                        saved.byte_len
                    );
                    Msg::DownloadFinished {
                        prompt_id: request.prompt_id,
                        image_index: request.image_index,
                    }
                }
                Err(err) => {
                    scene_warn!(
                        "Download {} of prompt {} failed: {}",
                        request.image_index,
                        request.prompt_id,
                        err
                    );
                    Msg::DownloadFailed {
                        prompt_id: request.prompt_id,
                        image_index: request.image_index,
                        reason: err.to_string(),
                    }
                }
            };
            let _ = events.send(HostEvent::Signal(msg));
        });
    }

    async fn forward_download(&mut self, request: DownloadRequest) {
        let message = Outbound::DownloadBlob {
            blob_url: request.url,
            filename: request.filename,
            prompt_id: request.prompt_id,
            image_index: request.image_index,
        };
        if let Err(err) = self.port.send(message).await {
            self.signal(Msg::DownloadFailed {
                prompt_id: request.prompt_id,
                image_index: request.image_index,
                reason: format!("extension unreachable: {err}"),
            });
        }
    }

    fn signal(&self, msg: Msg) {
        let _ = self.events.send(HostEvent::Signal(msg));
    }
}
