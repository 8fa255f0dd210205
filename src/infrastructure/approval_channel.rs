use crate::domain::ports::ApprovalHandoff;
use crate::domain::transaction::ApprovalOutcome;
use crate::error::Result;
use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tracing::warn;

/// A pending request for the presentation layer to show an approval page.
#[derive(Debug)]
pub struct ApprovalPrompt {
    pub approval_url: String,
    responder: oneshot::Sender<ApprovalOutcome>,
}

impl ApprovalPrompt {
    pub fn respond(self, outcome: ApprovalOutcome) {
        // The coordinator may already have given up on this prompt.
        let _ = self.responder.send(outcome);
    }

    pub fn approve(self) {
        self.respond(ApprovalOutcome::Approved);
    }

    pub fn cancel(self) {
        self.respond(ApprovalOutcome::Cancelled);
    }
}

/// Hands approval URLs to the presentation layer over a channel.
///
/// The presentation layer drains the receiver returned by `new`, renders
/// each prompt and answers it. Dropping a prompt unanswered, or dropping the
/// receiver, resolves the wait as `Cancelled`.
#[derive(Clone)]
pub struct ChannelApprovalHandoff {
    prompts: mpsc::Sender<ApprovalPrompt>,
}

impl ChannelApprovalHandoff {
    pub fn new(buffer: usize) -> (Self, mpsc::Receiver<ApprovalPrompt>) {
        let (prompts, rx) = mpsc::channel(buffer);
        (Self { prompts }, rx)
    }
}

#[async_trait]
impl ApprovalHandoff for ChannelApprovalHandoff {
    async fn present_approval(&self, approval_url: &str) -> Result<ApprovalOutcome> {
        let (responder, response) = oneshot::channel();
        let prompt = ApprovalPrompt {
            approval_url: approval_url.to_string(),
            responder,
        };
        if self.prompts.send(prompt).await.is_err() {
            warn!(approval_url, "presentation layer is gone");
            return Ok(ApprovalOutcome::Cancelled);
        }
        Ok(response.await.unwrap_or(ApprovalOutcome::Cancelled))
    }
}
