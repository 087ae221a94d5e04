//! Content derivation applied once per message before fan-out.

use std::time::Duration;

use {
    async_trait::async_trait,
    futures::future::join_all,
    lightning_common::{Attachment, Message, MessageKind},
    lightning_config::ContentConfig,
    tracing::debug,
};

pub const LOADING_TEXT: &str = "Loading...";
pub const STICKER_FALLBACK_TEXT: &str = "*used sticker*";
const ELLIPSIS: &str = "...";

/// Checks whether an asset URL can be fetched.
#[async_trait]
pub trait AssetProbe: Send + Sync {
    async fn reachable(&self, url: &str) -> bool;
}

/// Probes assets with a `HEAD` request.
pub struct HttpProbe {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpProbe {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout,
        }
    }
}

#[async_trait]
impl AssetProbe for HttpProbe {
    async fn reachable(&self, url: &str) -> bool {
        match self.client.head(url).timeout(self.timeout).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                debug!(url, error = %e, "asset probe failed");
                false
            },
        }
    }
}

/// Cut `content` to at most `max_chars` characters, marking the cut with `...`.
pub fn truncate(content: &str, max_chars: usize) -> String {
    if content.chars().count() <= max_chars {
        return content.to_string();
    }
    // A cap too small for the ellipsis is a plain cut.
    if max_chars <= ELLIPSIS.len() {
        return content.chars().take(max_chars).collect();
    }
    let keep = max_chars - ELLIPSIS.len();
    let mut out: String = content.chars().take(keep).collect();
    out.push_str(ELLIPSIS);
    out
}

/// Build the outgoing copy of `message`.
///
/// Placeholder kinds get fixed text, stickers become attachments when the
/// asset answers within the probe timeout, long content is truncated and
/// attachments over the size quota are dropped.
pub async fn derive(message: &Message, config: &ContentConfig, probe: &dyn AssetProbe) -> Message {
    let mut out = message.clone();

    match message.kind {
        MessageKind::Loading => out.content = Some(LOADING_TEXT.to_string()),
        MessageKind::MemberJoined => {
            out.content = Some(format!("*joined on {}*", message.platform.name));
        },
        MessageKind::Default => {},
    }

    if !message.stickers.is_empty() {
        let timeout = Duration::from_secs(config.sticker_probe_timeout_secs);
        let probes = message.stickers.iter().map(|sticker| async move {
            let url = sticker.url();
            let ok = tokio::time::timeout(timeout, probe.reachable(&url))
                .await
                .unwrap_or(false);
            (sticker, url, ok)
        });
        for (sticker, url, ok) in join_all(probes).await {
            if ok {
                out.attachments.push(Attachment {
                    file: url,
                    size: 0.0,
                    name: Some(sticker.filename()),
                    alt: Some(sticker.name.clone()),
                });
            } else {
                debug!(sticker = %sticker.id, url = %url, "sticker unreachable");
                out.content = Some(STICKER_FALLBACK_TEXT.to_string());
            }
        }
        out.stickers.clear();
    }

    if let Some(content) = &out.content {
        out.content = Some(truncate(content, config.max_content_chars));
    }

    out.attachments
        .retain(|a| a.size <= config.attachment_quota_mb);

    out
}
