//! JSON-lines bridge for an embedded panel.
//!
//! Each stdin line is one inbound message, enveloped or bare. Each outbound
//! message is written to stdout as one `{kind, payload}` line.

use color_eyre::Result;
use osae_core::ControlSession;
use osae_protocol::config_models::ControlConfig;
use osae_protocol::ipc::OutboundMessage;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::select;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Outbound messages queued for the panel; further sends are dropped.
const OUTBOUND_CAPACITY: usize = 256;

pub async fn run(config: ControlConfig) -> Result<()> {
    let (outbound_tx, mut outbound_rx) = mpsc::channel(OUTBOUND_CAPACITY);
    let session = ControlSession::activate(config, outbound_tx).await?;
    let _router = session.wire_inbound();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    info!("panel bridge ready");

    let result = loop {
        select! {
            Some(message) = outbound_rx.recv() => {
                if let Err(error) = write_envelope(&mut stdout, &message).await {
                    break Err(error);
                }
            }
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    session.channel().deliver_str(&line);
                }
                Ok(None) => {
                    debug!("stdin closed");
                    break Ok(());
                }
                Err(error) => break Err(error.into()),
            },
            _ = &mut ctrl_c => {
                debug!("interrupted");
                break Ok(());
            }
        }
    };

    session.shutdown().await;
    while let Ok(message) = outbound_rx.try_recv() {
        write_envelope(&mut stdout, &message).await?;
    }
    result
}

async fn write_envelope<W>(out: &mut W, message: &OutboundMessage) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut line = serde_json::to_vec(message)?;
    line.push(b'\n');
    out.write_all(&line).await?;
    out.flush().await?;
    Ok(())
}
