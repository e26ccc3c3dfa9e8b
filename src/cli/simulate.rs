//! `simulate` command: one attempt through the simulated transport, with
//! events printed to stdout as JSON lines.

use std::sync::Arc;
use std::time::Duration;

use clap::Args;

use crate::config::PairingConfig;
use crate::pairing::{
    AttemptReport, ChannelSink, ConnectionToken, EventEmitter, FailurePoint, PairingApi,
    PairingRequest, SimulatedTransport,
};
use crate::version::{ConnectionTokenVersion, PairingVersion};

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Connection token to pair with (a fresh one is minted if omitted)
    #[arg(long)]
    pub token: Option<String>,

    /// Make the attempt fail at this phase
    #[arg(long, value_enum)]
    pub fail_at: Option<FailurePoint>,

    /// Simulated duration of each phase in milliseconds
    #[arg(long, default_value = "500")]
    pub phase_delay_ms: u64,

    /// Declared connection token version tag
    #[arg(long, default_value_t = ConnectionTokenVersion::LATEST.tag())]
    pub connection_version: u8,

    /// Declared pairing protocol version tag
    #[arg(long, default_value_t = PairingVersion::LATEST.tag())]
    pub pairing_version: u8,
}

pub async fn run_simulate_command(
    args: &SimulateArgs,
    config: &PairingConfig,
) -> anyhow::Result<AttemptReport> {
    let token = args
        .token
        .clone()
        .map(ConnectionToken::from)
        .unwrap_or_else(ConnectionToken::generate);

    let mut transport =
        SimulatedTransport::with_phase_delay(Duration::from_millis(args.phase_delay_ms));
    if let Some(point) = args.fail_at {
        transport = transport.failing_at(point);
    }

    let (sink, mut events) = ChannelSink::channel();
    let api = PairingApi::from_config(
        config,
        EventEmitter::new(Arc::new(sink)),
        Arc::new(transport),
    );

    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            println!("{}", event.to_signal());
        }
    });

    let request =
        PairingRequest::with_versions(token, args.connection_version, args.pairing_version);
    let handle = api.start(request)?;
    eprintln!("Pairing {}...", handle.token());
    let report = handle.wait().await;

    // Dropping the API closes the sink so the printer drains and exits.
    drop(api);
    printer.await?;

    match &report {
        AttemptReport::Paired => eprintln!("Paired."),
        AttemptReport::Failed(e) => eprintln!("Pairing failed: {}", e),
        AttemptReport::Cancelled => eprintln!("Pairing cancelled."),
        AttemptReport::Aborted(reason) => eprintln!("Pairing aborted: {}", reason),
    }
    Ok(report)
}
