use http::header::{CONNECTION, UPGRADE};
use http::HeaderMap;
use hyper::upgrade::OnUpgrade;
use hyper_util::rt::TokioIo;
use tracing::{debug, error, trace};

/// Check if a request asks to switch protocols.
///
/// Requires an `Upgrade` header and an `upgrade` token in `Connection`
/// (case-insensitive). Covers WebSocket as well as any other protocol.
pub(crate) fn is_upgrade_request(headers: &HeaderMap) -> bool {
    let has_upgrade = headers.contains_key(UPGRADE);
    let has_connection = headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|part| part.trim().eq_ignore_ascii_case("upgrade"));

    trace!("is_upgrade_request - upgrade: {has_upgrade}, connection: {has_connection}");
    has_upgrade && has_connection
}

/// Waits for both sides to finish the protocol switch, then copies bytes in
/// both directions until either side closes.
pub(crate) fn spawn_tunnel(client: OnUpgrade, upstream: OnUpgrade, destination: String) {
    tokio::spawn(async move {
        let (client, upstream) = match tokio::try_join!(client, upstream) {
            Ok(pair) => pair,
            Err(e) => {
                error!(%destination, "Failed to upgrade connection: {}", e);
                return;
            }
        };

        let mut client = TokioIo::new(client);
        let mut upstream = TokioIo::new(upstream);
        match tokio::io::copy_bidirectional(&mut client, &mut upstream).await {
            Ok((to_upstream, to_client)) => {
                debug!(%destination, to_upstream, to_client, "Upgraded connection closed");
            }
            Err(e) => {
                debug!(%destination, "Upgraded connection ended with error: {}", e);
            }
        }
    });
}
