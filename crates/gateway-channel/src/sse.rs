//! `GET /channel/subscribe?channelId=&token=[&afterSeq=]`: a long-lived
//! SSE stream. Authorization is always via capability token here (the
//! query string, never a header, since EventSource cannot set custom
//! headers); the token's `read`/`read:deleted` permissions gate what the
//! poll loop is allowed to see.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use gateway_core::prelude::*;
use gateway_token::capability::{self, ChannelPermission};
use serde::{Deserialize, Serialize};

use crate::handler::{ChannelEventRes, VisibleEventRes};

const POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Deserialize)]
pub struct SubscribeQuery {
	pub channel_id: String,
	pub token: String,
	#[serde(default)]
	pub after_seq: Option<u64>,
}

#[derive(Serialize)]
struct ConnectedPayload {
	channel_id: String,
	after_seq: u64,
}

/// `GET /channel/subscribe`. Public (query-token authenticated).
pub async fn subscribe(
	State(app): State<App>,
	Query(q): Query<SubscribeQuery>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
	let meta = app.channel_adapter.get_metadata(&q.channel_id).await?.ok_or(Error::NotFound)?;
	let token = capability::verify(&q.token, &meta.secret, now_ms())?;
	if token.channel_id != meta.channel_id {
		return Err(Error::Forbidden);
	}
	if !token.has(ChannelPermission::Read) {
		return Err(Error::Forbidden);
	}
	let include_deleted = token.has(ChannelPermission::ReadDeleted);
	let start_seq = q.after_seq.unwrap_or(0);

	let stream = async_stream::stream! {
		let connected = ConnectedPayload { channel_id: meta.channel_id.clone(), after_seq: start_seq };
		if let Ok(json) = serde_json::to_string(&connected) {
			yield Ok(Event::default().event("connected").data(json));
		}

		let mut cursor = start_seq;
		loop {
			tokio::time::sleep(POLL_INTERVAL).await;

			let read = app
				.channel_adapter
				.read(&meta.channel_id, ReadOpts { after_seq: cursor, limit: 100, include_deleted })
				.await;

			match read {
				Ok(result) => {
					for visible in result.events {
						cursor = visible.event.seq;
						let deleted = visible.deleted;
						let res = VisibleEventRes { event: ChannelEventRes::from(visible.event), deleted };
						let Ok(json) = serde_json::to_string(&res) else { continue };
						yield Ok(Event::default().id(cursor.to_string()).data(json));
					}
				}
				Err(err) => {
					tracing::warn!(channel_id = %meta.channel_id, error = %err, "channel subscribe poll failed");
				}
			}
		}
	};

	Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

// vim: ts=4
