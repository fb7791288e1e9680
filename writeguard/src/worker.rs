use crate::{
	error::{Error, Result},
	trx::{EventRx, EventTx},
};
use aya::maps::{MapData, RingBuf};
use tokio::io::unix::AsyncFd;
use tracing::info;
use writeguard_common::WriteEvent;
use zerocopy::FromBytes;

pub struct RingBufWorker {
	pub ringbuf_fd: AsyncFd<RingBuf<MapData>>,
	pub tx: EventTx,
}

impl RingBufWorker {
	pub async fn start(ringbuf_fd: AsyncFd<RingBuf<MapData>>, tx: EventTx) -> Result<()> {
		let mut worker = RingBufWorker { ringbuf_fd, tx };
		tokio::spawn(async move {
			let res = worker.start_worker().await;
			res
		});
		Ok(())
	}

	async fn start_worker(&mut self) -> Result<()> {
		let tx = self.tx.clone();
		loop {
			let mut guard = self.ringbuf_fd.readable_mut().await?;
			let ring_buf = guard.get_inner_mut();

			// Records come out in the order the hook submitted them; forward
			// them on the same order.
			while let Some(item) = ring_buf.next() {
				let data = item.as_ref();

				match parse_event_from_bytes(data) {
					Ok(event) => {
						tx.send(event).await?;
					}
					Err(e) => info!("Failed to parse event: {:?}", e),
				}
			}

			guard.clear_ready();
		}
	}
}

pub struct SinkWorker {
	pub rx: EventRx,
}

impl SinkWorker {
	pub async fn start(rx: EventRx) -> Result<()> {
		let worker = SinkWorker { rx };
		tokio::spawn(async move {
			let res = worker.start_worker().await;
			res
		});
		Ok(())
	}

	pub async fn start_worker(&self) -> Result<()> {
		while let Ok(evt) = self.rx.recv().await {
			info!(
				"[WRITE] PID:{} | UID:{} | CMD:{} | LEN:{} | ENTROPY:{}",
				evt.pid,
				evt.uid,
				comm_to_string(&evt.comm),
				evt.write_len,
				evt.entropy_score
			);
		}
		Ok(())
	}
}

fn parse_event_from_bytes(data: &[u8]) -> Result<WriteEvent> {
	WriteEvent::read_from_bytes(data).map_err(|_| Error::InvalidEventSize)
}

pub fn comm_to_string(comm: &[u8]) -> String {
	let comm_lossy = String::from_utf8_lossy(comm);
	comm_lossy.trim_end_matches('\0').to_string()
}

#[cfg(test)]
mod tests {
	use super::*;
	use writeguard_common::{COMM_LEN, WRITE_EVENT_SIZE};
	use zerocopy::{FromZeros, IntoBytes};

	// Mirrors bpf_get_current_comm: at most 15 bytes of name, always
	// NUL-terminated, remainder zero-padded.
	fn kernel_comm(name: &str) -> [u8; COMM_LEN] {
		let mut comm = [0u8; COMM_LEN];
		let n = name.len().min(COMM_LEN - 1);
		comm[..n].copy_from_slice(&name.as_bytes()[..n]);
		comm
	}

	fn make_event(pid: u32, name: &str, write_len: u64) -> WriteEvent {
		let mut evt = WriteEvent::new_zeroed();
		evt.pid = pid;
		evt.comm = kernel_comm(name);
		evt.write_len = write_len;
		evt
	}

	#[test]
	fn decode_reproduces_hook_fields() {
		let evt = make_event(1234, "worker", 100);
		let bytes = evt.as_bytes();
		assert_eq!(bytes.len(), WRITE_EVENT_SIZE);

		let decoded = parse_event_from_bytes(bytes).unwrap();
		assert_eq!(decoded.pid, 1234);
		assert_eq!(comm_to_string(&decoded.comm), "worker");
		assert_eq!(decoded.write_len, 100);
		assert_eq!(decoded.uid, 0);
		assert_eq!(decoded.entropy_score, 0);
		assert!(decoded.filename.iter().all(|&b| b == 0));
	}

	#[test]
	fn decode_rejects_wrong_sized_records() {
		let evt = make_event(1, "worker", 1);
		let bytes = evt.as_bytes();

		assert!(matches!(parse_event_from_bytes(&bytes[..WRITE_EVENT_SIZE - 1]), Err(Error::InvalidEventSize)));
		assert!(matches!(parse_event_from_bytes(&[]), Err(Error::InvalidEventSize)));
	}

	#[test]
	fn long_comm_truncates_to_fifteen_bytes_and_terminator() {
		let comm = kernel_comm("averylongprocessname");
		assert_eq!(comm[COMM_LEN - 1], 0);
		assert_eq!(comm_to_string(&comm), "averylongproces");
	}

	// Parse-then-forward, the same path `RingBufWorker` walks per record:
	// whatever order records are submitted in is the order the sink sees.
	#[tokio::test]
	async fn drain_preserves_submit_order() {
		let (tx, rx) = crate::trx::new_trx_pair();

		for i in 0..8u32 {
			let raw = make_event(i, "worker", u64::from(i) * 10);
			let evt = parse_event_from_bytes(raw.as_bytes()).unwrap();
			tx.send(evt).await.unwrap();
		}

		for i in 0..8u32 {
			let evt = rx.recv().await.unwrap();
			assert_eq!(evt.pid, i);
			assert_eq!(evt.write_len, u64::from(i) * 10);
		}
	}

	#[test]
	fn saturated_channel_drops_without_blocking() {
		let (tx, rx) = flume::bounded::<WriteEvent>(2);

		assert!(tx.try_send(make_event(1, "worker", 1)).is_ok());
		assert!(tx.try_send(make_event(2, "worker", 2)).is_ok());
		// Full: the producer gets an immediate refusal, never a wait, and
		// the overflow event simply does not exist for the consumer.
		assert!(tx.try_send(make_event(3, "worker", 3)).is_err());

		assert_eq!(rx.recv().unwrap().pid, 1);
		assert_eq!(rx.recv().unwrap().pid, 2);
		assert!(rx.try_recv().is_err());
	}
}
