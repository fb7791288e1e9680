use crate::Result;
use flume::{Receiver, Sender};
use writeguard_common::WriteEvent;

#[derive(Clone)]
pub struct EventTx {
	tx: Sender<WriteEvent>,
}

impl EventTx {
	pub async fn send(&self, item: WriteEvent) -> Result<()> {
		match self.tx.send_async(item).await {
			Ok(_) => Ok(()),
			Err(ex) => Err(ex.into()),
		}
	}
}

pub struct EventRx {
	rx: Receiver<WriteEvent>,
}

impl EventRx {
	pub async fn recv(&self) -> Result<WriteEvent> {
		let res = self.rx.recv_async().await?;
		Ok(res)
	}
}

pub fn new_trx_pair() -> (EventTx, EventRx) {
	let (tx, rx) = flume::unbounded::<WriteEvent>();

	let evt_tx = EventTx { tx };

	let evt_rx = EventRx { rx };

	(evt_tx, evt_rx)
}

#[derive(Clone)]
pub struct ExitTx {
	tx: Sender<()>,
}

impl ExitTx {
	pub async fn send(&self) -> Result<()> {
		match self.tx.send_async(()).await {
			Ok(_) => Ok(()),
			Err(ex) => Err(ex.into()),
		}
	}
}

pub struct ExitRx {
	rx: Receiver<()>,
}

impl ExitRx {
	pub async fn recv(&self) -> Result<()> {
		self.rx.recv_async().await?;
		Ok(())
	}
}

pub fn new_exit_pair() -> (ExitTx, ExitRx) {
	let (tx, rx) = flume::bounded::<()>(1);

	(ExitTx { tx }, ExitRx { rx })
}
